//! Cubemap face loading
//!
//! Faces are decoded on the CPU in the fixed order +X, -X, +Y, -Y, +Z, -Z.
//! A face that fails to decode, is not square or exceeds the device texture
//! limit is reported and left empty; the remaining
//! faces still load and the texture is created with undefined content for the
//! missing layer.

use std::path::{Path, PathBuf};

use crate::error::AssetError;

/// Number of faces in a cubemap.
pub const FACE_COUNT: usize = 6;

/// File stems for the skybox faces, in layer order (+X, -X, +Y, -Y, +Z, -Z).
pub const FACE_NAMES: [&str; FACE_COUNT] = ["right", "left", "top", "bottom", "front", "back"];

/// Builds the six face paths for a skybox directory.
pub fn face_paths(dir: &Path, extension: &str) -> [PathBuf; FACE_COUNT] {
    FACE_NAMES.map(|name| dir.join(format!("{name}.{extension}")))
}

/// Decoded RGBA8 pixels of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Decodes an image file into tightly packed RGBA8.
pub fn decode_image(path: &Path) -> Result<FaceImage, AssetError> {
    let image = image::open(path)
        .map_err(|source| AssetError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();

    Ok(FaceImage {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

/// Rejects images the device cannot hold in a single texture.
pub fn check_texture_size(path: &Path, width: u32, height: u32, max: u32) -> Result<(), AssetError> {
    if width > max || height > max {
        return Err(AssetError::TooLarge {
            path: path.to_path_buf(),
            size: (width, height),
            max,
        });
    }
    Ok(())
}

/// CPU-side cubemap: a common face size and the pixels of every face that
/// decoded successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct CubemapFaces {
    pub width: u32,
    pub height: u32,
    pub faces: [Option<Vec<u8>>; FACE_COUNT],
}

impl CubemapFaces {
    /// Loads all six faces from disk. Faces wider or taller than
    /// `max_dimension` are rejected.
    pub fn load(paths: &[PathBuf; FACE_COUNT], max_dimension: u32) -> Self {
        let decoded = paths.clone().map(|path| {
            let result = decode_image(&path);
            (path, result)
        });
        Self::from_decoded(decoded, max_dimension)
    }

    /// Assembles faces from decode results, logging every failure.
    ///
    /// Faces must be square and no larger than `max_dimension`. The first
    /// face that passes defines the face size; later faces of a different
    /// size are rejected like decode failures.
    pub fn from_decoded(
        decoded: [(PathBuf, Result<FaceImage, AssetError>); FACE_COUNT],
        max_dimension: u32,
    ) -> Self {
        let mut size: Option<(u32, u32)> = None;
        let mut faces: [Option<Vec<u8>>; FACE_COUNT] = Default::default();

        for (index, (path, result)) in decoded.into_iter().enumerate() {
            let face = result.and_then(|face| {
                let actual = (face.width, face.height);
                check_texture_size(&path, face.width, face.height, max_dimension)?;
                if face.width != face.height {
                    return Err(AssetError::NonSquareFace {
                        path: path.clone(),
                        size: actual,
                    });
                }
                match size {
                    Some(expected) if expected != actual => Err(AssetError::FaceSize {
                        path: path.clone(),
                        expected,
                        actual,
                    }),
                    _ => {
                        size = Some(actual);
                        Ok(face)
                    }
                }
            });

            match face {
                Ok(face) => faces[index] = Some(face.rgba),
                Err(err) => {
                    log::error!("Cubemap texture failed to load at path: {} ({err})", path.display())
                }
            }
        }

        let (width, height) = size.unwrap_or((1, 1));
        Self {
            width,
            height,
            faces,
        }
    }

    /// 1x1 cubemap with every face set to `rgba`.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            faces: std::array::from_fn(|_| Some(rgba.to_vec())),
        }
    }

    pub fn loaded_count(&self) -> usize {
        self.faces.iter().filter(|face| face.is_some()).count()
    }
}
