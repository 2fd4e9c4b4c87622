//! OBJ model loading and GPU upload
//!
//! A model is loaded once at startup into [`ModelData`] (plain vectors plus
//! the texture paths named by its MTL file) and then uploaded as a
//! [`GpuModel`]. Vertex and index buffers are created with storage usage as
//! well, so patch programs can read them directly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use wgpu::util::DeviceExt;

use super::bindings::{BindingLayouts, MaterialTextures};
use super::cubemap::{check_texture_size, decode_image, FaceImage};
use super::texture_resource::TextureResource;
use super::vertex::Vertex3D;
use crate::error::AssetError;

/// Fallback albedo when the MTL file gives no diffuse color.
pub const DEFAULT_DIFFUSE: [f32; 3] = [0.8, 0.8, 0.8];
/// Tangent-space "straight up" normal.
pub const FLAT_NORMAL: [u8; 4] = [128, 128, 255, 255];
/// No occlusion.
pub const NO_OCCLUSION: [u8; 4] = [255, 255, 255, 255];
/// Zero height.
pub const NO_DISPLACEMENT: [u8; 4] = [0, 0, 0, 255];

/// Unit cube around the origin as 12 triangles, wound to face inwards.
#[rustfmt::skip]
pub const SKYBOX_POSITIONS: [[f32; 3]; 36] = [
    [-1.0,  1.0, -1.0], [-1.0, -1.0, -1.0], [ 1.0, -1.0, -1.0],
    [ 1.0, -1.0, -1.0], [ 1.0,  1.0, -1.0], [-1.0,  1.0, -1.0],

    [-1.0, -1.0,  1.0], [-1.0, -1.0, -1.0], [-1.0,  1.0, -1.0],
    [-1.0,  1.0, -1.0], [-1.0,  1.0,  1.0], [-1.0, -1.0,  1.0],

    [ 1.0, -1.0, -1.0], [ 1.0, -1.0,  1.0], [ 1.0,  1.0,  1.0],
    [ 1.0,  1.0,  1.0], [ 1.0,  1.0, -1.0], [ 1.0, -1.0, -1.0],

    [-1.0, -1.0,  1.0], [-1.0,  1.0,  1.0], [ 1.0,  1.0,  1.0],
    [ 1.0,  1.0,  1.0], [ 1.0, -1.0,  1.0], [-1.0, -1.0,  1.0],

    [-1.0,  1.0, -1.0], [ 1.0,  1.0, -1.0], [ 1.0,  1.0,  1.0],
    [ 1.0,  1.0,  1.0], [-1.0,  1.0,  1.0], [-1.0,  1.0, -1.0],

    [-1.0, -1.0, -1.0], [-1.0, -1.0,  1.0], [ 1.0, -1.0, -1.0],
    [ 1.0, -1.0, -1.0], [-1.0, -1.0,  1.0], [ 1.0, -1.0,  1.0],
];

/// Texture maps of one mesh, resolved against the model's directory.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialMaps {
    pub diffuse_color: [f32; 3],
    pub albedo: Option<PathBuf>,
    pub normal: Option<PathBuf>,
    pub ambient_occlusion: Option<PathBuf>,
    pub displacement: Option<PathBuf>,
}

impl Default for MaterialMaps {
    fn default() -> Self {
        Self {
            diffuse_color: DEFAULT_DIFFUSE,
            albedo: None,
            normal: None,
            ambient_occlusion: None,
            displacement: None,
        }
    }
}

impl MaterialMaps {
    fn from_mtl(material: &tobj::Material, base_dir: &Path) -> Self {
        let resolve = |name: &Option<String>| {
            name.as_deref()
                .filter(|name| !name.is_empty())
                .map(|name| base_dir.join(name))
        };
        let displacement = material
            .unknown_param
            .get("disp")
            .or_else(|| material.unknown_param.get("map_disp"))
            .cloned();

        Self {
            diffuse_color: material.diffuse.unwrap_or(DEFAULT_DIFFUSE),
            albedo: resolve(&material.diffuse_texture),
            normal: resolve(&material.normal_texture),
            ambient_occlusion: resolve(&material.ambient_texture),
            displacement: resolve(&displacement),
        }
    }

    pub fn diffuse_rgba(&self) -> [u8; 4] {
        let [r, g, b] = self.diffuse_color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        [r, g, b, 255]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<Vertex3D>,
    pub indices: Vec<u32>,
    pub material: MaterialMaps,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    pub path: PathBuf,
    pub meshes: Vec<MeshData>,
}

impl ModelData {
    /// Loads an OBJ file and the MTL file it references.
    ///
    /// A missing or broken MTL file only loses the materials.
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|source| AssetError::Model {
            path: path.to_path_buf(),
            source,
        })?;

        let materials = materials.unwrap_or_else(|err| {
            log::warn!("No materials for {}: {}", path.display(), err);
            Vec::new()
        });

        Self::from_obj(path, &models, &materials)
    }

    /// Converts parsed OBJ data. Meshes without triangles are dropped; a model
    /// left with no meshes is an error.
    pub fn from_obj(
        path: &Path,
        models: &[tobj::Model],
        materials: &[tobj::Material],
    ) -> Result<Self, AssetError> {
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let mut meshes = Vec::with_capacity(models.len());

        for model in models {
            let mesh = &model.mesh;
            if mesh.indices.len() < 3 {
                log::warn!("Skipping empty mesh '{}' in {}", model.name, path.display());
                continue;
            }

            let normals = if mesh.normals.len() == mesh.positions.len() {
                mesh.normals.clone()
            } else {
                calculate_vertex_normals(&mesh.positions, &mesh.indices)
            };

            let vertices = (0..mesh.positions.len() / 3)
                .map(|i| Vertex3D {
                    position: [
                        mesh.positions[i * 3],
                        mesh.positions[i * 3 + 1],
                        mesh.positions[i * 3 + 2],
                    ],
                    normal: [normals[i * 3], normals[i * 3 + 1], normals[i * 3 + 2]],
                    // OBJ puts v = 0 at the bottom of the image
                    tex_coords: match mesh.texcoords.get(i * 2..i * 2 + 2) {
                        Some(&[u, v]) => [u, 1.0 - v],
                        _ => [0.0, 0.0],
                    },
                })
                .collect();

            let material = mesh
                .material_id
                .and_then(|id| materials.get(id))
                .map(|mtl| MaterialMaps::from_mtl(mtl, base_dir))
                .unwrap_or_default();

            let whole_triangles = mesh.indices.len() / 3 * 3;
            meshes.push(MeshData {
                name: model.name.clone(),
                vertices,
                indices: mesh.indices[..whole_triangles].to_vec(),
                material,
            });
        }

        if meshes.is_empty() {
            return Err(AssetError::EmptyModel(path.to_path_buf()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            meshes,
        })
    }

    /// Single-mesh model from raw vertices, drawn in order.
    pub fn from_vertices(name: &str, vertices: Vec<Vertex3D>) -> Self {
        let indices = (0..vertices.len() as u32).collect();
        Self {
            path: PathBuf::from(name),
            meshes: vec![MeshData {
                name: name.to_owned(),
                vertices,
                indices,
                material: MaterialMaps::default(),
            }],
        }
    }

    /// The skybox cube.
    pub fn skybox() -> Self {
        Self::from_vertices(
            "skybox",
            SKYBOX_POSITIONS.iter().copied().map(Vertex3D::from_position).collect(),
        )
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(MeshData::triangle_count).sum()
    }
}

/// Smooth per-vertex normals: the normalized sum of the face normals of
/// every triangle touching the vertex.
pub fn calculate_vertex_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let mut normals = vec![0.0f32; positions.len()];
    let position = |i: usize| cgmath::Vector3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]);

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        if [i0, i1, i2].iter().any(|&i| i * 3 + 2 >= positions.len()) {
            continue;
        }
        let face = (position(i1) - position(i0)).cross(position(i2) - position(i0));

        for i in [i0, i1, i2] {
            normals[i * 3] += face.x;
            normals[i * 3 + 1] += face.y;
            normals[i * 3 + 2] += face.z;
        }
    }

    for normal in normals.chunks_exact_mut(3) {
        let length = (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt();
        if length > f32::EPSILON {
            normal.iter_mut().for_each(|n| *n /= length);
        } else {
            normal.copy_from_slice(&[0.0, 1.0, 0.0]);
        }
    }

    normals
}

/// Mesh buffers and bind groups on the GPU.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub material_bind_group: wgpu::BindGroup,
    pub patch_bind_group: wgpu::BindGroup,
}

impl GpuMesh {
    pub fn triangle_count(&self) -> u32 {
        self.index_count / 3
    }
}

pub struct GpuModel {
    pub meshes: Vec<GpuMesh>,
}

impl GpuModel {
    /// Uploads every mesh. Texture maps that fail to decode or exceed the
    /// device's texture size limit are logged and replaced by their neutral
    /// defaults.
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &BindingLayouts,
        data: &ModelData,
    ) -> Self {
        let mut textures = TextureCache::new(device.limits().max_texture_dimension_2d);
        let label = data.path.display().to_string();

        let meshes = data
            .meshes
            .iter()
            .map(|mesh| {
                let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Vertex Buffer", label)),
                    contents: bytemuck::cast_slice(&mesh.vertices),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::STORAGE,
                });
                let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Index Buffer", label)),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::STORAGE,
                });

                let maps = &mesh.material;
                let material = MaterialTextures {
                    albedo: textures.get(device, queue, maps.albedo.as_deref(), maps.diffuse_rgba()),
                    normal: textures.get(device, queue, maps.normal.as_deref(), FLAT_NORMAL),
                    ambient_occlusion: textures.get(
                        device,
                        queue,
                        maps.ambient_occlusion.as_deref(),
                        NO_OCCLUSION,
                    ),
                    displacement: textures.get(
                        device,
                        queue,
                        maps.displacement.as_deref(),
                        NO_DISPLACEMENT,
                    ),
                };

                GpuMesh {
                    material_bind_group: layouts.material_bind_group(device, &material),
                    patch_bind_group: layouts.patch_bind_group(device, &vertex_buffer, &index_buffer),
                    index_count: mesh.indices.len() as u32,
                    vertex_buffer,
                    index_buffer,
                }
            })
            .collect();

        Self { meshes }
    }
}

/// Decodes a material map, rejecting images larger than `max_dimension`.
pub fn load_texture_map(path: &Path, max_dimension: u32) -> Result<FaceImage, AssetError> {
    let image = decode_image(path)?;
    check_texture_size(path, image.width, image.height, max_dimension)?;
    Ok(image)
}

/// Textures of one model, so meshes sharing a map upload it once.
struct TextureCache {
    files: HashMap<PathBuf, TextureResource>,
    solids: HashMap<[u8; 4], TextureResource>,
    max_dimension: u32,
}

impl TextureCache {
    fn new(max_dimension: u32) -> Self {
        Self {
            files: HashMap::new(),
            solids: HashMap::new(),
            max_dimension,
        }
    }

    fn get(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: Option<&Path>,
        fallback: [u8; 4],
    ) -> TextureResource {
        if let Some(path) = path {
            if let Some(texture) = self.files.get(path) {
                return texture.clone();
            }
            match load_texture_map(path, self.max_dimension) {
                Ok(image) => {
                    let texture = TextureResource::create_from_rgba_data(
                        device,
                        queue,
                        &image.rgba,
                        image.width,
                        image.height,
                        &path.display().to_string(),
                    );
                    self.files.insert(path.to_path_buf(), texture.clone());
                    return texture;
                }
                Err(err) => log::error!("Texture failed to load: {}", err),
            }
        }

        self.solids
            .entry(fallback)
            .or_insert_with(|| TextureResource::create_solid(device, queue, fallback, "Solid Texture"))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tobj_model(name: &str, positions: Vec<f32>, indices: Vec<u32>) -> tobj::Model {
        tobj::Model::new(
            tobj::Mesh {
                positions,
                indices,
                ..Default::default()
            },
            name.to_owned(),
        )
    }

    #[test]
    fn test_normals_of_flat_triangle_point_up() {
        let positions = [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0];
        let normals = calculate_vertex_normals(&positions, &[0, 1, 2]);
        for normal in normals.chunks(3) {
            assert!((normal[1] - 1.0).abs() < 1e-6, "{:?}", normal);
        }
    }

    #[test]
    fn test_shared_vertex_normal_is_averaged_and_unit() {
        // two faces meeting at a right angle along the x axis
        let positions = [
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 0.0, -1.0, //
            0.0, 1.0, 0.0,
        ];
        let normals = calculate_vertex_normals(&positions, &[0, 1, 2, 0, 3, 1]);
        let n0 = &normals[0..3];
        let length = (n0[0] * n0[0] + n0[1] * n0[1] + n0[2] * n0[2]).sqrt();
        assert!((length - 1.0).abs() < 1e-5);
        assert!((n0[1] + n0[2]).abs() < 1e-5);
        assert!(n0[1] > 0.0);
    }

    #[test]
    fn test_unreferenced_vertex_gets_default_normal() {
        let positions = [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 5.0, 5.0, 5.0];
        let normals = calculate_vertex_normals(&positions, &[0, 1, 2]);
        assert_eq!(&normals[9..12], &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_from_obj_builds_vertices_and_defaults() {
        let model = tobj_model(
            "tri",
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
            vec![0, 1, 2],
        );
        let data = ModelData::from_obj(Path::new("assets/tri.obj"), &[model], &[]).unwrap();

        assert_eq!(data.meshes.len(), 1);
        let mesh = &data.meshes[0];
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.vertices[1].position, [0.0, 0.0, 1.0]);
        assert_eq!(mesh.vertices[1].tex_coords, [0.0, 0.0]);
        assert!((mesh.vertices[0].normal[1] - 1.0).abs() < 1e-6);
        assert_eq!(mesh.material, MaterialMaps::default());
        assert_eq!(data.triangle_count(), 1);
    }

    #[test]
    fn test_texture_v_is_flipped() {
        let mut model = tobj_model(
            "tri",
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
            vec![0, 1, 2],
        );
        model.mesh.texcoords = vec![0.0, 0.0, 0.25, 1.0, 1.0, 0.75];
        let data = ModelData::from_obj(Path::new("tri.obj"), &[model], &[]).unwrap();
        let uvs: Vec<[f32; 2]> = data.meshes[0].vertices.iter().map(|v| v.tex_coords).collect();
        assert_eq!(uvs, vec![[0.0, 1.0], [0.25, 0.0], [1.0, 0.25]]);
    }

    #[test]
    fn test_material_paths_resolve_against_model_dir() {
        let mut model = tobj_model(
            "player",
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
            vec![0, 1, 2],
        );
        model.mesh.material_id = Some(0);

        let mut material = tobj::Material {
            diffuse: Some([1.0, 0.5, 0.0]),
            diffuse_texture: Some("albedo.png".into()),
            normal_texture: Some("normal.png".into()),
            ambient_texture: Some("ao.png".into()),
            ..Default::default()
        };
        material
            .unknown_param
            .insert("disp".to_owned(), "height.png".to_owned());

        let data =
            ModelData::from_obj(Path::new("assets/quake/player.obj"), &[model], &[material]).unwrap();
        let maps = &data.meshes[0].material;

        assert_eq!(maps.albedo, Some(PathBuf::from("assets/quake/albedo.png")));
        assert_eq!(maps.normal, Some(PathBuf::from("assets/quake/normal.png")));
        assert_eq!(maps.ambient_occlusion, Some(PathBuf::from("assets/quake/ao.png")));
        assert_eq!(maps.displacement, Some(PathBuf::from("assets/quake/height.png")));
        assert_eq!(maps.diffuse_rgba(), [255, 128, 0, 255]);
    }

    #[test]
    fn test_empty_meshes_are_rejected() {
        let model = tobj_model("empty", vec![], vec![]);
        let result = ModelData::from_obj(Path::new("empty.obj"), &[model], &[]);
        assert!(matches!(result, Err(AssetError::EmptyModel(_))));
    }

    #[test]
    fn test_missing_file_is_a_model_error() {
        let result = ModelData::load(Path::new("/no/such/model.obj"));
        assert!(matches!(result, Err(AssetError::Model { .. })));
    }

    #[test]
    fn test_loads_obj_from_disk() {
        let dir = std::env::temp_dir().join(format!("tessera-model-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("quad.obj");
        std::fs::write(
            &path,
            "v 0 0 0\nv 1 0 0\nv 1 0 -1\nv 0 0 -1\nvt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nf 1/1 2/2 3/3 4/4\n",
        )
        .unwrap();

        let data = ModelData::load(&path).unwrap();
        assert_eq!(data.triangle_count(), 2);
        assert_eq!(data.meshes[0].vertices.len(), 4);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_texture_map_above_device_limit_is_rejected() {
        let dir = std::env::temp_dir().join(format!("tessera-texture-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("wide.png");
        image::RgbaImage::from_pixel(8, 4, image::Rgba([200, 100, 50, 255]))
            .save(&path)
            .unwrap();

        let result = load_texture_map(&path, 4);
        assert!(matches!(
            result,
            Err(AssetError::TooLarge { size: (8, 4), max: 4, .. })
        ));

        // rectangular maps are fine within the limit
        let image = load_texture_map(&path, 8).unwrap();
        assert_eq!((image.width, image.height), (8, 4));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_skybox_faces_point_inwards() {
        let skybox = ModelData::skybox();
        assert_eq!(skybox.triangle_count(), 12);

        for triangle in SKYBOX_POSITIONS.chunks(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(cgmath::Vector3::from);
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(cgmath::dot(normal, centroid) < 0.0, "{:?}", triangle);
        }
    }

    #[test]
    fn test_from_vertices_indexes_in_order() {
        let vertices = vec![Vertex3D::from_position([0.0; 3]); 6];
        let data = ModelData::from_vertices("skybox", vertices);
        assert_eq!(data.meshes[0].indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(data.triangle_count(), 2);
    }
}
