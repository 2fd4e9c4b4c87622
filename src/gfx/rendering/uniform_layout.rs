//! Named uniforms on top of a WGSL uniform struct
//!
//! Programs declare their uniforms in WGSL struct order. [`UniformLayout`]
//! computes the member offsets with the WGSL uniform address space rules so
//! a [`UniformBlock`] can stage values by name into bytes that match the
//! shader's struct exactly.

use std::collections::HashMap;

use cgmath::{Matrix3, Matrix4, Vector3};

use crate::gfx::backend::Uniform;

/// Type of a declared uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Int,
    Float,
    Vec3,
    Mat3,
    Mat4,
    /// Texture unit selector. Occupies no space in the buffer; the unit
    /// decides which bound texture the program samples.
    Sampler,
}

impl UniformKind {
    /// (alignment, size) in the uniform address space.
    fn align_and_size(self) -> Option<(u32, u32)> {
        match self {
            UniformKind::Int | UniformKind::Float => Some((4, 4)),
            UniformKind::Vec3 => Some((16, 12)),
            // three vec3 columns, each padded to 16 bytes
            UniformKind::Mat3 => Some((16, 48)),
            UniformKind::Mat4 => Some((16, 64)),
            UniformKind::Sampler => None,
        }
    }

    fn accepts(self, value: &Uniform) -> bool {
        matches!(
            (self, value),
            (UniformKind::Int, Uniform::Int(_))
                | (UniformKind::Sampler, Uniform::Int(_))
                | (UniformKind::Float, Uniform::Float(_))
                | (UniformKind::Vec3, Uniform::Vec3(_))
                | (UniformKind::Mat3, Uniform::Mat3(_))
                | (UniformKind::Mat4, Uniform::Mat4(_))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformField {
    pub name: &'static str,
    pub kind: UniformKind,
    /// Byte offset in the struct, `None` for samplers.
    pub offset: Option<u32>,
}

/// Field offsets and total size of one program's uniform struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformLayout {
    fields: Vec<UniformField>,
    size: u32,
}

fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

impl UniformLayout {
    /// Lays out `declarations` in order.
    pub fn new(declarations: &[(&'static str, UniformKind)]) -> Self {
        let mut cursor = 0;
        let mut fields = Vec::with_capacity(declarations.len());

        for &(name, kind) in declarations {
            let offset = kind.align_and_size().map(|(align, size)| {
                let offset = align_to(cursor, align);
                cursor = offset + size;
                offset
            });
            fields.push(UniformField { name, kind, offset });
        }

        // struct size rounds up to the largest member alignment, and uniform
        // bindings must be a multiple of 16 anyway
        Self {
            fields,
            size: align_to(cursor.max(16), 16),
        }
    }

    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    /// Struct size in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }
}

/// CPU staging copy of a program's uniforms.
///
/// Values persist until overwritten, mirroring the state of a bound program.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    layout: UniformLayout,
    bytes: Vec<u8>,
    sampler_units: HashMap<&'static str, i32>,
}

impl UniformBlock {
    pub fn new(layout: UniformLayout) -> Self {
        let bytes = vec![0; layout.size() as usize];
        Self {
            layout,
            bytes,
            sampler_units: HashMap::new(),
        }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    /// Writes `value` into the named field.
    ///
    /// Returns `false` when the program has no such uniform or the value has
    /// the wrong type; the block is left untouched in both cases.
    pub fn set(&mut self, name: &str, value: Uniform) -> bool {
        let Some(field) = self.layout.field(name).copied() else {
            return false;
        };
        if !field.kind.accepts(&value) {
            log::warn!(
                "Uniform '{}' is declared as {:?}, got {:?}",
                name,
                field.kind,
                value
            );
            return false;
        }

        let Some(offset) = field.offset else {
            if let Uniform::Int(unit) = value {
                self.sampler_units.insert(field.name, unit);
            }
            return true;
        };
        let offset = offset as usize;

        match value {
            Uniform::Int(v) => self.write(offset, bytemuck::bytes_of(&v)),
            Uniform::Float(v) => self.write(offset, bytemuck::bytes_of(&v)),
            Uniform::Vec3(v) => self.write_vec3(offset, v),
            Uniform::Mat3(m) => self.write_mat3(offset, m),
            Uniform::Mat4(m) => self.write_mat4(offset, m),
        }
        true
    }

    /// Texture unit last assigned to a sampler uniform.
    pub fn sampler_unit(&self, name: &str) -> Option<i32> {
        self.sampler_units.get(name).copied()
    }

    /// Current value of a float uniform.
    pub fn float(&self, name: &str) -> Option<f32> {
        let field = self.layout.field(name)?;
        if field.kind != UniformKind::Float {
            return None;
        }
        let offset = field.offset? as usize;
        Some(bytemuck::pod_read_unaligned(&self.bytes[offset..offset + 4]))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn write(&mut self, offset: usize, data: &[u8]) {
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
    }

    fn write_vec3(&mut self, offset: usize, v: Vector3<f32>) {
        let data: [f32; 3] = v.into();
        self.write(offset, bytemuck::cast_slice(&data));
    }

    fn write_mat3(&mut self, offset: usize, m: Matrix3<f32>) {
        for (column, v) in [m.x, m.y, m.z].into_iter().enumerate() {
            self.write_vec3(offset + column * 16, v);
        }
    }

    fn write_mat4(&mut self, offset: usize, m: Matrix4<f32>) {
        let data: [[f32; 4]; 4] = m.into();
        self.write(offset, bytemuck::cast_slice(&data));
    }
}
