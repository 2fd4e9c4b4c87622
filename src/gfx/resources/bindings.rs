//! Bind group layouts shared by every program
//!
//! - group 0: the program's uniform struct, selected per draw by dynamic offset
//! - group 1: the environment cubemap
//! - group 2: material textures of the mesh being drawn
//! - group 3: the mesh's vertex and index data as storage, for patch programs

use wgpu::ShaderStages;

use super::texture_resource::TextureResource;
use crate::wgpu_utils::{binding_types, DynamicUniformBuffer};

/// Material textures in binding order.
pub struct MaterialTextures {
    pub albedo: TextureResource,
    pub normal: TextureResource,
    pub ambient_occlusion: TextureResource,
    pub displacement: TextureResource,
}

pub struct BindingLayouts {
    pub uniforms: wgpu::BindGroupLayout,
    pub environment: wgpu::BindGroupLayout,
    pub material: wgpu::BindGroupLayout,
    pub patch: wgpu::BindGroupLayout,
}

impl BindingLayouts {
    /// `uniform_size` is the size of the largest uniform struct.
    pub fn new(device: &wgpu::Device, uniform_size: u32) -> Self {
        let uniforms = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniforms Layout"),
            entries: &[binding_types::entry(
                0,
                ShaderStages::VERTEX_FRAGMENT,
                binding_types::uniform_dynamic(uniform_size as u64),
            )],
        });

        let environment = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Environment Layout"),
            entries: &[
                binding_types::entry(0, ShaderStages::FRAGMENT, binding_types::texture_cube()),
                binding_types::entry(
                    1,
                    ShaderStages::FRAGMENT,
                    binding_types::sampler(wgpu::SamplerBindingType::Filtering),
                ),
            ],
        });

        // displacement is sampled in the vertex stage
        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Layout"),
            entries: &[
                binding_types::entry(0, ShaderStages::FRAGMENT, binding_types::texture_2d()),
                binding_types::entry(1, ShaderStages::FRAGMENT, binding_types::texture_2d()),
                binding_types::entry(2, ShaderStages::FRAGMENT, binding_types::texture_2d()),
                binding_types::entry(3, ShaderStages::VERTEX_FRAGMENT, binding_types::texture_2d()),
                binding_types::entry(
                    4,
                    ShaderStages::VERTEX_FRAGMENT,
                    binding_types::sampler(wgpu::SamplerBindingType::Filtering),
                ),
            ],
        });

        let patch = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Patch Layout"),
            entries: &[
                binding_types::entry(0, ShaderStages::VERTEX, binding_types::storage_buffer_read_only()),
                binding_types::entry(1, ShaderStages::VERTEX, binding_types::storage_buffer_read_only()),
            ],
        });

        Self {
            uniforms,
            environment,
            material,
            patch,
        }
    }

    pub fn uniform_bind_group(
        &self,
        device: &wgpu::Device,
        buffer: &DynamicUniformBuffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniforms Bind Group"),
            layout: &self.uniforms,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.binding_resource(),
            }],
        })
    }

    pub fn environment_bind_group(
        &self,
        device: &wgpu::Device,
        cubemap: &TextureResource,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Environment Bind Group"),
            layout: &self.environment,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&cubemap.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&cubemap.sampler),
                },
            ],
        })
    }

    /// All four maps share the albedo map's sampler.
    pub fn material_bind_group(
        &self,
        device: &wgpu::Device,
        textures: &MaterialTextures,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout: &self.material,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&textures.albedo.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&textures.normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&textures.ambient_occlusion.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&textures.displacement.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&textures.albedo.sampler),
                },
            ],
        })
    }

    pub fn patch_bind_group(
        &self,
        device: &wgpu::Device,
        vertices: &wgpu::Buffer,
        indices: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Patch Bind Group"),
            layout: &self.patch,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: vertices.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: indices.as_entire_binding(),
                },
            ],
        })
    }
}
