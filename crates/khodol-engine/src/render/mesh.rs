use anyhow::Result;
use wgpu::util::DeviceExt;

use crate::records::{MeshData, check_indices};

/// Vertex and index buffers for one [`MeshData`], shared by every instance
/// drawn from it.
pub struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    /// Uploads `mesh`; malformed index lists are rejected here rather than at
    /// draw time.
    pub fn new(device: &wgpu::Device, mesh: &MeshData, label: &str) -> Result<Self> {
        check_indices(&mesh.indices, mesh.vertices.len())?;
        anyhow::ensure!(!mesh.indices.is_empty(), "mesh `{label}` has no triangles");

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        log::debug!(
            "mesh `{label}`: {} vertices, {} triangles",
            mesh.vertices.len(),
            mesh.index_count() / 3
        );

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
        })
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub(super) fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    pub(super) fn index_buffer(&self) -> &wgpu::Buffer {
        &self.index_buffer
    }
}
