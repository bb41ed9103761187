use std::sync::Arc;

use glint_rhi::{
    buffer::{Buffer, BufferUsage},
    device::Device,
    staging::UploadContext,
};

/// One material sub-range of a mesh, in triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshSection {
    pub first_triangle: u32,
    pub num_triangles: u32,
}

/// A static mesh as consumed at draw time: device-local vertex and index
/// buffers plus the ordered material sections. File decoding happens
/// upstream; this type only takes the flattened bytes.
pub struct MeshAsset {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    sections: Vec<MeshSection>,
}

impl MeshAsset {
    pub fn new(
        device: &Arc<Device>,
        upload: &UploadContext,
        vertex_data: &[u8],
        indices: &[u32],
        sections: Vec<MeshSection>,
    ) -> Self {
        let vertex_buffer =
            upload.upload_buffer(device.clone(), BufferUsage::VERTEX_BUFFER, vertex_data);
        let index_buffer = upload.upload_buffer(
            device.clone(),
            BufferUsage::INDEX_BUFFER,
            bytemuck::cast_slice(indices),
        );

        Self {
            vertex_buffer,
            index_buffer,
            sections,
        }
    }

    #[inline]
    pub fn vertex_buffer(&self) -> &Buffer {
        &self.vertex_buffer
    }

    #[inline]
    pub fn index_buffer(&self) -> &Buffer {
        &self.index_buffer
    }

    #[inline]
    pub fn sections(&self) -> &[MeshSection] {
        &self.sections
    }
}
