use std::sync::Arc;

use ash::vk;
use smallvec::SmallVec;

use glint_rhi::{
    VkHandle,
    buffer::BufferRegion,
    command::CommandBuffer,
    render_pass::RenderPass,
};

use crate::{
    contract::{ContractError, RenderingContract},
    descriptor::BoundDescriptorSet,
    material::Material,
    mesh::{MeshAsset, MeshSection},
};

pub const MAX_VERTEX_BUFFER_BINDINGS: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum DrawError {
    /// The descriptor set was allocated for no material, or for a material
    /// built against a different contract. Recording the draw anyway would
    /// bind sets a pipeline cannot read.
    #[error("descriptor set does not belong to a material of this draw list's contract")]
    ForeignMaterial,
    #[error("expected {expected} shared descriptor sets, got {actual}")]
    SharedSetCount { expected: usize, actual: usize },
    #[error("shared descriptor set {index} does not use the contract's layout at that index")]
    SharedSetLayout { index: usize },
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error("draw binds {count} vertex buffers, the limit is {MAX_VERTEX_BUFFER_BINDINGS}")]
    TooManyVertexBuffers { count: usize },
    #[error("mesh has no section {index}")]
    UnknownSection { index: usize },
}

struct DrawItem {
    material: Arc<Material>,
    descriptor_set: vk::DescriptorSet,
    vertex_buffers: [vk::Buffer; MAX_VERTEX_BUFFER_BINDINGS],
    vertex_buffer_offsets: [u64; MAX_VERTEX_BUFFER_BINDINGS],
    vertex_buffer_count: usize,
    index_buffer: vk::Buffer,
    index_buffer_offset: u64,
    first_index: u32,
    index_count: u32,
    instance_count: u32,
}

/// First index and index count covering a mesh section's triangles.
fn section_indices(section: MeshSection) -> (u32, u32) {
    (section.first_triangle * 3, section.num_triangles * 3)
}

/// Instances packed into a buffer region at a fixed stride; a draw without
/// instance data renders once.
fn derived_instance_count(instances: Option<(BufferRegion, u64)>) -> u32 {
    match instances {
        Some((region, stride)) if stride > 0 => (region.range / stride) as u32,
        _ => 1,
    }
}

/// An ordered, append-only list of draws for one frame, all sharing one
/// contract. Emission order is preserved exactly, so sorting policy (back to
/// front, state grouping) stays with the caller.
pub struct DrawList {
    contract: Arc<RenderingContract>,
    items: Vec<DrawItem>,
}

impl DrawList {
    pub fn new(contract: Arc<RenderingContract>) -> Self {
        Self {
            contract,
            items: Vec::new(),
        }
    }

    #[inline]
    pub fn contract(&self) -> &Arc<RenderingContract> {
        &self.contract
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops all recorded draws so the list can be refilled next frame.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn checked_material(
        &self,
        descriptors: &BoundDescriptorSet,
    ) -> Result<Arc<Material>, DrawError> {
        let material = descriptors.material().ok_or(DrawError::ForeignMaterial)?;
        if !Arc::ptr_eq(material.contract(), &self.contract) {
            return Err(DrawError::ForeignMaterial);
        }
        Ok(material.clone())
    }

    /// Appends one indexed draw over explicit buffer regions.
    pub fn draw(
        &mut self,
        descriptors: &BoundDescriptorSet,
        vertex_buffers: &[BufferRegion],
        index_buffer: BufferRegion,
        index_count: u32,
        instance_count: u32,
    ) -> Result<(), DrawError> {
        let material = self.checked_material(descriptors)?;
        if vertex_buffers.len() > MAX_VERTEX_BUFFER_BINDINGS {
            return Err(DrawError::TooManyVertexBuffers {
                count: vertex_buffers.len(),
            });
        }

        let mut item = DrawItem {
            material,
            descriptor_set: descriptors.vk_handle(),
            vertex_buffers: [vk::Buffer::null(); MAX_VERTEX_BUFFER_BINDINGS],
            vertex_buffer_offsets: [0; MAX_VERTEX_BUFFER_BINDINGS],
            vertex_buffer_count: vertex_buffers.len(),
            index_buffer: index_buffer.buffer,
            index_buffer_offset: index_buffer.offset,
            first_index: 0,
            index_count,
            instance_count,
        };
        for (slot, region) in vertex_buffers.iter().enumerate() {
            item.vertex_buffers[slot] = region.buffer;
            item.vertex_buffer_offsets[slot] = region.offset;
        }

        self.items.push(item);
        Ok(())
    }

    /// Appends one draw per material section of the mesh.
    pub fn draw_mesh(
        &mut self,
        descriptors: &BoundDescriptorSet,
        mesh: &MeshAsset,
    ) -> Result<(), DrawError> {
        self.draw_mesh_inner(descriptors, mesh, None, None)
    }

    /// Appends draws for the named sections only.
    pub fn draw_mesh_sections(
        &mut self,
        descriptors: &BoundDescriptorSet,
        mesh: &MeshAsset,
        sections: &[usize],
    ) -> Result<(), DrawError> {
        self.draw_mesh_inner(descriptors, mesh, Some(sections), None)
    }

    /// Appends instanced draws for every section; the instance count derives
    /// from the region size and per-instance stride.
    pub fn draw_mesh_instanced(
        &mut self,
        descriptors: &BoundDescriptorSet,
        mesh: &MeshAsset,
        instances: BufferRegion,
        instance_stride: u64,
    ) -> Result<(), DrawError> {
        self.draw_mesh_inner(descriptors, mesh, None, Some((instances, instance_stride)))
    }

    pub fn draw_mesh_sections_instanced(
        &mut self,
        descriptors: &BoundDescriptorSet,
        mesh: &MeshAsset,
        sections: &[usize],
        instances: BufferRegion,
        instance_stride: u64,
    ) -> Result<(), DrawError> {
        self.draw_mesh_inner(
            descriptors,
            mesh,
            Some(sections),
            Some((instances, instance_stride)),
        )
    }

    fn draw_mesh_inner(
        &mut self,
        descriptors: &BoundDescriptorSet,
        mesh: &MeshAsset,
        sections: Option<&[usize]>,
        instances: Option<(BufferRegion, u64)>,
    ) -> Result<(), DrawError> {
        let material = self.checked_material(descriptors)?;

        let mut vertex_buffers = [vk::Buffer::null(); MAX_VERTEX_BUFFER_BINDINGS];
        let mut vertex_buffer_offsets = [0u64; MAX_VERTEX_BUFFER_BINDINGS];
        vertex_buffers[0] = mesh.vertex_buffer().vk_handle();
        let mut vertex_buffer_count = 1;
        if let Some((region, stride)) = instances {
            if stride > 0 {
                vertex_buffers[1] = region.buffer;
                vertex_buffer_offsets[1] = region.offset;
                vertex_buffer_count = 2;
            }
        }
        let instance_count = derived_instance_count(instances);

        let resolve = |index: usize| -> Result<MeshSection, DrawError> {
            mesh.sections()
                .get(index)
                .copied()
                .ok_or(DrawError::UnknownSection { index })
        };

        let indices: Vec<usize> = match sections {
            Some(subset) => subset.to_vec(),
            None => (0..mesh.sections().len()).collect(),
        };

        for index in indices {
            let section = resolve(index)?;
            let (first_index, index_count) = section_indices(section);
            self.items.push(DrawItem {
                material: material.clone(),
                descriptor_set: descriptors.vk_handle(),
                vertex_buffers,
                vertex_buffer_offsets,
                vertex_buffer_count,
                index_buffer: mesh.index_buffer().vk_handle(),
                index_buffer_offset: 0,
                first_index,
                index_count,
                instance_count,
            });
        }
        Ok(())
    }

    /// Replays the list into a command buffer for one of the contract's
    /// render passes. Everything is validated before the first bind is
    /// recorded: a failed call leaves the command buffer untouched.
    pub fn write_commands(
        &self,
        cmd: &CommandBuffer,
        render_pass: &Arc<RenderPass>,
        shared_sets: &[&BoundDescriptorSet],
    ) -> Result<(), DrawError> {
        let expected = self.contract.shared_set_count();
        if shared_sets.len() != expected {
            return Err(DrawError::SharedSetCount {
                expected,
                actual: shared_sets.len(),
            });
        }
        for (index, (set, layout)) in shared_sets
            .iter()
            .zip(self.contract.shared_layouts())
            .enumerate()
        {
            if !Arc::ptr_eq(set.layout(), layout) {
                return Err(DrawError::SharedSetLayout { index });
            }
        }
        let pass_index = self.contract.pass_index(render_pass)?;

        if !shared_sets.is_empty() {
            let handles: SmallVec<[vk::DescriptorSet; 4]> =
                shared_sets.iter().map(|set| set.vk_handle()).collect();
            cmd.bind_descriptor_sets(
                self.contract.shared_pipeline_layout().vk_handle(),
                0,
                &handles,
            );
        }

        for item in &self.items {
            cmd.bind_graphics_pipeline(item.material.pipeline(pass_index));
            cmd.bind_descriptor_sets(
                item.material.pipeline_layout().vk_handle(),
                expected as u32,
                &[item.descriptor_set],
            );
            cmd.bind_vertex_buffers(
                &item.vertex_buffers[..item.vertex_buffer_count],
                &item.vertex_buffer_offsets[..item.vertex_buffer_count],
            );
            cmd.bind_index_buffer(
                item.index_buffer,
                item.index_buffer_offset,
                vk::IndexType::UINT32,
            );
            cmd.draw_indexed(item.index_count, item.instance_count, item.first_index, 0, 0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_indices_count_triangles_in_threes() {
        let section = MeshSection {
            first_triangle: 7,
            num_triangles: 5,
        };
        assert_eq!(section_indices(section), (21, 15));
    }

    #[test]
    fn instance_count_divides_region_by_stride() {
        let region = BufferRegion {
            buffer: vk::Buffer::null(),
            offset: 256,
            range: 192,
        };
        assert_eq!(derived_instance_count(Some((region, 64))), 3);
    }

    #[test]
    fn missing_instance_data_draws_once() {
        assert_eq!(derived_instance_count(None), 1);

        let region = BufferRegion {
            buffer: vk::Buffer::null(),
            offset: 0,
            range: 128,
        };
        assert_eq!(derived_instance_count(Some((region, 0))), 1);
    }
}
