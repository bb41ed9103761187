use std::sync::Arc;

use ash::vk;

use glint_rhi::{
    AshHandle, VkHandle,
    buffer::BufferRegion,
    descriptor::DescriptorSetLayout,
    device::Device,
    image::ImageView,
    sampler::Sampler,
};

use crate::{
    frame::{PoolError, TransientResourcePool},
    material::Material,
};

/// A transient descriptor set, valid until the pool it came from is next
/// reset. Sets allocated for a material remember it, which is what lets a
/// draw list check contract membership at append time.
pub struct BoundDescriptorSet {
    device: Arc<Device>,
    layout: Arc<DescriptorSetLayout>,
    set: vk::DescriptorSet,
    material: Option<Arc<Material>>,
}

impl VkHandle for BoundDescriptorSet {
    type Handle = vk::DescriptorSet;

    #[inline]
    fn vk_handle(&self) -> Self::Handle {
        self.set
    }
}

impl BoundDescriptorSet {
    /// Allocates a per-object set against the material's layout.
    pub fn for_material(
        pool: &mut TransientResourcePool,
        material: &Arc<Material>,
    ) -> Result<Self, PoolError> {
        let set = pool.allocate_descriptor_set(material.per_object_layout())?;
        Ok(Self {
            device: pool.device().clone(),
            layout: material.per_object_layout().clone(),
            set,
            material: Some(material.clone()),
        })
    }

    /// Allocates a frame-global set against one of a contract's shared
    /// layouts.
    pub fn for_shared_layout(
        pool: &mut TransientResourcePool,
        layout: &Arc<DescriptorSetLayout>,
    ) -> Result<Self, PoolError> {
        let set = pool.allocate_descriptor_set(layout)?;
        Ok(Self {
            device: pool.device().clone(),
            layout: layout.clone(),
            set,
            material: None,
        })
    }

    #[inline]
    pub fn layout(&self) -> &Arc<DescriptorSetLayout> {
        &self.layout
    }

    #[inline]
    pub fn material(&self) -> Option<&Arc<Material>> {
        self.material.as_ref()
    }

    /// Points a uniform-buffer binding at a buffer region. Takes effect
    /// immediately; must happen before any command buffer binding this set
    /// is submitted.
    pub fn write_buffer(&self, binding: u32, array_element: u32, region: BufferRegion) {
        let buffer_info = region.to_vk();
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.set)
            .dst_binding(binding)
            .dst_array_element(array_element)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(std::slice::from_ref(&buffer_info));

        unsafe {
            self.device
                .ash_handle()
                .update_descriptor_sets(std::slice::from_ref(&write), &[]);
        }
    }

    pub fn write_combined_image_sampler(
        &self,
        binding: u32,
        array_element: u32,
        sampler: &Sampler,
        image_view: &ImageView,
        image_layout: vk::ImageLayout,
    ) {
        let image_info = vk::DescriptorImageInfo {
            sampler: sampler.vk_handle(),
            image_view: image_view.vk_handle(),
            image_layout,
        };
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.set)
            .dst_binding(binding)
            .dst_array_element(array_element)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(std::slice::from_ref(&image_info));

        unsafe {
            self.device
                .ash_handle()
                .update_descriptor_sets(std::slice::from_ref(&write), &[]);
        }
    }
}
