use std::{collections::HashMap, sync::Arc};

use ash::vk;

use crate::{AshHandle, VkHandle, descriptor::layout::DescriptorType, device::device::Device};

use super::DescriptorSetLayout;

#[derive(Debug, thiserror::Error)]
pub enum DescriptorPoolError {
    /// The fixed-size pool ran out of sets or descriptors. Pools are sized
    /// for the worst-case frame; hitting this means under-provisioning.
    #[error("descriptor pool exhausted: {0}")]
    Exhausted(vk::Result),
}

#[derive(Debug, Clone)]
pub struct DescriptorPoolCreateInfo {
    pub max_sets: u32,
    pub pool_sizes: HashMap<DescriptorType, u32>,
}

impl Default for DescriptorPoolCreateInfo {
    fn default() -> Self {
        Self {
            max_sets: 1024,
            pool_sizes: [
                (DescriptorType::UniformBuffer, 1024),
                (DescriptorType::CombinedImageSampler, 1024),
            ]
            .into_iter()
            .collect(),
        }
    }
}

/// A fixed-size pool with individually freeable sets, so a caller can bulk
/// release everything it handed out between two frames.
pub struct DescriptorPool {
    device: Arc<Device>,
    pool: vk::DescriptorPool,
}

impl VkHandle for DescriptorPool {
    type Handle = vk::DescriptorPool;

    #[inline]
    fn vk_handle(&self) -> Self::Handle {
        self.pool
    }
}

impl DescriptorPool {
    pub fn new(device: Arc<Device>, create_info: DescriptorPoolCreateInfo) -> Self {
        let vk_pool_sizes: Vec<vk::DescriptorPoolSize> = create_info
            .pool_sizes
            .iter()
            .map(|(descriptor_type, descriptor_count)| {
                vk::DescriptorPoolSize::default()
                    .ty(descriptor_type.to_vk())
                    .descriptor_count(*descriptor_count)
            })
            .collect();

        let vk_create_info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .max_sets(create_info.max_sets)
            .pool_sizes(&vk_pool_sizes);

        let pool = unsafe {
            device
                .ash_handle()
                .create_descriptor_pool(&vk_create_info, None)
                .expect("Failed to create descriptor pool")
        };

        Self { device, pool }
    }

    /// Allocates one set against `layout`. The caller is responsible for
    /// freeing it, individually or via `reset`.
    pub fn allocate(
        &self,
        layout: &DescriptorSetLayout,
    ) -> Result<vk::DescriptorSet, DescriptorPoolError> {
        let vk_layouts = [layout.vk_handle()];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(&vk_layouts);

        let sets = unsafe { self.device.ash_handle().allocate_descriptor_sets(&alloc_info) };

        match sets {
            Ok(sets) => Ok(sets[0]),
            Err(
                result @ (vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL),
            ) => Err(DescriptorPoolError::Exhausted(result)),
            Err(result) => panic!("Failed to allocate descriptor set: {result}"),
        }
    }

    pub fn free(&self, descriptor_sets: &[vk::DescriptorSet]) {
        if descriptor_sets.is_empty() {
            return;
        }
        unsafe {
            self.device
                .ash_handle()
                .free_descriptor_sets(self.pool, descriptor_sets)
                .expect("Failed to free descriptor sets");
        }
    }

    pub fn reset(&self) {
        unsafe {
            self.device
                .ash_handle()
                .reset_descriptor_pool(self.pool, vk::DescriptorPoolResetFlags::empty())
                .expect("Failed to reset descriptor pool");
        }
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device
                .ash_handle()
                .destroy_descriptor_pool(self.pool, None);
        }
    }
}
