use std::sync::Arc;

use ash::vk;

use crate::{AshHandle, VkHandle, device::device::Device};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerCreateInfo {
    pub mag_filter: vk::Filter,
    pub min_filter: vk::Filter,
    pub mipmap_mode: vk::SamplerMipmapMode,
    pub address_mode: vk::SamplerAddressMode,
    pub anisotropy: Option<f32>,
}

impl Default for SamplerCreateInfo {
    fn default() -> Self {
        Self {
            mag_filter: vk::Filter::LINEAR,
            min_filter: vk::Filter::LINEAR,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
            address_mode: vk::SamplerAddressMode::REPEAT,
            anisotropy: None,
        }
    }
}

pub struct Sampler {
    device: Arc<Device>,
    sampler: vk::Sampler,
}

impl VkHandle for Sampler {
    type Handle = vk::Sampler;

    #[inline]
    fn vk_handle(&self) -> Self::Handle {
        self.sampler
    }
}

impl Sampler {
    pub fn new(device: Arc<Device>, create_info: SamplerCreateInfo) -> Arc<Self> {
        let vk_create_info = vk::SamplerCreateInfo::default()
            .mag_filter(create_info.mag_filter)
            .min_filter(create_info.min_filter)
            .mipmap_mode(create_info.mipmap_mode)
            .address_mode_u(create_info.address_mode)
            .address_mode_v(create_info.address_mode)
            .address_mode_w(create_info.address_mode)
            .anisotropy_enable(create_info.anisotropy.is_some())
            .max_anisotropy(create_info.anisotropy.unwrap_or(1.0))
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE);

        let sampler = unsafe {
            device
                .ash_handle()
                .create_sampler(&vk_create_info, None)
                .expect("Failed to create sampler")
        };

        Arc::new(Self { device, sampler })
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.ash_handle().destroy_sampler(self.sampler, None);
        }
    }
}
