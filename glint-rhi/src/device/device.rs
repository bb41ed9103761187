use std::sync::Arc;

use ash::vk;
use log::debug;

use crate::{AshHandle, VkHandle, device::physical::PhysicalDevice, instance::Instance};

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("physical device has no graphics-capable queue family")]
    NoGraphicsQueue,
}

pub struct Device {
    physical_device: Arc<PhysicalDevice>,
    inner: ash::Device,
    graphics_queue_family: u32,
}

impl AshHandle for Device {
    type Handle = ash::Device;

    #[inline]
    fn ash_handle(&self) -> &Self::Handle {
        &self.inner
    }
}

impl VkHandle for Device {
    type Handle = vk::Device;

    #[inline]
    fn vk_handle(&self) -> Self::Handle {
        self.inner.handle()
    }
}

impl Device {
    /// Creates a logical device with one graphics queue. No extensions are
    /// enabled; swapchain wiring lives with whatever owns presentation.
    pub fn new(
        instance: Arc<Instance>,
        physical_device: Arc<PhysicalDevice>,
    ) -> Result<Arc<Self>, DeviceError> {
        let graphics_queue_family = physical_device
            .graphics_queue_family()
            .ok_or(DeviceError::NoGraphicsQueue)?;

        let queue_priorities = [1.0];
        let queue_create_info = vk::DeviceQueueCreateInfo::default()
            .queue_family_index(graphics_queue_family)
            .queue_priorities(&queue_priorities);

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(std::slice::from_ref(&queue_create_info));

        let device = unsafe {
            instance
                .ash_handle()
                .create_device(physical_device.vk_handle(), &create_info, None)
                .expect("Failed to create device")
        };

        debug!(
            "created device on {:?} (graphics queue family {})",
            physical_device.properties().device_name,
            graphics_queue_family
        );

        Ok(Arc::new(Device {
            physical_device,
            inner: device,
            graphics_queue_family,
        }))
    }

    #[inline]
    pub fn physical_device(&self) -> &Arc<PhysicalDevice> {
        &self.physical_device
    }

    #[inline]
    pub fn graphics_queue_family(&self) -> u32 {
        self.graphics_queue_family
    }

    /// Blocks until every queue on the device has drained.
    pub fn wait_idle(&self) {
        unsafe {
            self.inner
                .device_wait_idle()
                .expect("Failed to wait for device idle");
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            self.inner.destroy_device(None);
        }
    }
}
