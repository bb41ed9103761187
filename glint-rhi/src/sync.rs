use std::sync::Arc;

use ash::vk;

use crate::{AshHandle, VkHandle, device::device::Device};

pub struct Semaphore {
    device: Arc<Device>,
    semaphore: vk::Semaphore,
}

impl VkHandle for Semaphore {
    type Handle = vk::Semaphore;

    #[inline]
    fn vk_handle(&self) -> Self::Handle {
        self.semaphore
    }
}

impl Semaphore {
    pub fn new(device: Arc<Device>) -> Self {
        let create_info = vk::SemaphoreCreateInfo::default();

        let semaphore = unsafe {
            device
                .ash_handle()
                .create_semaphore(&create_info, None)
                .expect("Failed to create semaphore")
        };

        Self { device, semaphore }
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device
                .ash_handle()
                .destroy_semaphore(self.semaphore, None);
        }
    }
}

/// A fence paired with the submission that will signal it. Must stay alive
/// until that submission retires.
pub struct Fence {
    device: Arc<Device>,
    fence: vk::Fence,
}

impl VkHandle for Fence {
    type Handle = vk::Fence;

    #[inline]
    fn vk_handle(&self) -> Self::Handle {
        self.fence
    }
}

impl Fence {
    pub fn new(device: Arc<Device>, signaled: bool) -> Self {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::default().flags(flags);

        let fence = unsafe {
            device
                .ash_handle()
                .create_fence(&create_info, None)
                .expect("Failed to create fence")
        };

        Self { device, fence }
    }

    /// Blocks without timeout. Frame pacing relies on the signaling
    /// submission always retiring.
    pub fn wait(&self) {
        unsafe {
            self.device
                .ash_handle()
                .wait_for_fences(&[self.fence], true, u64::MAX)
                .expect("Failed to wait for fence");
        }
    }

    pub fn reset(&self) {
        unsafe {
            self.device
                .ash_handle()
                .reset_fences(&[self.fence])
                .expect("Failed to reset fence");
        }
    }

    pub fn is_signaled(&self) -> bool {
        unsafe {
            self.device
                .ash_handle()
                .get_fence_status(self.fence)
                .expect("Failed to query fence status")
        }
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.ash_handle().destroy_fence(self.fence, None);
        }
    }
}
