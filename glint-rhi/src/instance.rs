use std::sync::Arc;

use ash::vk;

use crate::{AshHandle, VkHandle, device::physical::PhysicalDevice};

/// The loaded Vulkan library.
pub struct Library {
    inner: ash::Entry,
}

impl Library {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: unsafe { ash::Entry::load().expect("Failed to load the Vulkan library") },
        })
    }

    #[inline]
    pub fn entry(&self) -> &ash::Entry {
        &self.inner
    }
}

pub struct Instance {
    library: Arc<Library>,
    instance: ash::Instance,
}

impl AshHandle for Instance {
    type Handle = ash::Instance;

    #[inline]
    fn ash_handle(&self) -> &Self::Handle {
        &self.instance
    }
}

impl VkHandle for Instance {
    type Handle = vk::Instance;

    #[inline]
    fn vk_handle(&self) -> Self::Handle {
        self.instance.handle()
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Instance")
    }
}

impl Instance {
    /// Creates a headless instance. No window-system extensions are enabled;
    /// presentation is handled outside this crate.
    pub fn new(library: Arc<Library>) -> Arc<Self> {
        let application_info =
            vk::ApplicationInfo::default().api_version(vk::make_api_version(0, 1, 1, 0));

        let create_info = vk::InstanceCreateInfo::default().application_info(&application_info);

        let instance = unsafe {
            library
                .entry()
                .create_instance(&create_info, None)
                .expect("Failed to create instance")
        };

        Arc::new(Self { library, instance })
    }

    #[inline]
    pub fn entry(&self) -> &ash::Entry {
        self.library.entry()
    }

    pub fn enumerate_physical_devices(self: &Arc<Self>) -> Vec<Arc<PhysicalDevice>> {
        let raw_physical_devices = unsafe {
            self.instance
                .enumerate_physical_devices()
                .expect("Failed to enumerate physical devices")
        };

        raw_physical_devices
            .into_iter()
            .map(|physical_device| PhysicalDevice::from_vk(Arc::clone(self), physical_device))
            .collect()
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            self.instance.destroy_instance(None);
        }
    }
}
