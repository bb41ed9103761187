use std::sync::Arc;

use ash::vk;

use crate::{AshHandle, VkHandle, instance::Instance, vk_enum};

vk_enum! {
    pub enum PhysicalDeviceKind: vk::PhysicalDeviceType {
        Other = OTHER,
        IntegratedGpu = INTEGRATED_GPU,
        DiscreteGpu = DISCRETE_GPU,
        VirtualGpu = VIRTUAL_GPU,
        Cpu = CPU,
    }
}

#[derive(Debug, Clone)]
pub struct PhysicalDeviceProperties {
    pub device_name: String,
    pub kind: PhysicalDeviceKind,
    pub limits: vk::PhysicalDeviceLimits,
}

pub struct PhysicalDevice {
    instance: Arc<Instance>,
    physical_device: vk::PhysicalDevice,
    properties: PhysicalDeviceProperties,
    queue_families: Vec<vk::QueueFamilyProperties>,
}

impl VkHandle for PhysicalDevice {
    type Handle = vk::PhysicalDevice;

    #[inline]
    fn vk_handle(&self) -> Self::Handle {
        self.physical_device
    }
}

impl std::fmt::Debug for PhysicalDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalDevice")
            .field("device_name", &self.properties.device_name)
            .field("kind", &self.properties.kind)
            .finish()
    }
}

impl PhysicalDevice {
    pub(crate) fn from_vk(
        instance: Arc<Instance>,
        physical_device: vk::PhysicalDevice,
    ) -> Arc<Self> {
        let raw = unsafe {
            instance
                .ash_handle()
                .get_physical_device_properties(physical_device)
        };

        let properties = PhysicalDeviceProperties {
            device_name: raw
                .device_name_as_c_str()
                .unwrap_or(c"<unknown>")
                .to_string_lossy()
                .into_owned(),
            kind: PhysicalDeviceKind::from_vk(raw.device_type)
                .unwrap_or(PhysicalDeviceKind::Other),
            limits: raw.limits,
        };

        let queue_families = unsafe {
            instance
                .ash_handle()
                .get_physical_device_queue_family_properties(physical_device)
        };

        Arc::new(Self {
            instance,
            physical_device,
            properties,
            queue_families,
        })
    }

    #[inline]
    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    #[inline]
    pub fn properties(&self) -> &PhysicalDeviceProperties {
        &self.properties
    }

    #[inline]
    pub fn queue_families(&self) -> &[vk::QueueFamilyProperties] {
        &self.queue_families
    }

    /// Index of the first queue family with graphics support.
    pub fn graphics_queue_family(&self) -> Option<u32> {
        self.queue_families
            .iter()
            .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|index| index as u32)
    }
}
