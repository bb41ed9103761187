pub mod device;
pub mod physical;

pub use device::Device;
pub use physical::PhysicalDevice;
