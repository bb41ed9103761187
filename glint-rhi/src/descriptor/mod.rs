pub mod layout;
pub mod pool;

pub use layout::{DescriptorBinding, DescriptorSetLayout, DescriptorType};
pub use pool::{DescriptorPool, DescriptorPoolCreateInfo, DescriptorPoolError};
