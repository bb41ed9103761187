pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod image;
pub mod instance;
pub mod macros;
pub mod memory;
pub mod pipeline;
pub mod queue;
pub mod render_pass;
pub mod sampler;
pub mod shader;
pub mod staging;
pub mod sync;

pub trait VkHandle {
    type Handle: ash::vk::Handle;

    /// Returns the inner handle of the object.
    fn vk_handle(&self) -> Self::Handle;

    #[inline]
    fn vk_object_type(&self) -> ash::vk::ObjectType {
        <Self::Handle as ash::vk::Handle>::TYPE
    }
}

pub trait AshHandle {
    type Handle;

    fn ash_handle(&self) -> &Self::Handle;
}
