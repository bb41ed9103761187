use std::sync::Arc;

use ash::vk;

use crate::{
    AshHandle, VkHandle,
    command::CommandBuffer,
    device::device::Device,
    memory::{AllocationDescription, MemoryAllocation, MemoryAllocator, MemoryLocation},
};

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// A layout pair the transition table does not model. Indicates an
    /// authoring mistake, not a runtime condition.
    #[error("unsupported image layout transition: {from:?} -> {to:?}")]
    UnsupportedTransition {
        from: vk::ImageLayout,
        to: vk::ImageLayout,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct ImageCreateInfo {
    pub extent: vk::Extent3D,
    pub format: vk::Format,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub usage: vk::ImageUsageFlags,
    pub flags: vk::ImageCreateFlags,
}

pub struct Image {
    device: Arc<Device>,
    image: vk::Image,
    _allocation: MemoryAllocation,
    format: vk::Format,
    extent: vk::Extent3D,
    mip_levels: u32,
}

impl VkHandle for Image {
    type Handle = vk::Image;

    #[inline]
    fn vk_handle(&self) -> Self::Handle {
        self.image
    }
}

impl Image {
    /// Creates a device-local, optimal-tiling image.
    pub fn new(
        device: Arc<Device>,
        allocator: &Arc<MemoryAllocator>,
        create_info: ImageCreateInfo,
    ) -> Self {
        let image_type = if create_info.extent.depth > 1 {
            vk::ImageType::TYPE_3D
        } else if create_info.extent.height > 1 {
            vk::ImageType::TYPE_2D
        } else {
            vk::ImageType::TYPE_1D
        };

        let vk_create_info = vk::ImageCreateInfo::default()
            .flags(create_info.flags)
            .image_type(image_type)
            .format(create_info.format)
            .extent(create_info.extent)
            .mip_levels(create_info.mip_levels)
            .array_layers(create_info.array_layers)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(create_info.usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe {
            device
                .ash_handle()
                .create_image(&vk_create_info, None)
                .expect("Failed to create image")
        };

        let requirements = unsafe { device.ash_handle().get_image_memory_requirements(image) };

        let allocation = allocator
            .allocate(AllocationDescription {
                name: Some("Image"),
                requirements,
                location: MemoryLocation::GpuOnly,
            })
            .expect("Failed to allocate memory for image");

        unsafe {
            device
                .ash_handle()
                .bind_image_memory(image, allocation.memory(), allocation.offset())
                .expect("Failed to bind image memory");
        }

        Self {
            device,
            image,
            _allocation: allocation,
            format: create_info.format,
            extent: create_info.extent,
            mip_levels: create_info.mip_levels,
        }
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent3D {
        self.extent
    }

    #[inline]
    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    /// Records a layout transition for one mip level of one array layer.
    pub fn transition_layout(
        &self,
        cmd: &CommandBuffer,
        mip_level: u32,
        array_layer: u32,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) -> Result<(), ImageError> {
        let src_access_mask = match old_layout {
            vk::ImageLayout::UNDEFINED => vk::AccessFlags::empty(),
            vk::ImageLayout::PREINITIALIZED => vk::AccessFlags::HOST_WRITE,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL => vk::AccessFlags::TRANSFER_READ,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL => vk::AccessFlags::TRANSFER_WRITE,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => vk::AccessFlags::SHADER_READ,
            from => {
                return Err(ImageError::UnsupportedTransition {
                    from,
                    to: new_layout,
                });
            }
        };

        let dst_access_mask = match new_layout {
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL => vk::AccessFlags::TRANSFER_READ,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL => vk::AccessFlags::TRANSFER_WRITE,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => vk::AccessFlags::SHADER_READ,
            vk::ImageLayout::PRESENT_SRC_KHR => vk::AccessFlags::MEMORY_READ,
            to => {
                return Err(ImageError::UnsupportedTransition {
                    from: old_layout,
                    to,
                });
            }
        };

        let barrier = vk::ImageMemoryBarrier::default()
            .src_access_mask(src_access_mask)
            .dst_access_mask(dst_access_mask)
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: mip_level,
                level_count: 1,
                base_array_layer: array_layer,
                layer_count: 1,
            });

        cmd.pipeline_barrier(
            vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            std::slice::from_ref(&barrier),
        );

        Ok(())
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe {
            self.device.ash_handle().destroy_image(self.image, None);
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ImageViewCreateInfo {
    pub view_type: vk::ImageViewType,
    pub format: vk::Format,
    pub aspect_mask: vk::ImageAspectFlags,
    pub level_count: u32,
    pub layer_count: u32,
}

pub struct ImageView {
    device: Arc<Device>,
    view: vk::ImageView,
}

impl VkHandle for ImageView {
    type Handle = vk::ImageView;

    #[inline]
    fn vk_handle(&self) -> Self::Handle {
        self.view
    }
}

impl ImageView {
    pub fn new(device: Arc<Device>, image: &Image, create_info: ImageViewCreateInfo) -> Self {
        let vk_create_info = vk::ImageViewCreateInfo::default()
            .image(image.vk_handle())
            .view_type(create_info.view_type)
            .format(create_info.format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: create_info.aspect_mask,
                base_mip_level: 0,
                level_count: create_info.level_count,
                base_array_layer: 0,
                layer_count: create_info.layer_count,
            });

        let view = unsafe {
            device
                .ash_handle()
                .create_image_view(&vk_create_info, None)
                .expect("Failed to create image view")
        };

        Self { device, view }
    }
}

impl Drop for ImageView {
    fn drop(&mut self) {
        unsafe {
            self.device.ash_handle().destroy_image_view(self.view, None);
        }
    }
}
