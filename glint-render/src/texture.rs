use std::sync::Arc;

use ash::vk;
use log::debug;

use glint_rhi::{
    VkHandle,
    device::Device,
    image::{Image, ImageCreateInfo, ImageError, ImageView, ImageViewCreateInfo},
    memory::MemoryAllocator,
    staging::UploadContext,
};

fn mip_levels_for(extent: vk::Extent3D) -> u32 {
    let largest = extent.width.max(extent.height).max(extent.depth).max(1);
    1 + (largest as f32).log2().ceil() as u32
}

/// A sampled texture with a full mip chain. Level zero of every layer is
/// uploaded through the staging buffer; the remaining levels are generated
/// with blits.
pub struct Texture {
    image: Image,
    view: ImageView,
}

impl Texture {
    pub fn new_2d(
        device: &Arc<Device>,
        allocator: &Arc<MemoryAllocator>,
        upload: &UploadContext,
        format: vk::Format,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Arc<Self>, ImageError> {
        Self::from_layers(
            device,
            allocator,
            upload,
            format,
            vk::Extent3D {
                width,
                height,
                depth: 1,
            },
            &[pixels],
            vk::ImageCreateFlags::empty(),
            vk::ImageViewType::TYPE_2D,
        )
    }

    /// Six square faces, in +x, -x, +y, -y, +z, -z order.
    pub fn new_cube(
        device: &Arc<Device>,
        allocator: &Arc<MemoryAllocator>,
        upload: &UploadContext,
        format: vk::Format,
        side_length: u32,
        faces: &[&[u8]; 6],
    ) -> Result<Arc<Self>, ImageError> {
        Self::from_layers(
            device,
            allocator,
            upload,
            format,
            vk::Extent3D {
                width: side_length,
                height: side_length,
                depth: 1,
            },
            faces,
            vk::ImageCreateFlags::CUBE_COMPATIBLE,
            vk::ImageViewType::CUBE,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn from_layers(
        device: &Arc<Device>,
        allocator: &Arc<MemoryAllocator>,
        upload: &UploadContext,
        format: vk::Format,
        extent: vk::Extent3D,
        layers: &[&[u8]],
        flags: vk::ImageCreateFlags,
        view_type: vk::ImageViewType,
    ) -> Result<Arc<Self>, ImageError> {
        let mip_levels = mip_levels_for(extent);
        let image = Image::new(
            device.clone(),
            allocator,
            ImageCreateInfo {
                extent,
                format,
                mip_levels,
                array_layers: layers.len() as u32,
                usage: vk::ImageUsageFlags::SAMPLED
                    | vk::ImageUsageFlags::TRANSFER_SRC
                    | vk::ImageUsageFlags::TRANSFER_DST,
                flags,
            },
        );

        for (layer_index, layer_data) in layers.iter().enumerate() {
            let layer = layer_index as u32;
            upload.write_staging(layer_data);

            let subresource = |mip_level: u32| vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level,
                base_array_layer: layer,
                layer_count: 1,
            };

            let cmd = upload.begin_transient();
            image.transition_layout(
                &cmd,
                0,
                layer,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            )?;
            cmd.copy_buffer_to_image(
                upload.staging_buffer().vk_handle(),
                image.vk_handle(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[vk::BufferImageCopy {
                    image_subresource: subresource(0),
                    image_extent: extent,
                    ..Default::default()
                }],
            );

            // Walk the chain, halving as we go; each level is blitted from
            // the one above it.
            let mut dims = vk::Offset3D {
                x: extent.width as i32,
                y: extent.height as i32,
                z: extent.depth as i32,
            };
            for mip in 1..mip_levels {
                let mut blit = vk::ImageBlit::default()
                    .src_subresource(subresource(mip - 1))
                    .dst_subresource(subresource(mip));
                blit.src_offsets[1] = dims;

                dims.x = (dims.x / 2).max(1);
                dims.y = (dims.y / 2).max(1);
                dims.z = (dims.z / 2).max(1);
                blit.dst_offsets[1] = dims;

                image.transition_layout(
                    &cmd,
                    mip - 1,
                    layer,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                )?;
                image.transition_layout(
                    &cmd,
                    mip,
                    layer,
                    vk::ImageLayout::UNDEFINED,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                )?;
                cmd.blit_image(
                    image.vk_handle(),
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    image.vk_handle(),
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    std::slice::from_ref(&blit),
                    vk::Filter::LINEAR,
                );
                image.transition_layout(
                    &cmd,
                    mip - 1,
                    layer,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                )?;
            }
            image.transition_layout(
                &cmd,
                mip_levels - 1,
                layer,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            )?;
            upload.end_transient(cmd);
        }

        let view = ImageView::new(
            device.clone(),
            &image,
            ImageViewCreateInfo {
                view_type,
                format,
                aspect_mask: vk::ImageAspectFlags::COLOR,
                level_count: mip_levels,
                layer_count: layers.len() as u32,
            },
        );

        debug!(
            "uploaded texture: {}x{}x{}, {} layers, {} mips",
            extent.width,
            extent.height,
            extent.depth,
            layers.len(),
            mip_levels
        );

        Ok(Arc::new(Self { image, view }))
    }

    #[inline]
    pub fn image(&self) -> &Image {
        &self.image
    }

    #[inline]
    pub fn view(&self) -> &ImageView {
        &self.view
    }
}

/// A device-local attachment image and its full-resource view, sized to the
/// framebuffer that will bind it.
pub struct RenderTarget {
    image: Image,
    view: ImageView,
}

impl RenderTarget {
    pub fn new(
        device: &Arc<Device>,
        allocator: &Arc<MemoryAllocator>,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        aspect_mask: vk::ImageAspectFlags,
    ) -> Arc<Self> {
        let image = Image::new(
            device.clone(),
            allocator,
            ImageCreateInfo {
                extent: vk::Extent3D {
                    width: extent.width,
                    height: extent.height,
                    depth: 1,
                },
                format,
                mip_levels: 1,
                array_layers: 1,
                usage,
                flags: vk::ImageCreateFlags::empty(),
            },
        );

        let view = ImageView::new(
            device.clone(),
            &image,
            ImageViewCreateInfo {
                view_type: vk::ImageViewType::TYPE_2D,
                format,
                aspect_mask,
                level_count: 1,
                layer_count: 1,
            },
        );

        Arc::new(Self { image, view })
    }

    #[inline]
    pub fn image(&self) -> &Image {
        &self.image
    }

    #[inline]
    pub fn view(&self) -> &ImageView {
        &self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_covers_the_largest_dimension() {
        let extent = |width, height| vk::Extent3D {
            width,
            height,
            depth: 1,
        };

        assert_eq!(mip_levels_for(extent(1, 1)), 1);
        assert_eq!(mip_levels_for(extent(256, 256)), 9);
        assert_eq!(mip_levels_for(extent(512, 64)), 10);
    }
}
