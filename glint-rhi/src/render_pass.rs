use std::sync::Arc;

use ash::vk;

use crate::{AshHandle, VkHandle, device::device::Device};

#[derive(Debug, Clone)]
pub struct RenderPassCreateInfo {
    pub color_attachments: Vec<vk::AttachmentDescription>,
    pub depth_attachment: Option<vk::AttachmentDescription>,
    /// Set for passes rendering into a mirrored target (planar reflections);
    /// pipelines compiled for the pass cull the opposite face.
    pub invert_faces: bool,
}

pub struct RenderPass {
    device: Arc<Device>,
    handle: vk::RenderPass,
    color_attachment_count: usize,
    has_depth_attachment: bool,
    invert_faces: bool,
}

impl VkHandle for RenderPass {
    type Handle = vk::RenderPass;

    #[inline]
    fn vk_handle(&self) -> Self::Handle {
        self.handle
    }
}

impl RenderPass {
    pub fn new(device: Arc<Device>, create_info: RenderPassCreateInfo) -> Arc<Self> {
        let color_attachment_count = create_info.color_attachments.len();
        let has_depth_attachment = create_info.depth_attachment.is_some();

        let mut attachments = create_info.color_attachments.clone();
        let mut color_refs = Vec::with_capacity(color_attachment_count);
        for index in 0..color_attachment_count {
            color_refs.push(vk::AttachmentReference {
                attachment: index as u32,
                layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            });
        }

        let depth_ref;
        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs);

        if let Some(depth_attachment) = create_info.depth_attachment {
            attachments.push(depth_attachment);
            depth_ref = vk::AttachmentReference {
                attachment: color_attachment_count as u32,
                layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            };
            subpass = subpass.depth_stencil_attachment(&depth_ref);
        }

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass));

        let handle = unsafe {
            device
                .ash_handle()
                .create_render_pass(&render_pass_info, None)
                .expect("Failed to create render pass")
        };

        Arc::new(Self {
            device,
            handle,
            color_attachment_count,
            has_depth_attachment,
            invert_faces: create_info.invert_faces,
        })
    }

    #[inline]
    pub fn has_color_attachments(&self) -> bool {
        self.color_attachment_count > 0
    }

    #[inline]
    pub fn has_depth_attachment(&self) -> bool {
        self.has_depth_attachment
    }

    #[inline]
    pub fn inverts_faces(&self) -> bool {
        self.invert_faces
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device
                .ash_handle()
                .destroy_render_pass(self.handle, None);
        }
    }
}

/// Concrete image views bound to a render pass at fixed dimensions.
pub struct Framebuffer {
    device: Arc<Device>,
    render_pass: Arc<RenderPass>,
    handle: vk::Framebuffer,
    extent: vk::Extent2D,
}

impl VkHandle for Framebuffer {
    type Handle = vk::Framebuffer;

    #[inline]
    fn vk_handle(&self) -> Self::Handle {
        self.handle
    }
}

impl Framebuffer {
    pub fn new(
        device: Arc<Device>,
        render_pass: Arc<RenderPass>,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> Arc<Self> {
        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass.vk_handle())
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let handle = unsafe {
            device
                .ash_handle()
                .create_framebuffer(&framebuffer_info, None)
                .expect("Failed to create framebuffer")
        };

        Arc::new(Self {
            device,
            render_pass,
            handle,
            extent,
        })
    }

    #[inline]
    pub fn render_pass(&self) -> &Arc<RenderPass> {
        &self.render_pass
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device
                .ash_handle()
                .destroy_framebuffer(self.handle, None);
        }
    }
}
