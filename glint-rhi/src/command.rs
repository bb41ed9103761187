use std::sync::Arc;

use ash::vk;

use crate::{
    AshHandle, VkHandle,
    device::device::Device,
    pipeline::GraphicsPipeline,
    render_pass::Framebuffer,
};

#[derive(Debug, thiserror::Error)]
pub enum CommandPoolError {
    #[error("command pool exhausted: {0}")]
    Exhausted(vk::Result),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandPoolCreateInfo {
    pub queue_family_index: u32,
    pub transient: bool,
}

pub struct CommandPool {
    device: Arc<Device>,
    pool: vk::CommandPool,
}

impl VkHandle for CommandPool {
    type Handle = vk::CommandPool;

    #[inline]
    fn vk_handle(&self) -> Self::Handle {
        self.pool
    }
}

impl CommandPool {
    pub fn new(device: Arc<Device>, create_info: CommandPoolCreateInfo) -> Self {
        let mut flags = vk::CommandPoolCreateFlags::empty();
        if create_info.transient {
            flags |= vk::CommandPoolCreateFlags::TRANSIENT;
        }

        let pool_create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(create_info.queue_family_index)
            .flags(flags);

        let pool = unsafe {
            device
                .ash_handle()
                .create_command_pool(&pool_create_info, None)
                .expect("Failed to create command pool")
        };

        Self { device, pool }
    }

    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Allocates one primary command buffer. The pool keeps ownership; the
    /// returned recorder does not free itself.
    pub fn allocate(&self) -> Result<CommandBuffer, CommandPoolError> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let buffers = unsafe { self.device.ash_handle().allocate_command_buffers(&alloc_info) }
            .map_err(CommandPoolError::Exhausted)?;

        Ok(CommandBuffer {
            device: self.device.clone(),
            buffer: buffers[0],
        })
    }

    pub fn free(&self, command_buffers: &[vk::CommandBuffer]) {
        if command_buffers.is_empty() {
            return;
        }
        unsafe {
            self.device
                .ash_handle()
                .free_command_buffers(self.pool, command_buffers);
        }
    }

    pub fn reset(&self) {
        unsafe {
            self.device
                .ash_handle()
                .reset_command_pool(self.pool, vk::CommandPoolResetFlags::empty())
                .expect("Failed to reset command pool");
        }
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device
                .ash_handle()
                .destroy_command_pool(self.pool, None);
        }
    }
}

/// Recording handle over a pool-owned command buffer. Lifetime of the
/// underlying buffer is managed by the pool that allocated it.
pub struct CommandBuffer {
    device: Arc<Device>,
    buffer: vk::CommandBuffer,
}

impl VkHandle for CommandBuffer {
    type Handle = vk::CommandBuffer;

    #[inline]
    fn vk_handle(&self) -> Self::Handle {
        self.buffer
    }
}

impl CommandBuffer {
    pub fn begin(&self, one_time_submit: bool) {
        let mut flags = vk::CommandBufferUsageFlags::empty();
        if one_time_submit {
            flags |= vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT;
        }

        let begin_info = vk::CommandBufferBeginInfo::default().flags(flags);

        unsafe {
            self.device
                .ash_handle()
                .begin_command_buffer(self.buffer, &begin_info)
                .expect("Failed to begin command buffer");
        }
    }

    pub fn end(&self) {
        unsafe {
            self.device
                .ash_handle()
                .end_command_buffer(self.buffer)
                .expect("Failed to end command buffer");
        }
    }

    /// Begins the pass over the framebuffer's full extent and points the
    /// dynamic viewport/scissor at it.
    pub fn begin_render_pass(&self, framebuffer: &Framebuffer, clear_values: &[vk::ClearValue]) {
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: framebuffer.extent(),
        };

        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(framebuffer.render_pass().vk_handle())
            .framebuffer(framebuffer.vk_handle())
            .render_area(render_area)
            .clear_values(clear_values);

        unsafe {
            self.device.ash_handle().cmd_begin_render_pass(
                self.buffer,
                &begin_info,
                vk::SubpassContents::INLINE,
            );
        }

        self.set_viewport(render_area);
        self.set_scissor(render_area);
    }

    pub fn end_render_pass(&self) {
        unsafe {
            self.device.ash_handle().cmd_end_render_pass(self.buffer);
        }
    }

    pub fn set_viewport(&self, area: vk::Rect2D) {
        let viewport = vk::Viewport {
            x: area.offset.x as f32,
            y: area.offset.y as f32,
            width: area.extent.width as f32,
            height: area.extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };

        unsafe {
            self.device
                .ash_handle()
                .cmd_set_viewport(self.buffer, 0, std::slice::from_ref(&viewport));
        }
    }

    pub fn set_scissor(&self, area: vk::Rect2D) {
        unsafe {
            self.device
                .ash_handle()
                .cmd_set_scissor(self.buffer, 0, std::slice::from_ref(&area));
        }
    }

    pub fn bind_graphics_pipeline(&self, pipeline: &GraphicsPipeline) {
        unsafe {
            self.device.ash_handle().cmd_bind_pipeline(
                self.buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.vk_handle(),
            );
        }
    }

    pub fn bind_descriptor_sets(
        &self,
        layout: vk::PipelineLayout,
        first_set: u32,
        descriptor_sets: &[vk::DescriptorSet],
    ) {
        unsafe {
            self.device.ash_handle().cmd_bind_descriptor_sets(
                self.buffer,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                first_set,
                descriptor_sets,
                &[],
            );
        }
    }

    pub fn bind_vertex_buffers(&self, buffers: &[vk::Buffer], offsets: &[u64]) {
        debug_assert_eq!(buffers.len(), offsets.len());
        unsafe {
            self.device
                .ash_handle()
                .cmd_bind_vertex_buffers(self.buffer, 0, buffers, offsets);
        }
    }

    pub fn bind_index_buffer(&self, buffer: vk::Buffer, offset: u64, index_type: vk::IndexType) {
        unsafe {
            self.device
                .ash_handle()
                .cmd_bind_index_buffer(self.buffer, buffer, offset, index_type);
        }
    }

    pub fn draw_indexed(
        &self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.ash_handle().cmd_draw_indexed(
                self.buffer,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
    }

    pub fn copy_buffer(&self, src: vk::Buffer, dst: vk::Buffer, regions: &[vk::BufferCopy]) {
        unsafe {
            self.device
                .ash_handle()
                .cmd_copy_buffer(self.buffer, src, dst, regions);
        }
    }

    pub fn copy_buffer_to_image(
        &self,
        src: vk::Buffer,
        dst: vk::Image,
        layout: vk::ImageLayout,
        regions: &[vk::BufferImageCopy],
    ) {
        unsafe {
            self.device
                .ash_handle()
                .cmd_copy_buffer_to_image(self.buffer, src, dst, layout, regions);
        }
    }

    pub fn blit_image(
        &self,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        regions: &[vk::ImageBlit],
        filter: vk::Filter,
    ) {
        unsafe {
            self.device.ash_handle().cmd_blit_image(
                self.buffer,
                src,
                src_layout,
                dst,
                dst_layout,
                regions,
                filter,
            );
        }
    }

    pub fn pipeline_barrier(
        &self,
        src_stage_mask: vk::PipelineStageFlags,
        dst_stage_mask: vk::PipelineStageFlags,
        image_memory_barriers: &[vk::ImageMemoryBarrier],
    ) {
        unsafe {
            self.device.ash_handle().cmd_pipeline_barrier(
                self.buffer,
                src_stage_mask,
                dst_stage_mask,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                image_memory_barriers,
            );
        }
    }
}
