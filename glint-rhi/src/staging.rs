use std::sync::Arc;

use ash::vk;
use log::debug;

use crate::{
    VkHandle,
    buffer::{Buffer, BufferCreateInfo, BufferUsage},
    command::{CommandBuffer, CommandPool, CommandPoolCreateInfo},
    device::device::Device,
    memory::{MemoryAllocator, MemoryLocation},
    queue::Queue,
};

pub const DEFAULT_STAGING_CAPACITY: u64 = 16 * 1024 * 1024;

/// One-shot upload path: a persistently mapped staging buffer plus a
/// transient command pool whose submissions are waited on synchronously.
/// Used for static resources at load time, never per frame.
pub struct UploadContext {
    queue: Arc<Queue>,
    allocator: Arc<MemoryAllocator>,
    staging: Buffer,
    command_pool: CommandPool,
}

impl UploadContext {
    pub fn new(
        device: Arc<Device>,
        queue: Arc<Queue>,
        allocator: Arc<MemoryAllocator>,
        staging_capacity: u64,
    ) -> Self {
        let staging = Buffer::new(
            device.clone(),
            &allocator,
            BufferCreateInfo {
                size: staging_capacity,
                usage: BufferUsage::TRANSFER_SRC,
                location: MemoryLocation::CpuToGpu,
            },
        );

        let command_pool = CommandPool::new(
            device,
            CommandPoolCreateInfo {
                queue_family_index: queue.family_index(),
                transient: true,
            },
        );

        Self {
            queue,
            allocator,
            staging,
            command_pool,
        }
    }

    #[inline]
    pub fn staging_buffer(&self) -> &Buffer {
        &self.staging
    }

    /// Copies `data` to the start of the staging buffer.
    pub fn write_staging(&self, data: &[u8]) {
        assert!(
            data.len() as u64 <= self.staging.size(),
            "staging buffer overflow: {} > {}",
            data.len(),
            self.staging.size()
        );

        let ptr = self
            .staging
            .mapped_ptr()
            .expect("staging buffer must be host-visible")
            .as_ptr() as *mut u8;

        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, data.len());
        }
    }

    /// Starts recording a one-shot command buffer.
    pub fn begin_transient(&self) -> CommandBuffer {
        let cmd = self
            .command_pool
            .allocate()
            .expect("Failed to allocate transient command buffer");
        cmd.begin(true);
        cmd
    }

    /// Finishes the one-shot buffer, submits it and blocks until the queue
    /// drains, then releases the buffer back to the pool.
    pub fn end_transient(&self, cmd: CommandBuffer) {
        cmd.end();
        self.queue.submit(&[cmd.vk_handle()], None);
        self.queue.wait_idle();
        self.command_pool.free(&[cmd.vk_handle()]);
    }

    /// Creates a device-local buffer populated with `data` through the
    /// staging buffer.
    pub fn upload_buffer(&self, device: Arc<Device>, usage: BufferUsage, data: &[u8]) -> Buffer {
        self.write_staging(data);

        let buffer = Buffer::new(
            device,
            &self.allocator,
            BufferCreateInfo {
                size: data.len() as u64,
                usage: usage | BufferUsage::TRANSFER_DST,
                location: MemoryLocation::GpuOnly,
            },
        );

        let cmd = self.begin_transient();
        cmd.copy_buffer(
            self.staging.vk_handle(),
            buffer.vk_handle(),
            &[vk::BufferCopy {
                src_offset: 0,
                dst_offset: 0,
                size: data.len() as u64,
            }],
        );
        self.end_transient(cmd);

        debug!("uploaded {} bytes into a static buffer", data.len());
        buffer
    }
}
