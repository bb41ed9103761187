use std::sync::Arc;

use ash::vk;
use log::trace;

use glint_rhi::{
    VkHandle,
    buffer::{Buffer, BufferCreateInfo, BufferRegion, BufferUsage},
    command::{CommandBuffer, CommandPool, CommandPoolCreateInfo, CommandPoolError},
    descriptor::{
        DescriptorPool, DescriptorPoolCreateInfo, DescriptorPoolError, DescriptorSetLayout,
    },
    device::Device,
    memory::{MemoryAllocator, MemoryLocation},
    sync::Fence,
};

#[derive(Debug, thiserror::Error)]
pub enum FrameBufferError {
    /// The frame wrote more transient data than the buffer was sized for.
    /// Capacity is fixed at pool construction; the buffer cannot grow
    /// mid-frame without invalidating regions already bound.
    #[error("linear frame buffer out of capacity: {needed} bytes needed, {capacity} available")]
    OutOfCapacity { needed: u64, capacity: u64 },
}

/// Offset bookkeeping for one linear frame buffer, kept apart from the GPU
/// buffer so the arithmetic is checkable on its own.
#[derive(Debug, Clone, Copy)]
struct LinearState {
    capacity: u64,
    alignment: u64,
    offset: u64,
    range: u64,
}

impl LinearState {
    fn new(capacity: u64, alignment: u64) -> Self {
        Self {
            capacity,
            alignment,
            offset: 0,
            range: 0,
        }
    }

    fn reset(&mut self) {
        self.offset = 0;
        self.range = 0;
    }

    fn begin(&mut self) {
        self.offset += self.range.div_ceil(self.alignment) * self.alignment;
        self.range = 0;
    }

    /// Reserves `len` bytes at the end of the pending region and returns the
    /// absolute offset to write them at.
    fn write(&mut self, len: u64) -> Result<u64, FrameBufferError> {
        let at = self.offset + self.range;
        let needed = at + len;
        if needed > self.capacity {
            return Err(FrameBufferError::OutOfCapacity {
                needed,
                capacity: self.capacity,
            });
        }
        self.range += len;
        Ok(at)
    }

    fn region(&self) -> (u64, u64) {
        (self.offset, self.range)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FrameBufferKind {
    Uniform,
    Vertex,
    Index,
}

impl FrameBufferKind {
    fn usage(self) -> BufferUsage {
        match self {
            FrameBufferKind::Uniform => BufferUsage::UNIFORM_BUFFER,
            FrameBufferKind::Vertex => BufferUsage::VERTEX_BUFFER,
            FrameBufferKind::Index => BufferUsage::INDEX_BUFFER,
        }
    }
}

/// A host-visible buffer handed out linearly over one frame. Regions stay
/// valid until the owning pool's next reset.
pub struct LinearFrameBuffer {
    buffer: Buffer,
    mapped: std::ptr::NonNull<u8>,
    state: LinearState,
}

impl LinearFrameBuffer {
    fn new(
        device: &Arc<Device>,
        allocator: &Arc<MemoryAllocator>,
        kind: FrameBufferKind,
        capacity: u64,
    ) -> Self {
        let buffer = Buffer::new(
            device.clone(),
            allocator,
            BufferCreateInfo {
                size: capacity,
                usage: kind.usage(),
                location: MemoryLocation::CpuToGpu,
            },
        );

        // Descriptors may reference any region offset, so the stride must
        // also satisfy the device's uniform-offset granularity.
        let mut alignment = buffer.memory_alignment();
        if kind == FrameBufferKind::Uniform {
            alignment = alignment.max(
                device
                    .physical_device()
                    .properties()
                    .limits
                    .min_uniform_buffer_offset_alignment,
            );
        }

        let mapped = buffer
            .mapped_ptr()
            .expect("linear frame buffer must be host-visible")
            .cast();

        Self {
            buffer,
            mapped,
            state: LinearState::new(capacity, alignment.max(1)),
        }
    }

    fn reset(&mut self) {
        self.state.reset();
    }

    /// Starts a new region past the previous one, rounded up to the buffer's
    /// alignment.
    pub fn begin(&mut self) {
        self.state.begin();
    }

    /// Appends bytes to the pending region.
    pub fn write(&mut self, data: &[u8]) -> Result<(), FrameBufferError> {
        let at = self.state.write(data.len() as u64)?;
        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                self.mapped.as_ptr().add(at as usize),
                data.len(),
            );
        }
        Ok(())
    }

    pub fn write_pod<T: bytemuck::Pod>(&mut self, value: &T) -> Result<(), FrameBufferError> {
        self.write(bytemuck::bytes_of(value))
    }

    /// Closes the pending region and returns its descriptor.
    pub fn end(&self) -> BufferRegion {
        let (offset, range) = self.state.region();
        self.buffer.region(offset, range)
    }

    pub fn upload(&mut self, data: &[u8]) -> Result<BufferRegion, FrameBufferError> {
        self.begin();
        self.write(data)?;
        Ok(self.end())
    }

    pub fn upload_pod<T: bytemuck::Pod>(
        &mut self,
        value: &T,
    ) -> Result<BufferRegion, FrameBufferError> {
        self.upload(bytemuck::bytes_of(value))
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.state.capacity
    }

    #[inline]
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolState {
    /// Transient resources are being handed out for the current frame.
    Recording,
    /// The frame was submitted; the fence will signal when it retires.
    Submitted,
    /// Nothing is in flight. Initial state only.
    Retired,
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error(transparent)]
    Descriptors(#[from] DescriptorPoolError),
    #[error(transparent)]
    Commands(#[from] CommandPoolError),
    #[error("pool must be {expected}, but is {actual:?}")]
    InvalidState {
        expected: &'static str,
        actual: PoolState,
    },
}

#[derive(Debug, Clone)]
pub struct TransientPoolCreateInfo {
    pub queue_family_index: u32,
    pub uniform_capacity: u64,
    pub vertex_capacity: u64,
    pub index_capacity: u64,
    pub descriptor_pool: DescriptorPoolCreateInfo,
}

impl TransientPoolCreateInfo {
    pub fn for_queue_family(queue_family_index: u32) -> Self {
        Self {
            queue_family_index,
            uniform_capacity: 1024 * 1024,
            vertex_capacity: 1024 * 1024,
            index_capacity: 1024 * 1024,
            descriptor_pool: DescriptorPoolCreateInfo::default(),
        }
    }
}

/// Per-frame transient resources: three linear buffers, short-lived
/// descriptor sets and command buffers, all recycled together once the
/// frame's fence signals. One pool per in-flight frame; the caller
/// round-robins pools to double/triple buffer.
pub struct TransientResourcePool {
    device: Arc<Device>,
    uniform_buffer: LinearFrameBuffer,
    vertex_buffer: LinearFrameBuffer,
    index_buffer: LinearFrameBuffer,
    command_pool: CommandPool,
    descriptor_pool: DescriptorPool,
    fence: Fence,
    command_buffers: Vec<vk::CommandBuffer>,
    descriptor_sets: Vec<vk::DescriptorSet>,
    state: PoolState,
}

impl TransientResourcePool {
    pub fn new(
        device: Arc<Device>,
        allocator: &Arc<MemoryAllocator>,
        create_info: TransientPoolCreateInfo,
    ) -> Self {
        let uniform_buffer = LinearFrameBuffer::new(
            &device,
            allocator,
            FrameBufferKind::Uniform,
            create_info.uniform_capacity,
        );
        let vertex_buffer = LinearFrameBuffer::new(
            &device,
            allocator,
            FrameBufferKind::Vertex,
            create_info.vertex_capacity,
        );
        let index_buffer = LinearFrameBuffer::new(
            &device,
            allocator,
            FrameBufferKind::Index,
            create_info.index_capacity,
        );

        let command_pool = CommandPool::new(
            device.clone(),
            CommandPoolCreateInfo {
                queue_family_index: create_info.queue_family_index,
                transient: true,
            },
        );

        let descriptor_pool = DescriptorPool::new(device.clone(), create_info.descriptor_pool);

        // Signaled so the first reset does not wait on a frame that never
        // happened.
        let fence = Fence::new(device.clone(), true);

        Self {
            device,
            uniform_buffer,
            vertex_buffer,
            index_buffer,
            command_pool,
            descriptor_pool,
            fence,
            command_buffers: Vec::new(),
            descriptor_sets: Vec::new(),
            state: PoolState::Retired,
        }
    }

    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    #[inline]
    pub fn state(&self) -> PoolState {
        self.state
    }

    /// Fence the frame's final submission must signal. Not signaling it
    /// before the next `reset` leaves the GPU reading recycled resources.
    #[inline]
    pub fn fence(&self) -> &Fence {
        &self.fence
    }

    #[inline]
    pub fn uniform_buffer(&mut self) -> &mut LinearFrameBuffer {
        &mut self.uniform_buffer
    }

    #[inline]
    pub fn vertex_buffer(&mut self) -> &mut LinearFrameBuffer {
        &mut self.vertex_buffer
    }

    #[inline]
    pub fn index_buffer(&mut self) -> &mut LinearFrameBuffer {
        &mut self.index_buffer
    }

    /// Records that the frame's commands were submitted with this pool's
    /// fence.
    pub fn mark_submitted(&mut self) -> Result<(), PoolError> {
        if self.state != PoolState::Recording {
            return Err(PoolError::InvalidState {
                expected: "Recording",
                actual: self.state,
            });
        }
        self.state = PoolState::Submitted;
        Ok(())
    }

    /// Blocks until the pool's previous frame has retired on the GPU, then
    /// recycles everything handed out since the last reset. This is the one
    /// suspension point of the subsystem; it is what keeps the engine from
    /// running more than N frames ahead.
    pub fn reset(&mut self) -> Result<(), PoolError> {
        match self.state {
            PoolState::Recording => {
                return Err(PoolError::InvalidState {
                    expected: "Submitted or Retired",
                    actual: self.state,
                });
            }
            PoolState::Submitted => self.fence.wait(),
            PoolState::Retired => {}
        }
        self.fence.reset();

        self.command_pool.free(&self.command_buffers);
        self.command_buffers.clear();
        self.command_pool.reset();

        self.descriptor_pool.free(&self.descriptor_sets);
        self.descriptor_sets.clear();
        self.descriptor_pool.reset();

        self.uniform_buffer.reset();
        self.vertex_buffer.reset();
        self.index_buffer.reset();

        trace!("transient resource pool reset");
        self.state = PoolState::Recording;
        Ok(())
    }

    /// Hands out a command buffer that lives until the next reset.
    pub fn allocate_command_buffer(&mut self) -> Result<CommandBuffer, PoolError> {
        self.expect_recording()?;
        let cmd = self.command_pool.allocate()?;
        self.command_buffers.push(cmd.vk_handle());
        Ok(cmd)
    }

    /// Hands out a descriptor set that lives until the next reset.
    pub fn allocate_descriptor_set(
        &mut self,
        layout: &DescriptorSetLayout,
    ) -> Result<vk::DescriptorSet, PoolError> {
        self.expect_recording()?;
        let set = self.descriptor_pool.allocate(layout)?;
        self.descriptor_sets.push(set);
        Ok(set)
    }

    fn expect_recording(&self) -> Result<(), PoolError> {
        if self.state != PoolState::Recording {
            return Err(PoolError::InvalidState {
                expected: "Recording",
                actual: self.state,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_are_disjoint_and_append_in_order() {
        let mut state = LinearState::new(1024, 64);

        state.begin();
        let first = state.write(100).unwrap();
        assert_eq!(first, 0);
        assert_eq!(state.region(), (0, 100));

        // 100 rounds up to 128 with 64-byte alignment.
        state.begin();
        let second = state.write(32).unwrap();
        assert_eq!(second, 128);
        assert_eq!(state.region(), (128, 32));

        state.begin();
        let third = state.write(1).unwrap();
        assert_eq!(third, 192);
    }

    #[test]
    fn multiple_writes_extend_the_pending_region() {
        let mut state = LinearState::new(256, 16);

        state.begin();
        assert_eq!(state.write(10).unwrap(), 0);
        assert_eq!(state.write(10).unwrap(), 10);
        assert_eq!(state.region(), (0, 20));
    }

    #[test]
    fn reset_rewinds_to_offset_zero() {
        let mut state = LinearState::new(256, 16);

        state.begin();
        state.write(100).unwrap();
        state.reset();

        state.begin();
        assert_eq!(state.write(8).unwrap(), 0);
        assert_eq!(state.region(), (0, 8));
    }

    #[test]
    fn overflowing_capacity_fails() {
        let mut state = LinearState::new(128, 16);

        state.begin();
        state.write(100).unwrap();
        let err = state.write(100).unwrap_err();
        match err {
            FrameBufferError::OutOfCapacity { needed, capacity } => {
                assert_eq!(needed, 200);
                assert_eq!(capacity, 128);
            }
        }

        // The failed write must not have grown the region.
        assert_eq!(state.region(), (0, 100));
    }

    #[test]
    fn begin_without_writes_does_not_advance() {
        let mut state = LinearState::new(256, 64);

        state.begin();
        state.begin();
        assert_eq!(state.write(4).unwrap(), 0);
    }
}
