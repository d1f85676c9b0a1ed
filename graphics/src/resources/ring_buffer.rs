//! Per-frame linear staging ring.
//!
//! Each ring owns one host-visible GPU buffer of a fixed byte budget plus a
//! host copy of the same size. Transient vertex, index and uniform data is
//! written into the host copy at increasing aligned offsets and uploaded in
//! one [`RingBuffer::flush`] just before the frame's command buffer is
//! submitted.
//!
//! Nothing is freed individually. [`RingBuffer::reset`] rewinds the cursor
//! once the frame slot that owns the ring has been retired by the GPU.

use std::ops::Range;
use std::sync::Arc;

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::Buffer;
use crate::types::{BufferDescriptor, BufferUsage};

/// Byte region handed out by a [`RingBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RingRegion {
    pub offset: u64,
    pub size: u64,
}

impl RingRegion {
    /// One past the last byte of the region.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    pub fn range(&self) -> Range<u64> {
        self.offset..self.end()
    }

    fn host_range(&self) -> Range<usize> {
        self.offset as usize..self.end() as usize
    }
}

/// Linear allocator over one staging buffer.
///
/// Driven from the encoding thread only.
pub struct RingBuffer {
    gpu: Arc<Buffer>,
    host: Vec<u8>,
    cursor: u64,
    alignment: u64,
    resets: u64,
}

impl RingBuffer {
    /// Create a ring whose budget is exactly `capacity` bytes.
    ///
    /// Every region starts at a multiple of `alignment`, which must be a
    /// power of two. The GPU buffer is labelled `{label}_ring`.
    pub fn with_alignment(
        device: &Arc<GraphicsDevice>,
        capacity: u64,
        usage: BufferUsage,
        label: &str,
        alignment: u64,
    ) -> Result<Self, GraphicsError> {
        if capacity == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "staging ring '{label}' needs a non-zero budget"
            )));
        }
        if !alignment.is_power_of_two() {
            return Err(GraphicsError::InvalidParameter(format!(
                "staging ring '{label}' alignment {alignment} is not a power of two"
            )));
        }

        let host_len = usize::try_from(capacity).map_err(|_| GraphicsError::OutOfMemory)?;
        let gpu = device.create_buffer(
            &BufferDescriptor::new(capacity, usage | BufferUsage::HOST_VISIBLE)
                .with_label(format!("{label}_ring")),
        )?;

        Ok(Self {
            gpu,
            host: vec![0; host_len],
            cursor: 0,
            alignment,
            resets: 0,
        })
    }

    /// GPU buffer the regions live in.
    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.gpu
    }

    pub fn capacity(&self) -> u64 {
        self.host.len() as u64
    }

    /// Offset just past the last region handed out.
    pub fn write_offset(&self) -> u64 {
        self.cursor
    }

    pub fn alignment(&self) -> u64 {
        self.alignment
    }

    /// Number of resets that reclaimed at least one region.
    pub fn reset_count(&self) -> u64 {
        self.resets
    }

    pub fn used(&self) -> u64 {
        self.cursor
    }

    /// Largest region the next [`allocate`](Self::allocate) can still return.
    pub fn remaining(&self) -> u64 {
        self.capacity().saturating_sub(self.next_start())
    }

    pub fn can_allocate(&self, size: u64) -> bool {
        self.place(size).is_some()
    }

    /// Hand out the next `size` bytes.
    ///
    /// Returns `None` when the region would cross the end of the budget. The
    /// ring does not wrap within a frame.
    pub fn allocate(&mut self, size: u64) -> Option<RingRegion> {
        let region = self.place(size)?;
        self.cursor = region.end();
        Some(region)
    }

    pub fn data(&self, region: RingRegion) -> &[u8] {
        &self.host[region.host_range()]
    }

    pub fn data_mut(&mut self, region: RingRegion) -> &mut [u8] {
        &mut self.host[region.host_range()]
    }

    /// Upload everything written since the last reset.
    pub fn flush(&self, device: &GraphicsDevice) -> Result<(), GraphicsError> {
        if self.cursor == 0 {
            return Ok(());
        }
        device
            .backend()
            .write_buffer(self.gpu.handle(), 0, &self.host[..self.cursor as usize])
    }

    /// Rewind to offset 0.
    ///
    /// The caller guarantees the GPU no longer reads any region of this ring.
    pub fn reset(&mut self) {
        if self.cursor != 0 {
            self.cursor = 0;
            self.resets += 1;
        }
    }

    fn next_start(&self) -> u64 {
        self.cursor.next_multiple_of(self.alignment)
    }

    fn place(&self, size: u64) -> Option<RingRegion> {
        let offset = self.next_start();
        let end = offset.checked_add(size)?;
        (end <= self.capacity()).then_some(RingRegion { offset, size })
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("label", &self.gpu.label())
            .field("used", &self.cursor)
            .field("capacity", &self.capacity())
            .field("alignment", &self.alignment)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    fn vertex_ring(
        capacity: u64,
        alignment: u64,
    ) -> (Arc<DummyBackend>, Arc<GraphicsDevice>, RingBuffer) {
        let backend = Arc::new(DummyBackend::new());
        let device = GraphicsDevice::new(backend.clone()).unwrap();
        let ring =
            RingBuffer::with_alignment(&device, capacity, BufferUsage::VERTEX, "verts", alignment)
                .unwrap();
        (backend, device, ring)
    }

    #[test]
    fn test_fresh_ring_is_empty() {
        let (_, _, ring) = vertex_ring(4096, 16);
        assert_eq!(ring.used(), 0);
        assert_eq!(ring.remaining(), 4096);
        assert_eq!(ring.reset_count(), 0);
        assert_eq!(ring.buffer().label(), Some("verts_ring"));
        assert!(ring.buffer().usage().contains(BufferUsage::HOST_VISIBLE));
    }

    #[test]
    fn test_regions_are_aligned_and_disjoint() {
        let (_, _, mut ring) = vertex_ring(4096, 16);
        let mut previous_end = 0;
        for size in [12, 1, 40, 16, 3] {
            let region = ring.allocate(size).unwrap();
            assert_eq!(region.offset % 16, 0);
            assert!(region.offset >= previous_end);
            assert_eq!(region.size, size);
            previous_end = region.end();
        }
        assert_eq!(ring.write_offset(), previous_end);
    }

    #[test]
    fn test_uniform_alignment_skips_padding() {
        let (_, _, mut ring) = vertex_ring(1024, 256);
        assert_eq!(ring.allocate(192).unwrap().range(), 0..192);
        assert_eq!(ring.remaining(), 768);
        assert_eq!(ring.allocate(192).unwrap().range(), 256..448);
    }

    #[test]
    fn test_budget_is_exact() {
        let (_, _, mut ring) = vertex_ring(1000, 16);
        assert!(ring.can_allocate(1000));
        assert!(!ring.can_allocate(1001));
        assert!(!ring.can_allocate(u64::MAX));

        ring.allocate(992).unwrap();
        // Next start is 992, 8 bytes left
        assert_eq!(ring.remaining(), 8);
        assert!(ring.allocate(9).is_none());
        assert_eq!(ring.write_offset(), 992);
        assert_eq!(ring.allocate(8).unwrap().offset, 992);
        assert!(ring.allocate(1).is_none());
    }

    #[test]
    fn test_reset_counts_only_reclaims() {
        let (_, _, mut ring) = vertex_ring(256, 16);
        ring.reset();
        assert_eq!(ring.reset_count(), 0);

        ring.allocate(100).unwrap();
        ring.reset();
        ring.reset();
        assert_eq!(ring.reset_count(), 1);
        assert_eq!(ring.allocate(100).unwrap().offset, 0);
    }

    #[test]
    fn test_flush_uploads_written_prefix() {
        let (backend, device, mut ring) = vertex_ring(64, 4);
        let first = ring.allocate(3).unwrap();
        let second = ring.allocate(2).unwrap();
        ring.data_mut(first).copy_from_slice(&[1, 2, 3]);
        ring.data_mut(second).copy_from_slice(&[7, 7]);
        assert_eq!(ring.data(second), &[7, 7]);

        ring.flush(&device).unwrap();
        let handle = ring.buffer().handle();
        assert_eq!(backend.read_buffer(handle, 0, 6), Some(vec![1, 2, 3, 0, 7, 7]));
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let device = GraphicsDevice::new(Arc::new(DummyBackend::new())).unwrap();
        assert!(RingBuffer::with_alignment(&device, 0, BufferUsage::INDEX, "idx", 4).is_err());
        assert!(RingBuffer::with_alignment(&device, 512, BufferUsage::INDEX, "idx", 12).is_err());
    }
}
