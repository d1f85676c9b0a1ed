//! Frame-scoped transient memory for vertex, index and uniform data.
//!
//! Every frame slot owns one [`RingBuffer`] per [`StagingKind`]. Allocations
//! are linear within a frame and the slot's rings are reset when the frame
//! synchronizer hands the slot out again, so the CPU never writes memory the
//! GPU may still be reading.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::config::StagingConfig;
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::{Buffer, RingBuffer};
use crate::types::BufferUsage;

/// What a transient allocation holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StagingKind {
    Vertex,
    Index,
    Uniform,
}

impl StagingKind {
    /// Every kind, in ring order.
    pub const ALL: [StagingKind; 3] = [
        StagingKind::Vertex,
        StagingKind::Index,
        StagingKind::Uniform,
    ];

    const fn index(self) -> usize {
        match self {
            Self::Vertex => 0,
            Self::Index => 1,
            Self::Uniform => 2,
        }
    }

    /// Buffer usage of the backing ring.
    pub const fn usage(self) -> BufferUsage {
        match self {
            Self::Vertex => BufferUsage::VERTEX,
            Self::Index => BufferUsage::INDEX,
            // Uniform blocks are bound through vertex buffer slots
            Self::Uniform => BufferUsage::UNIFORM.union(BufferUsage::VERTEX),
        }
    }

    /// Lower-case name used in labels and messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Index => "index",
            Self::Uniform => "uniform",
        }
    }
}

impl fmt::Display for StagingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A retained reference to transient memory: buffer, byte range and the
/// frame it was allocated in.
#[derive(Debug, Clone)]
pub struct BufferSlice {
    buffer: Arc<Buffer>,
    offset: u64,
    size: u64,
    frame: u64,
}

impl BufferSlice {
    /// The backing buffer.
    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }

    /// Byte offset into the buffer.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Valid byte range within the buffer.
    pub fn range(&self) -> Range<u64> {
        self.offset..self.offset + self.size
    }

    /// Frame the slice was allocated in.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

/// A freshly allocated, writable region of transient memory.
///
/// `data().len()` always equals `size()`. The region stays valid until the
/// end of the frame it was allocated in.
pub struct TransientAllocation<'a> {
    kind: StagingKind,
    slice: BufferSlice,
    data: &'a mut [u8],
}

impl<'a> TransientAllocation<'a> {
    pub fn kind(&self) -> StagingKind {
        self.kind
    }

    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.slice.buffer
    }

    pub fn offset(&self) -> u64 {
        self.slice.offset
    }

    pub fn size(&self) -> u64 {
        self.slice.size
    }

    pub fn range(&self) -> Range<u64> {
        self.slice.range()
    }

    pub fn frame(&self) -> u64 {
        self.slice.frame
    }

    /// The allocated bytes.
    pub fn data(&self) -> &[u8] {
        &*self.data
    }

    /// The writable bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut *self.data
    }

    /// Copy `bytes` to the start of the region.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), GraphicsError> {
        if bytes.len() > self.data.len() {
            return Err(GraphicsError::InvalidParameter(format!(
                "write of {} bytes into a {} byte allocation",
                bytes.len(),
                self.data.len()
            )));
        }
        self.data[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Copy plain-old-data values to the start of the region.
    pub fn write_pod<T: bytemuck::Pod>(&mut self, values: &[T]) -> Result<(), GraphicsError> {
        self.write(bytemuck::cast_slice(values))
    }

    /// A retainable reference to this allocation.
    pub fn slice(&self) -> BufferSlice {
        self.slice.clone()
    }

    /// Give up write access and keep the reference.
    pub fn into_slice(self) -> BufferSlice {
        self.slice
    }
}

impl fmt::Debug for TransientAllocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransientAllocation")
            .field("kind", &self.kind)
            .field("range", &self.range())
            .field("frame", &self.slice.frame)
            .finish()
    }
}

/// Per-slot, per-kind linear allocator over staging rings.
pub struct StagingAllocator {
    device: Arc<GraphicsDevice>,
    slots: Vec<[RingBuffer; 3]>,
    current_slot: usize,
    frame: Option<u64>,
}

impl StagingAllocator {
    /// Create the staging rings for `slot_count` frame slots.
    ///
    /// Vertex and index rings align to the device vertex buffer alignment,
    /// the uniform ring to the uniform offset alignment.
    pub fn new(
        device: &Arc<GraphicsDevice>,
        config: &StagingConfig,
        slot_count: usize,
    ) -> Result<Self, GraphicsError> {
        let caps = *device.capabilities();
        let mut slots = Vec::with_capacity(slot_count);
        for slot in 0..slot_count {
            let ring = |kind: StagingKind| {
                let alignment = match kind {
                    StagingKind::Vertex | StagingKind::Index => caps.vertex_buffer_alignment,
                    StagingKind::Uniform => caps.uniform_offset_alignment,
                };
                RingBuffer::with_alignment(
                    device,
                    config.budget(kind),
                    kind.usage(),
                    &format!("staging_{kind}_{slot}"),
                    alignment,
                )
            };
            slots.push([
                ring(StagingKind::Vertex)?,
                ring(StagingKind::Index)?,
                ring(StagingKind::Uniform)?,
            ]);
        }

        log::debug!(
            "Created staging rings for {} slots (vertex {} / index {} / uniform {} bytes)",
            slot_count,
            config.vertex_budget,
            config.index_budget,
            config.uniform_budget
        );

        Ok(Self {
            device: Arc::clone(device),
            slots,
            current_slot: 0,
            frame: None,
        })
    }

    /// Start allocating from `slot` for frame `frame`, reclaiming the slot's rings.
    pub fn begin_frame(&mut self, slot: usize, frame: u64) -> Result<(), GraphicsError> {
        let rings = self.slots.get_mut(slot).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!("staging slot {slot} does not exist"))
        })?;
        for ring in rings.iter_mut() {
            ring.reset();
        }
        self.current_slot = slot;
        self.frame = Some(frame);
        Ok(())
    }

    /// Allocate `size` bytes of `kind` memory from the current frame's region.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::OutOfStagingMemory`] when the frame budget for `kind`
    /// is exhausted, [`GraphicsError::InvalidState`] outside of a frame.
    pub fn allocate(
        &mut self,
        kind: StagingKind,
        size: u64,
    ) -> Result<TransientAllocation<'_>, GraphicsError> {
        let frame = self.frame.ok_or_else(|| {
            GraphicsError::InvalidState("allocate called outside of a frame".to_string())
        })?;
        let ring = &mut self.slots[self.current_slot][kind.index()];
        let Some(region) = ring.allocate(size) else {
            let available = ring.remaining();
            log::warn!(
                "Staging {} ring exhausted: requested {} bytes, {} left",
                kind,
                size,
                available
            );
            return Err(GraphicsError::OutOfStagingMemory {
                kind,
                requested: size,
                available,
            });
        };

        let slice = BufferSlice {
            buffer: Arc::clone(ring.buffer()),
            offset: region.offset,
            size: region.size,
            frame,
        };
        Ok(TransientAllocation {
            kind,
            slice,
            data: ring.data_mut(region),
        })
    }

    /// Check that `slice` belongs to the frame being recorded.
    pub fn validate(&self, slice: &BufferSlice) -> Result<(), GraphicsError> {
        match self.frame {
            Some(current) if current == slice.frame => Ok(()),
            Some(current) => Err(GraphicsError::StaleAllocation {
                allocated: slice.frame,
                current,
            }),
            None => Err(GraphicsError::InvalidState(
                "buffer slice used outside of a frame".to_string(),
            )),
        }
    }

    /// Upload everything written this frame to the GPU buffers.
    pub fn flush(&self) -> Result<(), GraphicsError> {
        for ring in &self.slots[self.current_slot] {
            ring.flush(&self.device)?;
        }
        Ok(())
    }

    /// Stop handing out memory until the next [`begin_frame`](Self::begin_frame).
    pub fn finish_frame(&mut self) {
        self.frame = None;
    }

    /// Bytes of `kind` used in the current slot.
    pub fn used(&self, kind: StagingKind) -> u64 {
        self.slots[self.current_slot][kind.index()].used()
    }

    /// Bytes of `kind` still available in the current slot.
    pub fn remaining(&self, kind: StagingKind) -> u64 {
        self.slots[self.current_slot][kind.index()].remaining()
    }

    /// Per-frame budget for `kind`.
    pub fn capacity(&self, kind: StagingKind) -> u64 {
        self.slots[self.current_slot][kind.index()].capacity()
    }

    /// Ring of `kind` for `slot`.
    pub fn ring(&self, slot: usize, kind: StagingKind) -> Option<&RingBuffer> {
        self.slots.get(slot).map(|rings| &rings[kind.index()])
    }

    /// Slot currently allocated from.
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    /// Frame currently allocated for, if one is active.
    pub fn frame(&self) -> Option<u64> {
        self.frame
    }
}

impl fmt::Debug for StagingAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagingAllocator")
            .field("slots", &self.slots.len())
            .field("current_slot", &self.current_slot)
            .field("frame", &self.frame)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyBackend, DummyBackendConfig};
    use crate::device::DeviceCapabilities;

    fn create_allocator(config: StagingConfig) -> (Arc<DummyBackend>, StagingAllocator) {
        let capabilities = DeviceCapabilities {
            vertex_buffer_alignment: 16,
            uniform_offset_alignment: 256,
            ..Default::default()
        };
        let backend = Arc::new(DummyBackend::with_config(
            DummyBackendConfig::new().with_capabilities(capabilities),
        ));
        let device = GraphicsDevice::new(backend.clone()).unwrap();
        let staging = StagingAllocator::new(&device, &config, 2).unwrap();
        (backend, staging)
    }

    #[test]
    fn test_allocations_are_aligned_and_disjoint() {
        let (_, mut staging) = create_allocator(StagingConfig::default());
        staging.begin_frame(0, 0).unwrap();

        let first = staging.allocate(StagingKind::Vertex, 1000).unwrap().into_slice();
        let second = staging.allocate(StagingKind::Vertex, 37).unwrap().into_slice();

        assert_eq!(first.range(), 0..1000);
        assert_eq!(second.offset(), 1008);
        assert_eq!(second.size(), 37);
        assert!(first.range().end <= second.range().start);
    }

    #[test]
    fn test_uniform_alignment() {
        let (_, mut staging) = create_allocator(StagingConfig::default());
        staging.begin_frame(0, 0).unwrap();

        staging.allocate(StagingKind::Uniform, 192).unwrap();
        let next = staging.allocate(StagingKind::Uniform, 96).unwrap();
        assert_eq!(next.offset(), 256);
        assert_eq!(next.data().len(), 96);
    }

    #[test]
    fn test_out_of_staging_memory() {
        let config = StagingConfig::default().with_budget(StagingKind::Vertex, 1000);
        let (_, mut staging) = create_allocator(config);
        staging.begin_frame(0, 0).unwrap();

        staging.allocate(StagingKind::Vertex, 1000).unwrap();
        let err = staging.allocate(StagingKind::Vertex, 37).unwrap_err();
        assert_eq!(
            err,
            GraphicsError::OutOfStagingMemory {
                kind: StagingKind::Vertex,
                requested: 37,
                available: 0,
            }
        );
        // Other kinds are budgeted separately
        assert!(staging.allocate(StagingKind::Index, 37).is_ok());
    }

    #[test]
    fn test_slots_have_separate_rings() {
        let (_, mut staging) = create_allocator(StagingConfig::default());
        staging.begin_frame(0, 0).unwrap();
        let slot0 = staging.allocate(StagingKind::Index, 64).unwrap().into_slice();

        staging.begin_frame(1, 1).unwrap();
        let slot1 = staging.allocate(StagingKind::Index, 64).unwrap().into_slice();

        assert!(!Arc::ptr_eq(slot0.buffer(), slot1.buffer()));
        assert_eq!(slot1.offset(), 0);

        // Reusing slot 0 reclaims its ring
        staging.begin_frame(0, 2).unwrap();
        assert_eq!(staging.used(StagingKind::Index), 0);
        let reused = staging.allocate(StagingKind::Index, 64).unwrap();
        assert!(Arc::ptr_eq(reused.buffer(), slot0.buffer()));
        assert_eq!(reused.frame(), 2);
    }

    #[test]
    fn test_stale_slice_rejected() {
        let (_, mut staging) = create_allocator(StagingConfig::default());
        staging.begin_frame(0, 0).unwrap();
        let old = staging.allocate(StagingKind::Vertex, 16).unwrap().into_slice();
        assert!(staging.validate(&old).is_ok());

        staging.begin_frame(1, 1).unwrap();
        assert_eq!(
            staging.validate(&old),
            Err(GraphicsError::StaleAllocation {
                allocated: 0,
                current: 1
            })
        );
    }

    #[test]
    fn test_allocate_outside_frame() {
        let (_, mut staging) = create_allocator(StagingConfig::default());
        let result = staging.allocate(StagingKind::Vertex, 16);
        assert!(matches!(result, Err(GraphicsError::InvalidState(_))));
    }

    #[test]
    fn test_write_checks_length() {
        let (_, mut staging) = create_allocator(StagingConfig::default());
        staging.begin_frame(0, 0).unwrap();
        let mut alloc = staging.allocate(StagingKind::Vertex, 8).unwrap();
        assert!(alloc.write_pod(&[1.0f32, 2.0]).is_ok());
        assert!(alloc.write_pod(&[1.0f32, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_flush_uploads_written_data() {
        let (backend, mut staging) = create_allocator(StagingConfig::default());
        staging.begin_frame(1, 0).unwrap();
        let slice = {
            let mut alloc = staging.allocate(StagingKind::Vertex, 4).unwrap();
            alloc.write(&[1, 2, 3, 4]).unwrap();
            alloc.into_slice()
        };
        staging.flush().unwrap();

        let contents = backend.read_buffer(slice.buffer().handle(), slice.offset(), slice.size());
        assert_eq!(contents, Some(vec![1, 2, 3, 4]));
    }
}
