//! Per-frame transform matrices and per-draw push constants.
//!
//! Both blocks live in transient uniform memory and are re-uploaded only when
//! dirty. An upload stays valid for the rest of the frame, so a new encoder
//! scope only needs the last slice bound again.

use bytemuck::{Pod, Zeroable};
use lumen_core::math::{self, Mat4};

use crate::binding::VertexBufferSlot;
use crate::error::GraphicsError;
use crate::resources::{BufferSlice, StagingAllocator, StagingKind};

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Global transforms as seen by the shaders. Matrices are column-major.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UniformBlock {
    pub projection: [f32; 16],
    pub view: [f32; 16],
    pub view_projection: [f32; 16],
}

static_assertions::const_assert_eq!(std::mem::size_of::<UniformBlock>(), 192);

impl UniformBlock {
    /// Block for `projection` and `view`, with `view_projection = projection * view`.
    pub fn from_matrices(projection: &Mat4, view: &Mat4) -> Self {
        Self {
            projection: math::mat4_to_cols_array(projection),
            view: math::mat4_to_cols_array(view),
            view_projection: math::mat4_to_cols_array(&math::view_projection(projection, view)),
        }
    }
}

impl Default for UniformBlock {
    fn default() -> Self {
        Self {
            projection: IDENTITY,
            view: IDENTITY,
            view_projection: IDENTITY,
        }
    }
}

/// Number of floats in the push-constant block.
pub const PUSH_CONSTANT_FLOATS: usize = 24;

/// Small per-draw parameter block.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PushConstants(pub [f32; PUSH_CONSTANT_FLOATS]);

impl Default for PushConstants {
    fn default() -> Self {
        Self([0.0; PUSH_CONSTANT_FLOATS])
    }
}

/// Result of flushing a block: the slice to bind and whether it was freshly uploaded.
#[derive(Debug, Clone)]
pub struct UniformFlush {
    pub slice: BufferSlice,
    pub uploaded: bool,
}

/// Dirty tracking for one uploaded block.
#[derive(Debug)]
struct Tracked<T> {
    value: T,
    dirty: bool,
    slice: Option<BufferSlice>,
    bound: bool,
}

impl<T: Pod> Tracked<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            dirty: true,
            slice: None,
            bound: false,
        }
    }

    fn flush(
        &mut self,
        staging: &mut StagingAllocator,
    ) -> Result<Option<UniformFlush>, GraphicsError> {
        if self.dirty {
            let mut allocation =
                staging.allocate(StagingKind::Uniform, std::mem::size_of::<T>() as u64)?;
            allocation.write_pod(std::slice::from_ref(&self.value))?;
            let slice = allocation.into_slice();
            self.slice = Some(slice.clone());
            self.dirty = false;
            self.bound = true;
            return Ok(Some(UniformFlush {
                slice,
                uploaded: true,
            }));
        }

        match &self.slice {
            Some(slice) if !self.bound => {
                self.bound = true;
                Ok(Some(UniformFlush {
                    slice: slice.clone(),
                    uploaded: false,
                }))
            }
            _ => Ok(None),
        }
    }

    fn invalidate(&mut self) {
        self.dirty = true;
        self.slice = None;
        self.bound = false;
    }
}

/// Transform block and push constants of the frame being recorded.
#[derive(Debug)]
pub struct GlobalUniforms {
    block: Tracked<UniformBlock>,
    push: Tracked<PushConstants>,
    uploads: u64,
}

impl GlobalUniforms {
    pub fn new() -> Self {
        Self {
            block: Tracked::new(UniformBlock::default()),
            push: Tracked::new(PushConstants::default()),
            uploads: 0,
        }
    }

    /// Set the camera transforms and mark the block dirty.
    pub fn set_view_projection(&mut self, projection: &Mat4, view: &Mat4) {
        self.block.value = UniformBlock::from_matrices(projection, view);
        self.block.dirty = true;
    }

    /// Overwrite push-constant floats starting at `offset`.
    pub fn set_push_constants(
        &mut self,
        offset: usize,
        values: &[f32],
    ) -> Result<(), GraphicsError> {
        let end = offset
            .checked_add(values.len())
            .filter(|end| *end <= PUSH_CONSTANT_FLOATS)
            .ok_or_else(|| {
                GraphicsError::InvalidParameter(format!(
                    "push constants {}..{} exceed {} floats",
                    offset,
                    offset.saturating_add(values.len()),
                    PUSH_CONSTANT_FLOATS
                ))
            })?;
        self.push.value.0[offset..end].copy_from_slice(values);
        self.push.dirty = true;
        Ok(())
    }

    /// Upload the transform block if dirty.
    ///
    /// Returns the slice to bind at the uniform slot: freshly uploaded, or the
    /// previous upload when a new encoder scope has not bound it yet. `None`
    /// when the bound block is current.
    pub fn flush_block(
        &mut self,
        staging: &mut StagingAllocator,
    ) -> Result<Option<UniformFlush>, GraphicsError> {
        let flush = self.block.flush(staging)?;
        if flush.as_ref().is_some_and(|f| f.uploaded) {
            self.uploads += 1;
        }
        Ok(flush)
    }

    /// Upload the push constants if dirty. Same contract as [`flush_block`](Self::flush_block).
    pub fn flush_push_constants(
        &mut self,
        staging: &mut StagingAllocator,
    ) -> Result<Option<UniformFlush>, GraphicsError> {
        let flush = self.push.flush(staging)?;
        if flush.as_ref().is_some_and(|f| f.uploaded) {
            self.uploads += 1;
        }
        Ok(flush)
    }

    /// A new frame recycles transient memory: everything must be uploaded again.
    pub fn invalidate(&mut self) {
        self.block.invalidate();
        self.push.invalidate();
    }

    /// A new encoder scope starts with nothing bound.
    pub fn encoder_changed(&mut self) {
        self.block.bound = false;
        self.push.bound = false;
    }

    /// Something other than a uniform flush was bound at `slot`.
    ///
    /// The uniform block and push constants share their slots with vertex
    /// streams, so the displaced block must be bound again before it is read.
    pub fn slot_overwritten(&mut self, slot: VertexBufferSlot) {
        if slot == VertexBufferSlot::UBO {
            self.block.bound = false;
        }
        if slot == VertexBufferSlot::PUSH_BUFFER {
            self.push.bound = false;
        }
    }

    pub fn block(&self) -> &UniformBlock {
        &self.block.value
    }

    pub fn push_constants(&self) -> &PushConstants {
        &self.push.value
    }

    pub fn is_block_dirty(&self) -> bool {
        self.block.dirty
    }

    pub fn is_push_dirty(&self) -> bool {
        self.push.dirty
    }

    /// Total uploads performed.
    pub fn uploads(&self) -> u64 {
        self.uploads
    }
}

impl Default for GlobalUniforms {
    fn default() -> Self {
        Self::new()
    }
}
