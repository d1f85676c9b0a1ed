//! Redundant state-change elimination.
//!
//! [`BindingCache`] mirrors what has been encoded into the current encoder
//! scope. A bind request that matches the mirrored value is dropped; anything
//! else updates the mirror and tells the caller to encode the GPU command.
//! Values are compared by identity (`Arc::ptr_eq`), never by contents.

use std::fmt;
use std::sync::Arc;

use crate::error::GraphicsError;
use crate::pipeline::{ComputePipeline, RenderPipeline};
use crate::resources::{Sampler, Texture};

/// Number of texture and sampler slots tracked per scope.
pub const MAX_BOUND_TEXTURES: usize = 4;

/// Vertex buffer slot indices used by the shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexBufferSlot(pub u32);

impl VertexBufferSlot {
    /// Per-draw push constants.
    pub const PUSH_BUFFER: Self = Self(0);
    /// Global uniform block.
    pub const UBO: Self = Self(1);
    /// First vertex stream. Shares index 1 with [`UBO`](Self::UBO); techniques
    /// reading a vertex stream there do not read the uniform block.
    pub const VERTEX_START: Self = Self(1);
    /// First vertex stream of alias models.
    pub const ALIAS_VERTEX_START: Self = Self(2);

    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Last value encoded for one binding slot.
pub struct BindSlot<T> {
    bound: Option<Arc<T>>,
}

impl<T> BindSlot<T> {
    pub const fn new() -> Self {
        Self { bound: None }
    }

    /// Record `value` as bound. Returns `true` if it differs from the
    /// current value and the bind must be encoded.
    pub fn update(&mut self, value: &Arc<T>) -> bool {
        if self.is_bound(value) {
            return false;
        }
        self.bound = Some(Arc::clone(value));
        true
    }

    /// Whether `value` is the currently bound object.
    pub fn is_bound(&self, value: &Arc<T>) -> bool {
        self.bound
            .as_ref()
            .is_some_and(|bound| Arc::ptr_eq(bound, value))
    }

    pub fn get(&self) -> Option<&Arc<T>> {
        self.bound.as_ref()
    }

    /// Forget the bound value.
    pub fn clear(&mut self) {
        self.bound = None;
    }
}

impl<T> Default for BindSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BindSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.bound {
            Some(bound) => write!(f, "Bound({:p})", Arc::as_ptr(bound)),
            None => f.write_str("Unbound"),
        }
    }
}

/// Counters for bind requests, for profiling and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingStats {
    /// Bind requests received.
    pub requests: u64,
    /// Requests that changed state and were encoded.
    pub encoded: u64,
}

impl BindingStats {
    /// Requests dropped as redundant.
    pub fn skipped(&self) -> u64 {
        self.requests - self.encoded
    }
}

/// Mirror of the pipeline, texture and sampler state of the current encoder scope.
#[derive(Debug)]
pub struct BindingCache {
    render_pipeline: BindSlot<RenderPipeline>,
    compute_pipeline: BindSlot<ComputePipeline>,
    textures: [BindSlot<Texture>; MAX_BOUND_TEXTURES],
    samplers: [BindSlot<Sampler>; MAX_BOUND_TEXTURES],
    stats: BindingStats,
    reset_count: u64,
}

impl BindingCache {
    pub fn new() -> Self {
        Self {
            render_pipeline: BindSlot::new(),
            compute_pipeline: BindSlot::new(),
            textures: std::array::from_fn(|_| BindSlot::new()),
            samplers: std::array::from_fn(|_| BindSlot::new()),
            stats: BindingStats::default(),
            reset_count: 0,
        }
    }

    fn record(&mut self, changed: bool) -> bool {
        self.stats.requests += 1;
        if changed {
            self.stats.encoded += 1;
        }
        changed
    }

    fn check_slot(slot: usize) -> Result<usize, GraphicsError> {
        if slot < MAX_BOUND_TEXTURES {
            Ok(slot)
        } else {
            Err(GraphicsError::InvalidSlot {
                slot,
                max: MAX_BOUND_TEXTURES - 1,
            })
        }
    }

    /// Returns `true` if `pipeline` must be encoded.
    pub fn bind_render_pipeline(&mut self, pipeline: &Arc<RenderPipeline>) -> bool {
        let changed = self.render_pipeline.update(pipeline);
        self.record(changed)
    }

    /// Returns `true` if `pipeline` must be encoded.
    pub fn bind_compute_pipeline(&mut self, pipeline: &Arc<ComputePipeline>) -> bool {
        let changed = self.compute_pipeline.update(pipeline);
        self.record(changed)
    }

    /// Returns `Ok(true)` if `texture` must be encoded at `slot`.
    pub fn bind_texture(
        &mut self,
        slot: usize,
        texture: &Arc<Texture>,
    ) -> Result<bool, GraphicsError> {
        let slot = Self::check_slot(slot)?;
        let changed = self.textures[slot].update(texture);
        Ok(self.record(changed))
    }

    /// Returns `Ok(true)` if `sampler` must be encoded at `slot`.
    pub fn bind_sampler(
        &mut self,
        slot: usize,
        sampler: &Arc<Sampler>,
    ) -> Result<bool, GraphicsError> {
        let slot = Self::check_slot(slot)?;
        let changed = self.samplers[slot].update(sampler);
        Ok(self.record(changed))
    }

    pub fn render_pipeline(&self) -> Option<&Arc<RenderPipeline>> {
        self.render_pipeline.get()
    }

    pub fn compute_pipeline(&self) -> Option<&Arc<ComputePipeline>> {
        self.compute_pipeline.get()
    }

    pub fn texture(&self, slot: usize) -> Option<&Arc<Texture>> {
        self.textures.get(slot).and_then(BindSlot::get)
    }

    pub fn sampler(&self, slot: usize) -> Option<&Arc<Sampler>> {
        self.samplers.get(slot).and_then(BindSlot::get)
    }

    /// Forget everything; called once per new encoder scope.
    pub fn reset(&mut self) {
        self.render_pipeline.clear();
        self.compute_pipeline.clear();
        self.textures.iter_mut().for_each(BindSlot::clear);
        self.samplers.iter_mut().for_each(BindSlot::clear);
        self.reset_count += 1;
        log::trace!("Binding cache reset ({})", self.reset_count);
    }

    /// Number of resets so far.
    pub fn reset_count(&self) -> u64 {
        self.reset_count
    }

    pub fn stats(&self) -> BindingStats {
        self.stats
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.render_pipeline.get().is_none()
            && self.compute_pipeline.get().is_none()
            && self.textures.iter().all(|s| s.get().is_none())
            && self.samplers.iter().all(|s| s.get().is_none())
    }
}

impl Default for BindingCache {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(BindingCache: Send, Sync);
