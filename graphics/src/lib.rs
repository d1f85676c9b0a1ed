//! # Lumen Graphics
//!
//! Per-frame GPU render state for an immediate-mode renderer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`RenderState`] - Owns one rendering context and drives its frames
//! - [`FrameSynchronizer`] - Bounds how many frames the CPU records ahead of the GPU
//! - [`StagingAllocator`] - Per-frame transient vertex, index and uniform memory
//! - [`PipelineRegistry`] - Fixed catalog of prebuilt pipelines keyed by technique
//! - [`BindingCache`] - Drops redundant pipeline, texture and sampler binds
//! - [`CommandEncoderLifecycle`] - Command buffer and encoder scope state machine
//! - [`GlobalUniforms`] - Camera transforms and push constants, uploaded when dirty
//! - [`GpuBackend`] - Trait for device backends, with [`DummyBackend`] for testing
//!
//! ## Example
//!
//! ```ignore
//! use lumen_graphics::{DummyBackend, GraphicsDevice, RenderState, RenderStateConfig};
//!
//! let device = GraphicsDevice::new(Arc::new(DummyBackend::new()))?;
//! let mut state = RenderState::new(device, registry, RenderStateConfig::default())?;
//!
//! state.begin_frame()?;
//! state.begin_scene_encoder()?;
//! // Flush uniforms, allocate, bind, draw...
//! let fence = state.end_frame()?;
//! ```

pub mod backend;
pub mod binding;
pub mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod profiling;
pub mod render_state;
pub mod resources;
pub mod types;
pub mod uniforms;

// Re-export main types for convenience
pub use backend::{
    CompletionCallback, CompletionMode, CompletionStatus, DeviceStatus, DummyBackend,
    DummyBackendConfig, GpuBackend, GpuHandle, Submission,
};
pub use binding::{BindingCache, BindingStats, MAX_BOUND_TEXTURES, VertexBufferSlot};
pub use command::{
    BufferCopyRegion, CommandBufferState, CommandEncoderLifecycle, EncoderDescriptor, EncoderKind,
    GpuCommand, RenderPassDescriptor, TriangleFillMode,
};
pub use config::{RenderStateConfig, StagingConfig};
pub use device::{DeviceCapabilities, GraphicsDevice};
pub use error::{ErrorClass, GraphicsError};
pub use frame::{FRAMES_IN_FLIGHT, Fence, FenceStatus, FrameInfo, FrameSynchronizer};
pub use pipeline::{
    ComputePipeline, PipelineKey, PipelineKind, PipelineRegistry, PipelineRegistryBuilder,
    RenderPipeline, Technique, WORLD_PIPELINE_COUNT, WorldVariant,
};
pub use render_state::RenderState;
pub use resources::{
    Buffer, BufferSlice, FAN_INDEX_BUFFER_VERTICES, GpuResource, MeshPrivateData, RingBuffer,
    RingRegion, Sampler, SamplerSet, StagingAllocator, StagingKind, Texture, TexturePrivateData,
    TransientAllocation,
};
pub use types::{
    BufferDescriptor, BufferUsage, Extent2d, IndexFormat, SamplerDescriptor, SamplerKind,
    TextureDescriptor, TextureFormat, TextureUsage, Viewport,
};
pub use uniforms::{GlobalUniforms, PUSH_CONSTANT_FLOATS, PushConstants, UniformBlock};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// Logs the library versions. Call once at startup.
pub fn init() {
    lumen_core::init();
    log::info!("Lumen Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_dummy_backend() {
        let backend = DummyBackend::new();
        assert_eq!(backend.name(), "Dummy Backend");
    }
}
