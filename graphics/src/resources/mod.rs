//! GPU resources.
//!
//! This module contains the GPU resource types that are created by [`GraphicsDevice`]:
//! - [`Buffer`] - GPU memory buffer
//! - [`Texture`] - GPU texture/image
//! - [`Sampler`] - Texture sampler, and the fixed [`SamplerSet`]
//! - [`RingBuffer`] - Linear allocator over one GPU buffer
//! - [`StagingAllocator`] - Frame-scoped transient memory, one ring per kind and slot
//!
//! Buffers, textures and samplers are all [`GpuResource`]s: an [`Arc`]-shared
//! backend handle plus its descriptor, with a weak link to the device.
//!
//! [`GraphicsDevice`]: crate::GraphicsDevice
//! [`Arc`]: std::sync::Arc

mod buffer;
mod fan_index;
mod private_data;
mod resource;
mod ring_buffer;
mod sampler;
mod staging;
mod texture;

pub use buffer::Buffer;
pub use fan_index::{
    FAN_INDEX_BUFFER_VERTICES, create_fan_index_buffer, fan_index_count, fan_indices,
};
pub use private_data::{MeshPrivateData, TexturePrivateData};
pub use resource::{GpuResource, ResourceDescriptor};
pub use ring_buffer::{RingBuffer, RingRegion};
pub use sampler::{Sampler, SamplerSet};
pub use staging::{BufferSlice, StagingAllocator, StagingKind, TransientAllocation};
pub use texture::Texture;
