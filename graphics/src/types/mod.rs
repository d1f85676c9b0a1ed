//! Common types and descriptors for graphics resources.
//!
//! Format enums, usage flags and descriptor structs used throughout the
//! render state.

mod buffer;
mod common;
mod sampler;
mod texture;

pub use buffer::{BufferDescriptor, BufferUsage, IndexFormat};
pub use common::{Extent2d, Viewport};
pub use sampler::{AddressMode, FilterMode, SamplerDescriptor, SamplerKind};
pub use texture::{TextureDescriptor, TextureFormat, TextureUsage};
