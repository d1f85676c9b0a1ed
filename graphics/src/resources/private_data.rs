//! Renderer-side GPU objects attached to higher-level assets.

use std::sync::Arc;

use crate::resources::{Buffer, Sampler, Texture};
use crate::types::IndexFormat;

/// GPU objects behind a texture asset.
#[derive(Debug, Clone)]
pub struct TexturePrivateData {
    pub texture: Arc<Texture>,
    pub sampler: Arc<Sampler>,
}

impl TexturePrivateData {
    pub fn new(texture: Arc<Texture>, sampler: Arc<Sampler>) -> Self {
        Self { texture, sampler }
    }
}

/// GPU objects behind a static mesh asset.
#[derive(Debug, Clone)]
pub struct MeshPrivateData {
    pub vertex_buffer: Arc<Buffer>,
    pub index_buffer: Arc<Buffer>,
    pub index_format: IndexFormat,
}

impl MeshPrivateData {
    /// Mesh with 16-bit indices.
    pub fn new(vertex_buffer: Arc<Buffer>, index_buffer: Arc<Buffer>) -> Self {
        Self {
            vertex_buffer,
            index_buffer,
            index_format: IndexFormat::Uint16,
        }
    }

    /// Set the index format.
    pub fn with_index_format(mut self, format: IndexFormat) -> Self {
        self.index_format = format;
        self
    }

    /// Number of indices the index buffer holds.
    pub fn index_count(&self) -> u32 {
        (self.index_buffer.size() / self.index_format.size()) as u32
    }
}
