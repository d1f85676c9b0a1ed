//! Encoder kinds, encoder descriptors and the recorded command set.

use std::fmt;
use std::sync::Arc;

use crate::backend::GpuHandle;
use crate::binding::VertexBufferSlot;
use crate::resources::Texture;
use crate::types::{IndexFormat, Viewport};

/// Kind of encoder scope within a command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderKind {
    /// Rasterization: draws, vertex buffers, viewport.
    Render,
    /// Compute dispatches.
    Compute,
    /// Buffer copies.
    Blit,
}

impl EncoderKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Compute => "compute",
            Self::Blit => "blit",
        }
    }
}

impl fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Polygon rasterization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TriangleFillMode {
    #[default]
    Fill,
    /// Draw triangle edges only.
    Lines,
}

// ============================================================================
// Encoder Descriptors
// ============================================================================

/// Targets and clear values of a render encoder.
#[derive(Debug, Clone)]
pub struct RenderPassDescriptor {
    /// Debug label.
    pub label: String,
    /// Color attachment.
    pub color_target: Arc<Texture>,
    /// Optional depth attachment.
    pub depth_target: Option<Arc<Texture>>,
    /// Clear color, or `None` to keep existing contents.
    pub clear_color: Option<[f32; 4]>,
    /// Clear depth, or `None` to keep existing contents.
    pub clear_depth: Option<f32>,
}

impl RenderPassDescriptor {
    /// Render into `color_target`, keeping its contents.
    pub fn new(label: impl Into<String>, color_target: Arc<Texture>) -> Self {
        Self {
            label: label.into(),
            color_target,
            depth_target: None,
            clear_color: None,
            clear_depth: None,
        }
    }

    /// Attach a depth target.
    pub fn with_depth_target(mut self, depth_target: Arc<Texture>) -> Self {
        self.depth_target = Some(depth_target);
        self
    }

    /// Clear the color target on load.
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = Some(color);
        self
    }

    /// Clear the depth target on load.
    pub fn with_clear_depth(mut self, depth: f32) -> Self {
        self.clear_depth = Some(depth);
        self
    }
}

/// What kind of encoder to open, and how.
#[derive(Debug, Clone)]
pub enum EncoderDescriptor {
    Render(RenderPassDescriptor),
    Compute { label: String },
    Blit { label: String },
}

impl EncoderDescriptor {
    pub fn compute(label: impl Into<String>) -> Self {
        Self::Compute {
            label: label.into(),
        }
    }

    pub fn blit(label: impl Into<String>) -> Self {
        Self::Blit {
            label: label.into(),
        }
    }

    pub fn kind(&self) -> EncoderKind {
        match self {
            Self::Render(_) => EncoderKind::Render,
            Self::Compute { .. } => EncoderKind::Compute,
            Self::Blit { .. } => EncoderKind::Blit,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Render(desc) => &desc.label,
            Self::Compute { label } | Self::Blit { label } => label,
        }
    }

    /// The command that opens this encoder.
    pub(crate) fn begin_command(&self) -> GpuCommand {
        match self {
            Self::Render(desc) => GpuCommand::BeginRenderEncoder {
                label: desc.label.clone(),
                color_target: desc.color_target.handle(),
                depth_target: desc.depth_target.as_ref().map(|t| t.handle()),
                clear_color: desc.clear_color,
                clear_depth: desc.clear_depth,
            },
            Self::Compute { label } => GpuCommand::BeginComputeEncoder {
                label: label.clone(),
            },
            Self::Blit { label } => GpuCommand::BeginBlitEncoder {
                label: label.clone(),
            },
        }
    }
}

impl From<RenderPassDescriptor> for EncoderDescriptor {
    fn from(desc: RenderPassDescriptor) -> Self {
        Self::Render(desc)
    }
}

// ============================================================================
// Recorded Commands
// ============================================================================

/// A byte range copy between two buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferCopyRegion {
    /// Offset in bytes into the source buffer.
    pub src_offset: u64,
    /// Offset in bytes into the destination buffer.
    pub dst_offset: u64,
    /// Number of bytes to copy.
    pub size: u64,
}

impl BufferCopyRegion {
    pub fn new(src_offset: u64, dst_offset: u64, size: u64) -> Self {
        Self {
            src_offset,
            dst_offset,
            size,
        }
    }
}

const NONE: &[EncoderKind] = &[];
const RENDER: &[EncoderKind] = &[EncoderKind::Render];
const COMPUTE: &[EncoderKind] = &[EncoderKind::Compute];
const BLIT: &[EncoderKind] = &[EncoderKind::Blit];
const RENDER_OR_COMPUTE: &[EncoderKind] = &[EncoderKind::Render, EncoderKind::Compute];

/// One command recorded into a command buffer.
///
/// Resources are referenced by backend handle so a recorded command buffer
/// is plain data.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    BeginRenderEncoder {
        label: String,
        color_target: GpuHandle,
        depth_target: Option<GpuHandle>,
        clear_color: Option<[f32; 4]>,
        clear_depth: Option<f32>,
    },
    BeginComputeEncoder {
        label: String,
    },
    BeginBlitEncoder {
        label: String,
    },
    EndEncoder,
    /// Draw state and depth/stencil state of a render pipeline, set together.
    SetRenderPipeline {
        state: GpuHandle,
        depth_state: GpuHandle,
    },
    SetComputePipeline {
        state: GpuHandle,
    },
    SetTexture {
        slot: u32,
        texture: GpuHandle,
    },
    SetSampler {
        slot: u32,
        sampler: GpuHandle,
    },
    SetVertexBuffer {
        slot: VertexBufferSlot,
        buffer: GpuHandle,
        offset: u64,
    },
    SetViewport(Viewport),
    SetTriangleFillMode(TriangleFillMode),
    Draw {
        vertex_start: u32,
        vertex_count: u32,
        instance_count: u32,
    },
    DrawIndexed {
        index_buffer: GpuHandle,
        index_offset: u64,
        index_format: IndexFormat,
        index_count: u32,
        base_vertex: i32,
        instance_count: u32,
    },
    Dispatch {
        groups: [u32; 3],
        threads_per_group: [u32; 3],
    },
    CopyBuffer {
        src: GpuHandle,
        dst: GpuHandle,
        region: BufferCopyRegion,
    },
}

impl GpuCommand {
    /// Command name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BeginRenderEncoder { .. } => "begin_render_encoder",
            Self::BeginComputeEncoder { .. } => "begin_compute_encoder",
            Self::BeginBlitEncoder { .. } => "begin_blit_encoder",
            Self::EndEncoder => "end_encoder",
            Self::SetRenderPipeline { .. } => "set_render_pipeline",
            Self::SetComputePipeline { .. } => "set_compute_pipeline",
            Self::SetTexture { .. } => "set_texture",
            Self::SetSampler { .. } => "set_sampler",
            Self::SetVertexBuffer { .. } => "set_vertex_buffer",
            Self::SetViewport(_) => "set_viewport",
            Self::SetTriangleFillMode(_) => "set_triangle_fill_mode",
            Self::Draw { .. } => "draw",
            Self::DrawIndexed { .. } => "draw_indexed",
            Self::Dispatch { .. } => "dispatch",
            Self::CopyBuffer { .. } => "copy_buffer",
        }
    }

    /// Encoder kinds the command may be recorded in.
    ///
    /// Empty for the scope markers, which only the lifecycle itself records.
    pub fn valid_scopes(&self) -> &'static [EncoderKind] {
        match self {
            Self::BeginRenderEncoder { .. }
            | Self::BeginComputeEncoder { .. }
            | Self::BeginBlitEncoder { .. }
            | Self::EndEncoder => NONE,
            Self::SetRenderPipeline { .. }
            | Self::SetVertexBuffer { .. }
            | Self::SetViewport(_)
            | Self::SetTriangleFillMode(_)
            | Self::Draw { .. }
            | Self::DrawIndexed { .. } => RENDER,
            Self::SetComputePipeline { .. } | Self::Dispatch { .. } => COMPUTE,
            Self::SetTexture { .. } | Self::SetSampler { .. } => RENDER_OR_COMPUTE,
            Self::CopyBuffer { .. } => BLIT,
        }
    }

    /// Whether the command may be recorded in an encoder of `kind`.
    pub fn is_valid_in(&self, kind: EncoderKind) -> bool {
        self.valid_scopes().contains(&kind)
    }

    /// Whether the command changes pipeline, texture or sampler state.
    pub fn is_state_bind(&self) -> bool {
        matches!(
            self,
            Self::SetRenderPipeline { .. }
                | Self::SetComputePipeline { .. }
                | Self::SetTexture { .. }
                | Self::SetSampler { .. }
        )
    }

    /// Whether the command is a draw or dispatch.
    pub fn is_work(&self) -> bool {
        matches!(
            self,
            Self::Draw { .. } | Self::DrawIndexed { .. } | Self::Dispatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_scopes() {
        let draw = GpuCommand::Draw {
            vertex_start: 0,
            vertex_count: 3,
            instance_count: 1,
        };
        assert!(draw.is_valid_in(EncoderKind::Render));
        assert!(!draw.is_valid_in(EncoderKind::Compute));
        assert!(draw.is_work());

        let texture = GpuCommand::SetTexture {
            slot: 0,
            texture: GpuHandle::from_raw(1),
        };
        assert!(texture.is_valid_in(EncoderKind::Render));
        assert!(texture.is_valid_in(EncoderKind::Compute));
        assert!(!texture.is_valid_in(EncoderKind::Blit));
        assert!(texture.is_state_bind());

        let copy = GpuCommand::CopyBuffer {
            src: GpuHandle::from_raw(1),
            dst: GpuHandle::from_raw(2),
            region: BufferCopyRegion::new(0, 0, 16),
        };
        assert_eq!(copy.valid_scopes(), &[EncoderKind::Blit]);
        assert!(!copy.is_state_bind());

        assert!(GpuCommand::EndEncoder.valid_scopes().is_empty());
    }

    #[test]
    fn test_viewport_requires_render() {
        let command = GpuCommand::SetViewport(Viewport::new(0.0, 0.0, 64.0, 64.0));
        assert_eq!(command.name(), "set_viewport");
        assert!(!command.is_valid_in(EncoderKind::Blit));
    }

    #[test]
    fn test_encoder_kind_display() {
        assert_eq!(EncoderKind::Compute.to_string(), "compute");
        assert_eq!(EncoderDescriptor::blit("copy").kind(), EncoderKind::Blit);
    }
}
