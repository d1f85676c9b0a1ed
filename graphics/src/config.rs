//! Render state configuration.
//!
//! Plain builder-style structs: start from `new()` (or `Default`) and refine
//! with `with_*` methods.
//!
//! ```ignore
//! let config = RenderStateConfig::new(Extent2d::new(1280, 720))
//!     .with_clear_color([0.0, 0.0, 0.0, 1.0])
//!     .with_staging(StagingConfig::default().with_budget(StagingKind::Vertex, 8 << 20));
//! ```

use crate::resources::StagingKind;
use crate::types::{Extent2d, TextureFormat};

/// Per-frame byte budget of each staging ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StagingConfig {
    /// Vertex bytes available per frame.
    pub vertex_budget: u64,
    /// Index bytes available per frame.
    pub index_budget: u64,
    /// Uniform bytes available per frame.
    pub uniform_budget: u64,
}

impl StagingConfig {
    /// Default vertex budget (4 MiB).
    pub const DEFAULT_VERTEX_BUDGET: u64 = 4 * 1024 * 1024;
    /// Default index budget (1 MiB).
    pub const DEFAULT_INDEX_BUDGET: u64 = 1024 * 1024;
    /// Default uniform budget (1 MiB).
    pub const DEFAULT_UNIFORM_BUDGET: u64 = 1024 * 1024;

    /// Create a config with the default budgets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the budget for one kind.
    pub fn with_budget(mut self, kind: StagingKind, bytes: u64) -> Self {
        match kind {
            StagingKind::Vertex => self.vertex_budget = bytes,
            StagingKind::Index => self.index_budget = bytes,
            StagingKind::Uniform => self.uniform_budget = bytes,
        }
        self
    }

    /// Budget for `kind`.
    pub fn budget(&self, kind: StagingKind) -> u64 {
        match kind {
            StagingKind::Vertex => self.vertex_budget,
            StagingKind::Index => self.index_budget,
            StagingKind::Uniform => self.uniform_budget,
        }
    }
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            vertex_budget: Self::DEFAULT_VERTEX_BUDGET,
            index_budget: Self::DEFAULT_INDEX_BUDGET,
            uniform_budget: Self::DEFAULT_UNIFORM_BUDGET,
        }
    }
}

/// Configuration of a [`RenderState`](crate::RenderState).
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStateConfig {
    /// Size of the frame color and depth targets.
    pub extent: Extent2d,
    /// Format of the per-slot color targets.
    pub color_format: TextureFormat,
    /// Format of the shared depth target.
    pub depth_format: TextureFormat,
    /// Clear color applied when a render encoder targets the frame color buffer.
    pub clear_color: [f32; 4],
    /// Preferred anisotropy level for the anisotropic samplers.
    pub anisotropy: u16,
    /// Log every encoded command at trace level.
    pub validation: bool,
    /// Staging ring budgets.
    pub staging: StagingConfig,
}

impl RenderStateConfig {
    /// Create a config for a surface of the given size.
    pub fn new(extent: Extent2d) -> Self {
        Self {
            extent,
            ..Default::default()
        }
    }

    /// Set the color target format.
    pub fn with_color_format(mut self, format: TextureFormat) -> Self {
        self.color_format = format;
        self
    }

    /// Set the depth target format.
    pub fn with_depth_format(mut self, format: TextureFormat) -> Self {
        self.depth_format = format;
        self
    }

    /// Set the clear color.
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Set the preferred anisotropy level.
    pub fn with_anisotropy(mut self, level: u16) -> Self {
        self.anisotropy = level;
        self
    }

    /// Enable or disable command validation logging.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validation = enabled;
        self
    }

    /// Set the staging budgets.
    pub fn with_staging(mut self, staging: StagingConfig) -> Self {
        self.staging = staging;
        self
    }
}

impl Default for RenderStateConfig {
    fn default() -> Self {
        Self {
            extent: Extent2d::new(1280, 720),
            color_format: TextureFormat::Bgra8Unorm,
            depth_format: TextureFormat::Depth32Float,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            anisotropy: 16,
            validation: false,
            staging: StagingConfig::default(),
        }
    }
}
