//! Sampler types and descriptors.

/// Texel filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

/// Behavior for texture coordinates outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    #[default]
    Repeat,
    ClampToEdge,
}

/// Descriptor for creating a sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDescriptor {
    /// Debug label for the sampler.
    pub label: Option<String>,
    /// Address mode for all coordinates.
    pub address_mode: AddressMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Mipmap filter.
    pub mipmap_filter: FilterMode,
    /// Maximum LOD clamp.
    pub lod_max_clamp: f32,
    /// Maximum anisotropy level. 1 disables anisotropic filtering.
    pub anisotropy_clamp: u16,
}

impl SamplerDescriptor {
    /// Create a new sampler descriptor with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a linear filtering sampler.
    pub fn linear() -> Self {
        Self {
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: FilterMode::Linear,
            ..Default::default()
        }
    }

    /// Create a nearest neighbor filtering sampler.
    ///
    /// Mip levels are still blended linearly.
    pub fn nearest() -> Self {
        Self {
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            mipmap_filter: FilterMode::Linear,
            ..Default::default()
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set address mode for all coordinates.
    pub fn with_address_mode(mut self, mode: AddressMode) -> Self {
        self.address_mode = mode;
        self
    }

    /// Set anisotropic filtering level.
    pub fn with_anisotropy(mut self, level: u16) -> Self {
        self.anisotropy_clamp = level;
        self
    }
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            address_mode: AddressMode::Repeat,
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            mipmap_filter: FilterMode::Nearest,
            lod_max_clamp: 32.0,
            anisotropy_clamp: 1,
        }
    }
}

/// The fixed sampler configurations the render state creates at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    Point,
    PointAniso,
    Linear,
    LinearAniso,
}

impl SamplerKind {
    /// Every kind, in creation order.
    pub const ALL: [SamplerKind; 4] = [
        SamplerKind::Point,
        SamplerKind::PointAniso,
        SamplerKind::Linear,
        SamplerKind::LinearAniso,
    ];

    /// Whether this kind uses anisotropic filtering.
    pub const fn is_anisotropic(self) -> bool {
        matches!(self, Self::PointAniso | Self::LinearAniso)
    }

    /// Short name used for labels.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::PointAniso => "point_aniso",
            Self::Linear => "linear",
            Self::LinearAniso => "linear_aniso",
        }
    }

    /// Descriptor for this kind, given the anisotropy level to use.
    pub fn descriptor(self, anisotropy: u16) -> SamplerDescriptor {
        let base = match self {
            Self::Point | Self::PointAniso => SamplerDescriptor::nearest(),
            Self::Linear | Self::LinearAniso => SamplerDescriptor::linear(),
        };
        let level = if self.is_anisotropic() {
            anisotropy.max(1)
        } else {
            1
        };
        base.with_label(self.name()).with_anisotropy(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_kind_descriptors() {
        let point = SamplerKind::Point.descriptor(16);
        assert_eq!(point.mag_filter, FilterMode::Nearest);
        assert_eq!(point.anisotropy_clamp, 1);

        let linear_aniso = SamplerKind::LinearAniso.descriptor(16);
        assert_eq!(linear_aniso.mag_filter, FilterMode::Linear);
        assert_eq!(linear_aniso.anisotropy_clamp, 16);
        assert_eq!(linear_aniso.label.as_deref(), Some("linear_aniso"));

        assert_eq!(SamplerKind::PointAniso.descriptor(0).anisotropy_clamp, 1);
    }
}
