//! Rendering techniques and their variants.

use std::fmt;

use bitflags::bitflags;

use crate::error::GraphicsError;

/// Number of world-surface pipeline variants, one per [`WorldVariant`] combination.
pub const WORLD_PIPELINE_COUNT: u8 = 16;

bitflags! {
    /// Feature bits selecting a world-surface pipeline.
    ///
    /// Every combination is a valid variant index below [`WORLD_PIPELINE_COUNT`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WorldVariant: u8 {
        /// Sample the fullbright texture.
        const FULLBRIGHT = 1 << 0;
        /// Discard fragments below the alpha threshold.
        const ALPHA_TEST = 1 << 1;
        /// Blend with the framebuffer.
        const ALPHA_BLEND = 1 << 2;
        /// Ordered dithering of the lit color.
        const DITHER = 1 << 3;
    }
}

impl WorldVariant {
    /// Variant index in the world pipeline table.
    pub const fn index(self) -> u8 {
        self.bits()
    }
}

/// Kind of GPU pipeline a technique is compiled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Render,
    Compute,
}

/// A named rendering technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Technique {
    BasicAlphaTest,
    BasicBlend,
    BasicNoTexBlend,
    BasicPolyBlend,
    World,
    Water,
    WaterBlend,
    RasterTexWarp,
    Particle,
    Sprite,
    SkyColor,
    SkyBox,
    SkyLayer,
    Alias,
    AliasBlend,
    AliasAlphaTest,
    Postprocess,
    ScreenWarp,
    CsTexWarp,
    ShowTris,
    ShowTrisDepthTest,
    ScreenWarpCompute,
    CsTexWarpCompute,
}

impl Technique {
    /// Every technique, render techniques first.
    pub const ALL: [Technique; 23] = [
        Technique::BasicAlphaTest,
        Technique::BasicBlend,
        Technique::BasicNoTexBlend,
        Technique::BasicPolyBlend,
        Technique::World,
        Technique::Water,
        Technique::WaterBlend,
        Technique::RasterTexWarp,
        Technique::Particle,
        Technique::Sprite,
        Technique::SkyColor,
        Technique::SkyBox,
        Technique::SkyLayer,
        Technique::Alias,
        Technique::AliasBlend,
        Technique::AliasAlphaTest,
        Technique::Postprocess,
        Technique::ScreenWarp,
        Technique::CsTexWarp,
        Technique::ShowTris,
        Technique::ShowTrisDepthTest,
        Technique::ScreenWarpCompute,
        Technique::CsTexWarpCompute,
    ];

    /// Stable snake_case name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::BasicAlphaTest => "basic_alphatest",
            Self::BasicBlend => "basic_blend",
            Self::BasicNoTexBlend => "basic_notex_blend",
            Self::BasicPolyBlend => "basic_poly_blend",
            Self::World => "world",
            Self::Water => "water",
            Self::WaterBlend => "water_blend",
            Self::RasterTexWarp => "raster_tex_warp",
            Self::Particle => "particle",
            Self::Sprite => "sprite",
            Self::SkyColor => "sky_color",
            Self::SkyBox => "sky_box",
            Self::SkyLayer => "sky_layer",
            Self::Alias => "alias",
            Self::AliasBlend => "alias_blend",
            Self::AliasAlphaTest => "alias_alphatest",
            Self::Postprocess => "postprocess",
            Self::ScreenWarp => "screen_warp",
            Self::CsTexWarp => "cs_tex_warp",
            Self::ShowTris => "showtris",
            Self::ShowTrisDepthTest => "showtris_depth_test",
            Self::ScreenWarpCompute => "screen_warp_compute",
            Self::CsTexWarpCompute => "cs_tex_warp_compute",
        }
    }

    /// Look a technique up by its [`name`](Self::name).
    pub fn from_name(name: &str) -> Result<Self, GraphicsError> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| GraphicsError::InvalidTechnique(format!("unknown technique '{name}'")))
    }

    /// Pipeline kind the technique compiles to.
    pub const fn kind(self) -> PipelineKind {
        match self {
            Self::ScreenWarpCompute | Self::CsTexWarpCompute => PipelineKind::Compute,
            _ => PipelineKind::Render,
        }
    }

    /// Number of variants the catalog holds for this technique.
    pub const fn variant_count(self) -> u8 {
        match self {
            Self::BasicAlphaTest | Self::BasicBlend | Self::BasicNoTexBlend => 2,
            Self::World => WORLD_PIPELINE_COUNT,
            _ => 1,
        }
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Catalog key: technique plus variant index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineKey {
    pub technique: Technique,
    pub variant: u8,
}

impl PipelineKey {
    pub const fn new(technique: Technique, variant: u8) -> Self {
        Self { technique, variant }
    }

    /// Check that the key names an existing catalog slot of `kind`.
    pub fn validate(self, kind: PipelineKind) -> Result<Self, GraphicsError> {
        if self.technique.kind() != kind {
            return Err(GraphicsError::InvalidTechnique(format!(
                "{} is a {:?} technique, not {:?}",
                self.technique,
                self.technique.kind(),
                kind
            )));
        }
        if self.variant >= self.technique.variant_count() {
            return Err(GraphicsError::InvalidTechnique(format!(
                "{} has {} variants, requested {}",
                self.technique,
                self.technique.variant_count(),
                self.variant
            )));
        }
        Ok(self)
    }

    /// Every catalog key, in technique order.
    pub fn all() -> impl Iterator<Item = PipelineKey> {
        Technique::ALL
            .into_iter()
            .flat_map(|t| (0..t.variant_count()).map(move |v| PipelineKey::new(t, v)))
    }
}

impl fmt::Display for PipelineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.technique.variant_count() > 1 {
            write!(f, "{}[{}]", self.technique, self.variant)
        } else {
            write!(f, "{}", self.technique)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for technique in Technique::ALL {
            assert_eq!(Technique::from_name(technique.name()), Ok(technique));
        }
    }

    #[test]
    fn test_unknown_name() {
        assert!(matches!(
            Technique::from_name("lava"),
            Err(GraphicsError::InvalidTechnique(_))
        ));
    }

    #[test]
    fn test_catalog_size() {
        // 3 techniques with 2 variants, 16 world variants, 19 single-variant techniques
        assert_eq!(PipelineKey::all().count(), 6 + 16 + 17 + 2);
        assert_eq!(
            Technique::ALL
                .iter()
                .filter(|t| t.kind() == PipelineKind::Compute)
                .count(),
            2
        );
    }

    #[test]
    fn test_world_variant_index() {
        let variant = WorldVariant::FULLBRIGHT | WorldVariant::ALPHA_BLEND;
        assert_eq!(variant.index(), 5);
        assert!(WorldVariant::all().index() < WORLD_PIPELINE_COUNT);
    }

    #[test]
    fn test_key_validation() {
        assert!(
            PipelineKey::new(Technique::BasicBlend, 1)
                .validate(PipelineKind::Render)
                .is_ok()
        );
        assert!(
            PipelineKey::new(Technique::BasicBlend, 2)
                .validate(PipelineKind::Render)
                .is_err()
        );
        assert!(
            PipelineKey::new(Technique::ScreenWarpCompute, 0)
                .validate(PipelineKind::Render)
                .is_err()
        );
    }

    #[test]
    fn test_key_display() {
        assert_eq!(PipelineKey::new(Technique::World, 3).to_string(), "world[3]");
        assert_eq!(PipelineKey::new(Technique::Sprite, 0).to_string(), "sprite");
    }
}
