//! Catalog of precompiled pipelines.
//!
//! Pipelines are compiled elsewhere and arrive as opaque backend handles.
//! [`PipelineRegistryBuilder`] collects them once at startup; the resulting
//! [`PipelineRegistry`] is immutable and complete, so every lookup with a
//! valid [`PipelineKey`] succeeds.
//!
//! # Example
//!
//! ```ignore
//! let mut builder = PipelineRegistry::builder();
//! for key in PipelineKey::all() {
//!     match key.technique.kind() {
//!         PipelineKind::Render => builder.insert_render(key, compile_render(key))?,
//!         PipelineKind::Compute => builder.insert_compute(key.technique, compile_compute(key))?,
//!     }
//! }
//! let registry = builder.build()?;
//! let world = registry.world(WorldVariant::FULLBRIGHT)?;
//! ```

mod technique;

pub use technique::{PipelineKey, PipelineKind, Technique, WORLD_PIPELINE_COUNT, WorldVariant};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::backend::GpuHandle;
use crate::error::GraphicsError;

/// A compiled draw pipeline: draw state plus depth/stencil state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPipeline {
    label: String,
    state: GpuHandle,
    depth_state: GpuHandle,
}

impl RenderPipeline {
    pub fn new(label: impl Into<String>, state: GpuHandle, depth_state: GpuHandle) -> Self {
        Self {
            label: label.into(),
            state,
            depth_state,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Draw-state handle.
    pub fn state(&self) -> GpuHandle {
        self.state
    }

    /// Depth/stencil-state handle.
    pub fn depth_state(&self) -> GpuHandle {
        self.depth_state
    }
}

/// A compiled compute pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputePipeline {
    label: String,
    state: GpuHandle,
}

impl ComputePipeline {
    pub fn new(label: impl Into<String>, state: GpuHandle) -> Self {
        Self {
            label: label.into(),
            state,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> GpuHandle {
        self.state
    }
}

/// Collects pipelines before freezing them into a [`PipelineRegistry`].
#[derive(Debug, Default)]
pub struct PipelineRegistryBuilder {
    render: HashMap<PipelineKey, Arc<RenderPipeline>>,
    compute: HashMap<Technique, Arc<ComputePipeline>>,
}

impl PipelineRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the render pipeline for `key`, replacing any previous one.
    pub fn insert_render(
        &mut self,
        key: PipelineKey,
        pipeline: RenderPipeline,
    ) -> Result<&mut Self, GraphicsError> {
        let key = key.validate(PipelineKind::Render)?;
        if self.render.insert(key, Arc::new(pipeline)).is_some() {
            log::warn!("Render pipeline {} registered twice", key);
        }
        Ok(self)
    }

    /// Register the compute pipeline for `technique`.
    pub fn insert_compute(
        &mut self,
        technique: Technique,
        pipeline: ComputePipeline,
    ) -> Result<&mut Self, GraphicsError> {
        PipelineKey::new(technique, 0).validate(PipelineKind::Compute)?;
        if self.compute.insert(technique, Arc::new(pipeline)).is_some() {
            log::warn!("Compute pipeline {} registered twice", technique);
        }
        Ok(self)
    }

    /// Freeze the catalog.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::MissingPipeline`] naming the first empty slot.
    pub fn build(self) -> Result<PipelineRegistry, GraphicsError> {
        for key in PipelineKey::all() {
            let present = match key.technique.kind() {
                PipelineKind::Render => self.render.contains_key(&key),
                PipelineKind::Compute => self.compute.contains_key(&key.technique),
            };
            if !present {
                return Err(GraphicsError::MissingPipeline(key.to_string()));
            }
        }

        log::debug!(
            "Pipeline registry built: {} render, {} compute",
            self.render.len(),
            self.compute.len()
        );

        Ok(PipelineRegistry {
            render: self.render,
            compute: self.compute,
        })
    }
}

/// Immutable catalog of every pipeline, keyed by technique and variant.
pub struct PipelineRegistry {
    render: HashMap<PipelineKey, Arc<RenderPipeline>>,
    compute: HashMap<Technique, Arc<ComputePipeline>>,
}

impl PipelineRegistry {
    pub fn builder() -> PipelineRegistryBuilder {
        PipelineRegistryBuilder::new()
    }

    /// Render pipeline for `technique` and `variant`.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::InvalidTechnique`] if the technique is a compute
    /// technique or has no such variant.
    pub fn render(
        &self,
        technique: Technique,
        variant: u8,
    ) -> Result<&Arc<RenderPipeline>, GraphicsError> {
        let key = PipelineKey::new(technique, variant).validate(PipelineKind::Render)?;
        self.render
            .get(&key)
            .ok_or_else(|| GraphicsError::MissingPipeline(key.to_string()))
    }

    /// World-surface pipeline for a feature combination.
    pub fn world(&self, variant: WorldVariant) -> Result<&Arc<RenderPipeline>, GraphicsError> {
        self.render(Technique::World, variant.index())
    }

    /// Compute pipeline for `technique`.
    pub fn compute(&self, technique: Technique) -> Result<&Arc<ComputePipeline>, GraphicsError> {
        let key = PipelineKey::new(technique, 0).validate(PipelineKind::Compute)?;
        self.compute
            .get(&key.technique)
            .ok_or_else(|| GraphicsError::MissingPipeline(key.to_string()))
    }

    /// Total number of pipelines.
    pub fn len(&self) -> usize {
        self.render.len() + self.compute.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for PipelineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineRegistry")
            .field("render", &self.render.len())
            .field("compute", &self.compute.len())
            .finish()
    }
}

static_assertions::assert_impl_all!(PipelineRegistry: Send, Sync);

/// Builder with every slot filled by sequential fake handles.
#[cfg(test)]
pub(crate) fn test_registry_builder() -> PipelineRegistryBuilder {
    let mut builder = PipelineRegistry::builder();
    let mut next = 1000u64;
    let mut handle = || {
        next += 1;
        GpuHandle::from_raw(next)
    };
    for key in PipelineKey::all() {
        match key.technique.kind() {
            PipelineKind::Render => {
                let pipeline = RenderPipeline::new(key.to_string(), handle(), handle());
                builder.insert_render(key, pipeline).unwrap();
            }
            PipelineKind::Compute => {
                let pipeline = ComputePipeline::new(key.to_string(), handle());
                builder.insert_compute(key.technique, pipeline).unwrap();
            }
        }
    }
    builder
}

#[cfg(test)]
pub(crate) fn test_registry() -> PipelineRegistry {
    test_registry_builder().build().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_catalog_builds() {
        let registry = test_registry();
        assert_eq!(registry.len(), PipelineKey::all().count());
    }

    #[test]
    fn test_missing_pipeline() {
        let mut builder = PipelineRegistry::builder();
        builder
            .insert_render(
                PipelineKey::new(Technique::BasicAlphaTest, 0),
                RenderPipeline::new("a", GpuHandle::from_raw(1), GpuHandle::from_raw(2)),
            )
            .unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            GraphicsError::MissingPipeline("basic_alphatest[1]".to_string())
        );
    }

    #[test]
    fn test_lookup() {
        let registry = test_registry();
        let sprite = registry.render(Technique::Sprite, 0).unwrap();
        assert_eq!(sprite.label(), "sprite");
        assert_ne!(sprite.state(), sprite.depth_state());

        let world = registry
            .world(WorldVariant::ALPHA_TEST | WorldVariant::DITHER)
            .unwrap();
        assert_eq!(world.label(), "world[10]");

        let warp = registry.compute(Technique::CsTexWarpCompute).unwrap();
        assert_eq!(warp.label(), "cs_tex_warp_compute");
    }

    #[test]
    fn test_lookup_is_stable() {
        let registry = test_registry();
        let a = registry.render(Technique::Water, 0).unwrap();
        let b = registry.render(Technique::Water, 0).unwrap();
        assert!(Arc::ptr_eq(a, b));
    }

    #[test]
    fn test_invalid_lookups() {
        let registry = test_registry();
        assert!(matches!(
            registry.render(Technique::BasicPolyBlend, 1),
            Err(GraphicsError::InvalidTechnique(_))
        ));
        assert!(matches!(
            registry.render(Technique::ScreenWarpCompute, 0),
            Err(GraphicsError::InvalidTechnique(_))
        ));
        assert!(matches!(
            registry.compute(Technique::ScreenWarp),
            Err(GraphicsError::InvalidTechnique(_))
        ));
    }

    #[test]
    fn test_insert_rejects_invalid_key() {
        let mut builder = PipelineRegistry::builder();
        let result = builder.insert_render(
            PipelineKey::new(Technique::World, WORLD_PIPELINE_COUNT),
            RenderPipeline::new("w", GpuHandle::from_raw(1), GpuHandle::from_raw(2)),
        );
        assert!(result.is_err());
    }
}
