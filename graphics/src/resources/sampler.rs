//! GPU sampler resource and the fixed sampler set.

use std::sync::Arc;

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::types::{SamplerDescriptor, SamplerKind};

use super::resource::{GpuResource, ResourceDescriptor};

/// A texture sampler, created by [`GraphicsDevice::create_sampler`].
pub type Sampler = GpuResource<SamplerDescriptor>;

impl ResourceDescriptor for SamplerDescriptor {
    const KIND: &'static str = "Sampler";

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

static_assertions::assert_impl_all!(Sampler: Send, Sync);

/// The four samplers every frame draws with, created once at startup.
///
/// Without device anisotropy support the anisotropic kinds share the `Arc`
/// of their plain counterpart, so binding either one deduplicates.
pub struct SamplerSet {
    point: Arc<Sampler>,
    point_aniso: Arc<Sampler>,
    linear: Arc<Sampler>,
    linear_aniso: Arc<Sampler>,
}

impl SamplerSet {
    /// Create the sampler set.
    ///
    /// `anisotropy` is the preferred level; it is clamped to the device limit.
    pub fn new(device: &Arc<GraphicsDevice>, anisotropy: u16) -> Result<Self, GraphicsError> {
        let caps = device.capabilities();
        let point = device.create_sampler(&SamplerKind::Point.descriptor(1))?;
        let linear = device.create_sampler(&SamplerKind::Linear.descriptor(1))?;

        let level = anisotropy.min(caps.max_anisotropy);
        let (point_aniso, linear_aniso) = if caps.supports_anisotropy() && level > 1 {
            (
                device.create_sampler(&SamplerKind::PointAniso.descriptor(level))?,
                device.create_sampler(&SamplerKind::LinearAniso.descriptor(level))?,
            )
        } else {
            log::warn!("Anisotropic filtering unavailable, using plain samplers instead");
            (Arc::clone(&point), Arc::clone(&linear))
        };

        log::debug!("Created sampler set (anisotropy {})", level.max(1));

        Ok(Self {
            point,
            point_aniso,
            linear,
            linear_aniso,
        })
    }

    /// Get the sampler for `kind`.
    pub fn get(&self, kind: SamplerKind) -> &Arc<Sampler> {
        match kind {
            SamplerKind::Point => &self.point,
            SamplerKind::PointAniso => &self.point_aniso,
            SamplerKind::Linear => &self.linear,
            SamplerKind::LinearAniso => &self.linear_aniso,
        }
    }
}

impl std::fmt::Debug for SamplerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerSet")
            .field("anisotropic", &!Arc::ptr_eq(&self.point, &self.point_aniso))
            .finish()
    }
}
