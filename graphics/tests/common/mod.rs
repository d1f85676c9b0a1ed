//! Common utilities for render state integration tests.
//!
//! Every test builds its own [`TestContext`] on a fresh [`DummyBackend`], so
//! contexts never share state.

#![allow(dead_code)]

use std::sync::Arc;

use lumen_graphics::{
    CompletionMode, ComputePipeline, DummyBackend, DummyBackendConfig, Extent2d, GpuCommand,
    GpuHandle, GraphicsDevice, PipelineKey, PipelineKind, PipelineRegistry, RenderPipeline,
    RenderState, RenderStateConfig, StagingConfig, Submission, Texture, TextureDescriptor,
    TextureFormat, TextureUsage,
};

/// Surface size used by the test contexts.
pub const TEST_EXTENT: Extent2d = Extent2d::new(320, 240);

/// Install a test logger. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Build a complete catalog with fake handles starting at `first_handle`.
pub fn create_registry(first_handle: u64) -> PipelineRegistry {
    let mut builder = PipelineRegistry::builder();
    let mut next = first_handle;
    let mut handle = || {
        let handle = GpuHandle::from_raw(next);
        next += 1;
        handle
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
    builder.build().unwrap()
}

/// A render state on a dummy backend, with the backend kept for inspection.
pub struct TestContext {
    pub backend: Arc<DummyBackend>,
    pub device: Arc<GraphicsDevice>,
    pub state: RenderState,
}

impl TestContext {
    /// Context whose submissions retire immediately.
    pub fn new() -> Self {
        Self::with_config(CompletionMode::Immediate, StagingConfig::default())
    }

    /// Context whose submissions stay in flight until completed by the test.
    pub fn manual() -> Self {
        Self::with_config(CompletionMode::Manual, StagingConfig::default())
    }

    pub fn with_config(completion: CompletionMode, staging: StagingConfig) -> Self {
        init_logging();

        let backend = Arc::new(DummyBackend::with_config(
            DummyBackendConfig::new().with_completion_mode(completion),
        ));
        let device = GraphicsDevice::new(backend.clone()).unwrap();
        let config = RenderStateConfig::new(TEST_EXTENT)
            .with_validation(true)
            .with_staging(staging);
        let state = RenderState::new(Arc::clone(&device), create_registry(10_000), config).unwrap();

        Self {
            backend,
            device,
            state,
        }
    }

    /// A sampled 4x4 texture.
    pub fn create_texture(&self) -> Arc<Texture> {
        self.device
            .create_texture(&TextureDescriptor::new_2d(
                4,
                4,
                TextureFormat::Rgba8Unorm,
                TextureUsage::TEXTURE_BINDING,
            ))
            .unwrap()
    }

    /// The most recent submission.
    pub fn last_submission(&self) -> Submission {
        self.backend
            .last_submission()
            .expect("no submission recorded")
    }
}

/// Commands of `submission` matching `filter`.
pub fn commands_where(
    submission: &Submission,
    filter: impl Fn(&GpuCommand) -> bool,
) -> Vec<GpuCommand> {
    submission
        .commands
        .iter()
        .filter(|c| filter(c))
        .cloned()
        .collect()
}
