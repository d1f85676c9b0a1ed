//! GPU backend abstraction layer.
//!
//! The render state never talks to a GPU API directly. Everything it needs
//! from the device goes through the [`GpuBackend`] trait:
//! - resource creation (buffers, textures, samplers)
//! - host writes into buffer memory
//! - command buffer creation and submission with a completion callback
//!
//! # Available Backends
//!
//! - [`DummyBackend`]: records submissions in memory, for testing and headless runs

pub mod dummy;

pub use dummy::{CompletionMode, DummyBackend, DummyBackendConfig};

use crate::command::GpuCommand;
use crate::device::DeviceCapabilities;
use crate::error::GraphicsError;
use crate::types::{BufferDescriptor, SamplerDescriptor, TextureDescriptor};

/// Opaque handle to an object owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuHandle(u64);

impl GpuHandle {
    /// Wrap a raw backend identifier.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw backend identifier.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Health of the device as last reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceStatus {
    Ready,
    Lost,
}

/// Outcome of a submitted command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionStatus {
    /// The GPU finished executing the command buffer.
    Completed,
    /// The device was lost before the command buffer finished.
    DeviceLost,
}

/// Callback invoked exactly once when a submission retires.
///
/// Backends may call it from any thread, including from inside
/// [`GpuBackend::submit`] itself.
pub type CompletionCallback = Box<dyn FnOnce(CompletionStatus) + Send + 'static>;

/// A closed command buffer handed to the backend for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Command buffer created by [`GpuBackend::create_command_buffer`].
    pub command_buffer: GpuHandle,
    /// Debug label of the command buffer.
    pub label: String,
    /// Frame the command buffer was recorded for.
    pub frame_index: u64,
    /// Recorded commands in encoding order.
    pub commands: Vec<GpuCommand>,
}

impl Submission {
    /// Number of state-binding commands in this submission.
    pub fn bind_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_state_bind()).count()
    }
}

/// Trait implemented by GPU backends.
pub trait GpuBackend: Send + Sync + 'static {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Limits and features of the device.
    fn capabilities(&self) -> DeviceCapabilities;

    /// Current device health.
    fn status(&self) -> DeviceStatus;

    /// Create a buffer resource.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuHandle, GraphicsError>;

    /// Create a texture resource.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<GpuHandle, GraphicsError>;

    /// Create a sampler resource.
    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<GpuHandle, GraphicsError>;

    /// Write `data` into host-visible buffer memory at `offset`.
    fn write_buffer(&self, buffer: GpuHandle, offset: u64, data: &[u8])
    -> Result<(), GraphicsError>;

    /// Create an empty command buffer.
    fn create_command_buffer(&self, label: &str) -> Result<GpuHandle, GraphicsError>;

    /// Queue a closed command buffer for execution.
    ///
    /// On `Ok`, `on_complete` is invoked exactly once when the submission
    /// retires. On `Err`, it is dropped without being invoked.
    fn submit(
        &self,
        submission: Submission,
        on_complete: CompletionCallback,
    ) -> Result<(), GraphicsError>;
}
