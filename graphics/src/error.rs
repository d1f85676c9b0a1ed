//! Graphics error types.

use thiserror::Error;

use crate::command::EncoderKind;
use crate::resources::StagingKind;

/// How the caller is expected to react to a [`GraphicsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The caller broke an API contract. The render path must abort.
    Programming,
    /// A per-frame budget ran out. The current batch may be dropped.
    ResourceExhausted,
    /// The device failed. The rendering subsystem has to be torn down.
    Device,
}

/// Errors that can occur in the graphics system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphicsError {
    /// A transient allocation did not fit in the current frame's region.
    #[error(
        "out of staging memory: {kind} request of {requested} bytes, {available} bytes left this frame"
    )]
    OutOfStagingMemory {
        kind: StagingKind,
        requested: u64,
        available: u64,
    },
    /// Texture or sampler slot outside the bindable range.
    #[error("binding slot {slot} out of range (max {max})")]
    InvalidSlot { slot: usize, max: usize },
    /// Unknown technique, or a variant index the technique does not have.
    #[error("invalid technique: {0}")]
    InvalidTechnique(String),
    /// A catalog entry was never registered.
    #[error("no pipeline registered for {0}")]
    MissingPipeline(String),
    /// The command buffer was already handed to the device.
    #[error("command buffer '{0}' was already submitted")]
    AlreadySubmitted(String),
    /// The operation needs a different encoder than the one currently open.
    #[error("{operation} is not valid with active encoder {active:?}")]
    EncoderMismatch {
        operation: &'static str,
        active: Option<EncoderKind>,
    },
    /// Frame or command-buffer lifecycle called out of order.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// A transient allocation was used after its frame ended.
    #[error("stale allocation from frame {allocated} used in frame {current}")]
    StaleAllocation { allocated: u64, current: u64 },
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// The GPU device was lost.
    #[error("GPU device lost")]
    DeviceLost,
    /// The device refused a submission.
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),
    /// The device could not create a command buffer.
    #[error("command buffer creation failed: {0}")]
    CommandBufferCreation(String),
    /// Out of GPU memory.
    #[error("out of GPU memory")]
    OutOfMemory,
    /// Failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreation(String),
}

impl GraphicsError {
    /// Classify the error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::OutOfStagingMemory { .. } => ErrorClass::ResourceExhausted,
            Self::InvalidSlot { .. }
            | Self::InvalidTechnique(_)
            | Self::MissingPipeline(_)
            | Self::AlreadySubmitted(_)
            | Self::EncoderMismatch { .. }
            | Self::InvalidState(_)
            | Self::StaleAllocation { .. }
            | Self::InvalidParameter(_) => ErrorClass::Programming,
            Self::DeviceLost
            | Self::SubmissionRejected(_)
            | Self::CommandBufferCreation(_)
            | Self::OutOfMemory
            | Self::ResourceCreation(_) => ErrorClass::Device,
        }
    }

    /// Whether the render path has to abort instead of skipping work.
    pub fn is_fatal(&self) -> bool {
        self.class() != ErrorClass::ResourceExhausted
    }
}
