//! Command buffer and encoder lifecycle.
//!
//! A frame records into exactly one command buffer. Within it, encoder
//! scopes of one kind at a time hold the actual commands:
//!
//! ```text
//! Idle ──open──► BufferOpen ──begin_encoder──► Encoding(kind)
//!                   ▲    │                          │
//!                   │    │                     end_encoder
//!                   │    │                          │
//!                   │    ◄──────────────────────────┘
//!                   │    │
//!                   │  close
//!                   │    ▼
//!                   │  Closed ──submit──► Submitted ──open──► BufferOpen
//!                   │
//!                 abandon (from any state) ──► Idle
//! ```
//!
//! [`CommandEncoderLifecycle`] is a pure state machine over recorded
//! [`GpuCommand`]s; the render state drives it together with the binding
//! cache.

mod commands;

pub use commands::{
    BufferCopyRegion, EncoderDescriptor, EncoderKind, GpuCommand, RenderPassDescriptor,
    TriangleFillMode,
};

use crate::backend::{CompletionCallback, GpuBackend, GpuHandle, Submission};
use crate::error::GraphicsError;

/// State of the frame's command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandBufferState {
    /// No command buffer.
    Idle,
    /// Command buffer open, no encoder active.
    BufferOpen,
    /// An encoder of the given kind is recording.
    Encoding(EncoderKind),
    /// Recording finished, ready to submit.
    Closed,
    /// Handed to the device. Terminal until the next `open`.
    Submitted,
}

/// Tracks the active command buffer and its encoder scopes.
#[derive(Debug)]
pub struct CommandEncoderLifecycle {
    state: CommandBufferState,
    command_buffer: Option<GpuHandle>,
    label: String,
    frame_index: u64,
    commands: Vec<GpuCommand>,
    encoder_count: u32,
}

impl CommandEncoderLifecycle {
    pub fn new() -> Self {
        Self {
            state: CommandBufferState::Idle,
            command_buffer: None,
            label: String::new(),
            frame_index: 0,
            commands: Vec::new(),
            encoder_count: 0,
        }
    }

    /// Create a command buffer for frame `frame_index`.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::CommandBufferCreation`] if the backend fails,
    /// [`GraphicsError::InvalidState`] if a buffer is still being recorded.
    pub fn open(
        &mut self,
        backend: &dyn GpuBackend,
        label: &str,
        frame_index: u64,
    ) -> Result<GpuHandle, GraphicsError> {
        match self.state {
            CommandBufferState::Idle | CommandBufferState::Submitted => {}
            state => {
                return Err(GraphicsError::InvalidState(format!(
                    "cannot open command buffer '{label}' while '{}' is {state:?}",
                    self.label
                )));
            }
        }

        let handle = backend
            .create_command_buffer(label)
            .map_err(|e| GraphicsError::CommandBufferCreation(e.to_string()))?;

        log::trace!("Opened command buffer '{}' for frame {}", label, frame_index);

        self.state = CommandBufferState::BufferOpen;
        self.command_buffer = Some(handle);
        self.label = label.to_string();
        self.frame_index = frame_index;
        self.commands.clear();
        self.encoder_count = 0;
        Ok(handle)
    }

    /// Open an encoder scope.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::EncoderMismatch`] if another encoder is still open,
    /// [`GraphicsError::InvalidState`] without an open command buffer.
    pub fn begin_encoder(&mut self, descriptor: &EncoderDescriptor) -> Result<(), GraphicsError> {
        match self.state {
            CommandBufferState::BufferOpen => {}
            CommandBufferState::Encoding(active) => {
                return Err(GraphicsError::EncoderMismatch {
                    operation: "begin_encoder",
                    active: Some(active),
                });
            }
            state => {
                return Err(GraphicsError::InvalidState(format!(
                    "begin_encoder '{}' with command buffer {state:?}",
                    descriptor.label()
                )));
            }
        }

        let kind = descriptor.kind();
        log::trace!("Begin {} encoder '{}'", kind, descriptor.label());
        self.commands.push(descriptor.begin_command());
        self.state = CommandBufferState::Encoding(kind);
        self.encoder_count += 1;
        Ok(())
    }

    /// Close the active encoder scope and return its kind.
    pub fn end_encoder(&mut self) -> Result<EncoderKind, GraphicsError> {
        let CommandBufferState::Encoding(kind) = self.state else {
            return Err(GraphicsError::EncoderMismatch {
                operation: "end_encoder",
                active: None,
            });
        };

        log::trace!("End {} encoder", kind);
        self.commands.push(GpuCommand::EndEncoder);
        self.state = CommandBufferState::BufferOpen;
        Ok(kind)
    }

    /// Check that the active encoder is one of `allowed`.
    pub fn require_encoder(
        &self,
        operation: &'static str,
        allowed: &[EncoderKind],
    ) -> Result<EncoderKind, GraphicsError> {
        match self.state {
            CommandBufferState::Encoding(kind) if allowed.contains(&kind) => Ok(kind),
            CommandBufferState::Encoding(kind) => Err(GraphicsError::EncoderMismatch {
                operation,
                active: Some(kind),
            }),
            _ => Err(GraphicsError::EncoderMismatch {
                operation,
                active: None,
            }),
        }
    }

    /// Record `command` into the active encoder.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::EncoderMismatch`] if the command is not valid in the
    /// active encoder, or no encoder is active.
    pub fn encode(&mut self, command: GpuCommand) -> Result<(), GraphicsError> {
        if command.valid_scopes().is_empty() {
            return Err(GraphicsError::InvalidParameter(format!(
                "{} is recorded by the encoder lifecycle",
                command.name()
            )));
        }
        self.require_encoder(command.name(), command.valid_scopes())?;
        self.commands.push(command);
        Ok(())
    }

    /// Finish recording. No encoder may be active.
    pub fn close(&mut self) -> Result<(), GraphicsError> {
        match self.state {
            CommandBufferState::BufferOpen => {
                self.state = CommandBufferState::Closed;
                log::trace!(
                    "Closed command buffer '{}' ({} commands)",
                    self.label,
                    self.commands.len()
                );
                Ok(())
            }
            CommandBufferState::Encoding(active) => Err(GraphicsError::EncoderMismatch {
                operation: "close",
                active: Some(active),
            }),
            CommandBufferState::Submitted => {
                Err(GraphicsError::AlreadySubmitted(self.label.clone()))
            }
            state => Err(GraphicsError::InvalidState(format!(
                "close with command buffer {state:?}"
            ))),
        }
    }

    /// Hand the closed command buffer to the device.
    ///
    /// `on_complete` fires when the GPU retires the buffer. If the backend
    /// rejects the submission the lifecycle returns to idle and the error is
    /// propagated.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::AlreadySubmitted`] on a second submit.
    pub fn submit(
        &mut self,
        backend: &dyn GpuBackend,
        on_complete: CompletionCallback,
    ) -> Result<usize, GraphicsError> {
        match self.state {
            CommandBufferState::Closed => {}
            CommandBufferState::Submitted => {
                return Err(GraphicsError::AlreadySubmitted(self.label.clone()));
            }
            state => {
                return Err(GraphicsError::InvalidState(format!(
                    "submit with command buffer {state:?}"
                )));
            }
        }
        let Some(command_buffer) = self.command_buffer else {
            return Err(GraphicsError::InvalidState(
                "closed command buffer without a handle".to_string(),
            ));
        };

        let submission = Submission {
            command_buffer,
            label: self.label.clone(),
            frame_index: self.frame_index,
            commands: std::mem::take(&mut self.commands),
        };
        let count = submission.commands.len();

        if let Err(e) = backend.submit(submission, on_complete) {
            log::error!("Submission of '{}' failed: {}", self.label, e);
            self.abandon();
            return Err(match e {
                GraphicsError::DeviceLost | GraphicsError::SubmissionRejected(_) => e,
                other => GraphicsError::SubmissionRejected(other.to_string()),
            });
        }

        log::trace!("Submitted '{}' ({} commands)", self.label, count);
        self.state = CommandBufferState::Submitted;
        self.command_buffer = None;
        Ok(count)
    }

    /// Drop whatever is being recorded.
    pub fn abandon(&mut self) {
        if self.state != CommandBufferState::Idle {
            log::trace!("Abandoned command buffer '{}'", self.label);
        }
        self.state = CommandBufferState::Idle;
        self.command_buffer = None;
        self.commands.clear();
    }

    pub fn state(&self) -> CommandBufferState {
        self.state
    }

    /// Kind of the open encoder, if any.
    pub fn active_encoder(&self) -> Option<EncoderKind> {
        match self.state {
            CommandBufferState::Encoding(kind) => Some(kind),
            _ => None,
        }
    }

    /// Handle of the command buffer being recorded.
    pub fn command_buffer(&self) -> Option<GpuHandle> {
        self.command_buffer
    }

    /// Commands recorded so far.
    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    /// Encoder scopes opened in this command buffer.
    pub fn encoder_count(&self) -> u32 {
        self.encoder_count
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Default for CommandEncoderLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
