//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. It keeps buffer
//! contents in host memory, records every submission, and retires
//! submissions either immediately or when the test says so. That makes the
//! whole render state observable without GPU hardware.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::device::DeviceCapabilities;
use crate::error::GraphicsError;
use crate::types::{BufferDescriptor, SamplerDescriptor, TextureDescriptor};

use super::{
    CompletionCallback, CompletionStatus, DeviceStatus, GpuBackend, GpuHandle, Submission,
};

/// When the dummy backend retires submitted command buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompletionMode {
    /// Completion callbacks run inside `submit`.
    #[default]
    Immediate,
    /// Submissions stay pending until [`DummyBackend::complete_next`] or
    /// [`DummyBackend::complete_all`] is called.
    Manual,
}

/// Configuration for [`DummyBackend`].
#[derive(Debug, Clone, Default)]
pub struct DummyBackendConfig {
    /// Capabilities reported to the device.
    pub capabilities: DeviceCapabilities,
    /// Completion behavior.
    pub completion: CompletionMode,
}

impl DummyBackendConfig {
    /// Create a config with default capabilities and immediate completion.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reported capabilities.
    pub fn with_capabilities(mut self, capabilities: DeviceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set the completion mode.
    pub fn with_completion_mode(mut self, completion: CompletionMode) -> Self {
        self.completion = completion;
        self
    }
}

struct PendingSubmission {
    frame_index: u64,
    on_complete: CompletionCallback,
}

#[derive(Default)]
struct DummyState {
    next_handle: u64,
    buffers: HashMap<GpuHandle, Vec<u8>>,
    submissions: Vec<Submission>,
    pending: VecDeque<PendingSubmission>,
    lost: bool,
    command_buffer_failure: Option<GraphicsError>,
    submit_failure: Option<GraphicsError>,
}

impl DummyState {
    fn allocate_handle(&mut self) -> GpuHandle {
        self.next_handle += 1;
        GpuHandle::from_raw(self.next_handle)
    }
}

/// Dummy GPU backend.
pub struct DummyBackend {
    config: DummyBackendConfig,
    state: Mutex<DummyState>,
}

impl DummyBackend {
    /// Create a new dummy backend with immediate completion.
    pub fn new() -> Self {
        Self::with_config(DummyBackendConfig::default())
    }

    /// Create a dummy backend with the given configuration.
    pub fn with_config(config: DummyBackendConfig) -> Self {
        Self {
            config,
            state: Mutex::new(DummyState::default()),
        }
    }

    /// The completion mode this backend was created with.
    pub fn completion_mode(&self) -> CompletionMode {
        self.config.completion
    }

    /// All submissions received so far, oldest first.
    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().submissions.clone()
    }

    /// Number of submissions received so far.
    pub fn submission_count(&self) -> usize {
        self.state.lock().submissions.len()
    }

    /// The most recent submission, if any.
    pub fn last_submission(&self) -> Option<Submission> {
        self.state.lock().submissions.last().cloned()
    }

    /// Number of submissions that have not retired yet.
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Read back host-side buffer contents.
    ///
    /// Returns `None` if the handle is unknown or the range is out of bounds.
    pub fn read_buffer(&self, buffer: GpuHandle, offset: u64, size: u64) -> Option<Vec<u8>> {
        let state = self.state.lock();
        let contents = state.buffers.get(&buffer)?;
        let start = usize::try_from(offset).ok()?;
        let end = start.checked_add(usize::try_from(size).ok()?)?;
        contents.get(start..end).map(<[u8]>::to_vec)
    }

    /// Retire the oldest pending submission.
    ///
    /// Returns `false` if nothing was pending.
    pub fn complete_next(&self) -> bool {
        let next = self.state.lock().pending.pop_front();
        match next {
            Some(pending) => {
                log::trace!(
                    "DummyBackend: completing submission for frame {}",
                    pending.frame_index
                );
                (pending.on_complete)(CompletionStatus::Completed);
                true
            }
            None => false,
        }
    }

    /// Retire every pending submission. Returns how many were retired.
    pub fn complete_all(&self) -> usize {
        let mut count = 0;
        while self.complete_next() {
            count += 1;
        }
        count
    }

    /// Simulate device loss.
    ///
    /// Every pending submission is retired with [`CompletionStatus::DeviceLost`]
    /// and all further device calls fail.
    pub fn lose_device(&self) {
        let pending: Vec<PendingSubmission> = {
            let mut state = self.state.lock();
            state.lost = true;
            state.pending.drain(..).collect()
        };
        log::warn!(
            "DummyBackend: device lost with {} submissions in flight",
            pending.len()
        );
        for submission in pending {
            (submission.on_complete)(CompletionStatus::DeviceLost);
        }
    }

    /// Make the next `create_command_buffer` call fail with `error`.
    pub fn fail_next_command_buffer(&self, error: GraphicsError) {
        self.state.lock().command_buffer_failure = Some(error);
    }

    /// Make the next `submit` call fail with `error`. The submission is not
    /// recorded and its completion callback never runs.
    pub fn fail_next_submit(&self, error: GraphicsError) {
        self.state.lock().submit_failure = Some(error);
    }

    fn check_lost(state: &DummyState) -> Result<(), GraphicsError> {
        if state.lost {
            Err(GraphicsError::DeviceLost)
        } else {
            Ok(())
        }
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DummyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DummyBackend")
            .field("completion", &self.config.completion)
            .field("submissions", &state.submissions.len())
            .field("pending", &state.pending.len())
            .field("lost", &state.lost)
            .finish()
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.config.capabilities
    }

    fn status(&self) -> DeviceStatus {
        if self.state.lock().lost {
            DeviceStatus::Lost
        } else {
            DeviceStatus::Ready
        }
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuHandle, GraphicsError> {
        let mut state = self.state.lock();
        Self::check_lost(&state)?;
        let size = usize::try_from(descriptor.size).map_err(|_| GraphicsError::OutOfMemory)?;
        let handle = state.allocate_handle();
        state.buffers.insert(handle, vec![0; size]);
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        Ok(handle)
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<GpuHandle, GraphicsError> {
        let mut state = self.state.lock();
        Self::check_lost(&state)?;
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{})",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height
        );
        Ok(state.allocate_handle())
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<GpuHandle, GraphicsError> {
        let mut state = self.state.lock();
        Self::check_lost(&state)?;
        log::trace!("DummyBackend: creating sampler {:?}", descriptor.label);
        Ok(state.allocate_handle())
    }

    fn write_buffer(
        &self,
        buffer: GpuHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        Self::check_lost(&state)?;
        let contents = state.buffers.get_mut(&buffer).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!("unknown buffer {buffer:?}"))
        })?;
        let start = offset as usize;
        let end = start + data.len();
        if end > contents.len() {
            return Err(GraphicsError::InvalidParameter(format!(
                "write of {} bytes at offset {} exceeds buffer size {}",
                data.len(),
                offset,
                contents.len()
            )));
        }
        contents[start..end].copy_from_slice(data);
        log::trace!(
            "DummyBackend: write_buffer offset={} len={}",
            offset,
            data.len()
        );
        Ok(())
    }

    fn create_command_buffer(&self, label: &str) -> Result<GpuHandle, GraphicsError> {
        let mut state = self.state.lock();
        Self::check_lost(&state)?;
        if let Some(error) = state.command_buffer_failure.take() {
            return Err(error);
        }
        log::trace!("DummyBackend: creating command buffer '{}'", label);
        Ok(state.allocate_handle())
    }

    fn submit(
        &self,
        submission: Submission,
        on_complete: CompletionCallback,
    ) -> Result<(), GraphicsError> {
        let frame_index = submission.frame_index;
        {
            let mut state = self.state.lock();
            Self::check_lost(&state)?;
            if let Some(error) = state.submit_failure.take() {
                return Err(error);
            }
            log::trace!(
                "DummyBackend: submitting '{}' with {} commands",
                submission.label,
                submission.commands.len()
            );
            state.submissions.push(submission);
            if self.config.completion == CompletionMode::Manual {
                state.pending.push_back(PendingSubmission {
                    frame_index,
                    on_complete,
                });
                return Ok(());
            }
        }
        // Immediate completion runs outside the lock.
        on_complete(CompletionStatus::Completed);
        Ok(())
    }
}

static_assertions::assert_impl_all!(DummyBackend: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BufferUsage;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn submission(frame_index: u64) -> Submission {
        Submission {
            command_buffer: GpuHandle::from_raw(0),
            label: format!("frame {frame_index}"),
            frame_index,
            commands: Vec::new(),
        }
    }

    fn counting_callback(counter: &Arc<AtomicUsize>) -> CompletionCallback {
        let counter = Arc::clone(counter);
        Box::new(move |status| {
            assert_eq!(status, CompletionStatus::Completed);
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_handles_are_unique() {
        let backend = DummyBackend::new();
        let a = backend
            .create_buffer(&BufferDescriptor::new(16, BufferUsage::VERTEX))
            .unwrap();
        let b = backend
            .create_sampler(&SamplerDescriptor::linear())
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_write_and_read_buffer() {
        let backend = DummyBackend::new();
        let buffer = backend
            .create_buffer(&BufferDescriptor::new(8, BufferUsage::UNIFORM))
            .unwrap();
        backend.write_buffer(buffer, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(
            backend.read_buffer(buffer, 0, 8),
            Some(vec![0, 0, 0, 0, 1, 2, 3, 4])
        );
        assert!(backend.write_buffer(buffer, 6, &[0; 4]).is_err());
        assert_eq!(backend.read_buffer(buffer, 6, 4), None);
    }

    #[test]
    fn test_immediate_completion() {
        let backend = DummyBackend::new();
        let counter = Arc::new(AtomicUsize::new(0));
        backend
            .submit(submission(0), counting_callback(&counter))
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(backend.pending_count(), 0);
        assert_eq!(backend.submission_count(), 1);
    }

    #[test]
    fn test_manual_completion_in_order() {
        let backend = DummyBackend::with_config(
            DummyBackendConfig::new().with_completion_mode(CompletionMode::Manual),
        );
        let counter = Arc::new(AtomicUsize::new(0));
        backend
            .submit(submission(0), counting_callback(&counter))
            .unwrap();
        backend
            .submit(submission(1), counting_callback(&counter))
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(backend.pending_count(), 2);

        assert!(backend.complete_next());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(backend.complete_all(), 1);
        assert!(!backend.complete_next());
    }

    #[test]
    fn test_lose_device_reports_pending() {
        let backend = DummyBackend::with_config(
            DummyBackendConfig::new().with_completion_mode(CompletionMode::Manual),
        );
        let lost = Arc::new(AtomicUsize::new(0));
        let lost_clone = Arc::clone(&lost);
        backend
            .submit(
                submission(0),
                Box::new(move |status| {
                    assert_eq!(status, CompletionStatus::DeviceLost);
                    lost_clone.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        backend.lose_device();
        assert_eq!(lost.load(Ordering::SeqCst), 1);
        assert_eq!(backend.status(), DeviceStatus::Lost);
        assert_eq!(
            backend.create_command_buffer("after loss"),
            Err(GraphicsError::DeviceLost)
        );
    }

    #[test]
    fn test_rejected_submit_drops_callback() {
        let backend = DummyBackend::new();
        backend.lose_device();
        let counter = Arc::new(AtomicUsize::new(0));
        let result = backend.submit(submission(0), counting_callback(&counter));
        assert_eq!(result, Err(GraphicsError::DeviceLost));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fail_next_command_buffer() {
        let backend = DummyBackend::new();
        backend.fail_next_command_buffer(GraphicsError::OutOfMemory);
        assert_eq!(
            backend.create_command_buffer("first"),
            Err(GraphicsError::OutOfMemory)
        );
        assert!(backend.create_command_buffer("second").is_ok());
    }
}
