//! Frame pacing for multiple frames in flight.
//!
//! [`FrameSynchronizer`] bounds how far the CPU may run ahead of the GPU.
//! Every frame slot owns transient resources (a color target and one staging
//! ring per allocation kind); the CPU may only write a slot again once the GPU
//! has retired the frame previously submitted from it.
//!
//! # Frame Overlap
//!
//! ```text
//! Frame 0: [CPU record] [submit] ──────────────────────────────────────────►
//!                                [GPU execute frame 0] ────────────────────►
//!
//! Frame 1:               [CPU record] [submit] ────────────────────────────►
//!                                             [GPU execute frame 1] ───────►
//!
//! Frame 2:                            [wait F0] [CPU record] [submit] ─────►
//! ```
//!
//! Pacing uses two primitives:
//!
//! | Primitive | Taken | Released |
//! |-----------|-------|----------|
//! | [`FrameSemaphore`] token | `begin_frame` | completion callback |
//! | Slot [`Fence`] | created at submit | signaled by completion callback |
//!
//! The semaphore caps the number of unretired frames; the slot fence makes
//! reuse safe even when the backend retires frames out of order.
//!
//! # Device Loss
//!
//! A completion callback reporting [`CompletionStatus::DeviceLost`] marks the
//! semaphore and the fence lost. Threads blocked in `begin_frame` wake up
//! and fail with [`GraphicsError::DeviceLost`], as does every later call.

mod sync;

pub use sync::{Fence, FenceStatus, FrameSemaphore};

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backend::{CompletionCallback, CompletionStatus};
use crate::error::GraphicsError;

/// Number of frames the CPU may record ahead of the GPU.
pub const FRAMES_IN_FLIGHT: usize = 2;

/// Identity of a frame being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameInfo {
    /// Frame slot, `0..frames_in_flight`.
    pub slot: usize,
    /// Monotonic frame number, starting at 0.
    pub index: u64,
}

/// Manages multiple frames in flight for CPU-GPU parallelism.
///
/// With N frames in flight there are N slots, used round-robin:
///
/// ```text
/// frames_in_flight = 2
///
/// Slot 0: [Frame 0] ──► [Frame 2] ──► [Frame 4] ──►
/// Slot 1: [Frame 1] ──► [Frame 3] ──► [Frame 5] ──►
/// ```
///
/// The synchronizer is owned by the encoding thread. Only its semaphore and
/// fences are shared with completion callbacks.
#[derive(Debug)]
pub struct FrameSynchronizer {
    semaphore: Arc<FrameSemaphore>,

    /// Fences for each frame slot. `None` if slot hasn't been used yet.
    frame_fences: Vec<Option<Fence>>,

    /// Current frame slot index (0 to frames_in_flight - 1).
    current_slot: usize,

    frames_in_flight: usize,

    /// Total frames started.
    frame_count: u64,

    /// Frame currently being recorded.
    active: Option<FrameInfo>,
}

impl FrameSynchronizer {
    /// Create a synchronizer.
    ///
    /// # Panics
    ///
    /// Panics if `frames_in_flight` is 0.
    pub fn new(frames_in_flight: usize) -> Self {
        assert!(frames_in_flight > 0, "frames_in_flight must be at least 1");

        Self {
            semaphore: Arc::new(FrameSemaphore::new(frames_in_flight)),
            frame_fences: (0..frames_in_flight).map(|_| None).collect(),
            current_slot: 0,
            frames_in_flight,
            frame_count: 0,
            active: None,
        }
    }

    /// Begin a new frame.
    ///
    /// Blocks until fewer than `frames_in_flight` frames are unretired and the
    /// current slot's previous frame has completed.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::DeviceLost`] if the device was lost before or while
    /// waiting, [`GraphicsError::InvalidState`] if a frame is already being
    /// recorded.
    pub fn begin_frame(&mut self) -> Result<FrameInfo, GraphicsError> {
        self.check_can_begin()?;
        self.semaphore.acquire()?;

        if let Some(fence) = &self.frame_fences[self.current_slot]
            && fence.wait() == FenceStatus::Lost
        {
            self.semaphore.release();
            return Err(GraphicsError::DeviceLost);
        }

        Ok(self.start_frame())
    }

    /// Begin a new frame with a timeout.
    ///
    /// Like [`begin_frame`](Self::begin_frame), but returns `Ok(None)` without
    /// starting a frame if `timeout` elapses first.
    pub fn begin_frame_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<FrameInfo>, GraphicsError> {
        self.check_can_begin()?;
        let deadline = Instant::now() + timeout;

        if !self.semaphore.acquire_until(deadline)? {
            log::trace!("Frame slot wait timed out after {:?}", timeout);
            return Ok(None);
        }

        if let Some(fence) = &self.frame_fences[self.current_slot] {
            match fence.wait_until(deadline) {
                FenceStatus::Signaled => {}
                FenceStatus::Unsignaled => {
                    self.semaphore.release();
                    log::trace!("Slot {} fence wait timed out", self.current_slot);
                    return Ok(None);
                }
                FenceStatus::Lost => {
                    self.semaphore.release();
                    return Err(GraphicsError::DeviceLost);
                }
            }
        }

        Ok(Some(self.start_frame()))
    }

    fn check_can_begin(&self) -> Result<(), GraphicsError> {
        if let Some(active) = self.active {
            return Err(GraphicsError::InvalidState(format!(
                "begin_frame called while frame {} is still being recorded",
                active.index
            )));
        }
        if self.semaphore.is_lost() {
            return Err(GraphicsError::DeviceLost);
        }
        Ok(())
    }

    fn start_frame(&mut self) -> FrameInfo {
        let info = FrameInfo {
            slot: self.current_slot,
            index: self.frame_count,
        };
        self.frame_count += 1;
        self.active = Some(info);

        log::trace!("Begin frame {} (slot {})", info.index, info.slot);

        info
    }

    /// Build the completion callback for the frame being recorded.
    ///
    /// On completion it signals `fence` and returns the frame's token. On
    /// device loss it marks both lost, waking any blocked `begin_frame`.
    pub fn completion_callback(&self, fence: &Fence) -> CompletionCallback {
        let semaphore = Arc::clone(&self.semaphore);
        let fence = fence.clone();
        let slot = self.current_slot;

        Box::new(move |status| match status {
            CompletionStatus::Completed => {
                log::trace!("Frame slot {} retired", slot);
                fence.signal();
                semaphore.release();
            }
            CompletionStatus::DeviceLost => {
                log::error!("Device lost while frame slot {} was in flight", slot);
                fence.mark_lost();
                semaphore.mark_lost();
            }
        })
    }

    /// End the current frame.
    ///
    /// Records the fence whose completion callback was handed to the backend
    /// and advances to the next frame slot.
    pub fn end_frame(&mut self, fence: Fence) -> Result<(), GraphicsError> {
        let Some(info) = self.active.take() else {
            return Err(GraphicsError::InvalidState(
                "end_frame called without begin_frame".to_string(),
            ));
        };

        log::trace!("End frame {} (slot {})", info.index, info.slot);

        self.frame_fences[self.current_slot] = Some(fence);
        self.current_slot = (self.current_slot + 1) % self.frames_in_flight;
        Ok(())
    }

    /// Give back the token of a frame that will not be submitted.
    ///
    /// The slot is not advanced; its previous fence stays in place.
    pub fn abort_frame(&mut self) {
        if let Some(info) = self.active.take() {
            log::warn!("Frame {} (slot {}) aborted", info.index, info.slot);
            self.semaphore.release();
        }
    }

    /// Mark the device lost, failing blocked and future `begin_frame` calls.
    pub fn mark_lost(&self) {
        log::error!("Frame synchronizer marked lost");
        self.semaphore.mark_lost();
        for fence in self.frame_fences.iter().flatten() {
            fence.mark_lost();
        }
    }

    /// Whether the device was lost.
    pub fn is_lost(&self) -> bool {
        self.semaphore.is_lost()
    }

    /// Wait for all in-flight GPU work to complete.
    ///
    /// Call this before destroying or recreating resources the GPU may still
    /// be reading.
    pub fn wait_idle(&self) -> Result<(), GraphicsError> {
        log::trace!("Waiting for GPU idle ({} slots)", self.frames_in_flight);

        for (i, fence) in self.frame_fences.iter().enumerate() {
            if let Some(f) = fence {
                log::trace!("Waiting for slot {}...", i);
                if f.wait() == FenceStatus::Lost {
                    return Err(GraphicsError::DeviceLost);
                }
            }
        }

        log::trace!("GPU idle");
        Ok(())
    }

    /// Wait for all in-flight GPU work with a timeout.
    ///
    /// Returns `Ok(false)` if the timeout elapses before all work completes.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> Result<bool, GraphicsError> {
        let deadline = Instant::now() + timeout;

        for fence in self.frame_fences.iter().flatten() {
            match fence.wait_until(deadline) {
                FenceStatus::Signaled => {}
                FenceStatus::Unsignaled => return Ok(false),
                FenceStatus::Lost => return Err(GraphicsError::DeviceLost),
            }
        }

        Ok(true)
    }

    /// Get the number of frame slots.
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// Number of submitted frames the GPU has not retired yet.
    pub fn in_flight(&self) -> usize {
        self.frame_fences
            .iter()
            .flatten()
            .filter(|fence| fence.status() == FenceStatus::Unsignaled)
            .count()
    }

    /// Get the current frame slot index.
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    /// Get the total number of frames started.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Frame currently being recorded, if any.
    pub fn active_frame(&self) -> Option<FrameInfo> {
        self.active
    }

    /// Whether a frame is being recorded.
    pub fn is_in_frame(&self) -> bool {
        self.active.is_some()
    }

    /// Check if a specific frame slot is ready (non-blocking).
    ///
    /// Returns `true` if the slot's fence is signaled or if the slot
    /// hasn't been used yet, `false` for a slot that does not exist.
    pub fn is_slot_ready(&self, slot: usize) -> bool {
        match self.frame_fences.get(slot) {
            Some(Some(fence)) => fence.is_signaled(),
            Some(None) => true,
            None => false,
        }
    }

    /// Check if all frame slots are ready (non-blocking).
    pub fn is_idle(&self) -> bool {
        self.frame_fences
            .iter()
            .all(|f| f.as_ref().is_none_or(|fence| fence.is_signaled()))
    }
}

impl Default for FrameSynchronizer {
    /// Creates a synchronizer with [`FRAMES_IN_FLIGHT`] slots.
    fn default() -> Self {
        Self::new(FRAMES_IN_FLIGHT)
    }
}

static_assertions::assert_impl_all!(FrameSynchronizer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    /// Record one frame and hand back its completion callback unfired.
    fn record_frame(sync: &mut FrameSynchronizer) -> (Fence, CompletionCallback) {
        sync.begin_frame().unwrap();
        let fence = Fence::new_unsignaled();
        let callback = sync.completion_callback(&fence);
        sync.end_frame(fence.clone()).unwrap();
        (fence, callback)
    }

    #[test]
    fn test_new() {
        let sync = FrameSynchronizer::new(2);
        assert_eq!(sync.frames_in_flight(), 2);
        assert_eq!(sync.current_slot(), 0);
        assert_eq!(sync.frame_count(), 0);
        assert!(!sync.is_in_frame());
    }

    #[test]
    fn test_default() {
        let sync = FrameSynchronizer::default();
        assert_eq!(sync.frames_in_flight(), FRAMES_IN_FLIGHT);
    }

    #[test]
    #[should_panic(expected = "frames_in_flight must be at least 1")]
    fn test_zero_frames_panics() {
        FrameSynchronizer::new(0);
    }

    #[test]
    fn test_frame_lifecycle() {
        let mut sync = FrameSynchronizer::new(2);

        let (_, done0) = record_frame(&mut sync);
        done0(CompletionStatus::Completed);
        assert_eq!(sync.current_slot(), 1);

        let (_, done1) = record_frame(&mut sync);
        done1(CompletionStatus::Completed);
        assert_eq!(sync.current_slot(), 0);

        // Frame 2 reuses slot 0
        let info = sync.begin_frame().unwrap();
        assert_eq!(info, FrameInfo { slot: 0, index: 2 });
        assert_eq!(sync.frame_count(), 3);
    }

    #[test]
    fn test_end_frame_advances_slot() {
        let mut sync = FrameSynchronizer::new(3);
        for expected in [1, 2, 0] {
            let (_, done) = record_frame(&mut sync);
            done(CompletionStatus::Completed);
            assert_eq!(sync.current_slot(), expected);
        }
    }

    #[test]
    fn test_third_frame_stalls_until_retirement() {
        let mut sync = FrameSynchronizer::new(2);
        let (fence0, done0) = record_frame(&mut sync);
        let (_, _done1) = record_frame(&mut sync);
        assert_eq!(sync.in_flight(), 2);

        let stalled = sync.begin_frame_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(stalled, None);
        assert!(!sync.is_in_frame());

        done0(CompletionStatus::Completed);
        assert!(fence0.is_signaled());
        assert_eq!(sync.in_flight(), 1);

        let info = sync.begin_frame_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(info, Some(FrameInfo { slot: 0, index: 2 }));
    }

    #[test]
    fn test_begin_frame_blocks_until_callback() {
        let mut sync = FrameSynchronizer::new(2);
        let (_, done0) = record_frame(&mut sync);
        let (_, _done1) = record_frame(&mut sync);

        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            done0(CompletionStatus::Completed);
        });

        let info = sync.begin_frame().unwrap();
        assert_eq!(info.slot, 0);
        assert!(sync.is_slot_ready(0));
    }

    #[test]
    fn test_device_loss_fails_next_begin() {
        let mut sync = FrameSynchronizer::new(2);
        let (fence, done) = record_frame(&mut sync);
        done(CompletionStatus::DeviceLost);

        assert_eq!(fence.status(), FenceStatus::Lost);
        assert!(sync.is_lost());
        assert_eq!(sync.begin_frame(), Err(GraphicsError::DeviceLost));
        assert_eq!(sync.wait_idle(), Err(GraphicsError::DeviceLost));
    }

    #[test]
    fn test_device_loss_wakes_blocked_begin() {
        let mut sync = FrameSynchronizer::new(2);
        let (_, _done0) = record_frame(&mut sync);
        let (_, done1) = record_frame(&mut sync);

        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            done1(CompletionStatus::DeviceLost);
        });

        assert_eq!(sync.begin_frame(), Err(GraphicsError::DeviceLost));
    }

    #[test]
    fn test_abort_frame_returns_token() {
        let mut sync = FrameSynchronizer::new(1);
        sync.begin_frame().unwrap();
        sync.abort_frame();
        assert!(!sync.is_in_frame());
        assert_eq!(sync.current_slot(), 0);

        let info = sync.begin_frame_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(info, Some(FrameInfo { slot: 0, index: 1 }));
    }

    #[test]
    fn test_nested_begin_rejected() {
        let mut sync = FrameSynchronizer::new(2);
        sync.begin_frame().unwrap();
        assert!(matches!(
            sync.begin_frame(),
            Err(GraphicsError::InvalidState(_))
        ));
    }

    #[test]
    fn test_end_without_begin_rejected() {
        let mut sync = FrameSynchronizer::new(2);
        assert!(matches!(
            sync.end_frame(Fence::new_signaled()),
            Err(GraphicsError::InvalidState(_))
        ));
    }

    #[test]
    fn test_is_slot_ready_unused() {
        let sync = FrameSynchronizer::new(2);
        assert!(sync.is_slot_ready(0));
        assert!(sync.is_slot_ready(1));
        assert!(sync.is_idle());
    }

    #[test]
    fn test_wait_idle() {
        let mut sync = FrameSynchronizer::new(2);
        let (_, done0) = record_frame(&mut sync);
        let (_, done1) = record_frame(&mut sync);
        assert!(!sync.is_idle());
        assert_eq!(sync.wait_idle_timeout(Duration::from_millis(5)), Ok(false));

        done0(CompletionStatus::Completed);
        done1(CompletionStatus::Completed);
        sync.wait_idle().unwrap();
        assert!(sync.is_idle());
        assert_eq!(sync.wait_idle_timeout(Duration::from_millis(1)), Ok(true));
    }

    #[test]
    fn test_is_slot_ready_out_of_range() {
        let sync = FrameSynchronizer::new(2);
        assert!(!sync.is_slot_ready(2));
        assert!(!sync.is_slot_ready(usize::MAX));
    }
}
