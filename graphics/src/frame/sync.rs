//! CPU-GPU synchronization primitives.
//!
//! Both types are shared between the encoding thread, which waits on them,
//! and backend completion callbacks, which signal them from arbitrary threads.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::GraphicsError;

/// Status of a fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceStatus {
    /// The fence has not yet been signaled.
    Unsignaled,
    /// The fence has been signaled (GPU work complete).
    Signaled,
    /// The device was lost before the work completed.
    Lost,
}

#[derive(Debug)]
struct FenceInner {
    status: Mutex<FenceStatus>,
    changed: Condvar,
}

/// CPU-GPU synchronization primitive.
///
/// A fence is created unsignaled when a frame is submitted and signaled by
/// the completion callback once the GPU has retired that frame. Clones share
/// state.
#[derive(Debug, Clone)]
pub struct Fence {
    inner: Arc<FenceInner>,
}

impl Fence {
    /// Create a new fence in the unsignaled state.
    pub fn new_unsignaled() -> Self {
        Self::with_status(FenceStatus::Unsignaled)
    }

    /// Create a new fence in the signaled state.
    pub fn new_signaled() -> Self {
        Self::with_status(FenceStatus::Signaled)
    }

    fn with_status(status: FenceStatus) -> Self {
        Self {
            inner: Arc::new(FenceInner {
                status: Mutex::new(status),
                changed: Condvar::new(),
            }),
        }
    }

    /// Check the current status of the fence.
    pub fn status(&self) -> FenceStatus {
        *self.inner.status.lock()
    }

    /// Check if the fence is signaled (non-blocking).
    pub fn is_signaled(&self) -> bool {
        self.status() == FenceStatus::Signaled
    }

    /// Block until the fence leaves the unsignaled state.
    ///
    /// Returns [`FenceStatus::Signaled`] or [`FenceStatus::Lost`].
    pub fn wait(&self) -> FenceStatus {
        let mut status = self.inner.status.lock();
        while *status == FenceStatus::Unsignaled {
            self.inner.changed.wait(&mut status);
        }
        *status
    }

    /// Wait with a timeout. Returns [`FenceStatus::Unsignaled`] on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> FenceStatus {
        self.wait_until(Instant::now() + timeout)
    }

    /// Wait until `deadline`. Returns [`FenceStatus::Unsignaled`] on timeout.
    pub fn wait_until(&self, deadline: Instant) -> FenceStatus {
        let mut status = self.inner.status.lock();
        while *status == FenceStatus::Unsignaled {
            if self
                .inner
                .changed
                .wait_until(&mut status, deadline)
                .timed_out()
            {
                break;
            }
        }
        *status
    }

    /// Signal the fence.
    pub(crate) fn signal(&self) {
        self.transition(FenceStatus::Signaled);
    }

    /// Mark the fence lost, waking every waiter.
    pub(crate) fn mark_lost(&self) {
        self.transition(FenceStatus::Lost);
    }

    fn transition(&self, to: FenceStatus) {
        let mut status = self.inner.status.lock();
        if *status == FenceStatus::Unsignaled {
            *status = to;
            self.inner.changed.notify_all();
        }
    }
}

impl Default for Fence {
    fn default() -> Self {
        Self::new_unsignaled()
    }
}

#[derive(Debug)]
struct SemaphoreState {
    tokens: usize,
    capacity: usize,
    lost: bool,
}

/// Counting semaphore bounding the number of frames in flight.
///
/// A token is taken when a frame begins and returned when the GPU retires it.
/// Once marked lost, every current and future acquire fails with
/// [`GraphicsError::DeviceLost`].
#[derive(Debug)]
pub struct FrameSemaphore {
    state: Mutex<SemaphoreState>,
    available: Condvar,
}

impl FrameSemaphore {
    /// Create a semaphore holding `capacity` tokens.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(SemaphoreState {
                tokens: capacity,
                capacity,
                lost: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Take a token, blocking until one is available.
    pub fn acquire(&self) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        loop {
            if state.lost {
                return Err(GraphicsError::DeviceLost);
            }
            if state.tokens > 0 {
                state.tokens -= 1;
                return Ok(());
            }
            self.available.wait(&mut state);
        }
    }

    /// Take a token, giving up at `deadline`. Returns `Ok(false)` on timeout.
    pub fn acquire_until(&self, deadline: Instant) -> Result<bool, GraphicsError> {
        let mut state = self.state.lock();
        loop {
            if state.lost {
                return Err(GraphicsError::DeviceLost);
            }
            if state.tokens > 0 {
                state.tokens -= 1;
                return Ok(true);
            }
            if self.available.wait_until(&mut state, deadline).timed_out() {
                return Ok(false);
            }
        }
    }

    /// Return a token.
    pub fn release(&self) {
        let mut state = self.state.lock();
        if state.tokens < state.capacity {
            state.tokens += 1;
        } else {
            log::warn!("FrameSemaphore: release without matching acquire");
        }
        self.available.notify_one();
    }

    /// Fail every waiter and every future acquire.
    pub fn mark_lost(&self) {
        let mut state = self.state.lock();
        state.lost = true;
        self.available.notify_all();
    }

    /// Whether the semaphore was marked lost.
    pub fn is_lost(&self) -> bool {
        self.state.lock().lost
    }

    /// Tokens currently available.
    pub fn available(&self) -> usize {
        self.state.lock().tokens
    }

    /// Total number of tokens.
    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }
}

static_assertions::assert_impl_all!(Fence: Send, Sync);
static_assertions::assert_impl_all!(FrameSemaphore: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_unsignaled() {
        let fence = Fence::new_unsignaled();
        assert_eq!(fence.status(), FenceStatus::Unsignaled);
        assert!(!fence.is_signaled());
    }

    #[test]
    fn test_fence_signal_and_wait() {
        let fence = Fence::new_unsignaled();

        let fence_clone = fence.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            fence_clone.signal();
        });

        assert_eq!(fence.wait(), FenceStatus::Signaled);
        assert!(fence.is_signaled());
    }

    #[test]
    fn test_fence_wait_timeout() {
        let fence = Fence::new_unsignaled();
        let result = fence.wait_timeout(Duration::from_millis(10));
        assert_eq!(result, FenceStatus::Unsignaled);
    }

    #[test]
    fn test_fence_lost_wakes_waiter() {
        let fence = Fence::new_unsignaled();
        let fence_clone = fence.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            fence_clone.mark_lost();
        });
        assert_eq!(fence.wait(), FenceStatus::Lost);
    }

    #[test]
    fn test_signaled_fence_stays_signaled() {
        let fence = Fence::new_signaled();
        fence.mark_lost();
        assert_eq!(fence.status(), FenceStatus::Signaled);
    }

    #[test]
    fn test_semaphore_counts_tokens() {
        let semaphore = FrameSemaphore::new(2);
        semaphore.acquire().unwrap();
        semaphore.acquire().unwrap();
        assert_eq!(semaphore.available(), 0);

        let deadline = Instant::now() + Duration::from_millis(10);
        assert_eq!(semaphore.acquire_until(deadline), Ok(false));

        semaphore.release();
        assert_eq!(semaphore.available(), 1);
        assert_eq!(semaphore.acquire_until(Instant::now()), Ok(true));
    }

    #[test]
    fn test_semaphore_release_unblocks_waiter() {
        let semaphore = Arc::new(FrameSemaphore::new(1));
        semaphore.acquire().unwrap();

        let releaser = Arc::clone(&semaphore);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            releaser.release();
        });

        semaphore.acquire().unwrap();
        assert_eq!(semaphore.available(), 0);
    }

    #[test]
    fn test_semaphore_lost_fails_waiters() {
        let semaphore = Arc::new(FrameSemaphore::new(1));
        semaphore.acquire().unwrap();

        let killer = Arc::clone(&semaphore);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            killer.mark_lost();
        });

        assert_eq!(semaphore.acquire(), Err(GraphicsError::DeviceLost));
        assert!(semaphore.is_lost());
    }

    #[test]
    fn test_semaphore_release_is_capped() {
        let semaphore = FrameSemaphore::new(2);
        semaphore.release();
        assert_eq!(semaphore.available(), 2);
        assert_eq!(semaphore.capacity(), 2);
    }
}
