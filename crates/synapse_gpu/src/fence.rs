//! # Fence Tracking
//!
//! Mirrors the state of a cross-process synchronization primitive.
//!
//! ## Design
//!
//! The bridge never dereferences the OS fence object itself; it tracks the
//! values the protocol reports as signaled and lets consumers block, with a
//! bounded timeout, until the value they need is reached. A producer that
//! never signals therefore degrades to a timed-out wait, not a hang.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::error::ResourceBridgeError;

/// How a wait target compares against the signaled value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FenceMode {
    /// Monotonic fence: a wait for `v` completes once `signaled >= v`.
    ///
    /// Direct3D 12 fences and Vulkan timeline semaphores behave this way.
    AtLeast,
    /// Keyed mutex: a wait for `v` completes only while `signaled == v`.
    ///
    /// Direct3D 11 keyed mutexes behave this way; the key is handed back and
    /// forth rather than counting upwards.
    Exact,
}

/// Outcome of a bounded fence wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FenceWait {
    /// The awaited value was reached within the timeout.
    Signaled,
    /// The timeout elapsed first. The texture must not be sampled.
    TimedOut,
}

/// Tracks the signaled value of one fence.
#[derive(Debug)]
pub struct FenceTracker {
    mode: FenceMode,
    value: Mutex<u64>,
    signaled: Condvar,
}

impl FenceTracker {
    /// Creates a tracker with the given comparison mode and initial value.
    #[must_use]
    pub fn new(mode: FenceMode, initial: u64) -> Self {
        Self {
            mode,
            value: Mutex::new(initial),
            signaled: Condvar::new(),
        }
    }

    /// Returns the comparison mode.
    #[inline]
    #[must_use]
    pub const fn mode(&self) -> FenceMode {
        self.mode
    }

    /// Returns the last signaled value.
    #[must_use]
    pub fn signaled_value(&self) -> u64 {
        *self.value.lock()
    }

    /// Records a signal at `value` and wakes waiters.
    ///
    /// # Errors
    ///
    /// [`ResourceBridgeError::FenceRegression`] in [`FenceMode::AtLeast`]
    /// mode if `value` is not greater than the current value. Keyed-mutex
    /// fences exchange arbitrary key values and accept any.
    pub fn signal(&self, value: u64) -> Result<(), ResourceBridgeError> {
        let mut current = self.value.lock();
        if self.mode == FenceMode::AtLeast && value <= *current {
            return Err(ResourceBridgeError::FenceRegression {
                current: *current,
                requested: value,
            });
        }
        *current = value;
        self.signaled.notify_all();
        Ok(())
    }

    /// Returns true if a wait for `value` would complete right now.
    #[must_use]
    pub fn is_reached(&self, value: u64) -> bool {
        let current = *self.value.lock();
        match self.mode {
            FenceMode::AtLeast => current >= value,
            FenceMode::Exact => current == value,
        }
    }

    /// Blocks until `value` is reached or `timeout` elapses.
    ///
    /// An already-reached value returns immediately without blocking.
    #[must_use]
    pub fn wait_for(&self, value: u64, timeout: Duration) -> FenceWait {
        let mut current = self.value.lock();
        let reached = |v: u64| match self.mode {
            FenceMode::AtLeast => v >= value,
            FenceMode::Exact => v == value,
        };

        if reached(*current) {
            return FenceWait::Signaled;
        }

        let deadline = std::time::Instant::now() + timeout;
        while !reached(*current) {
            if self.signaled.wait_until(&mut current, deadline).timed_out() {
                return if reached(*current) {
                    FenceWait::Signaled
                } else {
                    FenceWait::TimedOut
                };
            }
        }
        FenceWait::Signaled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_already_signaled_returns_immediately() {
        let fence = FenceTracker::new(FenceMode::AtLeast, 0);
        fence.signal(5).unwrap();
        assert_eq!(fence.wait_for(3, Duration::ZERO), FenceWait::Signaled);
        assert_eq!(fence.wait_for(5, Duration::ZERO), FenceWait::Signaled);
    }

    #[test]
    fn test_wait_times_out() {
        let fence = FenceTracker::new(FenceMode::AtLeast, 0);
        assert_eq!(
            fence.wait_for(1, Duration::from_millis(10)),
            FenceWait::TimedOut
        );
    }

    #[test]
    fn test_signal_wakes_waiter() {
        let fence = Arc::new(FenceTracker::new(FenceMode::AtLeast, 0));
        let waiter = Arc::clone(&fence);
        let handle = std::thread::spawn(move || waiter.wait_for(7, Duration::from_secs(5)));

        std::thread::sleep(Duration::from_millis(5));
        fence.signal(7).unwrap();
        assert_eq!(handle.join().unwrap(), FenceWait::Signaled);
    }

    #[test]
    fn test_monotonic_fence_rejects_regression() {
        let fence = FenceTracker::new(FenceMode::AtLeast, 0);
        fence.signal(10).unwrap();
        assert_eq!(
            fence.signal(10),
            Err(ResourceBridgeError::FenceRegression {
                current: 10,
                requested: 10,
            })
        );
    }

    #[test]
    fn test_keyed_mutex_matches_exact_key() {
        let fence = FenceTracker::new(FenceMode::Exact, 0);
        assert!(fence.is_reached(0));
        assert!(!fence.is_reached(1));

        // Keys hand back and forth; going "backwards" is legal.
        fence.signal(1).unwrap();
        fence.signal(0).unwrap();
        assert!(fence.is_reached(0));
    }
}
