//! Service lifecycle: the start/stop capability.
//!
//! ```text
//!   Created ──startup──▶ Running ──shutdown──▶ Stopped
//!      │                                          ▲
//!      └────────────────shutdown──────────────────┘
//! ```
//!
//! `Stopped` is terminal. Repeating a transition that already happened is
//! a no-op; starting a stopped service is an error.

use crate::error::{OmsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a service.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Constructed, not yet started.
    Created,
    /// Started and serving requests.
    Running,
    /// Shut down. Terminal.
    Stopped,
}

impl LifecycleState {
    const fn to_u8(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Running => 1,
            Self::Stopped => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Running,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// The start/stop contract shared by consumers and other services.
///
/// # Dyn Compatibility
///
/// Methods return `Pin<Box<dyn Future>>` rather than using `async fn` so
/// that `Arc<dyn ServiceLifecycle>` can be used by supervisors that manage
/// heterogeneous services.
pub trait ServiceLifecycle: Send + Sync {
    /// Start the service.
    ///
    /// Starting a running service is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::InvalidState`] if the service has been stopped.
    fn startup(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Stop the service and release its resources.
    ///
    /// Stopping a stopped service is a no-op.
    ///
    /// # Errors
    ///
    /// Drivers may return an error if releasing remote resources fails.
    fn shutdown(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Current lifecycle state.
    fn state(&self) -> LifecycleState;
}

/// Lock-free lifecycle state machine for drivers to embed.
///
/// # Example
///
/// ```
/// use openmessaging_core::lifecycle::{LifecycleState, LifecycleTracker};
///
/// let tracker = LifecycleTracker::new();
/// assert!(tracker.ensure_running().is_err());
///
/// assert!(tracker.start().unwrap());
/// assert!(!tracker.start().unwrap());
/// assert_eq!(tracker.state(), LifecycleState::Running);
///
/// assert!(tracker.stop());
/// assert!(tracker.start().is_err());
/// ```
#[derive(Debug)]
pub struct LifecycleTracker {
    state: AtomicU8,
}

impl LifecycleTracker {
    /// Create a tracker in the `Created` state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Created.to_u8()),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Transition `Created → Running`.
    ///
    /// Returns `true` if this call performed the transition and `false` if
    /// the service was already running.
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::InvalidState`] if the service has been stopped.
    pub fn start(&self) -> Result<bool> {
        match self.state.compare_exchange(
            LifecycleState::Created.to_u8(),
            LifecycleState::Running.to_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(true),
            Err(actual) => match LifecycleState::from_u8(actual) {
                LifecycleState::Running => Ok(false),
                state => Err(OmsError::InvalidState {
                    state,
                    operation: "startup",
                }),
            },
        }
    }

    /// Transition to `Stopped`.
    ///
    /// Returns `true` if this call performed the transition.
    pub fn stop(&self) -> bool {
        let previous = self
            .state
            .swap(LifecycleState::Stopped.to_u8(), Ordering::AcqRel);
        LifecycleState::from_u8(previous) != LifecycleState::Stopped
    }

    /// Fail unless the service is running.
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::NotRunning`] carrying the current state.
    pub fn ensure_running(&self) -> Result<()> {
        match self.state() {
            LifecycleState::Running => Ok(()),
            state => Err(OmsError::NotRunning { state }),
        }
    }
}

impl Default for LifecycleTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_before_startup_is_terminal() {
        let tracker = LifecycleTracker::new();
        assert!(tracker.stop());
        assert!(!tracker.stop());
        assert_eq!(
            tracker.start().unwrap_err(),
            OmsError::InvalidState {
                state: LifecycleState::Stopped,
                operation: "startup",
            }
        );
    }

    #[test]
    fn not_running_reports_state() {
        let tracker = LifecycleTracker::new();
        assert_eq!(
            tracker.ensure_running().unwrap_err(),
            OmsError::NotRunning {
                state: LifecycleState::Created
            }
        );
        tracker.start().unwrap();
        assert!(tracker.ensure_running().is_ok());
    }

    #[test]
    fn concurrent_starts_transition_once() {
        let tracker = std::sync::Arc::new(LifecycleTracker::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                std::thread::spawn(move || tracker.start().unwrap())
            })
            .collect();
        let transitions = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|started| *started)
            .count();
        assert_eq!(transitions, 1);
    }

    #[test]
    fn state_display() {
        assert_eq!(LifecycleState::Running.to_string(), "running");
    }
}
