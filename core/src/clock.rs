//! Clock abstraction for message timestamps.
//!
//! Drivers stamp messages through a [`Clock`] instead of calling
//! `Utc::now()` directly so that time-based seeks can be tested with a
//! deterministic clock.

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// # Examples
///
/// ```
/// use openmessaging_core::clock::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// let before = clock.now();
/// assert!(clock.now() >= before);
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
