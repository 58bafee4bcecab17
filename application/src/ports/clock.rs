//! Wall clock port
//!
//! Use cases read the current instant through [`Clock`] so tests can pin time.
//! Timers (voting window, grace period, loop intervals) use the async
//! runtime's clock instead.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
