//! Time source for deadlines and cooldowns
use crate::types::Timestamp;
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock {
    /// Current unix time in seconds
    fn now(&self) -> Timestamp;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // a clock set before 1970 reads as the epoch
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0)
    }
}
