// Worker constants (no magic values in the loops)
use std::time::Duration;

/// Interval between heartbeat checkins (30s)
pub const CHECKIN_INTERVAL: Duration = Duration::from_secs(30);

/// Sleep duration when every assigned queue is empty (5s)
pub const NO_WORK_DELAY: Duration = Duration::from_secs(5);

/// Sleep duration after a poll-loop error before the next attempt (5s)
pub const INTERNAL_ERROR_DELAY: Duration = Duration::from_secs(5);

/// Bound of the error-event channel; events beyond it are dropped rather
/// than ever blocking a loop
pub const ERROR_CHANNEL_CAPACITY: usize = 64;
