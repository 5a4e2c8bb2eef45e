// Time Provider Port (for testability)

/// Time provider interface (allows mocking in tests)
///
/// Unix seconds is the wire granularity: heartbeat timestamps and in-flight
/// start times are stored as whole seconds.
pub trait TimeProvider: Send + Sync {
    /// Current time in seconds since epoch
    fn now_secs(&self) -> i64;
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

pub mod mocks {
    use super::TimeProvider;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Settable clock for deterministic staleness and heartbeat tests.
    pub struct MockTimeProvider {
        now: AtomicI64,
    }

    impl MockTimeProvider {
        pub fn new(start_secs: i64) -> Self {
            Self {
                now: AtomicI64::new(start_secs),
            }
        }

        /// Move the clock forward.
        pub fn advance(&self, secs: i64) {
            self.now.fetch_add(secs, Ordering::SeqCst);
        }

        pub fn set(&self, secs: i64) {
            self.now.store(secs, Ordering::SeqCst);
        }
    }

    impl TimeProvider for MockTimeProvider {
        fn now_secs(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }
    }
}
