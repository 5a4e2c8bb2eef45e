// Host-qualified worker identity
// reason: sysinfo for cross-platform host name lookup

use dray_core::port::IdProvider;
use sysinfo::System;

/// Produces worker ids of the form `{hostname}:{uuid-v4}`.
///
/// The host part makes a worker traceable to its machine in the heartbeat
/// registry; the random part makes every process instance unique, so an id
/// is never reused across restarts.
pub struct HostIdProvider;

impl IdProvider for HostIdProvider {
    fn generate_id(&self) -> String {
        let host = System::host_name().unwrap_or_else(|| "unknown-host".to_string());
        format!("{}:{}", host, uuid::Uuid::new_v4())
    }
}
