// ID Provider Port (for deterministic testing)

/// Worker identity provider.
///
/// A worker id must be unique per process instance and is never reused. The
/// production implementation (infra-system crate) qualifies the random
/// component with the host name.
pub trait IdProvider: Send + Sync {
    /// Generate a fresh worker id
    fn generate_id(&self) -> String;
}

/// UUID v4 provider (unqualified; tests and tools)
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn generate_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
