// dray Infrastructure - System Adapters
// Implements: IdProvider

pub mod host_identity;

pub use host_identity::HostIdProvider;
