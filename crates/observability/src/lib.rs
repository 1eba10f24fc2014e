//! Process-wide logging setup shared by the pantry binaries.

/// Initialize logging with the default filter (`info`).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_DIRECTIVE);
}

/// Subscriber configuration (filters, output format).
pub mod tracing;
