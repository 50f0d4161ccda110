//! Process-wide tracing setup shared by the binaries.

/// Initialize tracing with JSON output.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(LogFormat::Json);
}

pub use self::tracing::{LogFormat, init as init_with_format};

/// Tracing configuration (filters, layers).
pub mod tracing;
