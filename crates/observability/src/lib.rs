//! Process-wide tracing setup shared by the binaries.

/// Initialize structured logging from `RUST_LOG` and `LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

pub mod tracing;

pub use tracing::{LogFormat, init_with};
