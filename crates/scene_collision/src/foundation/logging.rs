//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// The library itself never installs a logger; binaries call this once at startup.
pub fn init() {
    env_logger::init();
}
