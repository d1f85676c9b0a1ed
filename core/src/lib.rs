//! # Lumen Core
//!
//! Basic utilities shared by the Lumen crates: rendering math and profiling
//! instrumentation.

pub mod math;
pub mod profiling;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the core version. Call once at startup.
pub fn init() {
    log::info!("Lumen Core v{} initialized", VERSION);
}
