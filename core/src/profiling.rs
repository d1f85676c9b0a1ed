//! Tracy instrumentation for the frame loop.
//!
//! Build with the `profiling` feature to stream frame marks, spans and the
//! staging-usage plots to a Tracy client. Without it the macros expand to
//! nothing (plots still evaluate their value expression once).
//!
//! ```ignore
//! use lumen_core::profiling::{frame_mark, profile_plot, profile_scope};
//!
//! profile_scope!("end_frame");
//! profile_plot!("staging_vertex_bytes", used);
//! frame_mark!();
//! ```

#[cfg(feature = "profiling")]
pub use tracy_client::{frame_mark as tracy_frame_mark, plot as tracy_plot, span as tracy_span};

/// Close the current frame in Tracy. Call after the frame is submitted.
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! frame_mark {
    () => {
        $crate::profiling::tracy_frame_mark()
    };
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! frame_mark {
    () => {};
}

/// Open a named span that lasts until the end of the enclosing block.
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {
        let _lumen_span = $crate::profiling::tracy_span!($name);
    };
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {};
}

/// Record a sample of a numeric series, e.g. bytes used in a staging ring.
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_plot {
    ($name:expr, $value:expr) => {
        $crate::profiling::tracy_plot!($name, $value as f64)
    };
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_plot {
    ($name:expr, $value:expr) => {
        let _ = $value;
    };
}

pub use frame_mark;
pub use profile_plot;
pub use profile_scope;
