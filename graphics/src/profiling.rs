//! Profiling support via Tracy.
//!
//! Re-exports the CPU profiling macros from [`lumen_core::profiling`]. They
//! compile to nothing unless the `profiling` feature is enabled:
//!
//! ```toml
//! [dependencies]
//! lumen-graphics = { version = "0.1", features = ["profiling"] }
//! ```
//!
//! The render state marks frame boundaries in `end_frame` and plots staging
//! ring usage per frame:
//!
//! | Plot | Value |
//! |------|-------|
//! | `staging_vertex_bytes` | vertex ring bytes used by the submitted frame |
//! | `staging_index_bytes` | index ring bytes used by the submitted frame |
//! | `staging_uniform_bytes` | uniform ring bytes used by the submitted frame |
//!
//! ```ignore
//! use lumen_graphics::profiling::profile_scope;
//!
//! fn draw_particles(state: &mut RenderState) -> Result<(), GraphicsError> {
//!     profile_scope!("draw_particles");
//!     // ...
//! }
//! ```

pub use lumen_core::profiling::*;
