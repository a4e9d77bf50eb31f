//! # Mandel Core
//!
//! Escape-time rendering of square Mandelbrot tiles against a single
//! shared, zoomable viewport.
//!
//! ```text
//! SharedViewport ──snapshot──▶ TileRenderer ──per pixel──▶ escape::evaluate
//!                                                            │
//!                                   Tile (RGBA) ◀── color::map_color
//! ```
//!
//! The core is synchronous and total: every operation runs to completion
//! on the calling thread and never fails for well-formed input.

// ============================================================================
// Numeric Core
// ============================================================================
pub mod viewport;
pub mod escape;
pub mod color;

// ============================================================================
// Rendering
// ============================================================================
pub mod tile;
pub mod encode;

// ============================================================================
// Public API
// ============================================================================
pub mod explorer;

pub use color::map_color;
pub use encode::{encode_png, EncodeError};
pub use escape::{evaluate, EscapeResult, MAX_ITERATIONS};
pub use explorer::{Explorer, ExplorerError};
pub use tile::{Tile, TileError, TileRenderer, TileRequest, DEFAULT_TILE_SIZE};
pub use viewport::{Complex, SharedViewport, Viewport, ViewportError, ZoomConfig};

// ============================================================================
// Version
// ============================================================================
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
