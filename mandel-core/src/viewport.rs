//! # Viewport - Pixel to Complex Plane Mapping
//!
//! The viewport is an affine map from integer pixel coordinates to points in
//! the complex plane:
//!
//! ```text
//! re = min_x + px · step
//! im = min_y + py · step
//! ```
//!
//! Zooming reinterprets a pixel as the new centre of a logical viewer of
//! `2 · half_width` pixels and divides `step` by a fixed factor, so deep
//! magnification is reached by repeated zooms rather than by tracking a
//! fractional zoom level.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Plane coordinate of pixel (0, 0) on both axes in the canonical view.
pub const DEFAULT_MIN: f64 = -2.0;
/// Plane distance per pixel in the canonical view.
pub const DEFAULT_STEP: f64 = 0.005;
/// Magnification applied by a single zoom.
pub const ZOOM_FACTOR: f64 = 10.0;
/// Logical width of the viewer in pixels. Tiles are laid out across this
/// width by the front end; zoom recentring assumes it.
pub const VIEWER_WIDTH: u32 = 800;
/// Half of [`VIEWER_WIDTH`]. Must stay in sync with the viewer geometry or
/// the zoomed point will not land in the middle of the user's screen.
pub const HALF_WIDTH: i64 = (VIEWER_WIDTH / 2) as i64;

#[derive(Debug, Error, PartialEq)]
pub enum ViewportError {
    #[error("Zoom factor must be finite and greater than 1 (got {0})")]
    InvalidFactor(f64),
    #[error("Half width must not be negative (got {0})")]
    InvalidHalfWidth(i64),
    #[error("Viewer width must be positive")]
    EmptyViewer,
}

// ============================================================================
// Complex Plane
// ============================================================================

/// Point in the complex plane
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    #[inline]
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Magnitude squared (avoids sqrt)
    #[inline]
    pub fn norm_sqr(&self) -> f64 {
        self.re * self.re + self.im * self.im
    }
}

// ============================================================================
// Zoom Configuration
// ============================================================================

/// Constants of the zoom transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomConfig {
    /// Divisor applied to `step` on every zoom
    pub factor: f64,
    /// Pixel offset from the new `min` corner to the zoom centre
    pub half_width: i64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            factor: ZOOM_FACTOR,
            half_width: HALF_WIDTH,
        }
    }
}

impl ZoomConfig {
    pub fn new(factor: f64, half_width: i64) -> Result<Self, ViewportError> {
        if !factor.is_finite() || factor <= 1.0 {
            return Err(ViewportError::InvalidFactor(factor));
        }
        if half_width < 0 {
            return Err(ViewportError::InvalidHalfWidth(half_width));
        }
        Ok(Self { factor, half_width })
    }

    /// Zoom constants for a viewer `width` pixels wide, default factor.
    pub fn for_viewer_width(width: u32) -> Result<Self, ViewportError> {
        if width == 0 {
            return Err(ViewportError::EmptyViewer);
        }
        Self::new(ZOOM_FACTOR, i64::from(width / 2))
    }
}

// ============================================================================
// Viewport
// ============================================================================

/// Affine pixel-to-plane mapping. `step > 0` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub min_x: f64,
    pub min_y: f64,
    pub step: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            min_x: DEFAULT_MIN,
            min_y: DEFAULT_MIN,
            step: DEFAULT_STEP,
        }
    }
}

impl Viewport {
    /// Plane coordinate under pixel `(px, py)`
    #[inline]
    pub fn point_at(&self, px: i64, py: i64) -> Complex {
        Complex::new(
            self.min_x + px as f64 * self.step,
            self.min_y + py as f64 * self.step,
        )
    }

    /// The viewport after zooming in on pixel `(px, py)`.
    ///
    /// Any pixel is accepted, including ones far outside anything rendered.
    pub fn zoomed(&self, px: i64, py: i64, config: &ZoomConfig) -> Viewport {
        let centre = self.point_at(px, py);
        let step = self.step / config.factor;
        let offset = step * config.half_width as f64;
        Viewport {
            min_x: centre.re - offset,
            min_y: centre.im - offset,
            step,
        }
    }
}

// ============================================================================
// Shared State
// ============================================================================

/// The process-wide viewport, owned explicitly and guarded by a lock.
///
/// `reset`, `zoom` and `snapshot` are atomic with respect to each other, so a
/// reader never sees a half-written viewport.
#[derive(Debug, Default)]
pub struct SharedViewport {
    current: RwLock<Viewport>,
    zoom: ZoomConfig,
}

impl SharedViewport {
    pub fn new(zoom: ZoomConfig) -> Self {
        Self {
            current: RwLock::new(Viewport::default()),
            zoom,
        }
    }

    pub fn zoom_config(&self) -> ZoomConfig {
        self.zoom
    }

    /// Restore the canonical view.
    pub fn reset(&self) {
        *self.current.write() = Viewport::default();
        debug!("Viewport reset");
    }

    /// Zoom in on pixel `(px, py)` of the current view and return the result.
    pub fn zoom(&self, px: i64, py: i64) -> Viewport {
        let mut current = self.current.write();
        let next = current.zoomed(px, py, &self.zoom);
        *current = next;
        drop(current);

        debug!(
            px,
            py,
            min_x = next.min_x,
            min_y = next.min_y,
            step = next.step,
            "Viewport zoomed"
        );
        next
    }

    /// Immutable copy of the current viewport.
    pub fn snapshot(&self) -> Viewport {
        *self.current.read()
    }
}

// ============================================================================
// Tests
// ============================================================================
