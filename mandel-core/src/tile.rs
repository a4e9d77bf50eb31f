//! # Tile Renderer
//!
//! Turns a tile request (pixel origin + edge length) into an RGBA raster.
//!
//! Every pixel of one tile is evaluated against the same [`Viewport`]
//! snapshot, taken once when the render starts. A zoom or reset that lands
//! while the tile is being computed affects the next tile, never this one.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::escape::evaluate_point;
use crate::viewport::{SharedViewport, Viewport};

/// Edge length of the tiles requested by the viewer
pub const DEFAULT_TILE_SIZE: u32 = 100;
/// RGBA
pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TileError {
    #[error("Tile size must be positive")]
    EmptyTile,
}

// ============================================================================
// Request
// ============================================================================

/// A square block of pixels, `size` wide, whose top-left pixel is `origin`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRequest {
    pub origin_x: i64,
    pub origin_y: i64,
    pub size: u32,
}

impl TileRequest {
    pub fn new(origin_x: i64, origin_y: i64, size: u32) -> Result<Self, TileError> {
        if size == 0 {
            return Err(TileError::EmptyTile);
        }
        Ok(Self {
            origin_x,
            origin_y,
            size,
        })
    }

    /// Tile of [`DEFAULT_TILE_SIZE`] at the given origin
    pub fn at(origin_x: i64, origin_y: i64) -> Self {
        Self {
            origin_x,
            origin_y,
            size: DEFAULT_TILE_SIZE,
        }
    }

    fn buffer_len(&self) -> usize {
        let edge = self.size as usize;
        edge * edge * BYTES_PER_PIXEL
    }
}

// ============================================================================
// Tile
// ============================================================================

/// Rendered tile. Pixels are row-major RGBA8, image-local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    request: TileRequest,
    viewport: Viewport,
    buffer: Vec<u8>,
}

impl Tile {
    pub fn origin(&self) -> (i64, i64) {
        (self.request.origin_x, self.request.origin_y)
    }

    pub fn size(&self) -> u32 {
        self.request.size
    }

    pub fn request(&self) -> &TileRequest {
        &self.request
    }

    /// The viewport snapshot every pixel was evaluated against
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Raw RGBA bytes
    pub fn as_raw(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.buffer
    }

    /// Pixel at image-local `(x, y)`, or `None` outside the tile
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.request.size || y >= self.request.size {
            return None;
        }
        let idx = (y as usize * self.request.size as usize + x as usize) * BYTES_PER_PIXEL;
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.buffer[idx..idx + BYTES_PER_PIXEL]);
        Some(px)
    }
}

// ============================================================================
// Renderer
// ============================================================================

/// Renders tiles against a shared viewport
#[derive(Debug, Clone)]
pub struct TileRenderer {
    viewport: Arc<SharedViewport>,
}

impl TileRenderer {
    pub fn new(viewport: Arc<SharedViewport>) -> Self {
        Self { viewport }
    }

    pub fn shared_viewport(&self) -> &Arc<SharedViewport> {
        &self.viewport
    }

    /// Render against one snapshot of the shared viewport.
    pub fn render(&self, request: &TileRequest) -> Tile {
        let snapshot = self.viewport.snapshot();
        Self::render_with(&snapshot, request)
    }

    /// Render against an explicit viewport.
    pub fn render_with(viewport: &Viewport, request: &TileRequest) -> Tile {
        trace!(
            origin_x = request.origin_x,
            origin_y = request.origin_y,
            size = request.size,
            "Rendering tile"
        );

        let mut buffer = vec![0u8; request.buffer_len()];
        // An empty buffer yields no rows; keep the chunk length non-zero.
        let row_len = (request.size as usize * BYTES_PER_PIXEL).max(BYTES_PER_PIXEL);

        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;

            buffer
                .par_chunks_mut(row_len)
                .enumerate()
                .for_each(|(row, pixels)| render_row(viewport, request, row, pixels));
        }

        #[cfg(not(feature = "rayon"))]
        {
            for (row, pixels) in buffer.chunks_mut(row_len).enumerate() {
                render_row(viewport, request, row, pixels);
            }
        }

        Tile {
            request: *request,
            viewport: *viewport,
            buffer,
        }
    }
}

/// Fill one image-local row of the tile.
fn render_row(viewport: &Viewport, request: &TileRequest, row: usize, pixels: &mut [u8]) {
    let py = request.origin_y.saturating_add(row as i64);
    for (col, pixel) in pixels.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
        let px = request.origin_x.saturating_add(col as i64);
        let color = evaluate_point(viewport.point_at(px, py)).color();
        pixel.copy_from_slice(&color.0);
    }
}

// ============================================================================
// Tests
// ============================================================================
