//! # Explorer
//!
//! The synchronous API a transport layer calls: reset the view, zoom the
//! view, render a tile. Cloning an `Explorer` shares the same viewport.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::encode::{encode_png, EncodeError};
use crate::tile::{Tile, TileError, TileRenderer, TileRequest};
use crate::viewport::{SharedViewport, Viewport, ZoomConfig};

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error(transparent)]
    Tile(#[from] TileError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

#[derive(Debug, Clone)]
pub struct Explorer {
    renderer: TileRenderer,
}

impl Default for Explorer {
    fn default() -> Self {
        Self::new(ZoomConfig::default())
    }
}

impl Explorer {
    pub fn new(zoom: ZoomConfig) -> Self {
        Self::with_viewport(Arc::new(SharedViewport::new(zoom)))
    }

    pub fn with_viewport(viewport: Arc<SharedViewport>) -> Self {
        Self {
            renderer: TileRenderer::new(viewport),
        }
    }

    /// Current viewport
    pub fn viewport(&self) -> Viewport {
        self.renderer.shared_viewport().snapshot()
    }

    pub fn reset_viewport(&self) {
        self.renderer.shared_viewport().reset();
    }

    pub fn zoom_viewport(&self, px: i64, py: i64) -> Viewport {
        self.renderer.shared_viewport().zoom(px, py)
    }

    pub fn render_tile(&self, origin_x: i64, origin_y: i64, size: u32) -> Result<Tile, TileError> {
        let request = TileRequest::new(origin_x, origin_y, size)?;
        Ok(self.renderer.render(&request))
    }

    /// Render a tile and encode it as PNG
    pub fn render_tile_png(
        &self,
        origin_x: i64,
        origin_y: i64,
        size: u32,
    ) -> Result<Vec<u8>, ExplorerError> {
        let tile = self.render_tile(origin_x, origin_y, size)?;
        let png = encode_png(&tile)?;
        debug!(origin_x, origin_y, size, bytes = png.len(), "Encoded tile");
        Ok(png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explorer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Explorer>();
    }

    #[test]
    fn test_clones_share_viewport() {
        let a = Explorer::default();
        let b = a.clone();
        let zoomed = a.zoom_viewport(400, 400);
        assert_eq!(b.viewport(), zoomed);

        b.reset_viewport();
        assert_eq!(a.viewport(), Viewport::default());
    }

    #[test]
    fn test_render_tile() {
        let explorer = Explorer::default();
        let tile = explorer.render_tile(-40, 80, 20).unwrap();
        assert_eq!(tile.origin(), (-40, 80));
        assert_eq!(tile.as_raw().len(), 20 * 20 * 4);
        assert!(matches!(explorer.render_tile(0, 0, 0), Err(TileError::EmptyTile)));
    }

    #[test]
    fn test_render_tile_png() {
        let explorer = Explorer::default();
        let png = explorer.render_tile_png(0, 0, 100).unwrap();
        assert!(png.starts_with(b"\x89PNG"));
        assert!(matches!(
            explorer.render_tile_png(0, 0, 0),
            Err(ExplorerError::Tile(TileError::EmptyTile))
        ));
    }

    #[test]
    fn test_viewport_serializes() {
        let explorer = Explorer::default();
        let json = serde_json::to_value(explorer.viewport()).unwrap();
        assert_eq!(json["min_x"], -2.0);
        assert_eq!(json["step"], 0.005);
    }
}
