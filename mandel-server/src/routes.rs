//! Route table and handlers.
//!
//! ```text
//! GET  /                          viewer page
//! POST /mandelbrot/reset          reset viewport        202
//! POST /mandelbrot/zoom/{x}/{y}   zoom on pixel         202
//! GET  /mandelbrot/section/{x}/{y} PNG tile at origin   200
//! ```

use mandel_core::Explorer;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::http::{Method, Request, Response, Status};

const INDEX_TEMPLATE: &str = include_str!("../static/index.html");

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    /// A path parameter is not an integer
    #[error("Invalid {0} parameter")]
    InvalidInput(&'static str),
}

impl RouteError {
    pub fn into_response(self) -> Response {
        let status = match &self {
            RouteError::NotFound => Status::NotFound,
            RouteError::MethodNotAllowed => Status::MethodNotAllowed,
            RouteError::InvalidInput(_) => Status::BadRequest,
        };
        Response::text(status, &self.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Index,
    Reset,
    Zoom { x: i64, y: i64 },
    Section { x: i64, y: i64 },
}

impl Route {
    pub fn resolve(request: &Request) -> Result<Self, RouteError> {
        let segments: Vec<&str> = request.path.trim_start_matches('/').split('/').collect();

        // A bad parameter only surfaces once the method is known to fit.
        let (route, needs_post) = match segments.as_slice() {
            [""] => (Ok(Route::Index), false),
            ["mandelbrot", "reset"] => (Ok(Route::Reset), true),
            ["mandelbrot", "zoom", x, y] => {
                (parse_pixel(x, y).map(|(x, y)| Route::Zoom { x, y }), true)
            }
            ["mandelbrot", "section", x, y] => {
                (parse_pixel(x, y).map(|(x, y)| Route::Section { x, y }), false)
            }
            _ => return Err(RouteError::NotFound),
        };

        let allowed = if needs_post {
            request.method == Method::Post
        } else {
            matches!(request.method, Method::Get | Method::Head)
        };
        if !allowed {
            return Err(RouteError::MethodNotAllowed);
        }
        route
    }
}

fn parse_pixel(x: &str, y: &str) -> Result<(i64, i64), RouteError> {
    let x = x.parse().map_err(|_| RouteError::InvalidInput("x"))?;
    let y = y.parse().map_err(|_| RouteError::InvalidInput("y"))?;
    Ok((x, y))
}

// ============================================================================
// Handlers
// ============================================================================

/// Shared state for all connections
#[derive(Debug, Clone)]
pub struct AppState {
    pub explorer: Explorer,
    pub config: ServerConfig,
    index_page: String,
}

impl AppState {
    pub fn new(explorer: Explorer, config: ServerConfig) -> Self {
        let index_page = INDEX_TEMPLATE
            .replace("{{tile_size}}", &config.tile_size.to_string())
            .replace("{{viewer_width}}", &config.viewer_width.to_string());
        Self {
            explorer,
            config,
            index_page,
        }
    }

    /// Run a resolved route. Section renders are CPU-bound; call this from
    /// a blocking context.
    pub fn handle(&self, route: Route) -> Response {
        match route {
            Route::Index => Response::html(self.index_page.clone()),
            Route::Reset => {
                self.explorer.reset_viewport();
                info!("Viewport reset");
                Response::empty(Status::Accepted)
            }
            Route::Zoom { x, y } => {
                let v = self.explorer.zoom_viewport(x, y);
                info!(x, y, step = v.step, "Zoomed");
                Response::empty(Status::Accepted)
            }
            Route::Section { x, y } => {
                match self.explorer.render_tile_png(x, y, self.config.tile_size) {
                    Ok(png) => {
                        debug!(x, y, "Served section");
                        Response::png(png)
                    }
                    Err(e) => {
                        error!("Failed to render section ({}, {}): {}", x, y, e);
                        Response::text(Status::InternalServerError, "Failed to render section")
                    }
                }
            }
        }
    }
}
