//! Connection loop: one tokio task per connection, one request per
//! connection. Tile rendering is pushed onto the blocking pool.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::http::{read_request, Method, RequestError, Response, Status};
use crate::routes::{AppState, Route};

/// Accept connections until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    let addr = listener.local_addr()?;
    info!("Listening on http://{}", addr);

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let state = state.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, peer, state).await;
                        });
                    }
                    Err(e) => warn!("Accept failed: {}", e),
                }
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, state: Arc<AppState>) {
    let timeout = state.config.request_timeout();
    let request = match tokio::time::timeout(timeout, read_request(&mut stream)).await {
        Ok(Ok(r)) => r,
        Ok(Err(RequestError::Incomplete)) => return,
        Ok(Err(e)) => {
            debug!("Bad request from {}: {}", peer, e);
            let response = Response::text(Status::BadRequest, "Bad request");
            write_response(&mut stream, peer, &response, true).await;
            return;
        }
        Err(_) => {
            debug!("Request from {} timed out after {:?}", peer, timeout);
            let response = Response::text(Status::RequestTimeout, "Request timeout");
            write_response(&mut stream, peer, &response, true).await;
            return;
        }
    };

    debug!("{} {:?} {}", peer, request.method, request.path);
    let include_body = request.method != Method::Head;

    let response = match Route::resolve(&request) {
        Ok(route) => {
            match tokio::task::spawn_blocking(move || state.handle(route)).await {
                Ok(response) => response,
                Err(e) => {
                    error!("Handler panicked: {}", e);
                    Response::text(Status::InternalServerError, "Internal error")
                }
            }
        }
        Err(e) => e.into_response(),
    };

    write_response(&mut stream, peer, &response, include_body).await;
}

async fn write_response(
    stream: &mut TcpStream,
    peer: SocketAddr,
    response: &Response,
    include_body: bool,
) {
    if let Err(e) = response.write_to(stream, include_body).await {
        debug!("Failed to write response to {}: {}", peer, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::config::ServerConfig;
    use mandel_core::{Explorer, Viewport};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::oneshot;

    struct TestServer {
        addr: SocketAddr,
        state: Arc<AppState>,
        stop: Option<oneshot::Sender<()>>,
        task: tokio::task::JoinHandle<std::io::Result<()>>,
    }

    impl TestServer {
        async fn start() -> Self {
            Self::start_with(ServerConfig::default()).await
        }

        async fn start_with(config: ServerConfig) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let state = Arc::new(AppState::new(Explorer::default(), config));
            let (tx, rx) = oneshot::channel::<()>();
            let task = tokio::spawn(serve(listener, state.clone(), async move {
                let _ = rx.await;
            }));
            Self {
                addr,
                state,
                stop: Some(tx),
                task,
            }
        }

        async fn send(&self, raw: &str) -> (u16, Vec<u8>) {
            let mut stream = TcpStream::connect(self.addr).await.unwrap();
            stream.write_all(raw.as_bytes()).await.unwrap();
            let mut out = Vec::new();
            stream.read_to_end(&mut out).await.unwrap();

            let split = out.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
            let head = String::from_utf8_lossy(&out[..split]).to_string();
            let code = head[9..12].parse().unwrap();
            (code, out[split + 4..].to_vec())
        }

        async fn stop(mut self) {
            if let Some(tx) = self.stop.take() {
                let _ = tx.send(());
            }
            self.task.await.unwrap().unwrap();
        }
    }

    fn get(path: &str) -> String {
        format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path)
    }

    fn post(path: &str) -> String {
        format!("POST {} HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n", path)
    }

    #[tokio::test]
    async fn test_section_is_png() {
        let server = TestServer::start().await;
        let (code, body) = server.send(&get("/mandelbrot/section/300/300")).await;
        assert_eq!(code, 200);
        assert!(body.starts_with(b"\x89PNG\r\n\x1a\n"));

        let expected = server.state.explorer.render_tile_png(300, 300, 100).unwrap();
        assert_eq!(body, expected);
        server.stop().await;
    }

    #[tokio::test]
    async fn test_zoom_then_reset() {
        let server = TestServer::start().await;

        let (code, _) = server.send(&post("/mandelbrot/zoom/400/400")).await;
        assert_eq!(code, 202);
        let v = server.state.explorer.viewport();
        assert!((v.min_x - (-0.2)).abs() < 1e-12);
        assert!((v.step - 0.0005).abs() < 1e-12);

        let (code, _) = server.send(&post("/mandelbrot/reset")).await;
        assert_eq!(code, 202);
        assert_eq!(server.state.explorer.viewport(), Viewport::default());
        server.stop().await;
    }

    #[tokio::test]
    async fn test_client_errors() {
        let server = TestServer::start().await;

        let (code, body) = server.send(&post("/mandelbrot/zoom/left/4")).await;
        assert_eq!(code, 400);
        assert_eq!(body, b"Invalid x parameter\n");

        let (code, body) = server.send(&get("/mandelbrot/section/0/top")).await;
        assert_eq!(code, 400);
        assert_eq!(body, b"Invalid y parameter\n");

        let (code, _) = server.send(&get("/nope")).await;
        assert_eq!(code, 404);

        let (code, _) = server.send(&get("/mandelbrot/reset")).await;
        assert_eq!(code, 405);

        let (code, _) = server.send("NONSENSE\r\n\r\n").await;
        assert_eq!(code, 400);

        assert_eq!(server.state.explorer.viewport(), Viewport::default());
        server.stop().await;
    }

    #[tokio::test]
    async fn test_index_page() {
        let server = TestServer::start().await;
        let (code, body) = server.send(&get("/")).await;
        assert_eq!(code, 200);
        let page = String::from_utf8(body).unwrap();
        assert!(page.contains("/mandelbrot/section/"));
        server.stop().await;
    }

    #[tokio::test]
    async fn test_stalled_request_is_dropped() {
        let config = ServerConfig {
            request_timeout_ms: 200,
            ..ServerConfig::default()
        };
        let server = TestServer::start_with(config).await;

        // Head never terminated by a blank line
        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        stream.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n").await.unwrap();

        let mut out = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut out))
            .await
            .expect("server kept the stalled connection open")
            .unwrap();
        assert!(out.starts_with(b"HTTP/1.1 408"));

        // The listener keeps serving after dropping the stalled client.
        let (code, _) = server.send(&get("/")).await;
        assert_eq!(code, 200);
        server.stop().await;
    }
}
