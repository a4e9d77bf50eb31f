//! Minimal HTTP/1.1 framing: read one request head, write one response.
//!
//! Every connection carries a single request and is closed afterwards, so
//! request bodies are never read.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on the request line plus headers
pub const MAX_HEAD_BYTES: usize = 8192;
/// How long a client may take to deliver the request head
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Connection closed before request was complete")]
    Incomplete,
    #[error("Request head too large")]
    TooLarge,
    #[error("Malformed request line: {0:?}")]
    Malformed(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Head,
    Other,
}

impl Method {
    fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "HEAD" => Method::Head,
            _ => Method::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Path without the query string
    pub path: String,
}

impl Request {
    /// Parse the request line out of a request head.
    pub fn parse(head: &str) -> Result<Self, RequestError> {
        let line = head.lines().next().unwrap_or("");
        let mut parts = line.split_whitespace();
        let (method, target, version) = match (parts.next(), parts.next(), parts.next()) {
            (Some(m), Some(t), Some(v)) if parts.next().is_none() => (m, t, v),
            _ => return Err(RequestError::Malformed(line.to_string())),
        };
        if !version.starts_with("HTTP/1.") || !target.starts_with('/') {
            return Err(RequestError::Malformed(line.to_string()));
        }

        let path = target.split(['?', '#']).next().unwrap_or(target);
        Ok(Self {
            method: Method::parse(method),
            path: path.to_string(),
        })
    }
}

/// Read bytes until the blank line that ends the request head.
pub async fn read_request<R>(reader: &mut R) -> Result<Request, RequestError>
where
    R: AsyncRead + Unpin,
{
    let mut head = Vec::with_capacity(1024);
    let mut buf = [0u8; 1024];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Err(RequestError::Incomplete);
        }
        head.extend_from_slice(&buf[..n]);

        if let Some(end) = find_head_end(&head) {
            head.truncate(end);
            break;
        }
        if head.len() > MAX_HEAD_BYTES {
            return Err(RequestError::TooLarge);
        }
    }

    Request::parse(&String::from_utf8_lossy(&head))
}

fn find_head_end(bytes: &[u8]) -> Option<usize> {
    bytes.windows(4).position(|w| w == b"\r\n\r\n")
}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Accepted,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    RequestTimeout,
    InternalServerError,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Accepted => 202,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::MethodNotAllowed => 405,
            Status::RequestTimeout => 408,
            Status::InternalServerError => 500,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Accepted => "Accepted",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::MethodNotAllowed => "Method Not Allowed",
            Status::RequestTimeout => "Request Timeout",
            Status::InternalServerError => "Internal Server Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: Status, content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }

    pub fn empty(status: Status) -> Self {
        Self::new(status, "text/plain; charset=utf-8", Vec::new())
    }

    pub fn text(status: Status, message: &str) -> Self {
        Self::new(status, "text/plain; charset=utf-8", format!("{}\n", message).into_bytes())
    }

    pub fn html(body: String) -> Self {
        Self::new(Status::Ok, "text/html; charset=utf-8", body.into_bytes())
    }

    pub fn png(body: Vec<u8>) -> Self {
        Self::new(Status::Ok, "image/png", body)
    }

    pub fn head(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Cache-Control: no-store\r\n\
             Connection: close\r\n\r\n",
            self.status.code(),
            self.status.reason(),
            self.content_type,
            self.body.len()
        )
    }

    pub async fn write_to<W>(&self, writer: &mut W, include_body: bool) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(self.head().as_bytes()).await?;
        if include_body {
            writer.write_all(&self.body).await?;
        }
        writer.flush().await
    }
}
