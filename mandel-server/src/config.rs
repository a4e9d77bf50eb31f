//! Server configuration.
//!
//! Precedence, lowest first: built-in defaults, `--config <file>` (JSON),
//! `MANDEL_BIND`, then command-line flags.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mandel_core::{ZoomConfig, DEFAULT_TILE_SIZE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::REQUEST_TIMEOUT;

pub const BIND_ENV: &str = "MANDEL_BIND";
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing value for {0}")]
    MissingValue(String),
    #[error("Invalid value for {flag}: {value}")]
    InvalidValue { flag: String, value: String },
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Viewer width must be positive and even (got {0})")]
    InvalidViewerWidth(u32),
    #[error("Tile size must be positive")]
    InvalidTileSize,
    #[error("Request timeout must be positive")]
    InvalidRequestTimeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind: SocketAddr,
    /// Logical width of the viewer page in pixels; zoom recentres on its middle
    pub viewer_width: u32,
    /// Edge length of the tiles the viewer requests
    pub tile_size: u32,
    /// Milliseconds a client may take to send its request head
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            viewer_width: mandel_core::viewport::VIEWER_WIDTH,
            tile_size: DEFAULT_TILE_SIZE,
            request_timeout_ms: REQUEST_TIMEOUT.as_millis() as u64,
        }
    }
}

/// What the command line asked for
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Serve(ServerConfig),
    Help,
}

impl ServerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the configuration from `args` (including the program name) and
    /// the value of `MANDEL_BIND`, if set.
    pub fn from_args(args: &[String], env_bind: Option<&str>) -> Result<Command, ConfigError> {
        let mut config_path: Option<PathBuf> = None;
        let mut bind: Option<String> = None;
        let mut viewer_width: Option<u32> = None;
        let mut tile_size: Option<u32> = None;
        let mut request_timeout_ms: Option<u64> = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--config" | "-c" => {
                    config_path = Some(PathBuf::from(flag_value(args, i)?));
                    i += 2;
                }
                "--bind" | "-b" => {
                    bind = Some(flag_value(args, i)?.to_string());
                    i += 2;
                }
                "--viewer-width" => {
                    viewer_width = Some(parse_flag(args, i)?);
                    i += 2;
                }
                "--tile-size" => {
                    tile_size = Some(parse_flag(args, i)?);
                    i += 2;
                }
                "--request-timeout-ms" => {
                    request_timeout_ms = Some(parse_flag(args, i)?);
                    i += 2;
                }
                "--help" | "-h" => return Ok(Command::Help),
                other => {
                    return Err(ConfigError::InvalidValue {
                        flag: "argument".into(),
                        value: other.to_string(),
                    })
                }
            }
        }

        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Some(addr) = bind.as_deref().or(env_bind) {
            config.bind = addr.parse().map_err(|_| ConfigError::InvalidValue {
                flag: "--bind".into(),
                value: addr.to_string(),
            })?;
        }
        if let Some(width) = viewer_width {
            config.viewer_width = width;
        }
        if let Some(size) = tile_size {
            config.tile_size = size;
        }
        if let Some(ms) = request_timeout_ms {
            config.request_timeout_ms = ms;
        }

        config.validate()?;
        Ok(Command::Serve(config))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewer_width == 0 || self.viewer_width % 2 != 0 {
            return Err(ConfigError::InvalidViewerWidth(self.viewer_width));
        }
        if self.tile_size == 0 {
            return Err(ConfigError::InvalidTileSize);
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidRequestTimeout);
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn zoom_config(&self) -> Result<ZoomConfig, ConfigError> {
        ZoomConfig::for_viewer_width(self.viewer_width)
            .map_err(|_| ConfigError::InvalidViewerWidth(self.viewer_width))
    }
}

fn flag_value<'a>(args: &'a [String], i: usize) -> Result<&'a str, ConfigError> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| ConfigError::MissingValue(args[i].clone()))
}

fn parse_flag<T: std::str::FromStr>(args: &[String], i: usize) -> Result<T, ConfigError> {
    let value = flag_value(args, i)?;
    value.parse().map_err(|_| ConfigError::InvalidValue {
        flag: args[i].clone(),
        value: value.to_string(),
    })
}

pub fn print_usage() {
    eprintln!("Usage: mandel-server [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>       JSON configuration file");
    eprintln!("  -b, --bind <ADDR>         Listen address (default {}, env {})", DEFAULT_BIND, BIND_ENV);
    eprintln!("      --viewer-width <PX>   Logical viewer width (default 800)");
    eprintln!("      --tile-size <PX>      Tile edge length (default 100)");
    eprintln!("      --request-timeout-ms <MS>  Time allowed to send a request (default 10000)");
    eprintln!("  -h, --help                Show this help");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("mandel-server")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    fn serve(cmd: Command) -> ServerConfig {
        match cmd {
            Command::Serve(config) => config,
            Command::Help => panic!("expected serve"),
        }
    }

    #[test]
    fn test_defaults() {
        let config = serve(ServerConfig::from_args(&args(&[]), None).unwrap());
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert_eq!(config.zoom_config().unwrap().half_width, 400);
        assert_eq!(config.request_timeout(), REQUEST_TIMEOUT);
    }

    #[test]
    fn test_request_timeout_flag() {
        let config = serve(
            ServerConfig::from_args(&args(&["--request-timeout-ms", "250"]), None).unwrap(),
        );
        assert_eq!(config.request_timeout(), Duration::from_millis(250));
        assert!(matches!(
            ServerConfig::from_args(&args(&["--request-timeout-ms", "0"]), None),
            Err(ConfigError::InvalidRequestTimeout)
        ));
    }

    #[test]
    fn test_flags_override_env() {
        let config = serve(
            ServerConfig::from_args(&args(&["--bind", "127.0.0.1:9000"]), Some("127.0.0.1:7000"))
                .unwrap(),
        );
        assert_eq!(config.bind.port(), 9000);

        let config = serve(ServerConfig::from_args(&args(&[]), Some("127.0.0.1:7000")).unwrap());
        assert_eq!(config.bind.port(), 7000);
    }

    #[test]
    fn test_geometry_flags() {
        let config = serve(
            ServerConfig::from_args(&args(&["--viewer-width", "1024", "--tile-size", "128"]), None)
                .unwrap(),
        );
        assert_eq!(config.viewer_width, 1024);
        assert_eq!(config.tile_size, 128);
        assert_eq!(config.zoom_config().unwrap().half_width, 512);
    }

    #[test]
    fn test_help() {
        assert_eq!(ServerConfig::from_args(&args(&["-h"]), None).unwrap(), Command::Help);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            ServerConfig::from_args(&args(&["--bind"]), None),
            Err(ConfigError::MissingValue(_))
        ));
        assert!(matches!(
            ServerConfig::from_args(&args(&["--tile-size", "big"]), None),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            ServerConfig::from_args(&args(&["--tile-size", "0"]), None),
            Err(ConfigError::InvalidTileSize)
        ));
        assert!(matches!(
            ServerConfig::from_args(&args(&["--viewer-width", "801"]), None),
            Err(ConfigError::InvalidViewerWidth(801))
        ));
        assert!(matches!(
            ServerConfig::from_args(&args(&[]), Some("not-an-address")),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            ServerConfig::from_args(&args(&["--verbose"]), None),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "bind": "127.0.0.1:8181", "tile_size": 50 }}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = serve(ServerConfig::from_args(&args(&["--config", &path]), None).unwrap());
        assert_eq!(config.bind.port(), 8181);
        assert_eq!(config.tile_size, 50);
        assert_eq!(config.viewer_width, 800);

        let config = serve(
            ServerConfig::from_args(&args(&["--config", &path, "--tile-size", "25"]), None)
                .unwrap(),
        );
        assert_eq!(config.tile_size, 25);
    }

    #[test]
    fn test_config_file_errors() {
        let missing = ServerConfig::from_file(Path::new("/nonexistent/mandel.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            ServerConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
