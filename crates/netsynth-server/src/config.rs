//! Server configuration read from environment variables.
//!
//! Every limit is a configuration point. Unset variables use the defaults
//! below; values that fail to parse fall back to the default with a warning.
//!
//! | Variable | Default |
//! |---|---|
//! | `NETSYNTH_HOST` | `0.0.0.0` |
//! | `NETSYNTH_PORT` (or `PORT`) | `10000` |
//! | `NETSYNTH_YOSYS_BIN` | `yosys` |
//! | `NETSYNTH_TIMEOUT_SECS` | `60` (at most one week) |
//! | `NETSYNTH_MAX_REQUEST_BYTES` | `2097152` |
//! | `NETSYNTH_MAX_SOURCE_BYTES` | `1048576` |
//! | `NETSYNTH_OUTPUT_CAP_BYTES` | `1048576` |
//! | `NETSYNTH_MAX_NETLIST_BYTES` | `67108864` |
//! | `NETSYNTH_LOG_EXCERPT_CHARS` | `2000` |
//! | `NETSYNTH_MAX_CONCURRENT` | available parallelism |
//! | `NETSYNTH_QUEUE_DEPTH` | `16` |
//! | `NETSYNTH_ADMISSION` | `queue` |
//! | `NETSYNTH_QUEUE_TIMEOUT_SECS` | `120` |
//! | `NETSYNTH_SCRATCH_DIR` | system temp dir |
//! | `NETSYNTH_ALLOWED_ORIGINS` | any origin |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use netsynth_runner::{DEFAULT_MAX_NETLIST_BYTES, MAX_TOOL_TIMEOUT};

use crate::concurrency::AdmissionMode;

/// Runtime configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path or name of the Yosys executable.
    pub yosys_bin: PathBuf,
    /// Default and maximum wall-clock time for one tool run.
    pub timeout: Duration,
    /// Maximum request body size.
    pub max_request_bytes: usize,
    /// Maximum design source size.
    pub max_source_bytes: usize,
    /// Bytes retained per captured output stream.
    pub output_cap_bytes: usize,
    /// Largest `out.json` the server will read.
    pub max_netlist_bytes: u64,
    /// Characters of stdout/stderr returned in responses.
    pub log_excerpt_chars: usize,
    /// Concurrent tool runs.
    pub max_concurrent: usize,
    /// Requests allowed to wait for a slot in queue mode.
    pub queue_depth: usize,
    pub admission_mode: AdmissionMode,
    /// Longest time a queued request waits for a slot.
    pub queue_timeout: Duration,
    /// Parent directory of per-job workspaces.
    pub scratch_dir: PathBuf,
    /// CORS origins; empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 10000,
            yosys_bin: PathBuf::from("yosys"),
            timeout: Duration::from_secs(60),
            max_request_bytes: 2 * 1024 * 1024,
            max_source_bytes: 1024 * 1024,
            output_cap_bytes: 1024 * 1024,
            max_netlist_bytes: DEFAULT_MAX_NETLIST_BYTES,
            log_excerpt_chars: 2000,
            max_concurrent: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2),
            queue_depth: 16,
            admission_mode: AdmissionMode::Queue,
            queue_timeout: Duration::from_secs(120),
            scratch_dir: std::env::temp_dir(),
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = ServerConfig::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let port = match var("NETSYNTH_PORT") {
            Some(_) => setting(&var, "NETSYNTH_PORT", defaults.port),
            None => setting(&var, "PORT", defaults.port),
        };

        ServerConfig {
            host: var("NETSYNTH_HOST").unwrap_or(defaults.host),
            port,
            yosys_bin: var("NETSYNTH_YOSYS_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.yosys_bin),
            timeout: Duration::from_secs(
                setting(&var, "NETSYNTH_TIMEOUT_SECS", defaults.timeout.as_secs())
                    .clamp(1, MAX_TOOL_TIMEOUT.as_secs()),
            ),
            max_request_bytes: setting(&var, "NETSYNTH_MAX_REQUEST_BYTES", defaults.max_request_bytes),
            max_source_bytes: setting(&var, "NETSYNTH_MAX_SOURCE_BYTES", defaults.max_source_bytes),
            output_cap_bytes: setting(&var, "NETSYNTH_OUTPUT_CAP_BYTES", defaults.output_cap_bytes),
            max_netlist_bytes: setting(&var, "NETSYNTH_MAX_NETLIST_BYTES", defaults.max_netlist_bytes),
            log_excerpt_chars: setting(&var, "NETSYNTH_LOG_EXCERPT_CHARS", defaults.log_excerpt_chars),
            max_concurrent: setting(&var, "NETSYNTH_MAX_CONCURRENT", defaults.max_concurrent).max(1),
            queue_depth: setting(&var, "NETSYNTH_QUEUE_DEPTH", defaults.queue_depth),
            admission_mode: setting(&var, "NETSYNTH_ADMISSION", defaults.admission_mode),
            queue_timeout: Duration::from_secs(setting(
                &var,
                "NETSYNTH_QUEUE_TIMEOUT_SECS",
                defaults.queue_timeout.as_secs(),
            )),
            scratch_dir: var("NETSYNTH_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            allowed_origins: var("NETSYNTH_ALLOWED_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// `host:port` string for binding the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn setting<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    let Some(raw) = var(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable configuration value");
            default
        }
    }
}
