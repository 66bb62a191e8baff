//! Environment-driven configuration.
//!
//! Every tunable has its own accessor with a compiled default:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `CHESSHALL_DATA_DIR` | platform data dir, else `./data` |
//! | `CHESSHALL_FINISHED_GRACE_SECS` | `30` (`0` keeps finished sessions) |
//! | `CHESSHALL_BROADCAST_RESULTS` | `true` |
//! | `CHESSHALL_AI_BACKEND` | `minimax` |
//! | `CHESSHALL_AI_DEPTH` | `1` |
//! | `CHESSHALL_UCI_PATH` | `stockfish` |
//! | `CHESSHALL_LOG_DIR` | unset (log to stderr) |

use std::path::PathBuf;
use std::time::Duration;

use engine::{SearchConfig, SearchError};

const DEV_DATA_DIR: &str = "./data";
const RESULTS_DB: &str = "results.db";
const DEFAULT_GRACE_SECS: u64 = 30;
const DEFAULT_AI_BACKEND: &str = "minimax";
const DEFAULT_AI_DEPTH: u8 = 1;
const DEFAULT_UCI_PATH: &str = "stockfish";

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a variable, logging and falling back to `default` when it is
/// malformed.
fn parsed<T: std::str::FromStr>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(v) => v.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %v, "Ignoring malformed setting");
            default
        }),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Directory holding the results database.
///
/// Priority:
/// 1. `CHESSHALL_DATA_DIR` if set
/// 2. the platform data directory for `chesshall`
/// 3. `./data`
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = var("CHESSHALL_DATA_DIR") {
        return PathBuf::from(dir);
    }
    directories::ProjectDirs::from("", "", "chesshall")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(DEV_DATA_DIR))
}

pub fn get_results_db_path() -> PathBuf {
    get_data_dir().join(RESULTS_DB)
}

/// How long a finished session lingers before it is destroyed. `None`
/// disables automatic destruction.
pub fn get_finished_grace() -> Option<Duration> {
    grace_from(var("CHESSHALL_FINISHED_GRACE_SECS"))
}

fn grace_from(raw: Option<String>) -> Option<Duration> {
    match parsed("CHESSHALL_FINISHED_GRACE_SECS", raw, DEFAULT_GRACE_SECS) {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    }
}

pub fn get_broadcast_results() -> bool {
    broadcast_from(var("CHESSHALL_BROADCAST_RESULTS"))
}

fn broadcast_from(raw: Option<String>) -> bool {
    match raw {
        None => true,
        Some(v) => parse_flag(&v).unwrap_or_else(|| {
            tracing::warn!(value = %v, "Ignoring malformed CHESSHALL_BROADCAST_RESULTS");
            true
        }),
    }
}

/// Search backend for computer participants.
pub fn get_search_config() -> Result<SearchConfig, SearchError> {
    search_from(
        var("CHESSHALL_AI_BACKEND"),
        var("CHESSHALL_AI_DEPTH"),
        var("CHESSHALL_UCI_PATH"),
    )
}

fn search_from(
    backend: Option<String>,
    depth: Option<String>,
    uci_path: Option<String>,
) -> Result<SearchConfig, SearchError> {
    let depth = parsed("CHESSHALL_AI_DEPTH", depth, DEFAULT_AI_DEPTH);
    SearchConfig::from_parts(
        backend.as_deref().unwrap_or(DEFAULT_AI_BACKEND),
        depth,
        PathBuf::from(uci_path.unwrap_or_else(|| DEFAULT_UCI_PATH.to_string())),
    )
}

/// Directory for rolling log files, if file logging is wanted.
pub fn get_log_dir() -> Option<PathBuf> {
    var("CHESSHALL_LOG_DIR").map(PathBuf::from)
}

/// Snapshot of the settings the coordinator needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub finished_grace: Option<Duration>,
    pub broadcast_results: bool,
    pub search: SearchConfig,
    /// How often finished sessions are checked for expiry.
    pub reap_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            finished_grace: Some(Duration::from_secs(DEFAULT_GRACE_SECS)),
            broadcast_results: true,
            search: SearchConfig::default(),
            reap_interval: Duration::from_secs(1),
        }
    }
}

impl CoordinatorConfig {
    pub fn from_env() -> Result<Self, SearchError> {
        Ok(Self {
            finished_grace: get_finished_grace(),
            broadcast_results: get_broadcast_results(),
            search: get_search_config()?,
            ..Self::default()
        })
    }
}
