use crate::{debounce::DEFAULT_DEBOUNCE_WINDOW, persistence::DEFAULT_CACHE_FILE};
use std::{fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const DEFAULT_BIND_ADDRESS: ([u8; 4], u16) = ([127, 0, 0, 1], 8000);

/// How inbound paths map onto store keys.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum StoreMode {
    /// `/i/{path}`, keyed by path only.
    Flat,
    /// `/i/{id}/{path}`, keyed by identifier and path.
    #[default]
    Namespaced,
}

impl FromStr for StoreMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(StoreMode::Flat),
            "namespaced" => Ok(StoreMode::Namespaced),
            other => Err(format!(
                "unknown mode `{}`, expected `flat` or `namespaced`",
                other
            )),
        }
    }
}

impl Display for StoreMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreMode::Flat => write!(f, "flat"),
            StoreMode::Namespaced => write!(f, "namespaced"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogServerConfiguration {
    mode: StoreMode,
    cache_file: PathBuf,
    debounce_window: Duration,
    history_limit: usize,
    bind_address: SocketAddr,
}

impl LogServerConfiguration {
    pub fn new(mode: StoreMode) -> Self {
        Self {
            mode,
            cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            history_limit: DEFAULT_HISTORY_LIMIT,
            bind_address: SocketAddr::from(DEFAULT_BIND_ADDRESS),
        }
    }

    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    pub fn cache_file(&self) -> &PathBuf {
        &self.cache_file
    }

    pub fn set_cache_file<P: Into<PathBuf>>(&mut self, cache_file: P) {
        self.cache_file = cache_file.into();
    }

    pub fn debounce_window(&self) -> Duration {
        self.debounce_window
    }

    pub fn set_debounce_window(&mut self, window: Duration) {
        self.debounce_window = window;
    }

    /// How many captures a read returns per key.
    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub fn set_history_limit(&mut self, limit: usize) {
        self.history_limit = limit;
    }

    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    pub fn set_bind_address(&mut self, address: SocketAddr) {
        self.bind_address = address;
    }
}

impl Default for LogServerConfiguration {
    fn default() -> Self {
        Self::new(StoreMode::default())
    }
}
