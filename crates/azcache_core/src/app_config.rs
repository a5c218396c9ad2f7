use crate::CacheError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub browser: BrowserSettings,

    #[serde(default)]
    pub connection: ConnectionSettings,
}

/// Pagination tuning shared by every browser the host creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Window size for lists and sorted sets.
    pub page_size: u32,

    /// `COUNT` hint passed to the SCAN family.
    pub scan_count: Option<u32>,

    /// A scan page keeps going until it holds at least this many entries or
    /// the cursor wraps to `0`.
    pub scan_min_elements: usize,

    /// Upper bound on scan calls per page. `None` scans until an entry or the
    /// end of the keyspace shows up.
    pub max_scan_iterations: Option<u32>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            scan_count: None,
            scan_min_elements: 1,
            max_scan_iterations: Some(10_000),
        }
    }
}

impl BrowserSettings {
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_scan_min_elements(mut self, min: usize) -> Self {
        self.scan_min_elements = min;
        self
    }

    pub fn with_max_scan_iterations(mut self, max: Option<u32>) -> Self {
        self.max_scan_iterations = max;
        self
    }

    pub fn validate(&self) -> Result<(), CacheError> {
        if self.page_size == 0 {
            return Err(CacheError::configuration("browser.page_size must be > 0"));
        }

        if self.max_scan_iterations == Some(0) {
            return Err(CacheError::configuration(
                "browser.max_scan_iterations must be > 0",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Interval between keep-alive pings. `0` disables them.
    pub keepalive_secs: u64,

    pub connect_timeout_secs: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            keepalive_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

pub struct AppConfigStore {
    path: PathBuf,
}

impl AppConfigStore {
    pub fn new() -> Result<Self, CacheError> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            CacheError::IoError(std::io::Error::other("Could not find config directory"))
        })?;

        Ok(Self {
            path: config_dir.join("azcache").join("config.json"),
        })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<AppConfig, CacheError> {
        if !self.path.exists() {
            log::debug!("No config at {}, using defaults", self.path.display());
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.path).map_err(CacheError::IoError)?;
        let config: AppConfig = serde_json::from_str(&content).map_err(|e| {
            CacheError::configuration(format!("{}: {}", self.path.display(), e))
        })?;

        config.browser.validate()?;
        Ok(config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
