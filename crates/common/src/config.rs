//! Suite configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment overrides. The harness binary applies CLI flags last.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::selectors::SelectorTable;

/// Browser engine a scenario runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::fmt::Display for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Browser {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(Error::invalid_config("browser", format!("unknown engine '{}'", other))),
        }
    }
}

/// When a failure artifact (trace, screenshot, video) is captured and kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureMode {
    Off,
    On,
    OnlyOnFailure,
    RetainOnFailure,
}

impl CaptureMode {
    /// Whether the browser has to record while the scenario runs
    pub fn records(&self) -> bool {
        matches!(self, CaptureMode::On | CaptureMode::RetainOnFailure)
    }

    /// Whether a recorded artifact survives the given outcome
    pub fn keep(&self, failed: bool) -> bool {
        match self {
            CaptureMode::Off => false,
            CaptureMode::On => true,
            CaptureMode::OnlyOnFailure | CaptureMode::RetainOnFailure => failed,
        }
    }
}

impl FromStr for CaptureMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "off" => Ok(CaptureMode::Off),
            "on" => Ok(CaptureMode::On),
            "only-on-failure" => Ok(CaptureMode::OnlyOnFailure),
            "retain-on-failure" => Ok(CaptureMode::RetainOnFailure),
            other => Err(Error::invalid_config("capture", format!("unknown mode '{}'", other))),
        }
    }
}

/// Failure artifact capture policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPolicy {
    pub trace: CaptureMode,
    pub screenshot: CaptureMode,
    pub video: CaptureMode,
}

impl Default for ArtifactPolicy {
    fn default() -> Self {
        Self {
            trace: CaptureMode::RetainOnFailure,
            screenshot: CaptureMode::OnlyOnFailure,
            video: CaptureMode::RetainOnFailure,
        }
    }
}

/// Backend endpoint paths used for response correlation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Upload status endpoint, correlated on GET
    pub upload_status: String,
    /// Delete endpoint, correlated on DELETE
    pub delete: String,
    /// Process endpoint, correlated on POST
    pub process: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            upload_status: "/documents/upload".to_string(),
            delete: "/documents".to_string(),
            process: "/documents/process".to_string(),
        }
    }
}

/// Wait budgets, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub test_ms: u64,
    pub expect_ms: u64,
    pub action_ms: u64,
    pub navigation_ms: u64,
    pub upload_row_ms: u64,
    pub large_upload_row_ms: u64,
    pub bot_answer_ms: u64,
    pub error_indicator_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            test_ms: 180_000,
            expect_ms: 30_000,
            action_ms: 30_000,
            navigation_ms: 60_000,
            upload_row_ms: 30_000,
            large_upload_row_ms: 360_000,
            bot_answer_ms: 60_000,
            error_indicator_ms: 30_000,
        }
    }
}

impl Timeouts {
    pub fn test(&self) -> Duration {
        Duration::from_millis(self.test_ms)
    }
}

/// Complete suite configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Application base URL
    pub base_url: String,

    /// Backend paths for response correlation
    pub endpoints: Endpoints,

    /// Wait budgets
    pub timeouts: Timeouts,

    /// Engines every scenario runs against
    pub browsers: Vec<Browser>,

    /// Scenarios allowed to run at once
    pub workers: usize,

    /// Extra attempts for a failed scenario
    pub retries: u32,

    /// Run browsers without a window
    pub headless: bool,

    /// Viewport dimensions
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Trace/screenshot/video capture policy
    pub artifacts: ArtifactPolicy,

    /// Assert backend responses alongside UI effects
    pub correlate_responses: bool,

    /// Directory holding the uploadable sample documents
    pub resources_dir: PathBuf,

    /// Directory for results, artifacts and generated fixtures
    pub output_dir: PathBuf,

    /// Optional YAML file replacing the built-in question set
    pub questions_file: Option<PathBuf>,

    /// Selector overrides keyed by snake_case role name
    pub selectors: BTreeMap<String, String>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            endpoints: Endpoints::default(),
            timeouts: Timeouts::default(),
            browsers: vec![Browser::Chromium, Browser::Firefox],
            workers: 1,
            retries: 0,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            artifacts: ArtifactPolicy::default(),
            correlate_responses: true,
            resources_dir: PathBuf::from("resources"),
            output_dir: PathBuf::from("test-results"),
            questions_file: None,
            selectors: BTreeMap::new(),
        }
    }
}

impl SuiteConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading suite config from {}", path.display());
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Defaults plus the process environment
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(std::env::vars())?;
        Ok(config)
    }

    /// Apply environment-style overrides
    pub fn apply_env<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "BASE_URL" => self.base_url = value.to_string(),
                "UPLOAD_STATUS_PATH" => self.endpoints.upload_status = value.to_string(),
                "DELETE_API_PATH" => self.endpoints.delete = value.to_string(),
                "PROCESS_API_PATH" => self.endpoints.process = value.to_string(),
                "E2E_BROWSERS" => {
                    self.browsers = value
                        .split(',')
                        .filter(|s| !s.trim().is_empty())
                        .map(Browser::from_str)
                        .collect::<Result<Vec<_>>>()?;
                }
                "E2E_WORKERS" => self.workers = parse_number(key, value)?,
                "E2E_RETRIES" => self.retries = parse_number(key, value)?,
                "E2E_HEADLESS" => self.headless = parse_bool(key, value)?,
                "E2E_CORRELATE" => self.correlate_responses = parse_bool(key, value)?,
                "E2E_TRACE" => self.artifacts.trace = value.parse()?,
                "E2E_SCREENSHOT" => self.artifacts.screenshot = value.parse()?,
                "E2E_VIDEO" => self.artifacts.video = value.parse()?,
                "E2E_TEST_TIMEOUT_MS" => self.timeouts.test_ms = parse_number(key, value)?,
                "E2E_EXPECT_TIMEOUT_MS" => self.timeouts.expect_ms = parse_number(key, value)?,
                "E2E_RESOURCES_DIR" => self.resources_dir = PathBuf::from(value),
                "E2E_OUTPUT_DIR" => self.output_dir = PathBuf::from(value),
                _ => continue,
            }
            debug!("Config override from environment: {}", key);
        }
        Ok(())
    }

    /// Check invariants the runner depends on
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::invalid_config("workers", "must be at least 1"));
        }
        if self.browsers.is_empty() {
            return Err(Error::invalid_config("browsers", "at least one engine is required"));
        }
        let parsed = url::Url::parse(&self.base_url)
            .map_err(|e| Error::invalid_config("base_url", e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::invalid_config(
                "base_url",
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }
        self.selector_table()?;
        Ok(())
    }

    /// Absolute URL for a backend path
    pub fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Selector table with configured overrides applied
    pub fn selector_table(&self) -> Result<SelectorTable> {
        SelectorTable::from_overrides(&self.selectors)
    }

    /// Directory generated fixtures are written to
    pub fn generated_dir(&self) -> PathBuf {
        self.output_dir.join("fixtures")
    }

    /// Directory per-attempt artifacts are written to
    pub fn artifacts_dir(&self) -> PathBuf {
        self.output_dir.join("artifacts")
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::invalid_config(key, format!("expected a number, got '{}'", value)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(Error::invalid_config(key, format!("expected a boolean, got '{}'", value))),
    }
}
