//! Configuration management for tlink.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority, applied to `[defaults]`)
//! 2. Project-local `tlink.toml` file
//! 3. User config `~/.config/tlink/config.toml`
//! 4. Built-in defaults (lowest priority)
//!
//! A fixture's effective configuration is its own `[fixtures."<name>"]`
//! section layered over `[defaults]`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::adaptor::{ConnectionParameters, HierarchySelection};

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Settings shared by every fixture.
    pub defaults: FixtureConfig,

    /// Per-fixture overrides keyed by fully qualified fixture name.
    pub fixtures: BTreeMap<String, FixtureConfig>,

    /// Export behaviour.
    pub export: ExportConfig,

    /// HTTP client settings.
    pub client: ClientConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            defaults: FixtureConfig {
                url: Some(DEFAULT_TESTLINK_URL.to_string()),
                enabled: Some(true),
                ..FixtureConfig::default()
            },
            fixtures: BTreeMap::new(),
            export: ExportConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./tlink.toml` (project local)
    /// 2. `~/.config/tlink/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_file(DEFAULT_CONFIG_FILE);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir
                .join(DEFAULT_CONFIG_DIR)
                .join(DEFAULT_USER_CONFIG_FILE);
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides to `[defaults]`.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|var| std::env::var(var).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let defaults = &mut self.defaults;
        let overrides: [(&str, &mut Option<String>); 7] = [
            ("TLINK_URL", &mut defaults.url),
            ("TLINK_DEV_KEY", &mut defaults.dev_key),
            ("TLINK_USER", &mut defaults.user),
            ("TLINK_PROJECT", &mut defaults.project),
            ("TLINK_TEST_PLAN", &mut defaults.test_plan),
            ("TLINK_PLATFORM", &mut defaults.platform),
            ("TLINK_BUILD", &mut defaults.build),
        ];
        for (var, field) in overrides {
            if let Some(value) = lookup(var) {
                *field = Some(value);
            }
        }
    }

    /// Effective configuration for a fixture.
    ///
    /// Returns `None` for an empty name, and when the fixture has no section
    /// of its own and the defaults don't name a server either.
    pub fn fixture(&self, name: &str) -> Option<FixtureConfig> {
        if name.is_empty() {
            return None;
        }
        match self.fixtures.get(name) {
            Some(section) => Some(section.layered_over(&self.defaults)),
            None if self.defaults.url.is_some() => Some(self.defaults.clone()),
            None => None,
        }
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Connection and hierarchy settings for one test fixture.
///
/// Every field is optional so that a fixture section only needs to name
/// what differs from `[defaults]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// TestLink API endpoint.
    pub url: Option<String>,

    /// Developer key (can also be set via `TLINK_DEV_KEY`).
    #[serde(skip_serializing)]
    pub dev_key: Option<String>,

    /// Login of the user test cases are created as.
    pub user: Option<String>,

    pub project: Option<String>,

    pub test_plan: Option<String>,

    /// Platform name; empty or missing means "no platform".
    pub platform: Option<String>,

    /// Build name; empty or missing selects the latest build of the plan.
    pub build: Option<String>,

    /// Dotted suite path; missing means the fixture's own name.
    pub test_suite: Option<String>,

    /// Results are only exported when this is `true`.
    pub enabled: Option<bool>,
}

impl FixtureConfig {
    /// Returns `self` with every unset field taken from `base`.
    pub fn layered_over(&self, base: &FixtureConfig) -> FixtureConfig {
        fn pick<T: Clone>(own: &Option<T>, base: &Option<T>) -> Option<T> {
            own.clone().or_else(|| base.clone())
        }

        FixtureConfig {
            url: pick(&self.url, &base.url),
            dev_key: pick(&self.dev_key, &base.dev_key),
            user: pick(&self.user, &base.user),
            project: pick(&self.project, &base.project),
            test_plan: pick(&self.test_plan, &base.test_plan),
            platform: pick(&self.platform, &base.platform),
            build: pick(&self.build, &base.build),
            test_suite: pick(&self.test_suite, &base.test_suite),
            enabled: pick(&self.enabled, &base.enabled),
        }
    }

    /// Checks that everything needed to reach the server and pick a test
    /// plan is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("url", &self.url),
            ("dev_key", &self.dev_key),
            ("project", &self.project),
            ("test_plan", &self.test_plan),
        ];
        for (name, value) in required {
            if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!("missing `{name}`")));
            }
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(false)
    }

    pub fn connection(&self) -> ConnectionParameters {
        ConnectionParameters::new(
            self.url.clone().unwrap_or_default(),
            self.dev_key.clone().unwrap_or_default(),
            self.user.clone().unwrap_or_default(),
        )
    }

    /// Builds the hierarchy selection, using `fallback_suite` when no
    /// suite is configured.
    pub fn hierarchy(&self, fallback_suite: &str) -> HierarchySelection {
        HierarchySelection {
            project: self.project.clone().unwrap_or_default(),
            test_plan: self.test_plan.clone().unwrap_or_default(),
            test_suite: self
                .test_suite
                .clone()
                .unwrap_or_else(|| fallback_suite.to_string()),
            platform: self.platform.clone().unwrap_or_default(),
            build: self.build.clone().unwrap_or_default(),
        }
    }
}

/// Export behaviour configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Create suites that don't exist yet.
    pub create_missing_suites: bool,

    /// Line appended to the notes of skipped tests.
    pub skip_marker: String,

    /// Line appended to the notes of ignored tests.
    pub ignore_marker: String,

    /// Importance of created test cases.
    pub test_case_importance: u8,

    /// Execution type of created test cases.
    pub execution_type: u8,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            create_missing_suites: DEFAULT_CREATE_MISSING_SUITES,
            skip_marker: DEFAULT_SKIP_MARKER.to_string(),
            ignore_marker: DEFAULT_IGNORE_MARKER.to_string(),
            test_case_importance: DEFAULT_TEST_CASE_IMPORTANCE,
            execution_type: DEFAULT_EXECUTION_TYPE,
        }
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Timeout for a single remote call, in seconds.
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}
