use std::collections::BTreeMap;
use std::time::Duration;
use std::{env, fmt, fs, io, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::monitoring::types::{CheckDefinition, CheckSet, NetworkMode, Pattern};
use crate::validation::{ValidationError, validate_config};

/// Environment variables that override `settings.webhook-url`, in priority order
const WEBHOOK_ENV_VARS: [&str; 2] = ["UPTIME_WEBHOOK_URL", "SLACK_WEBHOOK"];

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read {}: {source}", .path.display())]
    ReadFailed { path: path::PathBuf, source: io::Error },
    #[error("Failed to parse {}: {source}", .path.display())]
    ParseFailed { path: path::PathBuf, source: toml::de::Error },
    #[error("No config file found, searched: {0}")]
    NotFound(String),
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub tests: Vec<TestConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    #[serde(alias = "slack-webhook")]
    pub webhook_url: Option<String>,
    pub interval_seconds: u64,
    pub user_agent: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self { webhook_url: None, interval_seconds: 30, user_agent: None }
    }
}

/// One `[[tests]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    /// Milliseconds
    pub max_response_time: u64,
    pub status_code: u16,
    #[serde(default)]
    pub header_regexps: BTreeMap<String, String>,
    #[serde(default)]
    pub content_regexp: String,
    #[serde(default)]
    pub network: NetworkMode,
    #[serde(default = "default_notify_error_count")]
    pub notify_error_count: u32,
}

fn default_method() -> String {
    "GET".into()
}

fn default_notify_error_count() -> u32 {
    3
}

impl TestConfig {
    pub fn to_definition(&self) -> CheckDefinition {
        CheckDefinition {
            name: self.name.clone(),
            url: self.url.clone(),
            method: self.method.clone(),
            expected_status: self.status_code,
            max_response_time: Duration::from_millis(self.max_response_time),
            header_patterns: self
                .header_regexps
                .iter()
                .map(|(header, regex)| (header.clone(), Pattern::new(regex.as_str())))
                .collect(),
            body_pattern: Pattern::new(self.content_regexp.as_str()),
            network: self.network,
            notify_threshold: self.notify_error_count,
        }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Per-user config path ($XDG_CONFIG_HOME/uptime-mon/config.toml or
/// $HOME/.config/...)
fn user_config_path() -> Option<path::PathBuf> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else {
        env::home_dir()?.join(".config")
    };

    Some(path.join("uptime-mon/config.toml"))
}

/// Locations searched when no explicit path is given, first match wins
pub fn search_paths() -> Vec<path::PathBuf> {
    let mut paths = vec![path::PathBuf::from("/etc/uptime-mon/config.toml")];
    paths.extend(user_config_path());
    paths.push(path::PathBuf::from("config.toml"));
    paths
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let write_2 = write_indented(2);

        writeln!(f, "Uptime Monitor Configuration:")?;
        write_title_1(f, "Settings")?;
        write_1(f, "Webhook", &if self.settings.webhook_url.is_some() { "configured" } else { "none" })?;
        write_1(f, "Interval (s)", &self.settings.interval_seconds)?;
        write_title_1(f, &format!("Tests ({})", self.tests.len()))?;
        for test in &self.tests {
            write_1(f, &test.name, &format!("{} {}", test.method, test.url))?;
            write_2(f, "Expect status", &test.status_code)?;
            write_2(f, "Max response time (ms)", &test.max_response_time)?;
            write_2(f, "Network", &test.network)?;
            write_2(f, "Notify after", &test.notify_error_count)?;
            for (header, regex) in &test.header_regexps {
                write_2(f, &format!("Header {header}"), regex)?;
            }
            if !test.content_regexp.is_empty() {
                write_2(f, "Body", &test.content_regexp)?;
            }
        }

        Ok(())
    }
}

impl Config {
    /// Load, validate and apply environment overrides.
    ///
    /// Without an explicit path the [`search_paths`] are tried in order.
    ///
    /// ```rust,ignore
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path = match optional_path {
            Some(path) => normalize_toml_path(path.as_ref()),
            None => {
                let candidates = search_paths();
                candidates.iter().find(|p| p.exists()).cloned().ok_or_else(|| {
                    Error::NotFound(
                        candidates.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "),
                    )
                })?
            }
        };

        let raw_string = fs::read_to_string(&config_path)
            .map_err(|source| Error::ReadFailed { path: config_path.clone(), source })?;
        let mut config = Self::parse(&raw_string)
            .map_err(|source| Error::ParseFailed { path: config_path, source })?;
        config.apply_webhook_override(|name| env::var(name).ok());
        validate_config(&config)?;
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    fn apply_webhook_override(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = WEBHOOK_ENV_VARS.into_iter().filter_map(&lookup).find(|v| !v.is_empty()) {
            self.settings.webhook_url = Some(url);
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.settings.interval_seconds)
    }

    /// Build a fresh check set; streaks and alert flags start from zero
    pub fn check_set(&self) -> CheckSet {
        CheckSet::new(self.interval(), self.tests.iter().map(TestConfig::to_definition).collect())
    }
}
