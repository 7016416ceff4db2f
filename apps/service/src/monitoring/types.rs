use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::alert::{AlertState, Transition};
use super::streak::{FailureStreaks, StreakUpdate};

/// Network family constraint applied to a check definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    #[default]
    #[serde(alias = "")]
    Default,
    #[serde(rename = "tcp4", alias = "ipv4", alias = "v4")]
    ForceV4,
    #[serde(rename = "tcp6", alias = "ipv6", alias = "v6")]
    ForceV6,
    Both,
}

impl NetworkMode {
    /// Variants exercised by one run of a check, in execution order
    pub fn variants(self) -> &'static [Variant] {
        match self {
            NetworkMode::Default => &[Variant::Default],
            NetworkMode::ForceV4 => &[Variant::V4],
            NetworkMode::ForceV6 => &[Variant::V6],
            NetworkMode::Both => &[Variant::V4, Variant::V6],
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkMode::Default => write!(f, "default"),
            NetworkMode::ForceV4 => write!(f, "tcp4"),
            NetworkMode::ForceV6 => write!(f, "tcp6"),
            NetworkMode::Both => write!(f, "both"),
        }
    }
}

/// A single network variant a probe attempt runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Default,
    V4,
    V6,
}

impl Variant {
    pub(crate) fn index(self) -> usize {
        match self {
            Variant::Default => 0,
            Variant::V4 => 1,
            Variant::V6 => 2,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Default => write!(f, "default"),
            Variant::V4 => write!(f, "IPv4"),
            Variant::V6 => write!(f, "IPv6"),
        }
    }
}

/// A regular expression from configuration, compiled once at load time.
///
/// Compilation errors are kept rather than rejected so that a bad pattern
/// fails the check it belongs to instead of the whole configuration.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    compiled: Result<Regex, regex::Error>,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = Regex::new(&source);
        Self { source, compiled }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match against `haystack`, reporting a compilation failure as an error
    pub fn is_match(&self, haystack: &str) -> Result<bool, CheckFailure> {
        match &self.compiled {
            Ok(regex) => Ok(regex.is_match(haystack)),
            Err(e) => Err(CheckFailure::InvalidPattern {
                pattern: self.source.clone(),
                message: e.to_string(),
            }),
        }
    }
}

/// Immutable description of one monitored endpoint and its pass criteria
#[derive(Debug, Clone)]
pub struct CheckDefinition {
    pub name: String,
    pub url: String,
    pub method: String,
    pub expected_status: u16,
    pub max_response_time: Duration,
    /// Header name to pattern, checked in name order
    pub header_patterns: BTreeMap<String, Pattern>,
    pub body_pattern: Pattern,
    pub network: NetworkMode,
    pub notify_threshold: u32,
}

/// Why a single probe attempt failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckFailure {
    #[error("failed to build request: {0}")]
    RequestBuild(String),

    #[error("request failed: {0}")]
    Network(String),

    #[error("response time exceeded {0} ms")]
    Timeout(u64),

    #[error("status code {actual} did not match {expected}")]
    StatusMismatch { actual: u16, expected: u16 },

    #[error("{0} header not present in response")]
    HeaderAbsent(String),

    #[error("{name} header did not match {pattern}")]
    HeaderMismatch { name: String, pattern: String },

    #[error("response body did not match {0}")]
    BodyMismatch(String),

    #[error("invalid regular expression {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// A check definition together with the runtime state owned by the monitor
#[derive(Debug)]
pub struct ActiveCheck {
    pub definition: CheckDefinition,
    pub streaks: FailureStreaks,
    pub alerts: AlertState,
}

impl ActiveCheck {
    pub fn new(definition: CheckDefinition) -> Self {
        Self { definition, streaks: FailureStreaks::new(), alerts: AlertState::new() }
    }

    /// Display name for a variant, used in notifications and logs
    pub fn label(&self, variant: Variant) -> String {
        match variant {
            Variant::Default => self.definition.name.clone(),
            _ => format!("{} ({})", self.definition.name, variant),
        }
    }

    /// Record one attempt's outcome and the alert transition it causes, if any
    pub fn record_outcome(&self, variant: Variant, success: bool) -> (StreakUpdate, Option<Transition>) {
        let update = self.streaks.record(variant, success);
        let transition =
            self.alerts.observe(variant, success, update.current, self.definition.notify_threshold);
        (update, transition)
    }

    pub fn current_streak(&self, variant: Variant) -> u32 {
        self.streaks.current(variant)
    }

    pub fn is_alerting(&self, variant: Variant) -> bool {
        self.alerts.is_alerting(variant)
    }
}

/// The active set of checks, swapped as a whole on reload
#[derive(Debug)]
pub struct CheckSet {
    pub interval: Duration,
    checks: Vec<Arc<ActiveCheck>>,
}

impl CheckSet {
    /// Build a set with fresh streaks and alert flags for every definition
    pub fn new(interval: Duration, definitions: Vec<CheckDefinition>) -> Self {
        let checks = definitions.into_iter().map(|d| Arc::new(ActiveCheck::new(d))).collect();
        Self { interval, checks }
    }

    pub fn checks(&self) -> &[Arc<ActiveCheck>] {
        &self.checks
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn test_definition(name: &str) -> CheckDefinition {
    CheckDefinition {
        name: name.to_string(),
        url: "http://127.0.0.1:1/".to_string(),
        method: "GET".to_string(),
        expected_status: 200,
        max_response_time: Duration::from_millis(500),
        header_patterns: BTreeMap::new(),
        body_pattern: Pattern::new(""),
        network: NetworkMode::Default,
        notify_threshold: 3,
    }
}
