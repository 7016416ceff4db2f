//! Semantic validation of a loaded configuration.
//!
//! Runs before a check set is built, so a bad reload never replaces a good
//! running set. Regular expressions are deliberately not compiled here; an
//! invalid one only fails the check that uses it.

use std::collections::HashSet;

use reqwest::Method;
use reqwest::header::{HeaderName, HeaderValue};
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::config::{Config, TestConfig};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("interval-seconds must be at least 1")]
    ZeroInterval,

    #[error("user-agent is not a valid header value: {0:?}")]
    InvalidUserAgent(String),

    #[error("test #{0} has an empty name")]
    EmptyName(usize),

    #[error("duplicate test name: {0}")]
    DuplicateName(String),

    #[error("{name}: invalid URL {url}: {reason}")]
    InvalidUrl { name: String, url: String, reason: String },

    #[error("{name}: unsupported URL scheme: {scheme}")]
    UnsupportedScheme { name: String, scheme: String },

    #[error("{name}: invalid HTTP method: {method}")]
    InvalidMethod { name: String, method: String },

    #[error("{name}: max-response-time must be greater than 0")]
    ZeroTimeout { name: String },

    #[error("{name}: notify-error-count must be at least 1")]
    ZeroThreshold { name: String },

    #[error("{name}: invalid header name: {header}")]
    InvalidHeaderName { name: String, header: String },
}

/// Validate the whole configuration, reporting the first problem found
pub fn validate_config(config: &Config) -> Result<(), ValidationError> {
    if config.settings.interval_seconds == 0 {
        return Err(ValidationError::ZeroInterval);
    }

    if let Some(agent) = &config.settings.user_agent {
        HeaderValue::from_str(agent).map_err(|_| ValidationError::InvalidUserAgent(agent.clone()))?;
    }

    if config.tests.is_empty() {
        warn!("Configuration contains no tests, nothing will be monitored");
    }

    let mut seen = HashSet::new();
    for (index, test) in config.tests.iter().enumerate() {
        if test.name.trim().is_empty() {
            return Err(ValidationError::EmptyName(index + 1));
        }
        // Names key the failure streaks, so they must be unique.
        if !seen.insert(test.name.as_str()) {
            return Err(ValidationError::DuplicateName(test.name.clone()));
        }
        validate_test(test)?;
    }

    Ok(())
}

fn validate_test(test: &TestConfig) -> Result<(), ValidationError> {
    let name = || test.name.clone();

    let url = Url::parse(&test.url).map_err(|e| ValidationError::InvalidUrl {
        name: name(),
        url: test.url.clone(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ValidationError::UnsupportedScheme { name: name(), scheme: other.to_string() });
        }
    }

    Method::from_bytes(test.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| ValidationError::InvalidMethod { name: name(), method: test.method.clone() })?;

    if test.max_response_time == 0 {
        return Err(ValidationError::ZeroTimeout { name: name() });
    }

    if test.notify_error_count == 0 {
        return Err(ValidationError::ZeroThreshold { name: name() });
    }

    for header in test.header_regexps.keys() {
        HeaderName::from_bytes(header.as_bytes()).map_err(|_| ValidationError::InvalidHeaderName {
            name: name(),
            header: header.clone(),
        })?;
    }

    Ok(())
}
