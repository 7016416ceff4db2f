//! Pass criteria for a received response.
//!
//! Rules run in a fixed order (status, headers, body) and stop at the first
//! failure.

use reqwest::header::HeaderMap;

use super::types::{CheckDefinition, CheckFailure};

/// Validate a response against the definition's expectations
pub fn validate_response(
    definition: &CheckDefinition,
    status: u16,
    headers: &HeaderMap,
    body: &str,
) -> Result<(), CheckFailure> {
    validate_status(definition, status)?;
    validate_headers(definition, headers)?;
    validate_body(definition, body)
}

fn validate_status(definition: &CheckDefinition, status: u16) -> Result<(), CheckFailure> {
    if status != definition.expected_status {
        return Err(CheckFailure::StatusMismatch {
            actual: status,
            expected: definition.expected_status,
        });
    }
    Ok(())
}

/// Each pattern is matched against the first value of its header only
fn validate_headers(definition: &CheckDefinition, headers: &HeaderMap) -> Result<(), CheckFailure> {
    for (name, pattern) in &definition.header_patterns {
        let value = headers
            .get(name.as_str())
            .ok_or_else(|| CheckFailure::HeaderAbsent(name.clone()))?;
        let value = String::from_utf8_lossy(value.as_bytes());
        if !pattern.is_match(&value)? {
            return Err(CheckFailure::HeaderMismatch {
                name: name.clone(),
                pattern: pattern.as_str().to_string(),
            });
        }
    }
    Ok(())
}

fn validate_body(definition: &CheckDefinition, body: &str) -> Result<(), CheckFailure> {
    if !definition.body_pattern.is_match(body)? {
        return Err(CheckFailure::BodyMismatch(definition.body_pattern.as_str().to_string()));
    }
    Ok(())
}
