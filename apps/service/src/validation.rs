use std::net::IpAddr;
use url::Url;

use crate::config::Preferences;
use crate::error::{JobError, JobResult};

/// Validation results with specific error messages
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { is_valid: true, error: None }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self { is_valid: false, error: Some(msg.into()) }
    }

    pub fn into_job_result(self) -> JobResult<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(JobError::Validation(
                self.error.unwrap_or_else(|| "Validation failed".to_string()),
            ))
        }
    }
}

/// Validate everything a creation request carries, stopping at the first problem.
pub fn validate_new_job(
    name: &str,
    url: &str,
    frequency_seconds: u64,
    preferences: &Preferences,
) -> JobResult<()> {
    validate_job_name(name).into_job_result()?;
    validate_http_endpoint(url, preferences.allow_private_targets).into_job_result()?;
    validate_frequency(
        frequency_seconds,
        preferences.min_frequency_seconds,
        preferences.max_frequency_seconds,
    )
    .into_job_result()
}

/// Validate HTTP/HTTPS URL endpoint
pub fn validate_http_endpoint(target: &str, allow_private: bool) -> ValidationResult {
    if target.trim().is_empty() {
        return ValidationResult::err("URL cannot be empty");
    }

    match Url::parse(target) {
        Ok(url) => {
            let scheme = url.scheme();
            if scheme != "http" && scheme != "https" {
                return ValidationResult::err(format!(
                    "Invalid scheme '{scheme}'. Must be http or https"
                ));
            }

            let Some(host) = url.host_str() else {
                return ValidationResult::err("URL must have a valid host");
            };

            if !allow_private && is_private_or_local(host) {
                return ValidationResult::err(format!(
                    "Private/local addresses are not allowed: {host}"
                ));
            }

            if url.port() == Some(0) {
                return ValidationResult::err("Port 0 is not valid");
            }

            ValidationResult::ok()
        }
        Err(e) => {
            // If it fails to parse, check if it's missing a scheme
            if !target.contains("://") {
                ValidationResult::err("URL must include scheme (http:// or https://)")
            } else {
                ValidationResult::err(format!("Invalid URL: {e}"))
            }
        }
    }
}

/// Validate job name
pub fn validate_job_name(name: &str) -> ValidationResult {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return ValidationResult::err("Name cannot be empty");
    }

    if trimmed.chars().count() > 100 {
        return ValidationResult::err("Name too long (max 100 characters)");
    }

    ValidationResult::ok()
}

/// Validate the interval between probes, in seconds
pub fn validate_frequency(frequency: u64, min: u64, max: u64) -> ValidationResult {
    if frequency == 0 || frequency < min {
        return ValidationResult::err(format!(
            "Frequency too short: {frequency} seconds (minimum: {})",
            min.max(1)
        ));
    }

    if frequency > max {
        return ValidationResult::err(format!(
            "Frequency too long: {frequency} seconds (maximum: {max})"
        ));
    }

    ValidationResult::ok()
}

/// Check if hostname/IP is private or localhost
fn is_private_or_local(host: &str) -> bool {
    // IPv6 literals come out of the URL with their brackets
    let host = host.trim_start_matches('[').trim_end_matches(']');

    if host.eq_ignore_ascii_case("localhost") || host.ends_with(".localhost") {
        return true;
    }

    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ipv4)) => {
            ipv4.is_private()
                || ipv4.is_loopback()
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                || ipv4.is_unspecified()
        }
        Ok(IpAddr::V6(ipv6)) => ipv6.is_loopback() || ipv6.is_unspecified() || ipv6.is_multicast(),
        Err(_) => host.ends_with(".local") || host.ends_with(".internal"),
    }
}
