use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Outcome class of a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Up,
    Down,
    Degraded,
    Unknown,
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorStatus::Up => write!(f, "up"),
            MonitorStatus::Down => write!(f, "down"),
            MonitorStatus::Degraded => write!(f, "degraded"),
            MonitorStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Latest known state of a job's target.
///
/// A job holds exactly one of these; it is replaced wholesale after every
/// completed probe and cloned out for readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    /// Status of the check (up/down/degraded/unknown)
    pub state: MonitorStatus,

    /// Response time in milliseconds
    pub latency_ms: Option<u64>,

    /// HTTP status code (if the target answered)
    pub status_code: Option<u16>,

    /// Error message (if check failed)
    pub error_message: Option<String>,

    /// When the probe finished, as unix milliseconds on the wire; `None` until
    /// the first probe completes
    #[serde(with = "unix_millis")]
    pub checked_at: Option<SystemTime>,
}

impl JobStatus {
    /// Placeholder held by a job before its first probe completes
    pub fn pending() -> Self {
        Self {
            state: MonitorStatus::Unknown,
            latency_ms: None,
            status_code: None,
            error_message: None,
            checked_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.checked_at.is_none()
    }

    /// Mark the check as successful with latency
    pub fn success(latency_ms: u64, status_code: Option<u16>) -> Self {
        Self {
            state: MonitorStatus::Up,
            latency_ms: Some(latency_ms),
            status_code,
            error_message: None,
            checked_at: Some(SystemTime::now()),
        }
    }

    /// Mark the check as degraded (slow response)
    pub fn degraded(latency_ms: u64, status_code: Option<u16>) -> Self {
        Self { state: MonitorStatus::Degraded, ..Self::success(latency_ms, status_code) }
    }

    /// Mark the check as failed with error
    pub fn failure(error: impl Into<String>, status_code: Option<u16>) -> Self {
        Self {
            state: MonitorStatus::Down,
            latency_ms: None,
            status_code,
            error_message: Some(error.into()),
            checked_at: Some(SystemTime::now()),
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::pending()
    }
}

mod unix_millis {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error> {
        value
            .map(|time| time.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SystemTime>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(|ms| UNIX_EPOCH + Duration::from_millis(ms)))
    }
}
