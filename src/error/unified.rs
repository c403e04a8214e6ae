//! Error classification shared by the session and conversation layers.

use serde::{Deserialize, Serialize};

/// Broad error category for routing error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    Network,
    Timeout,
    Server,
    Api,
    Signaling,
    Transport,
    Configuration,
    Serialization,
    Unknown,
}

/// How a front end should surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Show a transient notification and abandon the session attempt.
    Notify,
    /// Log only; the conversation carries on.
    LogOnly,
}
