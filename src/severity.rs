//! Advisory severity levels attached to every error node.
//!
//! Severity is triage metadata for the caller. Nothing in this crate changes
//! behavior based on it except log routing in [`crate::logging`].

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Closed set of triage levels.
///
/// `Expected` covers faults that are part of normal operation (an expired
/// token, a failed validation). `Suspect` marks faults that may indicate
/// abuse and deserve a security review rather than a bug report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    /// Developer diagnostics only.
    Debug,
    /// Informational; no action required.
    Info,
    /// Degraded but functional.
    Warning,
    /// Anticipated failure, e.g. an expired credential.
    Expected,
    /// Unexpected failure of a single request.
    #[default]
    Error,
    /// The process or a subsystem cannot continue.
    Fatal,
    /// Possible abuse or tampering.
    Suspect,
}

impl Severity {
    /// Every level, in declaration order.
    pub const ALL: [Severity; 7] = [
        Self::Debug,
        Self::Info,
        Self::Warning,
        Self::Expected,
        Self::Error,
        Self::Fatal,
        Self::Suspect,
    ];

    /// Stable lowercase label, identical to the serialized form.
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Expected => "expected",
            Self::Error => "error",
            Self::Fatal => "fatal",
            Self::Suspect => "suspect",
        }
    }

    /// Level used when a chain is emitted through `tracing`.
    ///
    /// Expected faults log at INFO: they happen on the happy path of a
    /// service and would drown real warnings otherwise.
    #[inline]
    pub const fn tracing_level(self) -> tracing::Level {
        match self {
            Self::Debug => tracing::Level::DEBUG,
            Self::Info | Self::Expected => tracing::Level::INFO,
            Self::Warning | Self::Suspect => tracing::Level::WARN,
            Self::Error | Self::Fatal => tracing::Level::ERROR,
        }
    }

    /// Whether an operator should look at this fault.
    #[inline]
    pub const fn requires_attention(self) -> bool {
        matches!(self, Self::Error | Self::Fatal | Self::Suspect)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the severity labels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown severity '{input}'")]
pub struct ParseSeverityError {
    input: String,
}

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseSeverityError { input: s.to_owned() })
    }
}
