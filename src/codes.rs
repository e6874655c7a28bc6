//! Transport status categories and the compile-time error catalog.
//!
//! # Classification vs. code
//!
//! Every [`ErrorNode`](crate::ErrorNode) carries two identifiers:
//!
//! - a [`Classification`]: one of the seventeen canonical RPC status
//!   categories. It decides how the error is projected onto the wire.
//! - a `code`: a short application-defined string such as `"ECPw"`. It is the
//!   only identity used for matching and equality.
//!
//! Many codes share one classification.
//!
//! # Catalogs
//!
//! Application errors are best declared once, as `const` templates, and
//! instantiated at the failure site:
//!
//! ```rust
//! use status_chain::{define_error_catalog, Classification, Severity};
//!
//! define_error_catalog! {
//!     Classification::InvalidArgument => {
//!         /// Password rejected by the length policy.
//!         PASSWORD_TOO_SHORT = ("EPW1", "The argument 'password' is invalid", Severity::Expected, "'{1}' lower than {2}"),
//!         EMAIL_MALFORMED = ("EEM1", "The argument 'email' is invalid"),
//!     }
//! }
//!
//! let err = PASSWORD_TOO_SHORT.located().set_param(1, "password").set_param(2, "6");
//! assert_eq!(err.cause_template(), "'password' lower than 6");
//! assert_eq!(EMAIL_MALFORMED.severity(), Severity::Error);
//! ```

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Classification
// ============================================================================

/// Canonical RPC status category.
///
/// Discriminants match the numeric values used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum Classification {
    /// Not an error.
    #[default]
    Ok = 0,
    /// The operation was cancelled, typically by the caller.
    Cancelled = 1,
    /// Unknown error.
    Unknown = 2,
    /// The client specified an invalid argument.
    InvalidArgument = 3,
    /// The deadline expired before the operation could complete.
    DeadlineExceeded = 4,
    /// Some requested entity was not found.
    NotFound = 5,
    /// The entity a client attempted to create already exists.
    AlreadyExists = 6,
    /// The caller does not have permission to execute the operation.
    PermissionDenied = 7,
    /// Some resource has been exhausted.
    ResourceExhausted = 8,
    /// The system is not in a state required for the operation.
    FailedPrecondition = 9,
    /// The operation was aborted, typically due to a concurrency issue.
    Aborted = 10,
    /// The operation was attempted past the valid range.
    OutOfRange = 11,
    /// The operation is not implemented or not supported.
    Unimplemented = 12,
    /// Internal invariants were broken.
    Internal = 13,
    /// The service is currently unavailable.
    Unavailable = 14,
    /// Unrecoverable data loss or corruption.
    DataLoss = 15,
    /// The request lacks valid authentication credentials.
    Unauthenticated = 16,
}

impl Classification {
    /// Every category, ordered by wire value.
    pub const ALL: [Classification; 17] = [
        Self::Ok,
        Self::Cancelled,
        Self::Unknown,
        Self::InvalidArgument,
        Self::DeadlineExceeded,
        Self::NotFound,
        Self::AlreadyExists,
        Self::PermissionDenied,
        Self::ResourceExhausted,
        Self::FailedPrecondition,
        Self::Aborted,
        Self::OutOfRange,
        Self::Unimplemented,
        Self::Internal,
        Self::Unavailable,
        Self::DataLoss,
        Self::Unauthenticated,
    ];

    /// Numeric wire value.
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Look up a category by wire value.
    #[inline]
    pub const fn from_i32(value: i32) -> Option<Self> {
        if value < 0 || value > 16 {
            return None;
        }
        Some(Self::ALL[value as usize])
    }

    /// Name as printed in rendered statuses (`"NotFound"`).
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Cancelled => "Canceled",
            Self::Unknown => "Unknown",
            Self::InvalidArgument => "InvalidArgument",
            Self::DeadlineExceeded => "DeadlineExceeded",
            Self::NotFound => "NotFound",
            Self::AlreadyExists => "AlreadyExists",
            Self::PermissionDenied => "PermissionDenied",
            Self::ResourceExhausted => "ResourceExhausted",
            Self::FailedPrecondition => "FailedPrecondition",
            Self::Aborted => "Aborted",
            Self::OutOfRange => "OutOfRange",
            Self::Unimplemented => "Unimplemented",
            Self::Internal => "Internal",
            Self::Unavailable => "Unavailable",
            Self::DataLoss => "DataLoss",
            Self::Unauthenticated => "Unauthenticated",
        }
    }

    /// Protocol constant name (`"NOT_FOUND"`).
    #[inline]
    pub const fn constant_name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::Aborted => "ABORTED",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::Unimplemented => "UNIMPLEMENTED",
            Self::Internal => "INTERNAL",
            Self::Unavailable => "UNAVAILABLE",
            Self::DataLoss => "DATA_LOSS",
            Self::Unauthenticated => "UNAUTHENTICATED",
        }
    }

    /// Whether this category carries no error.
    #[inline]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string or number names no classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown status classification '{input}'")]
pub struct ParseClassificationError {
    input: String,
}

impl FromStr for Classification {
    type Err = ParseClassificationError;

    /// Accepts the display name, the constant name, or the decimal wire value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(value) = s.parse::<i32>() {
            return Self::from_i32(value).ok_or_else(|| ParseClassificationError {
                input: s.to_owned(),
            });
        }
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s) || c.constant_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseClassificationError { input: s.to_owned() })
    }
}

impl TryFrom<i32> for Classification {
    type Error = ParseClassificationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::from_i32(value).ok_or_else(|| ParseClassificationError {
            input: value.to_string(),
        })
    }
}

// Serialized as the wire number, like the status protocol does.
#[cfg(feature = "serde")]
impl serde::Serialize for Classification {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Classification {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i32::deserialize(deserializer)?;
        Self::try_from(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Catalog Macro
// ============================================================================

/// Declare application error templates as `const` [`ErrorNode`](crate::ErrorNode)s.
///
/// Each entry is `NAME = (code, description)`, optionally followed by a
/// [`Severity`](crate::Severity) and a cause template. Entries without a
/// severity default to `Severity::Error`.
///
/// Catalog templates carry no origin frame; call
/// [`located`](crate::ErrorNode::located) at the failure site to capture one.
#[macro_export]
macro_rules! define_error_catalog {
    ($classification:expr => {
        $(
            $(#[$attr:meta])*
            $name:ident = ( $($entry:tt)* )
        ),* $(,)?
    }) => {
        $(
            $(#[$attr])*
            pub const $name: $crate::ErrorNode = $crate::__catalog_entry!($classification; $($entry)*);
        )*
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __catalog_entry {
    ($classification:expr; $code:literal, $description:literal $(,)?) => {
        $crate::ErrorNode::const_new($classification, $code, $description, "", $crate::Severity::Error)
    };
    ($classification:expr; $code:literal, $description:literal, $severity:expr $(,)?) => {
        $crate::ErrorNode::const_new($classification, $code, $description, "", $severity)
    };
    ($classification:expr; $code:literal, $description:literal, $severity:expr, $template:literal $(,)?) => {
        $crate::ErrorNode::const_new($classification, $code, $description, $template, $severity)
    };
}
