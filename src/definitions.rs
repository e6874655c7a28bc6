//! Sentinel values and a small catalog of service-agnostic errors.
//!
//! # Sentinels
//!
//! - [`NIL`] is the "no error" value: empty code, no cause. It is what
//!   [`ErrorNode::default`](crate::ErrorNode) returns and what
//!   [`ErrorNode::wrap`](crate::ErrorNode::wrap) builds on.
//! - [`PRIMITIVE_ERROR_CODE`] tags the leaf synthesized for any foreign
//!   error passed to [`from_source`](crate::ErrorNode::from_source).
//!
//! # Catalog
//!
//! The entries below cover failures every service boundary runs into. They
//! are templates: call [`located`](crate::ErrorNode::located) at the failure
//! site, then fill placeholders with [`set_param`](crate::ErrorNode::set_param).
//!
//! Application catalogs should live in the application and use their own
//! code prefixes. The `GEN_` prefix is reserved for this module; uniqueness
//! is checked by the `tests` module at the bottom of this file.

use crate::{define_error_catalog, Classification, ErrorNode, Severity};

/// Code of the leaf created for errors that are not [`ErrorNode`]s.
pub const PRIMITIVE_ERROR_CODE: &str = "PRIMITIVE_ERROR";

/// The absence of an error.
pub const NIL: ErrorNode = ErrorNode::const_new(Classification::Ok, "", "", "", Severity::Error);

// -----------------------------------------------------------------------------
// Request validation
// -----------------------------------------------------------------------------
// ACTION: Return to caller; metadata becomes field violations
define_error_catalog! {
    Classification::InvalidArgument => {
        /// A required field was absent or empty. `{1}` is the field name.
        GEN_FIELD_REQUIRED = ("GEN_FIELD_REQUIRED", "A required field is missing", Severity::Expected, "'{1}' is required"),
        /// A field failed a format or range check.
        GEN_FIELD_INVALID = ("GEN_FIELD_INVALID", "A field has an invalid value", Severity::Expected, "'{1}' {2}"),
        /// The request body could not be decoded.
        GEN_MALFORMED_REQUEST = ("GEN_MALFORMED_REQUEST", "The request could not be decoded", Severity::Expected),
    }
}

// -----------------------------------------------------------------------------
// Access
// -----------------------------------------------------------------------------
// ACTION: Return to caller; repeated Suspect entries warrant review
define_error_catalog! {
    Classification::Unauthenticated => {
        /// No valid credentials were presented.
        GEN_UNAUTHENTICATED = ("GEN_UNAUTHENTICATED", "Authentication is required", Severity::Expected),
    }
}

define_error_catalog! {
    Classification::PermissionDenied => {
        /// Authenticated, but not allowed.
        GEN_FORBIDDEN = ("GEN_FORBIDDEN", "The caller may not perform this operation", Severity::Expected),
        /// Access pattern looks hostile, e.g. probing foreign identifiers.
        GEN_ACCESS_SUSPECT = ("GEN_ACCESS_SUSPECT", "The caller may not perform this operation", Severity::Suspect),
    }
}

// -----------------------------------------------------------------------------
// Resources
// -----------------------------------------------------------------------------
define_error_catalog! {
    Classification::NotFound => {
        /// `{1}` is the resource kind, `{2}` its identifier.
        GEN_NOT_FOUND = ("GEN_NOT_FOUND", "The requested resource does not exist", Severity::Expected, "{1} '{2}' not found"),
    }
}

define_error_catalog! {
    Classification::AlreadyExists => {
        /// Creation collided with an existing resource.
        GEN_ALREADY_EXISTS = ("GEN_ALREADY_EXISTS", "The resource already exists", Severity::Expected, "{1} '{2}' already exists"),
    }
}

define_error_catalog! {
    Classification::FailedPrecondition => {
        /// The target is in the wrong state for the operation.
        GEN_PRECONDITION = ("GEN_PRECONDITION", "The resource is not in the required state", Severity::Warning),
    }
}

define_error_catalog! {
    Classification::ResourceExhausted => {
        /// Caller quota exhausted.
        GEN_RATE_LIMITED = ("GEN_RATE_LIMITED", "Too many requests", Severity::Warning),
    }
}

// -----------------------------------------------------------------------------
// Infrastructure
// -----------------------------------------------------------------------------
// ACTION: Alert; descriptions of wrapped causes stay internal
define_error_catalog! {
    Classification::Unavailable => {
        /// A downstream dependency did not answer. `{1}` names it.
        GEN_DEPENDENCY_UNAVAILABLE = ("GEN_DEPENDENCY_UNAVAILABLE", "A dependency is unavailable", Severity::Error, "'{1}' did not respond"),
    }
}

define_error_catalog! {
    Classification::DeadlineExceeded => {
        /// Deadline reached before completion.
        GEN_TIMEOUT = ("GEN_TIMEOUT", "The operation timed out", Severity::Warning),
    }
}

define_error_catalog! {
    Classification::Internal => {
        /// Catch-all for unexpected failures.
        GEN_INTERNAL = ("GEN_INTERNAL", "Internal error"),
        /// A state the code assumes impossible was reached.
        GEN_INVARIANT_BROKEN = ("GEN_INVARIANT_BROKEN", "Internal error", Severity::Fatal),
    }
}

define_error_catalog! {
    Classification::Unimplemented => {
        /// Operation not available in this build or deployment.
        GEN_UNIMPLEMENTED = ("GEN_UNIMPLEMENTED", "The operation is not supported"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const CATALOG: &[ErrorNode] = &[
        GEN_FIELD_REQUIRED,
        GEN_FIELD_INVALID,
        GEN_MALFORMED_REQUEST,
        GEN_UNAUTHENTICATED,
        GEN_FORBIDDEN,
        GEN_ACCESS_SUSPECT,
        GEN_NOT_FOUND,
        GEN_ALREADY_EXISTS,
        GEN_PRECONDITION,
        GEN_RATE_LIMITED,
        GEN_DEPENDENCY_UNAVAILABLE,
        GEN_TIMEOUT,
        GEN_INTERNAL,
        GEN_INVARIANT_BROKEN,
        GEN_UNIMPLEMENTED,
    ];

    /// Codes are identities; a duplicate would make two entries match each other.
    #[test]
    fn catalog_codes_are_unique_and_prefixed() {
        let mut seen = HashSet::new();
        for entry in CATALOG {
            assert!(entry.code().starts_with("GEN_"), "{} lacks prefix", entry.code());
            assert!(seen.insert(entry.code()), "duplicate code {}", entry.code());
        }
    }

    #[test]
    fn catalog_entries_are_errors_not_ok() {
        for entry in CATALOG {
            assert!(entry.is_error());
            assert!(!entry.classification().is_ok());
            assert!(entry.cause().is_none());
        }
    }

    #[test]
    fn nil_is_the_sentinel() {
        assert_eq!(NIL.code(), "");
        assert!(NIL.cause().is_none());
        assert!(NIL.classification().is_ok());
    }

    #[test]
    fn templates_fill_at_the_failure_site() {
        let err = GEN_NOT_FOUND.located().set_param(1, "user").set_param(2, "42");
        assert_eq!(err.cause_template(), "user '42' not found");
        assert!(err.origin_frame().is_some());
        assert_eq!(err, GEN_NOT_FOUND);
    }
}
