//! Projection of error chains onto RPC status values.
//!
//! # Capability Model
//!
//! The chain does not know any wire format. A [`StatusBackend`] supplies the
//! three operations the projection needs: build a status from a
//! classification and message, attach structured details, render the result.
//! [`RpcBackend`] is the built-in implementation; services with a real gRPC
//! stack implement the trait over their own status type.
//!
//! # Projection Rules
//!
//! Given a node and its ancestry:
//!
//! | Classification    | Status code       | Message                  | Details                     |
//! |-------------------|-------------------|--------------------------|-----------------------------|
//! | `Unknown`         | `NotFound`        | description              | none                        |
//! | `InvalidArgument` | `InvalidArgument` | description              | `BadRequest`, `DebugInfo`   |
//! | anything else     | unchanged         | `description \| code`     | none                        |
//!
//! The `Unknown -> NotFound` remap is long-standing client-visible behavior
//! and is kept as is.
//!
//! Sensitive descriptions are replaced with `[REDACTED]` in every branch.
//!
//! # Failure Policy
//!
//! A failed detail attachment never aborts the projection. The status is
//! rendered without the details, the failure is logged at `WARN` and handed
//! back in [`Projection::detail_error`].

use crate::{Classification, ErrorNode};
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Detail budget used by [`RpcBackend::new`]: the usual gRPC metadata ceiling.
pub const DEFAULT_DETAILS_BUDGET: usize = 8 * 1024;

const DEBUG_INFO_TYPE_URL: &str = "type.googleapis.com/google.rpc.DebugInfo";
const BAD_REQUEST_TYPE_URL: &str = "type.googleapis.com/google.rpc.BadRequest";

// ============================================================================
// Detail Payloads
// ============================================================================

/// One rejected request field.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldViolation {
    /// Field name, as the caller sent it.
    pub field: String,
    /// Why the value was rejected.
    pub description: String,
}

/// Structured payload attached to a status.
///
/// The shapes follow `google.rpc.DebugInfo` and `google.rpc.BadRequest`; how
/// they are encoded is up to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "@type", rename_all = "camelCase"))]
pub enum StatusDetail {
    /// Codes of the ancestors, nearest first.
    DebugInfo {
        /// One code per ancestor.
        #[cfg_attr(feature = "serde", serde(rename = "stackEntries"))]
        stack_entries: Vec<String>,
        /// Resolved explanation of the projected node.
        detail: String,
    },
    /// Field violations of a validation failure.
    BadRequest {
        /// One entry per metadata pair.
        #[cfg_attr(feature = "serde", serde(rename = "fieldViolations"))]
        field_violations: Vec<FieldViolation>,
    },
}

impl StatusDetail {
    /// Fully qualified protobuf type URL of the payload.
    #[inline]
    pub const fn type_url(&self) -> &'static str {
        match self {
            Self::DebugInfo { .. } => DEBUG_INFO_TYPE_URL,
            Self::BadRequest { .. } => BAD_REQUEST_TYPE_URL,
        }
    }

    /// Bytes this payload occupies in a protobuf-encoded status, wrapped in
    /// `google.protobuf.Any`.
    pub fn encoded_len(&self) -> usize {
        let payload = match self {
            Self::DebugInfo { stack_entries, detail } => {
                stack_entries.iter().map(|e| bytes_field_len(e.len())).sum::<usize>()
                    + optional_string_len(detail)
            }
            Self::BadRequest { field_violations } => field_violations
                .iter()
                .map(|v| {
                    bytes_field_len(optional_string_len(&v.field) + optional_string_len(&v.description))
                })
                .sum(),
        };

        let mut any = bytes_field_len(self.type_url().len());
        if payload > 0 {
            any += bytes_field_len(payload);
        }
        bytes_field_len(any)
    }
}

// Field numbers used here are all below 16, so every tag is one byte.
#[inline]
fn bytes_field_len(len: usize) -> usize {
    1 + varint_len(len) + len
}

#[inline]
fn optional_string_len(s: &str) -> usize {
    if s.is_empty() { 0 } else { bytes_field_len(s.len()) }
}

#[inline]
fn varint_len(mut value: usize) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

// ============================================================================
// Capability
// ============================================================================

/// Status construction, detail attachment and rendering.
///
/// `attach_details` must be all-or-nothing: on error the status is left as
/// it was before the call.
pub trait StatusBackend {
    /// Status under construction.
    type Status;
    /// Rendered form handed to the transport.
    type Wire;
    /// Why details could not be attached. Surfaced, never interpreted.
    type AttachError: Error + Send + Sync + 'static;

    /// Build a status with no details.
    fn new_status(&self, classification: Classification, message: &str) -> Self::Status;

    /// Attach `details` to `status`.
    fn attach_details(
        &self,
        status: &mut Self::Status,
        details: &[StatusDetail],
    ) -> Result<(), Self::AttachError>;

    /// Render the finished status.
    fn render(&self, status: Self::Status) -> Self::Wire;
}

/// Output of [`to_status`].
#[must_use = "the rendered status should be returned to the caller"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection<W, E> {
    /// The rendered status.
    pub wire: W,
    /// Set when details were dropped because the backend rejected them.
    pub detail_error: Option<E>,
}

impl<W, E> Projection<W, E> {
    /// Whether every detail made it into the status.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.detail_error.is_none()
    }

    /// Rendered status, dropping any attachment failure.
    #[inline]
    pub fn into_wire(self) -> W {
        self.wire
    }
}

/// Project `node` onto a status using `backend`.
///
/// See the [module documentation](self) for the rules. `node` is not
/// modified.
pub fn to_status<B>(node: &ErrorNode, backend: &B) -> Projection<B::Wire, B::AttachError>
where
    B: StatusBackend,
{
    match node.classification() {
        Classification::Unknown => {
            let status = backend.new_status(Classification::NotFound, node.public_description());
            Projection {
                wire: backend.render(status),
                detail_error: None,
            }
        }
        Classification::InvalidArgument => {
            let mut status = backend.new_status(Classification::InvalidArgument, node.public_description());

            // Only this branch carries details; the other two skip the walk.
            let stack_entries: Vec<String> = node
                .parents()
                .into_iter()
                .map(|parent| parent.code().to_owned())
                .collect();

            let field_violations = node
                .metadata()
                .iter()
                .map(|(field, description)| FieldViolation {
                    field: field.to_owned(),
                    description: description.to_owned(),
                })
                .collect();
            let details = [
                StatusDetail::BadRequest { field_violations },
                StatusDetail::DebugInfo {
                    stack_entries,
                    detail: node.cause_template().to_owned(),
                },
            ];

            let detail_error = backend.attach_details(&mut status, &details).err();
            if let Some(err) = &detail_error {
                tracing::warn!(
                    code = node.code(),
                    error = %err,
                    "status details dropped during projection"
                );
            }

            Projection {
                wire: backend.render(status),
                detail_error,
            }
        }
        classification => {
            let message = format!("{} | {}", node.public_description(), node.code());
            let status = backend.new_status(classification, &message);
            Projection {
                wire: backend.render(status),
                detail_error: None,
            }
        }
    }
}

impl ErrorNode {
    /// Project this node through `backend`. See [`to_status`].
    #[inline]
    pub fn to_status<B: StatusBackend>(&self, backend: &B) -> Projection<B::Wire, B::AttachError> {
        to_status(self, backend)
    }

    /// Project onto the built-in [`RpcStatus`] with the default budget.
    ///
    /// Attachment failures are logged and otherwise ignored.
    pub fn to_rpc_status(&self) -> RpcStatus {
        to_status(self, &RpcBackend::new()).into_wire()
    }
}

// ============================================================================
// Reference Backend
// ============================================================================

/// Why [`RpcBackend`] refused to attach details.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachError {
    /// Encoded details would exceed the configured budget.
    #[error("status details need {size} bytes, budget is {budget}")]
    DetailsTooLarge {
        /// Encoded size of all details including those already attached.
        size: usize,
        /// Configured budget.
        budget: usize,
    },
    /// A status with code OK cannot carry details.
    #[error("no error details for status with code OK")]
    OkStatus,
}

/// Backend producing [`RpcStatus`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcBackend {
    details_budget: usize,
}

impl RpcBackend {
    /// Backend with [`DEFAULT_DETAILS_BUDGET`].
    #[inline]
    pub const fn new() -> Self {
        Self {
            details_budget: DEFAULT_DETAILS_BUDGET,
        }
    }

    /// Set the maximum encoded size of all details on one status.
    #[inline]
    pub const fn with_details_budget(mut self, bytes: usize) -> Self {
        self.details_budget = bytes;
        self
    }

    /// Configured budget in bytes.
    #[inline]
    pub const fn details_budget(&self) -> usize {
        self.details_budget
    }
}

impl Default for RpcBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBackend for RpcBackend {
    type Status = RpcStatus;
    type Wire = RpcStatus;
    type AttachError = AttachError;

    fn new_status(&self, classification: Classification, message: &str) -> RpcStatus {
        RpcStatus::new(classification, message)
    }

    fn attach_details(&self, status: &mut RpcStatus, details: &[StatusDetail]) -> Result<(), AttachError> {
        if status.code.is_ok() {
            return Err(AttachError::OkStatus);
        }

        let size: usize = status
            .details
            .iter()
            .chain(details)
            .map(StatusDetail::encoded_len)
            .sum();
        if size > self.details_budget {
            return Err(AttachError::DetailsTooLarge {
                size,
                budget: self.details_budget,
            });
        }

        status.details.extend_from_slice(details);
        Ok(())
    }

    fn render(&self, status: RpcStatus) -> RpcStatus {
        status
    }
}

/// In-memory RPC status: code, message and structured details.
///
/// Displays the way gRPC clients print a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RpcStatus {
    code: Classification,
    message: String,
    #[cfg_attr(feature = "serde", serde(default))]
    details: Vec<StatusDetail>,
}

impl RpcStatus {
    /// Status without details.
    pub fn new(code: Classification, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Status category.
    #[inline]
    pub const fn code(&self) -> Classification {
        self.code
    }

    /// Message sent to the client.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Attached details, in attachment order.
    #[inline]
    pub fn details(&self) -> &[StatusDetail] {
        &self.details
    }

    /// Field violations from every `BadRequest` detail.
    pub fn field_violations(&self) -> impl Iterator<Item = &FieldViolation> {
        self.details.iter().flat_map(|detail| match detail {
            StatusDetail::BadRequest { field_violations } => field_violations.as_slice(),
            StatusDetail::DebugInfo { .. } => &[][..],
        })
    }

    /// Stack entries of the first `DebugInfo` detail.
    pub fn stack_entries(&self) -> Option<&[String]> {
        self.details.iter().find_map(|detail| match detail {
            StatusDetail::DebugInfo { stack_entries, .. } => Some(stack_entries.as_slice()),
            StatusDetail::BadRequest { .. } => None,
        })
    }
}

impl fmt::Display for RpcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rpc error: code = {} desc = {}", self.code, self.message)
    }
}

impl Error for RpcStatus {}

impl From<&ErrorNode> for RpcStatus {
    fn from(node: &ErrorNode) -> Self {
        node.to_rpc_status()
    }
}

impl From<ErrorNode> for RpcStatus {
    fn from(node: ErrorNode) -> Self {
        node.to_rpc_status()
    }
}
