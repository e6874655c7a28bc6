//! # Status Chain
//!
//! Chained, code-addressable errors for service code, projected onto RPC
//! status values at the boundary.
//!
//! ## Model
//!
//! An [`ErrorNode`] is one link of a causal chain. It carries:
//!
//! - a stable machine-readable `code` (the only identity used for matching),
//! - a transport [`Classification`] deciding how it reaches the wire,
//! - an advisory [`Severity`],
//! - free-form [`Metadata`] (field violations for validation errors),
//! - an optional cause, shared immutably with earlier snapshots.
//!
//! Mutators never touch the receiver. `set_cause`, `add_metadata`,
//! `set_param` and `from_source` all borrow the node and return a new one, so
//! anything still holding the previous value keeps seeing it unchanged.
//!
//! ## Quick Start
//!
//! ```rust
//! use status_chain::{Classification, ErrorNode, Severity};
//!
//! let leaf = ErrorNode::new(Classification::InvalidArgument, "EIA", "The argument 'password' is invalid")
//!     .with_cause_template("'{1}' lower than {2}")
//!     .with_severity(Severity::Expected)
//!     .add_metadata("password", "too short")
//!     .set_param(1, "password")
//!     .set_param(2, "6");
//!
//! let top = ErrorNode::new(Classification::PermissionDenied, "LOGIN_ERR", "The login process is invalid")
//!     .from_source(leaf);
//!
//! assert!(top.is_same_as(&ErrorNode::new(Classification::Unknown, "EIA", "")));
//! assert_eq!(top.parents().len(), 1);
//!
//! let status = top.to_rpc_status();
//! assert_eq!(status.to_string(), "rpc error: code = PermissionDenied desc = The login process is invalid | LOGIN_ERR");
//! ```
//!
//! ## Features
//!
//! - `serde`: serialize/deserialize nodes and statuses
//! - `trusted_debug`: show sensitive descriptions in chain logs (debug builds only)

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::any::Any;
use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::panic::Location;
use std::result;
use std::sync::Arc;
use zeroize::Zeroize;

pub mod chain;
pub mod codes;
pub mod context;
pub mod definitions;
pub mod logging;
pub mod severity;
pub mod status;

pub use chain::*;
pub use codes::*;
pub use context::*;
pub use definitions::*;
pub use logging::*;
pub use severity::*;
pub use status::*;

/// Type alias for Results using the chained error type.
pub type Result<T> = result::Result<T, ErrorNode>;

/// Placeholder shown instead of a sensitive description.
pub(crate) const REDACTED: &str = "[REDACTED]";

// ============================================================================
// Error Node
// ============================================================================

/// One link of an error chain.
///
/// # Identity
///
/// Two nodes are the same error exactly when their codes are equal. The
/// description, metadata and ancestry play no part in `==`.
///
/// # Ownership
///
/// A node holds its cause through an `Arc`. Ancestors are never mutated
/// after linking, so copies made by the mutators share them instead of
/// duplicating the chain. Traversal is capped at [`MAX_CHAIN_DEPTH`] hops.
///
/// # Drop
///
/// Owned strings are zeroized on drop. Ancestors are released iteratively,
/// so dropping a very long chain does not recurse once per link.
#[must_use = "errors should be handled, wrapped or projected"]
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorNode {
    #[cfg_attr(feature = "serde", serde(default))]
    description: Cow<'static, str>,
    #[cfg_attr(feature = "serde", serde(rename = "type", default))]
    classification: Classification,
    #[cfg_attr(feature = "serde", serde(default))]
    code: Cow<'static, str>,
    #[cfg_attr(feature = "serde", serde(rename = "cause", default))]
    cause_template: Cow<'static, str>,
    #[cfg_attr(feature = "serde", serde(rename = "isSensible", default))]
    sensitive: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    severity: Severity,
    #[cfg_attr(feature = "serde", serde(rename = "meta", default))]
    metadata: Metadata,
    #[cfg_attr(feature = "serde", serde(rename = "comesFrom", default))]
    cause: Option<Arc<ErrorNode>>,
    #[cfg_attr(feature = "serde", serde(skip))]
    origin_frame: Option<&'static Location<'static>>,
}

impl ErrorNode {
    /// Create a leaf node and capture the caller's location.
    #[track_caller]
    #[inline]
    pub fn new(
        classification: Classification,
        code: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            description: description.into(),
            classification,
            code: code.into(),
            cause_template: Cow::Borrowed(""),
            sensitive: false,
            severity: Severity::Error,
            metadata: Metadata::new(),
            cause: None,
            origin_frame: Some(Location::caller()),
        }
    }

    /// Create a leaf node in a `const` context. No frame is captured.
    ///
    /// This is what [`define_error_catalog!`] expands to.
    #[inline]
    pub const fn const_new(
        classification: Classification,
        code: &'static str,
        description: &'static str,
        cause_template: &'static str,
        severity: Severity,
    ) -> Self {
        Self {
            description: Cow::Borrowed(description),
            classification,
            code: Cow::Borrowed(code),
            cause_template: Cow::Borrowed(cause_template),
            sensitive: false,
            severity,
            metadata: Metadata::new(),
            cause: None,
            origin_frame: None,
        }
    }

    /// Leaf standing in for a foreign error, coded [`PRIMITIVE_ERROR_CODE`].
    #[track_caller]
    pub fn primitive(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Classification::Unknown, PRIMITIVE_ERROR_CODE, message)
    }

    /// Wrap `source` in an otherwise empty node.
    ///
    /// The wrapper has an empty code but still reports
    /// [`is_error`](Self::is_error) because it has a cause.
    #[track_caller]
    pub fn wrap<E>(source: E) -> Self
    where
        E: Error + 'static,
    {
        NIL.from_source(source)
    }

    // ========================================================================
    // Builders (consume a freshly created node)
    // ========================================================================

    /// Set the severity.
    #[inline]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Set the classification.
    #[inline]
    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    /// Set the cause template. Same effect as [`set_cause`](Self::set_cause)
    /// without the copy.
    #[inline]
    pub fn with_cause_template(mut self, template: impl Into<Cow<'static, str>>) -> Self {
        self.cause_template = template.into();
        self
    }

    /// Mark the description as unfit for external display.
    #[inline]
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Record the caller's location as this node's origin.
    ///
    /// Catalog templates are `const` and carry no frame; call this where the
    /// fault is detected.
    #[track_caller]
    #[inline]
    pub fn located(mut self) -> Self {
        self.origin_frame = Some(Location::caller());
        self
    }

    // ========================================================================
    // Copy-on-write mutators
    // ========================================================================

    /// Copy of this node with `source` linked as its cause.
    ///
    /// An `ErrorNode` source, bare or in a `Box` or `Arc`, is linked as is,
    /// ancestry included. Any other error becomes a [`PRIMITIVE_ERROR_CODE`]
    /// leaf carrying its message.
    /// The receiver keeps its own cause (or lack of one).
    #[track_caller]
    pub fn from_source<E>(&self, source: E) -> Self
    where
        E: Error + 'static,
    {
        // Move an ErrorNode source in without cloning its ancestry.
        let mut slot = Some(source);
        let any = &mut slot as &mut dyn Any;
        if let Some(node) = any.downcast_mut::<Option<ErrorNode>>().and_then(Option::take) {
            return self.with_parent(Arc::new(node));
        }
        if let Some(node) = any.downcast_mut::<Option<Box<ErrorNode>>>().and_then(Option::take) {
            return self.with_parent(Arc::new(*node));
        }
        if let Some(node) = any.downcast_mut::<Option<Arc<ErrorNode>>>().and_then(Option::take) {
            return self.with_parent(node);
        }
        match slot {
            Some(foreign) => self.with_parent(Arc::new(Self::foreign_leaf(&foreign))),
            None => self.clone(),
        }
    }

    /// Like [`from_source`](Self::from_source) for type-erased errors.
    #[track_caller]
    pub fn from_boxed(&self, source: Box<dyn Error + Send + Sync + 'static>) -> Self {
        let parent = match source.downcast::<ErrorNode>() {
            Ok(node) => *node,
            Err(foreign) => Self::foreign_leaf(foreign.as_ref()),
        };
        self.with_parent(Arc::new(parent))
    }

    /// Copy of this node with its cause template replaced.
    ///
    /// The name is historical: this sets the human-readable explanation, not
    /// the cause link. Use [`from_source`](Self::from_source) for that.
    pub fn set_cause(&self, cause: impl Into<Cow<'static, str>>) -> Self {
        let mut next = self.clone();
        next.cause_template = cause.into();
        next
    }

    /// Copy of this node with `metadata[key] = value`.
    pub fn add_metadata(
        &self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> Self {
        let mut next = self.clone();
        next.metadata.insert(key, value);
        next
    }

    /// Copy of this node with the first `{position}` placeholder of the cause
    /// template replaced by `value`.
    ///
    /// A missing placeholder leaves the template unchanged.
    pub fn set_param(&self, position: usize, value: &str) -> Self {
        let mut next = self.clone();
        let placeholder = format!("{{{position}}}");
        if self.cause_template.contains(&placeholder) {
            next.cause_template = Cow::Owned(self.cause_template.replacen(&placeholder, value, 1));
        }
        next
    }

    fn with_parent(&self, parent: Arc<ErrorNode>) -> Self {
        Self {
            description: self.description.clone(),
            classification: self.classification,
            code: self.code.clone(),
            cause_template: self.cause_template.clone(),
            sensitive: self.sensitive,
            severity: self.severity,
            metadata: self.metadata.clone(),
            cause: Some(parent),
            origin_frame: self.origin_frame,
        }
    }

    #[track_caller]
    fn foreign_leaf(source: &(dyn Error + 'static)) -> Self {
        Self::primitive(source.to_string())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Human-readable message.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Transport status category.
    #[inline]
    pub const fn classification(&self) -> Classification {
        self.classification
    }

    /// Stable identifier; empty for the "no error" sentinel.
    #[inline]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Explanation text, possibly with unresolved `{n}` placeholders.
    #[inline]
    pub fn cause_template(&self) -> &str {
        &self.cause_template
    }

    /// Whether the description must stay internal.
    #[inline]
    pub const fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    /// Advisory triage level.
    #[inline]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Structured context.
    #[inline]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Direct cause, if any.
    #[inline]
    pub fn cause(&self) -> Option<&ErrorNode> {
        self.cause.as_deref()
    }

    /// Where this node was created or located.
    #[inline]
    pub const fn origin_frame(&self) -> Option<&'static Location<'static>> {
        self.origin_frame
    }

    /// Description safe for untrusted readers.
    #[inline]
    pub fn public_description(&self) -> &str {
        if self.sensitive { REDACTED } else { self.description.as_ref() }
    }

    fn zeroize_owned(&mut self) {
        for field in [&mut self.description, &mut self.cause_template] {
            if let Cow::Owned(s) = field {
                s.zeroize();
            }
        }
        self.metadata.zeroize();
    }
}

impl Default for ErrorNode {
    fn default() -> Self {
        NIL
    }
}

impl Drop for ErrorNode {
    fn drop(&mut self) {
        self.zeroize_owned();

        // Unlink uniquely owned ancestors one at a time; shared ones are
        // released by their last holder.
        let mut next = self.cause.take();
        while let Some(parent) = next {
            next = match Arc::try_unwrap(parent) {
                Ok(mut node) => node.cause.take(),
                Err(_) => None,
            };
        }
    }
}

// ============================================================================
// Formatting
// ============================================================================

impl fmt::Display for ErrorNode {
    /// `CODE: description`, with sensitive descriptions redacted.
    ///
    /// The alternate form (`{:#}`) prints the whole chain, one node per line,
    /// with origin frames.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !f.alternate() {
            return write!(f, "{}: {}", self.code, self.public_description());
        }

        for (depth, node) in self.chain().enumerate() {
            if depth > 0 {
                writeln!(f)?;
                f.write_str("caused by: ")?;
            }
            write!(f, "{}: {}", node.code, node.public_description())?;
            if let Some(frame) = node.origin_frame {
                write!(f, "\n    at {}:{}:{}", frame.file(), frame.line(), frame.column())?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ErrorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorNode")
            .field("code", &self.code)
            .field("classification", &self.classification)
            .field("severity", &self.severity)
            .field("description", &self.public_description())
            .field("cause_template", &self.cause_template)
            .field("metadata", &self.metadata)
            .field("origin_frame", &self.origin_frame)
            .field("ancestors", &AncestorCodes(self))
            .finish()
    }
}

/// Ancestor codes for `Debug`, capped like every other walk.
struct AncestorCodes<'a>(&'a ErrorNode);

impl fmt::Debug for AncestorCodes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.ancestors().map(ErrorNode::code)).finish()
    }
}

impl Error for ErrorNode {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn Error + 'static))
    }
}
