//! Structured log rendering of whole chains.
//!
//! # Properties
//!
//! - [`ChainLog`] borrows the head node and cannot outlive it
//! - Rendering writes straight into a `fmt::Write`; nothing is retained
//! - Every field is truncated to [`MAX_FIELD_OUTPUT_LEN`] bytes
//! - Sensitive descriptions render as `[REDACTED]`
//!
//! The last point is relaxed only when the `trusted_debug` feature is on
//! *and* debug assertions are enabled. A release build never prints a
//! sensitive description, whatever the feature set.
//!
//! # Format
//!
//! One segment per node, head first, joined by ` <- `:
//!
//! ```text
//! [LOGIN_ERR] severity=error classification=PermissionDenied description='The login process is invalid' at=src/auth.rs:42 <- [ECPw] ...
//! ```

use crate::{ErrorNode, REDACTED};
use std::borrow::Cow;
use std::fmt;
use tracing::Level;

/// Maximum length for any individual field in rendered output.
pub const MAX_FIELD_OUTPUT_LEN: usize = 1024;

/// Appended to fields cut at [`MAX_FIELD_OUTPUT_LEN`].
const TRUNCATION_INDICATOR: &str = "...[TRUNCATED]";

const NODE_SEPARATOR: &str = " <- ";

const SHOW_SENSITIVE: bool = cfg!(all(feature = "trusted_debug", debug_assertions));

/// Log view over a chain, borrowed from its head node.
///
/// ```rust
/// # use status_chain::{Classification, ErrorNode};
/// let err = ErrorNode::new(Classification::Internal, "DB_DOWN", "pool exhausted");
/// let mut line = String::new();
/// err.chain_log().write_to(&mut line).unwrap();
/// assert!(line.starts_with("[DB_DOWN] severity=error classification=Internal"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ChainLog<'a> {
    head: &'a ErrorNode,
}

impl<'a> ChainLog<'a> {
    /// View over `head` and its ancestors.
    #[inline]
    pub const fn new(head: &'a ErrorNode) -> Self {
        Self { head }
    }

    /// The node the view starts at.
    #[inline]
    pub const fn head(&self) -> &'a ErrorNode {
        self.head
    }

    /// Write the chain as one line.
    ///
    /// Walks at most [`MAX_CHAIN_DEPTH`](crate::MAX_CHAIN_DEPTH) ancestors.
    pub fn write_to(&self, f: &mut impl fmt::Write) -> fmt::Result {
        for (i, node) in self.head.chain().enumerate() {
            if i > 0 {
                f.write_str(NODE_SEPARATOR)?;
            }
            write_node(node, f)?;
        }
        Ok(())
    }

    /// Send the chain to `tracing` at the head's severity level.
    ///
    /// The rendered chain is attached as the `chain` field and is only
    /// formatted if a subscriber is interested in the event.
    pub fn emit(&self) {
        let log = *self;
        let node = self.head;
        let depth = node.depth();

        macro_rules! emit_at {
            ($level:expr) => {
                tracing::event!(
                    $level,
                    code = node.code(),
                    classification = %node.classification(),
                    severity = %node.severity(),
                    depth,
                    chain = %log,
                    "error chain"
                )
            };
        }

        match node.severity().tracing_level() {
            Level::ERROR => emit_at!(Level::ERROR),
            Level::WARN => emit_at!(Level::WARN),
            Level::INFO => emit_at!(Level::INFO),
            Level::DEBUG => emit_at!(Level::DEBUG),
            _ => emit_at!(Level::TRACE),
        }
    }

    /// Render with sensitive descriptions in clear.
    ///
    /// Only compiled with the `trusted_debug` feature in debug builds. The
    /// returned string holds whatever the chain holds; keep it out of
    /// shared log sinks.
    #[cfg(all(feature = "trusted_debug", debug_assertions))]
    pub fn format_for_trusted_debug(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ChainLog<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f)
    }
}

fn write_node(node: &ErrorNode, f: &mut impl fmt::Write) -> fmt::Result {
    let description = if node.is_sensitive() && !SHOW_SENSITIVE {
        REDACTED
    } else {
        node.description()
    };

    write!(
        f,
        "[{}] severity={} classification={} description='{}'",
        truncate_with_indicator(node.code()),
        node.severity(),
        node.classification(),
        truncate_with_indicator(description),
    )?;

    if !node.cause_template().is_empty() {
        write!(f, " cause='{}'", truncate_with_indicator(node.cause_template()))?;
    }

    for (key, value) in node.metadata().iter() {
        write!(
            f,
            " {}='{}'",
            truncate_with_indicator(key),
            truncate_with_indicator(value)
        )?;
    }

    if let Some(frame) = node.origin_frame() {
        write!(f, " at={}:{}", frame.file(), frame.line())?;
    }

    Ok(())
}

/// Truncate a field for display, keeping the cut visible to operators.
///
/// Borrows when no truncation is needed.
fn truncate_with_indicator(s: &str) -> Cow<'_, str> {
    if s.len() <= MAX_FIELD_OUTPUT_LEN {
        return Cow::Borrowed(s);
    }

    let max_content_len = MAX_FIELD_OUTPUT_LEN.saturating_sub(TRUNCATION_INDICATOR.len());

    let mut idx = max_content_len;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }

    if idx == 0 {
        return Cow::Borrowed(TRUNCATION_INDICATOR);
    }

    let mut result = String::with_capacity(idx + TRUNCATION_INDICATOR.len());
    result.push_str(&s[..idx]);
    result.push_str(TRUNCATION_INDICATOR);
    Cow::Owned(result)
}

impl ErrorNode {
    /// Log view over this chain.
    #[inline]
    pub const fn chain_log(&self) -> ChainLog<'_> {
        ChainLog::new(self)
    }

    /// Run `f` with a log view that cannot escape the closure.
    #[inline]
    pub fn with_chain_log<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ChainLog<'_>) -> R,
    {
        f(&self.chain_log())
    }

    /// Emit this chain through `tracing`. See [`ChainLog::emit`].
    #[inline]
    pub fn log(&self) {
        self.chain_log().emit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Classification, Severity};
    use std::io;
    use std::sync::{Arc, Mutex};

    fn render(node: &ErrorNode) -> String {
        let mut out = String::new();
        node.chain_log().write_to(&mut out).unwrap();
        out
    }

    fn fixture() -> ErrorNode {
        let leaf = ErrorNode::new(Classification::InvalidArgument, "EIA", "The argument 'password' is invalid")
            .with_cause_template("'password' lower than 6")
            .add_metadata("arg", "'password");
        ErrorNode::new(Classification::PermissionDenied, "LOGIN_ERR", "The login process is invalid")
            .from_source(leaf)
    }

    #[test]
    fn renders_every_node_head_first() {
        let line = render(&fixture());
        let segments: Vec<&str> = line.split(NODE_SEPARATOR).collect();

        assert_eq!(segments.len(), 2);
        assert!(segments[0].starts_with(
            "[LOGIN_ERR] severity=error classification=PermissionDenied description='The login process is invalid'"
        ));
        assert!(segments[1].contains(" cause=''password' lower than 6'"));
        assert!(segments[1].contains(" arg=''password'"));
        assert!(segments[1].contains(" at="));
    }

    #[test]
    fn empty_template_is_omitted() {
        let node = ErrorNode::new(Classification::Internal, "X", "y");
        assert!(!render(&node).contains("cause="));
    }

    #[cfg(not(all(feature = "trusted_debug", debug_assertions)))]
    #[test]
    fn sensitive_description_is_redacted() {
        let node = ErrorNode::new(Classification::Internal, "DB", "postgres://root:hunter2@db").sensitive();
        let line = render(&node);
        assert!(line.contains("description='[REDACTED]'"));
        assert!(!line.contains("hunter2"));
    }

    #[cfg(all(feature = "trusted_debug", debug_assertions))]
    #[test]
    fn trusted_debug_shows_sensitive_description() {
        let node = ErrorNode::new(Classification::Internal, "DB", "postgres://root:hunter2@db").sensitive();
        assert!(node.chain_log().format_for_trusted_debug().contains("hunter2"));
    }

    #[test]
    fn long_fields_are_truncated() {
        let node = ErrorNode::new(Classification::Internal, "BIG", "x".repeat(MAX_FIELD_OUTPUT_LEN * 4))
            .add_metadata("payload", "y".repeat(MAX_FIELD_OUTPUT_LEN * 4));
        let line = render(&node);
        assert_eq!(line.matches(TRUNCATION_INDICATOR).count(), 2);
        assert!(line.len() < MAX_FIELD_OUTPUT_LEN * 3);
    }

    #[test]
    fn display_matches_write_to() {
        let node = fixture();
        assert_eq!(node.chain_log().to_string(), render(&node));
        assert_eq!(node.with_chain_log(|log| log.head().code().to_owned()), "LOGIN_ERR");
    }

    fn quoted<'a>(line: &'a str, key: &str) -> &'a str {
        let open = format!(" {key}='");
        let start = line.find(&open).expect("field present") + open.len();
        let len = line[start..].find('\'').expect("closing quote");
        &line[start..start + len]
    }

    #[test]
    fn oversized_description_is_cut_with_indicator() {
        let node = ErrorNode::new(Classification::Internal, "BIG", "a".repeat(MAX_FIELD_OUTPUT_LEN + 10));
        let line = render(&node);
        let description = quoted(&line, "description");

        assert_eq!(description.len(), MAX_FIELD_OUTPUT_LEN);
        assert!(description.ends_with(TRUNCATION_INDICATOR));
        assert!(line.contains("[BIG] severity=error"));
    }

    #[test]
    fn description_at_limit_renders_whole() {
        let text = "a".repeat(MAX_FIELD_OUTPUT_LEN);
        let node = ErrorNode::new(Classification::Internal, "EDGE", text.clone());
        let line = render(&node);

        assert_eq!(quoted(&line, "description"), text);
        assert!(!line.contains(TRUNCATION_INDICATOR));
    }

    #[test]
    fn multibyte_cause_is_cut_on_char_boundary() {
        // Two bytes per char.
        let node = ErrorNode::new(Classification::Internal, "CYR", "short")
            .set_cause("й".repeat(MAX_FIELD_OUTPUT_LEN));
        let line = render(&node);
        let cause = quoted(&line, "cause");

        assert!(cause.len() <= MAX_FIELD_OUTPUT_LEN);
        let kept = cause.strip_suffix(TRUNCATION_INDICATOR).expect("cut is marked");
        assert!(kept.chars().all(|c| c == 'й'));
        assert_eq!(quoted(&line, "description"), "short");
    }

    #[test]
    fn emoji_metadata_is_cut_on_char_boundary() {
        let node = ErrorNode::new(Classification::InvalidArgument, "EMOJI", "bad input")
            .add_metadata("comment", "🔥".repeat(MAX_FIELD_OUTPUT_LEN));
        let line = render(&node);
        let value = quoted(&line, "comment");

        assert!(value.len() <= MAX_FIELD_OUTPUT_LEN);
        let kept = value.strip_suffix(TRUNCATION_INDICATOR).expect("cut is marked");
        assert!(!kept.is_empty());
        assert!(kept.chars().all(|c| c == '🔥'));
    }

    #[test]
    fn oversized_metadata_key_is_cut() {
        let key = "k".repeat(MAX_FIELD_OUTPUT_LEN * 2);
        let node = ErrorNode::new(Classification::InvalidArgument, "KEY", "bad input").add_metadata(key, "v");
        let line = render(&node);

        let kept = "k".repeat(MAX_FIELD_OUTPUT_LEN - TRUNCATION_INDICATOR.len());
        let expected = format!(" {kept}{TRUNCATION_INDICATOR}='v'");
        assert!(line.contains(&expected));
    }

    #[test]
    fn truncation_applies_per_node_in_chain() {
        let inner = ErrorNode::new(Classification::Internal, "INNER", "b".repeat(MAX_FIELD_OUTPUT_LEN * 2));
        let top = ErrorNode::new(Classification::Internal, "OUTER", "fine").from_source(inner);
        let line = render(&top);

        assert_eq!(line.matches(TRUNCATION_INDICATOR).count(), 1);
        assert!(line.contains("description='fine'"));
        let inner_part = &line[line.find("[INNER]").expect("inner node rendered")..];
        assert_eq!(quoted(inner_part, "description").len(), MAX_FIELD_OUTPUT_LEN);
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(Level::TRACE)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buf.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn emit_uses_severity_level_and_structured_fields() {
        let node = fixture();
        let out = capture(|| node.log());

        assert!(out.contains("ERROR"));
        assert!(out.contains("LOGIN_ERR"));
        assert!(out.contains("classification=PermissionDenied"));
        assert!(out.contains("depth=1"));
        assert!(out.contains("[EIA]"));
    }

    #[test]
    fn expected_faults_log_at_info() {
        let node = ErrorNode::new(Classification::Unauthenticated, "TOKEN_EXP", "expired")
            .with_severity(Severity::Expected);
        let out = capture(|| node.log());

        assert!(out.contains("INFO"));
        assert!(!out.contains("ERROR"));
    }

    #[test]
    fn sensitive_description_stays_out_of_tracing() {
        let node = ErrorNode::new(Classification::Internal, "DB", "hunter2").sensitive();
        let out = capture(|| node.log());

        if !SHOW_SENSITIVE {
            assert!(!out.contains("hunter2"));
        }
        assert!(out.contains("DB"));
    }
}
