//! Property-based tests for status_chain
//!
//! These tests use proptest to generate random inputs and verify invariants hold.

use proptest::prelude::*;
use status_chain::{Classification, ErrorNode, MAX_CHAIN_DEPTH, NIL, Severity};

fn classification() -> impl Strategy<Value = Classification> {
    (0i32..=16).prop_map(|v| Classification::from_i32(v).unwrap())
}

fn severity() -> impl Strategy<Value = Severity> {
    prop::sample::select(Severity::ALL.to_vec())
}

prop_compose! {
    fn node()(
        class in classification(),
        code in "[A-Z_]{1,12}",
        desc in "\\PC{0,64}",
        level in severity(),
        meta in prop::collection::vec(("[a-z]{1,8}", "\\PC{0,16}"), 0..6),
    ) -> ErrorNode {
        meta.into_iter().fold(
            ErrorNode::new(class, code, desc).with_severity(level),
            |node, (k, v)| node.add_metadata(k, v),
        )
    }
}

fn chain_of(codes: &[String]) -> ErrorNode {
    let mut iter = codes.iter();
    let first = iter.next().cloned().unwrap_or_default();
    iter.fold(
        ErrorNode::new(Classification::Internal, first, "leaf"),
        |inner, code| ErrorNode::new(Classification::Internal, code.clone(), "wrap").from_source(inner),
    )
}

// ============================================================================
// IDENTITY PROPERTIES
// ============================================================================

proptest! {
    /// Equality is decided by code alone
    #[test]
    fn equality_is_code_equality(a in node(), b in node()) {
        prop_assert_eq!(a.equals(&b), a.code() == b.code());
        prop_assert_eq!(a == b, a.code() == b.code());
    }

    /// Metadata and description never affect equality
    #[test]
    fn equality_ignores_payload(a in node(), desc in "\\PC{0,32}", key in "[a-z]{1,8}") {
        let b = ErrorNode::new(a.classification(), a.code().to_owned(), desc).add_metadata(key, "v");
        prop_assert!(a.equals(&b));
    }

    /// Any non-empty code makes a node an error
    #[test]
    fn coded_nodes_are_errors(n in node()) {
        prop_assert!(n.is_error());
        prop_assert!(NIL.from_source(n).is_error());
    }
}

// ============================================================================
// TRAVERSAL PROPERTIES
// ============================================================================

proptest! {
    /// Parents come back nearest first, one per wrap
    #[test]
    fn parents_mirror_construction(codes in prop::collection::vec("[A-Z]{1,6}", 1..40)) {
        let top = chain_of(&codes);
        let parents: Vec<&str> = top.parents().into_iter().map(ErrorNode::code).collect();

        let expected: Vec<&str> = codes.iter().rev().skip(1).map(String::as_str).collect();
        prop_assert_eq!(parents, expected);
        prop_assert!(top.depth() <= MAX_CHAIN_DEPTH);
    }

    /// Every code in the chain is findable from the head
    #[test]
    fn every_ancestor_matches(codes in prop::collection::vec("[A-Z]{1,6}", 1..20), pick in any::<prop::sample::Index>()) {
        let top = chain_of(&codes);
        let code = pick.get(&codes);
        let target = ErrorNode::new(Classification::Unknown, code.clone(), "");

        prop_assert!(top.is_same_as(&target));
        prop_assert_eq!(top.find_code(code).map(ErrorNode::code), Some(code.as_str()));
    }

    /// A leaf has no parents
    #[test]
    fn leaves_have_no_parents(n in node()) {
        prop_assert!(n.parents().is_empty());
        prop_assert_eq!(n.root_cause().code(), n.code());
    }
}

// ============================================================================
// MUTATOR PROPERTIES
// ============================================================================

proptest! {
    /// Mutators never touch the receiver
    #[test]
    fn mutators_are_pure(n in node(), key in "[a-z]{1,8}", text in "\\PC{0,32}", other in node()) {
        let before = format!("{n:?}");

        let _ = n.set_cause(text.clone());
        let _ = n.add_metadata(key, text.clone());
        let _ = n.set_param(1, &text);
        let wrapped = n.from_source(other.clone());

        prop_assert_eq!(format!("{n:?}"), before);
        prop_assert!(n.cause().is_none());
        prop_assert_eq!(wrapped.cause(), Some(&other));
    }

    /// set_param replaces exactly the first placeholder occurrence
    #[test]
    fn set_param_substitutes_first_match(pos in 1usize..10, value in "[a-z ]{0,12}", prefix in "[a-z ]{0,8}") {
        let template = format!("{prefix}{{{pos}}} and {{{pos}}}");
        let node = NIL.set_cause(template);
        let next = node.set_param(pos, &value);

        prop_assert_eq!(next.cause_template(), format!("{prefix}{value} and {{{pos}}}"));
    }

    /// A missing placeholder leaves the template alone
    #[test]
    fn set_param_missing_position_is_noop(template in "[a-z' ]{0,32}", pos in 1usize..100) {
        let node = NIL.set_cause(template.clone());
        let next = node.set_param(pos, "x");
        prop_assert_eq!(next.cause_template(), template.as_str());
    }
}

// ============================================================================
// PROJECTION PROPERTIES
// ============================================================================

proptest! {
    /// Default-branch messages are `description | code`
    #[test]
    fn default_branch_appends_code(n in node()) {
        prop_assume!(!matches!(n.classification(), Classification::Unknown | Classification::InvalidArgument));
        let status = n.to_rpc_status();

        prop_assert_eq!(status.code(), n.classification());
        prop_assert_eq!(status.message(), format!("{} | {}", n.description(), n.code()));
        prop_assert!(status.details().is_empty());
    }

    /// Validation errors list one field violation per metadata pair
    #[test]
    fn validation_errors_list_every_field(n in node()) {
        let n = n.with_classification(Classification::InvalidArgument);
        let status = n.to_rpc_status();

        let fields: Vec<&str> = status.field_violations().map(|v| v.field.as_str()).collect();
        let keys: Vec<&str> = n.metadata().iter().map(|(k, _)| k).collect();
        prop_assert_eq!(fields, keys);
    }

    /// Unknown always reaches the wire as NotFound
    #[test]
    fn unknown_becomes_not_found(n in node()) {
        let n = n.with_classification(Classification::Unknown);
        let status = n.to_rpc_status();

        prop_assert_eq!(status.code(), Classification::NotFound);
        prop_assert_eq!(status.message(), n.description());
    }
}

// ============================================================================
// LOG RENDERING PROPERTIES
// ============================================================================

proptest! {
    /// Rendered chains stay valid UTF-8 and bounded
    #[test]
    fn chain_log_is_bounded(desc in "\\PC{0,5000}", value in "\\PC{0,5000}") {
        let node = ErrorNode::new(Classification::Internal, "BIG", desc).add_metadata("k", value);
        let mut buffer = String::new();
        node.chain_log().write_to(&mut buffer).unwrap();

        prop_assert!(std::str::from_utf8(buffer.as_bytes()).is_ok());
        prop_assert!(buffer.len() < 1024 * 2 + 256 + 128);
    }

    /// Sensitive descriptions never show in Display
    #[test]
    fn sensitive_never_in_display(secret in "[a-z]{16,32}") {
        let node = ErrorNode::new(Classification::Internal, "SECRET", secret.clone()).sensitive();
        prop_assert!(!node.to_string().contains(&secret));
        prop_assert!(!node.to_rpc_status().message().contains(&secret));
    }
}
