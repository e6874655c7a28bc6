#![no_main]

use libfuzzer_sys::fuzz_target;
use status_chain::{Classification, ErrorNode, MAX_FIELD_OUTPUT_LEN};

// Rendering must stay bounded for arbitrary descriptions, templates and metadata.
fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data).into_owned();
    let (head, tail) = text.split_at(text.char_indices().nth(text.chars().count() / 2).map_or(0, |(i, _)| i));

    let node = ErrorNode::new(Classification::InvalidArgument, "FUZZ", head.to_owned())
        .with_cause_template(tail.to_owned())
        .add_metadata(tail.to_owned(), head.to_owned())
        .set_param(1, head);

    let mut line = String::new();
    node.chain_log().write_to(&mut line).unwrap();
    assert!(line.len() <= MAX_FIELD_OUTPUT_LEN * 5 + 512);
});
