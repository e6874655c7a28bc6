#![no_main]

use libfuzzer_sys::fuzz_target;
use status_chain::{Classification, ErrorNode, RpcBackend};

// Arbitrary chains project without panicking and never expose sensitive text.
fuzz_target!(|data: &[u8]| {
    let mut node = ErrorNode::primitive("seed");
    for (i, chunk) in data.chunks(3).take(64).enumerate() {
        let class = Classification::from_i32(i32::from(chunk[0] % 17)).unwrap_or_default();
        let code = format!("C{}", chunk.get(1).copied().unwrap_or(0));
        let mut next = ErrorNode::new(class, code, "secret-description");
        if chunk.get(2).is_some_and(|b| b & 1 == 1) {
            next = next.sensitive();
        }
        node = next.add_metadata(format!("f{i}"), "v").from_source(node);
    }

    let projection = node.to_status(&RpcBackend::new().with_details_budget(512));
    if node.is_sensitive() {
        assert!(!projection.wire.message().contains("secret-description"));
    }
});
