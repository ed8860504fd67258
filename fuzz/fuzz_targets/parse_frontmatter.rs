#![no_main]

use libfuzzer_sys::fuzz_target;
use skillsync::frontmatter::{decode, split};

fuzz_target!(|data: &[u8]| {
    let parts = split(data);
    if parts.has_frontmatter {
        let _ = decode(&parts.frontmatter);
    } else {
        assert!(parts.frontmatter.is_empty());
    }

    let mut wrapped = b"---\n".to_vec();
    wrapped.extend_from_slice(data);
    wrapped.extend_from_slice(b"\n---\n");
    let _ = decode(&split(&wrapped).frontmatter);
});
