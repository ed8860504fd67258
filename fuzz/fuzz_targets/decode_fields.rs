#![no_main]

use libfuzzer_sys::fuzz_target;
use skillsync::frontmatter::decode;
use skillsync::validation::is_valid_name;

fuzz_target!(|data: &[u8]| {
    let Ok(fields) = decode(data) else {
        return;
    };

    if let Some(name) = fields.string("name") {
        let _ = is_valid_name(&name);
    }
    let _ = fields.string_list("tools");
    let _ = fields.string_map("compatibility");
    let _ = fields.bool("disable-model-invocation");
    let _ = fields.remaining(&["name", "description"]);
});
