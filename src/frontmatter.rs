//! Frontmatter splitting and decoding.
//!
//! A skill file may start with a metadata block delimited by `---` or `+++`
//! lines. [`split`] separates that block from the body without interpreting it;
//! [`decode`] parses the block as YAML into a [`Frontmatter`] map whose accessors
//! are deliberately forgiving about value types.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};

use crate::error::ParseError;

const DELIMITERS: [&str; 2] = ["---", "+++"];

/// Result of splitting a document into frontmatter and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    /// Raw frontmatter bytes with CRLF normalized to LF.
    pub frontmatter: Vec<u8>,
    /// Everything after the closing delimiter line, or the whole input when
    /// there is no frontmatter.
    pub body: String,
    pub has_frontmatter: bool,
}

impl Split {
    fn without_frontmatter(content: &[u8]) -> Self {
        Self {
            frontmatter: Vec::new(),
            body: String::from_utf8_lossy(content).into_owned(),
            has_frontmatter: false,
        }
    }
}

/// Split a leading delimited block from the rest of the document.
///
/// The opening delimiter must sit at offset 0 (after an optional UTF-8 BOM) and
/// be followed by `\n` or `\r\n`. An unclosed block is treated as plain body.
pub fn split(content: &[u8]) -> Split {
    let input = content.strip_prefix(b"\xef\xbb\xbf").unwrap_or(content);

    let Some((delim, open_len)) = opening_delimiter(input) else {
        return Split::without_frontmatter(content);
    };

    // Search from the opening line's newline so an immediately following
    // delimiter closes an empty block.
    let search_from = open_len - 1;
    let Some((close_at, close_len)) = closing_delimiter(input, delim, search_from) else {
        return Split::without_frontmatter(content);
    };

    let raw = if close_at > open_len {
        &input[open_len..close_at]
    } else {
        &[][..]
    };
    let body_start = (close_at + close_len).min(input.len());

    Split {
        frontmatter: normalize_frontmatter(raw),
        body: String::from_utf8_lossy(&input[body_start..]).into_owned(),
        has_frontmatter: true,
    }
}

fn opening_delimiter(input: &[u8]) -> Option<(&'static str, usize)> {
    for delim in DELIMITERS {
        let Some(rest) = input.strip_prefix(delim.as_bytes()) else {
            continue;
        };
        if rest.starts_with(b"\n") {
            return Some((delim, delim.len() + 1));
        }
        if rest.starts_with(b"\r\n") {
            return Some((delim, delim.len() + 2));
        }
    }
    None
}

/// Locate the closing delimiter line. Returns the offset of the newline that
/// precedes it and the length of the matched sequence.
fn closing_delimiter(input: &[u8], delim: &str, from: usize) -> Option<(usize, usize)> {
    let haystack = &input[from..];
    let candidates = [
        format!("\n{delim}\n"),
        format!("\n{delim}\r\n"),
    ];

    let mut best: Option<(usize, usize)> = None;
    for needle in &candidates {
        if let Some(pos) = find(haystack, needle.as_bytes()) {
            if best.map_or(true, |(at, _)| pos < at) {
                best = Some((pos, needle.len()));
            }
        }
    }

    if best.is_none() {
        let tail = format!("\n{delim}");
        if haystack.ends_with(tail.as_bytes()) {
            best = Some((haystack.len() - tail.len(), tail.len()));
        }
    }

    best.map(|(pos, len)| (pos + from, len))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn normalize_frontmatter(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'\r' && raw.get(i + 1) == Some(&b'\n') {
            i += 1;
            continue;
        }
        out.push(raw[i]);
        i += 1;
    }
    while out.last() == Some(&b'\r') {
        out.pop();
    }
    out
}

/// Normalize body text: CRLF to LF, surrounding whitespace trimmed.
pub fn normalize_body(text: &str) -> String {
    text.replace("\r\n", "\n").trim().to_string()
}

/// Decoded frontmatter: string keys mapped to YAML values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    fields: BTreeMap<String, Value>,
}

/// Decode frontmatter bytes as a YAML mapping.
///
/// Empty input yields an empty map.
pub fn decode(bytes: &[u8]) -> Result<Frontmatter, ParseError> {
    let text = String::from_utf8_lossy(bytes);
    if text.trim().is_empty() {
        return Ok(Frontmatter::default());
    }

    let parsed: Value = serde_yaml::from_str(&text)?;
    match parsed {
        Value::Mapping(map) => Ok(Frontmatter {
            fields: mapping_to_btreemap(map)?,
        }),
        Value::Null => Ok(Frontmatter::default()),
        _ => Err(ParseError::NotAMapping),
    }
}

impl Frontmatter {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// A string field. Numbers and booleans are rendered; other shapes are absent.
    pub fn string(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(num) => Some(num.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// A string field with surrounding whitespace trimmed; empty counts as absent.
    pub fn trimmed(&self, key: &str) -> Option<String> {
        self.string(key)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    }

    /// A boolean field. Accepts YAML booleans and the strings `true`/`false`.
    pub fn bool(&self, key: &str) -> bool {
        match self.fields.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(text)) => text.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    /// A list of strings from either a sequence or a comma-separated string.
    pub fn string_list(&self, key: &str) -> Vec<String> {
        match self.fields.get(key) {
            Some(Value::Sequence(items)) => items
                .iter()
                .filter_map(scalar_to_string)
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
            Some(Value::String(text)) => text
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// A mapping of scalar keys to scalar values.
    pub fn string_map(&self, key: &str) -> BTreeMap<String, String> {
        match self.fields.get(key) {
            Some(Value::Mapping(map)) => mapping_to_string_map(map),
            _ => BTreeMap::new(),
        }
    }

    /// Every field not listed in `excluded`, rendered for display.
    pub fn remaining(&self, excluded: &[&str]) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .filter(|(key, _)| !excluded.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), render_value(value)))
            .collect()
    }
}

/// Convert a `serde_yaml` Mapping to a `BTreeMap` with string keys.
pub fn mapping_to_btreemap(map: Mapping) -> Result<BTreeMap<String, Value>, ParseError> {
    let mut result = BTreeMap::new();
    for (key, value) in map {
        let key_str = match key {
            Value::String(text) => text,
            _ => return Err(ParseError::NonStringKey),
        };
        result.insert(key_str, value);
    }
    Ok(result)
}

/// Convert a Mapping to string keys and values, dropping non-scalar entries.
pub fn mapping_to_string_map(map: &Mapping) -> BTreeMap<String, String> {
    map.iter()
        .filter_map(|(key, value)| Some((scalar_to_string(key)?, scalar_to_string(value)?)))
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(num) => Some(num.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Render any YAML value as a single display string.
///
/// Sequences become `[a b c]` and mappings `{k: v, ...}` so that they survive
/// being stored as a flat string.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(num) => num.to_string(),
        Value::String(text) => text.clone(),
        Value::Sequence(items) => {
            let parts: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", parts.join(" "))
        }
        Value::Mapping(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(key, val)| format!("{}: {}", render_value(key), render_value(val)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        Value::Tagged(tagged) => render_value(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn split_lf_frontmatter() {
        let out = split(b"---\nname: my-skill\ndescription: A test\n---\n# Title\n\nBody\n");
        assert!(out.has_frontmatter);
        assert_eq!(out.frontmatter, b"name: my-skill\ndescription: A test".to_vec());
        assert_eq!(out.body, "# Title\n\nBody\n");
    }

    #[test]
    fn split_crlf_frontmatter() {
        let out = split(b"---\r\nname: x\r\ntools: [a]\r\n---\r\nBody\r\n");
        assert!(out.has_frontmatter);
        assert_eq!(out.frontmatter, b"name: x\ntools: [a]".to_vec());
        assert_eq!(out.body, "Body\r\n");
    }

    #[test]
    fn split_plus_delimiters() {
        let out = split(b"+++\nname: x\n+++\nBody");
        assert!(out.has_frontmatter);
        assert_eq!(out.frontmatter, b"name: x".to_vec());
        assert_eq!(out.body, "Body");
    }

    #[test]
    fn split_empty_frontmatter() {
        let out = split(b"---\n---\nBody here\n");
        assert!(out.has_frontmatter);
        assert!(out.frontmatter.is_empty());
        assert_eq!(out.body, "Body here\n");

        let out = split(b"---\r\n---\r\nBody");
        assert!(out.has_frontmatter);
        assert!(out.frontmatter.is_empty());
        assert_eq!(out.body, "Body");
    }

    #[test]
    fn split_unclosed_is_plain_body() {
        let input = b"---\nname: x\nno closing here\n";
        let out = split(input);
        assert!(!out.has_frontmatter);
        assert_eq!(out.body.as_bytes(), input);
    }

    #[test]
    fn split_requires_delimiter_at_offset_zero() {
        let out = split(b" ---\nname: x\n---\nBody");
        assert!(!out.has_frontmatter);

        let out = split(b"---name\nx\n---\n");
        assert!(!out.has_frontmatter);
    }

    #[test]
    fn split_closing_at_end_of_input() {
        let out = split(b"---\nname: x\n---");
        assert!(out.has_frontmatter);
        assert_eq!(out.frontmatter, b"name: x".to_vec());
        assert_eq!(out.body, "");
    }

    #[test]
    fn split_mixed_endings_closes_at_earliest_delimiter() {
        let out = split(b"---\nname: x\n---\r\nBody\n---\nmore\n");
        assert!(out.has_frontmatter);
        assert_eq!(out.frontmatter, b"name: x".to_vec());
        assert_eq!(out.body, "Body\n---\nmore\n");

        let out = split(b"---\r\nname: x\r\n---\nBody\r\n---\r\nTail");
        assert!(out.has_frontmatter);
        assert_eq!(out.frontmatter, b"name: x".to_vec());
        assert_eq!(out.body, "Body\r\n---\r\nTail");
    }

    #[test]
    fn split_skips_bom() {
        let out = split("\u{feff}---\nname: x\n---\nBody".as_bytes());
        assert!(out.has_frontmatter);
        assert_eq!(out.body, "Body");
    }

    #[test]
    fn decode_empty_is_empty_map() {
        assert!(decode(b"").unwrap().is_empty());
        assert!(decode(b"  \n").unwrap().is_empty());
    }

    #[test]
    fn decode_errors() {
        assert!(matches!(
            decode(b"name: [invalid\ndescription: broken"),
            Err(ParseError::InvalidYaml(_))
        ));
        assert!(matches!(
            decode(b"- just\n- a\n- list"),
            Err(ParseError::NotAMapping)
        ));
        assert!(matches!(
            decode(b"1: a\nname: x"),
            Err(ParseError::NonStringKey)
        ));
    }

    #[test]
    fn accessors_are_permissive() {
        let fm = decode(
            b"name: x\ncount: 3\nflag: true\ntools: [Bash, ' Read ']\nallowed-tools: Bash, Read, Grep\n\
              compat:\n  claude: '>=1.0'\n  cursor: 2\nnested: {a: 1}\n",
        )
        .unwrap();

        assert_eq!(fm.string("name").as_deref(), Some("x"));
        assert_eq!(fm.string("count").as_deref(), Some("3"));
        assert_eq!(fm.string("nested"), None);
        assert!(fm.bool("flag"));
        assert!(!fm.bool("name"));
        assert_eq!(fm.string_list("tools"), vec!["Bash", "Read"]);
        assert_eq!(fm.string_list("allowed-tools"), vec!["Bash", "Read", "Grep"]);
        assert!(fm.string_list("count").is_empty());

        let compat = fm.string_map("compat");
        assert_eq!(compat.get("claude").map(String::as_str), Some(">=1.0"));
        assert_eq!(compat.get("cursor").map(String::as_str), Some("2"));
        assert!(fm.string_map("name").is_empty());
    }

    #[test]
    fn remaining_renders_sequences_and_maps() {
        let fm = decode(b"name: x\nglobs: ['*.rs', '*.toml']\nalwaysApply: false\nextra: {k: v}\n")
            .unwrap();
        let rest = fm.remaining(&["name"]);
        assert_eq!(rest.get("globs").map(String::as_str), Some("[*.rs *.toml]"));
        assert_eq!(rest.get("alwaysApply").map(String::as_str), Some("false"));
        assert_eq!(rest.get("extra").map(String::as_str), Some("{k: v}"));
        assert!(!rest.contains_key("name"));
    }

    #[test]
    fn normalize_body_converts_crlf_and_trims() {
        assert_eq!(normalize_body("\r\n  Line one\r\nLine two\r\n\r\n"), "Line one\nLine two");
    }

    proptest! {
        #[test]
        fn split_never_panics(input in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = split(&input);
        }

        #[test]
        fn body_of_split_has_no_frontmatter(key in "k[a-z]{0,7}", value in "[a-z0-9 ]{0,16}", body in "[a-zA-Z0-9 #\n]{0,64}") {
            let doc = format!("---\n{key}: \"{value}\"\n---\n{body}");
            let out = split(doc.as_bytes());
            prop_assert!(out.has_frontmatter);
            let fm = decode(&out.frontmatter).unwrap();
            prop_assert_eq!(fm.keys().collect::<Vec<_>>(), vec![key.as_str()]);
            prop_assert!(!split(out.body.as_bytes()).has_frontmatter);
        }

        #[test]
        fn empty_frontmatter_preserves_body(body in "[a-zA-Z0-9 ]{0,32}(\r\n[a-zA-Z0-9 ]{0,32}){0,4}") {
            let doc = format!("---\r\n---\r\n{body}");
            let out = split(doc.as_bytes());
            prop_assert!(out.has_frontmatter);
            prop_assert_eq!(out.body.replace("\r\n", "\n"), body.replace("\r\n", "\n"));
        }
    }
}
