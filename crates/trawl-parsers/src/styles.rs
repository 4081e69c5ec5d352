//! CSS/SCSS summarization: rule, selector, and property counts, declared
//! variables, and `@import` targets. No full CSS object model — the graph
//! stores a summary, not the sheet.

use std::sync::OnceLock;

use regex::Regex;

use crate::ir::StylesheetInfo;
use trawl_core::hash::short_hash;

fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"@import\s+(?:url\()?["']?([^"');]+)["']?\)?\s*;"#).expect("import regex")
    })
}

fn var_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Custom properties (--x:) and SCSS variables ($x:)
    RE.get_or_init(|| Regex::new(r"(?m)^\s*(--[\w-]+|\$[\w-]+)\s*:").expect("var regex"))
}

pub fn parse(source: &str) -> StylesheetInfo {
    let stripped = strip_comments(source);

    let mut rule_count = 0usize;
    let mut selector_count = 0usize;
    let mut property_count = 0usize;

    let mut depth = 0usize;
    let mut pending = String::new();
    for c in stripped.chars() {
        match c {
            '{' => {
                let selector_text = pending.trim();
                // At-rules with blocks (@media, @keyframes) open a brace but
                // are not style rules themselves
                if !selector_text.is_empty() && !selector_text.starts_with('@') {
                    rule_count += 1;
                    selector_count += selector_text.split(',').filter(|s| !s.trim().is_empty()).count();
                }
                pending.clear();
                depth += 1;
            }
            '}' => {
                depth = depth.saturating_sub(1);
                pending.clear();
            }
            ';' => {
                if depth > 0 && pending.contains(':') {
                    property_count += 1;
                }
                pending.clear();
            }
            _ => pending.push(c),
        }
    }

    let variables: Vec<String> = var_re()
        .captures_iter(&stripped)
        .map(|c| c[1].to_string())
        .collect();

    let imports: Vec<String> = import_re()
        .captures_iter(&stripped)
        .map(|c| c[1].trim().to_string())
        .collect();

    StylesheetInfo {
        hash: short_hash(source),
        rule_count,
        selector_count,
        property_count,
        variables,
        imports,
    }
}

fn strip_comments(source: &str) -> String {
    let block_re = Regex::new(r"(?s)/\*.*?\*/").expect("comment regex");
    let line_re = Regex::new(r"(?m)//.*$").expect("line comment regex");
    let without_blocks = block_re.replace_all(source, "");
    line_re.replace_all(&without_blocks, "").to_string()
}
