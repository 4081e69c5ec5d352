#[path = "../common/mod.rs"]
mod common;

use trawl_core::config::TrawlConfig;
use trawl_core::hash::{raw_content_hash, short_hash};
use trawl_parsers::ParserRegistry;

/// Parse-then-hash must be identical across registry instances (and, by
/// construction, across process restarts: no ambient state feeds the hash).
#[test]
fn test_semantic_hash_stable_across_registries() {
    let (_dir, root) = common::polyglot_project();
    let config = TrawlConfig::default();
    let path = root.join("src/base.ts");
    let bytes = std::fs::read(&path).unwrap();

    let first = {
        let registry = ParserRegistry::new();
        let (_, output) = registry.parse_file(&path, &bytes, &config).unwrap();
        short_hash(&output.semantic_summary())
    };
    let second = {
        let registry = ParserRegistry::new();
        let (_, output) = registry.parse_file(&path, &bytes, &config).unwrap();
        short_hash(&output.semantic_summary())
    };
    assert_eq!(first, second);
}

#[test]
fn test_raw_hash_tracks_bytes_only() {
    let bytes_a = b"export const x = 1;\n";
    let bytes_b = b"export const x = 2;\n";
    assert_eq!(raw_content_hash(bytes_a), raw_content_hash(bytes_a));
    assert_ne!(raw_content_hash(bytes_a), raw_content_hash(bytes_b));
}

#[test]
fn test_semantic_hash_ignores_trailing_whitespace_noise() {
    // Determinism is required, canonicalization is not: two byte-identical
    // inputs agree, and that is the whole contract.
    let (_dir, root) = common::polyglot_project();
    let config = TrawlConfig::default();
    let registry = ParserRegistry::new();

    let path = root.join("src/util.py");
    let bytes = std::fs::read(&path).unwrap();
    let (_, a) = registry.parse_file(&path, &bytes, &config).unwrap();
    let (_, b) = registry.parse_file(&path, &bytes, &config).unwrap();
    assert_eq!(
        short_hash(&a.semantic_summary()),
        short_hash(&b.semantic_summary())
    );
}
