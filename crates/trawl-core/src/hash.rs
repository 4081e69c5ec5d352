use sha2::{Digest, Sha256};
use xxhash_rust::xxh64::xxh64;

const BASE62_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Encode a u64 value as a base62 string (11 chars, zero-padded).
fn base62_encode(mut value: u64) -> String {
    if value == 0 {
        return "0".repeat(11);
    }
    let mut result = Vec::with_capacity(11);
    while value > 0 {
        let idx = (value % 62) as usize;
        result.push(BASE62_CHARS[idx]);
        value /= 62;
    }
    // Pad to 11 chars
    while result.len() < 11 {
        result.push(b'0');
    }
    result.reverse();
    String::from_utf8(result).expect("base62 chars are valid UTF-8")
}

/// Short content hash: base62(xxhash64(input)), 11 chars.
///
/// Used for semantic content hashes, signature hashes, and hash-suffixed
/// identifiers. Deterministic across runs and platforms.
pub fn short_hash(input: &str) -> String {
    base62_encode(xxh64(input.as_bytes(), 0))
}

/// Short hash over raw bytes (media headers, first-64KiB fingerprints).
pub fn short_hash_bytes(input: &[u8]) -> String {
    base62_encode(xxh64(input, 0))
}

/// Raw content hash: lowercase SHA-256 hex of the file bytes.
///
/// The pre-parse skip key — if the raw hash is unchanged the file is not
/// re-parsed at all.
pub fn raw_content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Strip the common leading whitespace from every line.
///
/// Scope content hashes must not change when a block is re-indented, e.g.
/// when a function is moved into or out of a class body.
pub fn dedent(text: &str) -> String {
    let min_indent = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    if min_indent == 0 {
        return text.to_string();
    }
    text.lines()
        .map(|l| if l.len() >= min_indent { &l[min_indent..] } else { l.trim_start() })
        .collect::<Vec<_>>()
        .join("\n")
}
