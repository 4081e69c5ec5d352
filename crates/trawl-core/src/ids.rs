//! Prefix-tagged deterministic identifiers.
//!
//! Every node id is a pure function of its inputs so that re-indexing the same
//! tree reproduces the same graph. The prefixes are load-bearing: the graph
//! store matcher dispatches on them and they must never change between
//! ingestions.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::hash::short_hash;
use crate::types::ScopeKind;

/// Reserved project id for files that belong to no registered project.
/// No Project node is ever emitted for it.
pub const ORPHAN_PROJECT_ID: &str = "__orphans__";

/// Fixed namespace for v5 UUIDs. Changing this invalidates every stored scope
/// identity, so it is frozen.
const UUID_NAMESPACE: Uuid = Uuid::from_u128(0x7a3d_90f1_44c2_4b9a_a1e6_52d8_03bc_71e5);

pub fn project_id(name: &str) -> String {
    format!("project:{name}")
}

pub fn file_id(absolute_path: &str) -> String {
    format!("file:{}", short_hash(absolute_path))
}

pub fn dir_id(absolute_path: &str) -> String {
    format!("dir:{}", short_hash(absolute_path))
}

pub fn pkg_id(absolute_path: &str) -> String {
    format!("pkg:{}", short_hash(absolute_path))
}

pub fn lib_id(name: &str) -> String {
    format!("lib:{}", short_hash(name))
}

pub fn data_id(absolute_path: &str) -> String {
    format!("data:{}", short_hash(absolute_path))
}

/// Section ids mix the owning file with the section path so that two files can
/// carry identically-titled sections.
pub fn section_id(absolute_path: &str, section_path: &str) -> String {
    format!("section:{}", short_hash(&format!("{absolute_path}#{section_path}")))
}

pub fn media_id(absolute_path: &str) -> String {
    format!("media:{}", Uuid::new_v5(&UUID_NAMESPACE, absolute_path.as_bytes()))
}

pub fn doc_id(absolute_path: &str) -> String {
    format!("doc:{}", Uuid::new_v5(&UUID_NAMESPACE, absolute_path.as_bytes()))
}

pub fn url_id(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write;
        let _ = write!(hex, "{b:02x}");
    }
    format!("url:{hex}")
}

/// Signature hash for a scope.
///
/// `parent.name? + "." + (signature OR name:kind:dedented-content)`, with the
/// start line appended only for variables and constants. Everything else must
/// keep its identity when the declaration moves.
pub fn signature_hash(
    parent_name: Option<&str>,
    name: &str,
    kind: ScopeKind,
    signature: Option<&str>,
    dedented_content: &str,
    start_line: u32,
) -> String {
    let core = match signature {
        Some(sig) if !sig.is_empty() => sig.to_string(),
        _ => format!("{name}:{}:{dedented_content}", kind.as_str()),
    };
    let mut input = match parent_name {
        Some(parent) if !parent.is_empty() => format!("{parent}.{core}"),
        _ => core,
    };
    if kind.is_positional() {
        input.push_str(&format!(":{start_line}"));
    }
    short_hash(&input)
}

/// Deterministic scope UUID: v5 over `absolute_path:name:kind:signature_hash`.
pub fn scope_uuid(absolute_path: &str, name: &str, kind: ScopeKind, sig_hash: &str) -> String {
    let input = format!("{absolute_path}:{name}:{}:{sig_hash}", kind.as_str());
    Uuid::new_v5(&UUID_NAMESPACE, input.as_bytes()).to_string()
}
