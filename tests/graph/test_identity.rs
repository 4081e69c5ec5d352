#[path = "../common/mod.rs"]
mod common;

use trawl_core::config::TrawlConfig;
use trawl_core::types::NodeLabel;
use trawl_graph::builder::{BuildRequest, GraphBuilder};
use trawl_graph::symbols::UuidMapping;

use common::write_file;

fn build(root: &std::path::Path) -> trawl_graph::builder::BuildOutput {
    let builder = GraphBuilder::new(TrawlConfig::default());
    builder
        .build(&BuildRequest {
            root: root.to_path_buf(),
            project_id: "project:demo".to_string(),
            include: None,
            existing_uuids: UuidMapping::new(),
        })
        .unwrap()
}

fn scope_uuid(output: &trawl_graph::builder::BuildOutput, name: &str) -> String {
    output
        .graph
        .nodes
        .iter()
        .find(|n| n.label == NodeLabel::Scope && n.name == name)
        .unwrap_or_else(|| panic!("scope {name} not found"))
        .uuid
        .clone()
}

fn scope_hash(output: &trawl_graph::builder::BuildOutput, name: &str) -> String {
    output
        .graph
        .nodes
        .iter()
        .find(|n| n.label == NodeLabel::Scope && n.name == name)
        .unwrap()
        .content_hash
        .clone()
        .unwrap()
}

#[test]
fn test_rename_refactor_keeps_uuid_changes_hash() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write_file(root, "x.ts", "class A {\n  foo(): void {}\n}\n");
    let before = build(root);
    let foo_before = scope_uuid(&before, "foo");
    let a_before = scope_uuid(&before, "A");
    let foo_hash_before = scope_hash(&before, "foo");
    let a_hash_before = scope_hash(&before, "A");

    // Same signature, new body
    write_file(root, "x.ts", "class A {\n  foo(): void { /* body */ }\n}\n");
    let after = build(root);

    assert_eq!(scope_uuid(&after, "foo"), foo_before);
    assert_ne!(scope_hash(&after, "foo"), foo_hash_before);
    // The parent class keeps identity too (its own signature is unchanged)
    assert_eq!(scope_uuid(&after, "A"), a_before);
    let _ = a_hash_before;
}

#[test]
fn test_line_drift_does_not_change_uuid() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write_file(root, "y.ts", "export function bar(n: number): number {\n  return n;\n}\n");
    let before = build(root);
    let uuid_before = scope_uuid(&before, "bar");

    let padding = "// shifted\n".repeat(110);
    write_file(
        root,
        "y.ts",
        &format!("{padding}export function bar(n: number): number {{\n  return n;\n}}\n"),
    );
    let after = build(root);

    assert_eq!(scope_uuid(&after, "bar"), uuid_before);
    let bar = after
        .graph
        .nodes
        .iter()
        .find(|n| n.label == NodeLabel::Scope && n.name == "bar")
        .unwrap();
    assert_eq!(bar.properties["startLine"], 111);
}

#[test]
fn test_moving_a_variable_changes_uuid() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write_file(root, "v.ts", "const LIMIT = 10;\n");
    let before = build(root);
    let uuid_before = scope_uuid(&before, "LIMIT");

    write_file(root, "v.ts", "// moved down\nconst LIMIT = 10;\n");
    let after = build(root);

    assert_ne!(scope_uuid(&after, "LIMIT"), uuid_before);
}

#[test]
fn test_file_uuid_is_path_function() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_file(root, "a.ts", "export const x = 1;\n");

    let first = build(root);
    write_file(root, "a.ts", "export const x = 2;\n");
    let second = build(root);

    let uuid_of = |output: &trawl_graph::builder::BuildOutput| {
        output
            .graph
            .nodes
            .iter()
            .find(|n| n.label == NodeLabel::File)
            .unwrap()
            .uuid
            .clone()
    };
    assert_eq!(uuid_of(&first), uuid_of(&second));
}

#[test]
fn test_signature_change_changes_uuid() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write_file(root, "s.ts", "export function f(a: number): number { return a; }\n");
    let before = build(root);
    write_file(root, "s.ts", "export function f(a: string): string { return a; }\n");
    let after = build(root);

    assert_ne!(scope_uuid(&before, "f"), scope_uuid(&after, "f"));
}
