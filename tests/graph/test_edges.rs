#[path = "../common/mod.rs"]
mod common;

use trawl_core::config::TrawlConfig;
use trawl_core::types::{NodeLabel, RelType};
use trawl_graph::builder::{BuildRequest, GraphBuilder};
use trawl_graph::symbols::UuidMapping;

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

#[test]
fn test_cross_file_inheritance() {
    let (_dir, root) = common::polyglot_project();
    let output = build(&root);
    let graph = &output.graph;

    let base = graph
        .nodes
        .iter()
        .find(|n| n.label == NodeLabel::Scope && n.name == "Base")
        .unwrap();
    let derived = graph
        .nodes
        .iter()
        .find(|n| n.label == NodeLabel::Scope && n.name == "Derived")
        .unwrap();

    let inherits: Vec<_> = graph
        .relationships
        .iter()
        .filter(|r| r.rel_type == RelType::InheritsFrom)
        .collect();
    assert_eq!(inherits.len(), 1);
    assert_eq!(inherits[0].from, derived.uuid);
    assert_eq!(inherits[0].to, base.uuid);
    assert_eq!(inherits[0].properties["explicit"], true);
    assert_eq!(inherits[0].properties["clause"], "extends");

    assert!(!graph
        .relationships
        .iter()
        .any(|r| r.rel_type == RelType::Consumes
            && r.from == derived.uuid
            && r.to == base.uuid));
}

#[test]
fn test_package_dependency_edge() {
    let (_dir, root) = common::polyglot_project();
    let output = build(&root);
    let graph = &output.graph;

    let lodash = graph
        .nodes
        .iter()
        .find(|n| n.label == NodeLabel::ExternalLibrary && n.name == "lodash")
        .expect("lodash library node");
    let package_json = graph
        .nodes
        .iter()
        .find(|n| n.label == NodeLabel::DataFile && n.name == "package.json")
        .unwrap();

    assert!(graph.relationships.iter().any(|r| {
        r.rel_type == RelType::UsesPackage
            && r.from == package_json.uuid
            && r.to == lodash.uuid
    }));
}

#[test]
fn test_belongs_to_is_exactly_one() {
    let (_dir, root) = common::polyglot_project();
    let output = build(&root);
    let graph = &output.graph;

    for node in &graph.nodes {
        if node.label == NodeLabel::Project {
            continue;
        }
        let count = graph
            .relationships
            .iter()
            .filter(|r| r.rel_type == RelType::BelongsTo && r.from == node.uuid)
            .count();
        assert_eq!(count, 1, "node {} ({:?})", node.uuid, node.label);
    }
}

#[test]
fn test_scope_and_method_hierarchy() {
    let (_dir, root) = common::polyglot_project();
    let output = build(&root);
    let graph = &output.graph;

    let base = graph
        .nodes
        .iter()
        .find(|n| n.label == NodeLabel::Scope && n.name == "Base")
        .unwrap();
    // Base.describe has a HAS_PARENT edge up to Base, and Base CONSUMES it
    let describe = graph
        .nodes
        .iter()
        .find(|n| {
            n.label == NodeLabel::Scope
                && n.name == "describe"
                && n.properties.get("parentScope").and_then(|v| v.as_str()) == Some("Base")
        })
        .unwrap();

    assert!(graph.relationships.iter().any(|r| {
        r.rel_type == RelType::HasParent && r.from == describe.uuid && r.to == base.uuid
    }));
    assert!(graph.relationships.iter().any(|r| {
        r.rel_type == RelType::Consumes && r.from == base.uuid && r.to == describe.uuid
    }));
}

#[test]
fn test_directory_chain_edges() {
    let (_dir, root) = common::polyglot_project();
    let output = build(&root);
    let graph = &output.graph;

    let src = graph
        .nodes
        .iter()
        .find(|n| n.label == NodeLabel::Directory && n.name == "src")
        .unwrap();
    let base_file = graph
        .nodes
        .iter()
        .find(|n| n.label == NodeLabel::File && n.name == "base.ts")
        .unwrap();

    assert!(graph.relationships.iter().any(|r| {
        r.rel_type == RelType::InDirectory && r.from == base_file.uuid && r.to == src.uuid
    }));
}

#[test]
fn test_no_duplicate_relationship_triples() {
    let (_dir, root) = common::polyglot_project();
    let output = build(&root);

    let mut triples: Vec<_> = output
        .graph
        .relationships
        .iter()
        .map(|r| (r.rel_type, r.from.clone(), r.to.clone()))
        .collect();
    let before = triples.len();
    triples.sort();
    triples.dedup();
    assert_eq!(before, triples.len());
}

#[test]
fn test_unresolvable_references_emit_no_dangling_edges() {
    let (_dir, root) = common::polyglot_project();
    let output = build(&root);
    let graph = &output.graph;

    let uuids: std::collections::HashSet<&str> =
        graph.nodes.iter().map(|n| n.uuid.as_str()).collect();
    for rel in &graph.relationships {
        assert!(
            uuids.contains(rel.from.as_str())
                || rel.from == trawl_core::ids::ORPHAN_PROJECT_ID,
            "dangling from: {}",
            rel.from
        );
        assert!(
            uuids.contains(rel.to.as_str()) || rel.to == trawl_core::ids::ORPHAN_PROJECT_ID,
            "dangling to: {} ({})",
            rel.to,
            rel.rel_type
        );
    }
}
