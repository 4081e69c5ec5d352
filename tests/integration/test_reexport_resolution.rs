#[path = "../common/mod.rs"]
mod common;

use trawl_core::config::TrawlConfig;
use trawl_core::types::{NodeLabel, RelType};
use trawl_graph::builder::{BuildRequest, GraphBuilder};
use trawl_graph::symbols::UuidMapping;

use common::write_file;

/// A barrel file between the consumer and the definition: the CONSUMES edge
/// must land on the defining file's scope, not the barrel.
#[test]
fn test_consumes_through_barrel() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write_file(root, "src/widgets/button.ts", "export class Button {\n  press(): void {}\n}\n");
    write_file(root, "src/widgets/index.ts", "export * from './button';\n");
    write_file(
        root,
        "src/app.ts",
        "import { Button } from './widgets';\n\nexport function makeButton(): Button {\n  return new Button();\n}\n",
    );

    let builder = GraphBuilder::new(TrawlConfig::default());
    let output = builder
        .build(&BuildRequest {
            root: root.to_path_buf(),
            project_id: "project:demo".to_string(),
            include: None,
            existing_uuids: UuidMapping::new(),
        })
        .unwrap();
    let graph = &output.graph;

    let button = graph
        .nodes
        .iter()
        .find(|n| n.label == NodeLabel::Scope && n.name == "Button")
        .unwrap();
    let maker = graph
        .nodes
        .iter()
        .find(|n| n.label == NodeLabel::Scope && n.name == "makeButton")
        .unwrap();

    assert!(graph.relationships.iter().any(|r| {
        r.rel_type == RelType::Consumes && r.from == maker.uuid && r.to == button.uuid
    }));
}

#[test]
fn test_aliased_reexport_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write_file(root, "src/impl.ts", "export class Engine {\n  start(): void {}\n}\n");
    write_file(root, "src/index.ts", "export { Engine as Motor } from './impl';\n");
    write_file(
        root,
        "src/app.ts",
        "import { Motor } from './index';\n\nexport function boot(): void {\n  new Motor();\n}\n",
    );

    let builder = GraphBuilder::new(TrawlConfig::default());
    let output = builder
        .build(&BuildRequest {
            root: root.to_path_buf(),
            project_id: "project:demo".to_string(),
            include: None,
            existing_uuids: UuidMapping::new(),
        })
        .unwrap();
    let graph = &output.graph;

    let engine = graph
        .nodes
        .iter()
        .find(|n| n.label == NodeLabel::Scope && n.name == "Engine")
        .unwrap();
    let boot = graph
        .nodes
        .iter()
        .find(|n| n.label == NodeLabel::Scope && n.name == "boot")
        .unwrap();

    assert!(graph.relationships.iter().any(|r| {
        r.rel_type == RelType::Consumes && r.from == boot.uuid && r.to == engine.uuid
    }));
}
