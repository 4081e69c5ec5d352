#[path = "../common/mod.rs"]
mod common;

use std::sync::{Arc, Mutex};

use trawl_core::config::TrawlConfig;
use trawl_core::sqlite::SqliteGraphStore;
use trawl_core::store::GraphStore;
use trawl_core::types::NodeLabel;
use trawl_ingest::orchestrator::{IngestOptions, Orchestrator};
use trawl_ingest::queue::{ChangeType, FileChange};
use trawl_ingest::watcher::initial_scan;

use common::write_file;

fn no_embed() -> IngestOptions {
    IngestOptions {
        generate_embeddings: false,
        transform_graph: None,
    }
}

#[test]
fn test_index_then_edit_then_delete() {
    let (_dir, root) = common::polyglot_project();
    let store: Arc<Mutex<dyn GraphStore>> =
        Arc::new(Mutex::new(SqliteGraphStore::in_memory().unwrap()));
    let orchestrator = Orchestrator::new(Arc::clone(&store), TrawlConfig::default(), None);

    // Initial index of the whole tree
    let changes = initial_scan(&root, "project:sample");
    let stats = orchestrator.reingest(&changes, &no_embed());
    assert!(stats.ok(), "errors: {:?}", stats.errors);
    assert_eq!(stats.created, changes.len());
    assert!(stats.nodes_created > 10);

    {
        let store = store.lock().unwrap();
        // One node per label family we expect from the fixture
        let labels: std::collections::HashSet<NodeLabel> = store
            .nodes_for_file(&root.join("src/base.ts").to_string_lossy())
            .unwrap()
            .iter()
            .map(|n| n.label)
            .collect();
        assert!(labels.contains(&NodeLabel::File));
        assert!(labels.contains(&NodeLabel::Scope));
    }

    // Edit one file; only that file's subgraph is rebuilt
    let derived = root.join("src/derived.ts").to_string_lossy().to_string();
    write_file(
        &root,
        "src/derived.ts",
        "import { Base } from './base';\n\nexport class Derived extends Base {\n  describe(): string {\n    return 'still derived';\n  }\n}\n",
    );
    let stats = orchestrator.reingest(
        &[FileChange::new(&derived, ChangeType::Updated).for_project("project:sample")],
        &no_embed(),
    );
    assert!(stats.ok());
    assert_eq!(stats.updated, 1);

    // Delete the file; its nodes disappear, the rest stays
    std::fs::remove_file(&derived).unwrap();
    let stats = orchestrator.reingest(
        &[FileChange::new(&derived, ChangeType::Deleted).for_project("project:sample")],
        &no_embed(),
    );
    assert!(stats.ok());
    assert_eq!(stats.deleted, 1);

    let store = store.lock().unwrap();
    assert!(store.nodes_for_file(&derived).unwrap().is_empty());
    let base = root.join("src/base.ts").to_string_lossy().to_string();
    assert!(!store.nodes_for_file(&base).unwrap().is_empty());
}

#[test]
fn test_resolve_chunk_parents_after_ingest() {
    let (_dir, root) = common::polyglot_project();
    let store: Arc<Mutex<dyn GraphStore>> =
        Arc::new(Mutex::new(SqliteGraphStore::in_memory().unwrap()));
    let orchestrator = Orchestrator::new(Arc::clone(&store), TrawlConfig::default(), None);
    orchestrator.reingest(&initial_scan(&root, "project:sample"), &no_embed());

    let store = store.lock().unwrap();
    let readme = root.join("README.md").to_string_lossy().to_string();
    let sections: Vec<String> = store
        .nodes_for_file(&readme)
        .unwrap()
        .into_iter()
        .filter(|n| n.label == NodeLabel::MarkdownSection)
        .map(|n| n.uuid)
        .collect();
    assert!(!sections.is_empty());

    let resolved = store.resolve_chunk_parents(&sections).unwrap();
    assert_eq!(resolved.len(), sections.len());
    for uuid in &sections {
        assert_eq!(resolved[uuid].label, NodeLabel::MarkdownSection);
    }
}

#[test]
fn test_stats_shape() {
    let (_dir, root) = common::polyglot_project();
    let store: Arc<Mutex<dyn GraphStore>> =
        Arc::new(Mutex::new(SqliteGraphStore::in_memory().unwrap()));
    let orchestrator = Orchestrator::new(Arc::clone(&store), TrawlConfig::default(), None);

    let stats = orchestrator.reingest(&initial_scan(&root, "project:sample"), &no_embed());
    assert!(stats.errors.is_empty());
    assert_eq!(stats.embeddings_generated, 0);
    assert_eq!(stats.embeddings_preserved, 0);
    assert_eq!(stats.unchanged, 0);
    assert_eq!(stats.updated, 0);
    assert!(stats.nodes_created >= stats.created);
}
