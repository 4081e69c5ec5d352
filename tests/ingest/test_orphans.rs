#[path = "../common/mod.rs"]
mod common;

use std::sync::{Arc, Mutex};

use trawl_core::config::TrawlConfig;
use trawl_core::ids::ORPHAN_PROJECT_ID;
use trawl_core::sqlite::SqliteGraphStore;
use trawl_core::store::GraphStore;
use trawl_core::types::NodeLabel;
use trawl_ingest::orchestrator::{IngestOptions, Orchestrator};
use trawl_ingest::orphans::OrphanTracker;
use trawl_ingest::queue::{ChangeType, FileChange};

use common::write_file;

const DAY: u64 = 86_400;

fn no_embed() -> IngestOptions {
    IngestOptions {
        generate_embeddings: false,
        transform_graph: None,
    }
}

#[test]
fn test_orphan_file_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let file = write_file(root, "scratch.py", "def probe():\n    return 1\n");

    let store: Arc<Mutex<dyn GraphStore>> =
        Arc::new(Mutex::new(SqliteGraphStore::in_memory().unwrap()));
    let config = TrawlConfig::default();
    let orchestrator = Orchestrator::new(Arc::clone(&store), config.clone(), None);
    let mut tracker = OrphanTracker::load(root, &config);

    // Touched outside any registered project: indexed under the reserved id
    let change = FileChange::new(&file, ChangeType::Created);
    let stats = orchestrator.reingest(&[change], &no_embed());
    assert!(stats.ok());
    tracker.track(&file, 1_000);

    {
        let store = store.lock().unwrap();
        let nodes = store.nodes_for_file(&file).unwrap();
        assert!(!nodes.is_empty());
        assert!(nodes.iter().all(|n| n.project_id == ORPHAN_PROJECT_ID));
        assert!(!nodes.iter().any(|n| n.label == NodeLabel::Project));
    }

    // Past the retention horizon the tracker evicts, and the eviction drives
    // a deleted batch that removes the subgraph.
    let expired = tracker.evict_expired(1_000 + 8 * DAY);
    assert_eq!(expired, vec![file.clone()]);

    let deletions: Vec<FileChange> = expired
        .into_iter()
        .map(|path| FileChange::new(path, ChangeType::Deleted))
        .collect();
    let stats = orchestrator.reingest(&deletions, &no_embed());
    assert!(stats.ok());
    assert_eq!(stats.deleted, 1);

    let store = store.lock().unwrap();
    assert!(store.nodes_for_file(&file).unwrap().is_empty());
}

#[test]
fn test_orphan_cap_evicts_oldest_first() {
    let dir = tempfile::tempdir().unwrap();
    let config = TrawlConfig {
        max_orphan_files: 3,
        ..TrawlConfig::default()
    };
    let mut tracker = OrphanTracker::load(dir.path(), &config);

    for (i, t) in [(0, 10u64), (1, 20), (2, 30)] {
        assert!(tracker.track(&format!("/tmp/f{i}.ts"), t).is_empty());
    }
    let evicted = tracker.track("/tmp/f3.ts", 40);
    assert_eq!(evicted, vec!["/tmp/f0.ts".to_string()]);
    assert_eq!(tracker.len(), 3);
}
