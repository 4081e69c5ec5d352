//! Metadata preservation across the destructive delete/rebuild cycle.
//!
//! Embedding vectors and scope UUIDs are captured before a file's subgraph is
//! deleted. After ingestion, vectors whose `(file, contentHash, field)` key
//! matches a rebuilt node are restored; the rest are left for the re-embedder.

use trawl_core::collab::ProviderInfo;
use trawl_core::store::GraphStore;
use trawl_core::types::{EmbeddingRecord, GraphError, StoredScope};
use trawl_graph::symbols::{ExistingUuid, UuidMapping};

/// Everything captured for one batch, keyed for restoration.
#[derive(Debug, Default, Clone)]
pub struct CapturedMetadata {
    pub embeddings: Vec<EmbeddingRecord>,
    pub scopes: Vec<StoredScope>,
}

pub struct MetadataPreserver;

impl MetadataPreserver {
    /// Capture embeddings and scope UUIDs for the affected files. Must run
    /// strictly before any deletion.
    pub fn capture(
        store: &dyn GraphStore,
        files: &[String],
    ) -> Result<CapturedMetadata, GraphError> {
        Ok(CapturedMetadata {
            embeddings: store.embeddings_for_files(files)?,
            scopes: store.scopes_for_files(files)?,
        })
    }

    /// The `(name → candidates)` mapping the symbol resolver consults to keep
    /// UUIDs stable across a rebuild.
    pub fn uuid_mapping(captured: &CapturedMetadata) -> UuidMapping {
        let mut mapping = UuidMapping::new();
        for scope in &captured.scopes {
            mapping
                .entry(scope.name.clone())
                .or_default()
                .push(ExistingUuid {
                    uuid: scope.uuid.clone(),
                    file: scope.file.clone(),
                    kind: scope.kind,
                });
        }
        mapping
    }

    /// Restore captured vectors onto rebuilt nodes. A record is restored when
    /// a node in its file carries the same content hash; records from a
    /// different provider/model are skipped so the re-embedder regenerates
    /// them. Returns the number restored.
    pub fn restore(
        store: &mut dyn GraphStore,
        captured: &CapturedMetadata,
        active_provider: Option<&ProviderInfo>,
    ) -> Result<usize, GraphError> {
        let mut restored = 0usize;
        for record in &captured.embeddings {
            if let Some(active) = active_provider {
                if record.provider != active.provider || record.model != active.model {
                    continue;
                }
            }
            let nodes = store.nodes_for_file(&record.file)?;
            let target = nodes
                .iter()
                .find(|n| n.content_hash.as_deref() == Some(record.content_hash.as_str()));
            let Some(target) = target else {
                // Content changed: the vector is stale, let re-embedding fill it
                continue;
            };
            let mut to_store = record.clone();
            to_store.node_uuid = target.uuid.clone();
            store.put_embedding(&to_store)?;
            restored += 1;
        }
        Ok(restored)
    }
}
