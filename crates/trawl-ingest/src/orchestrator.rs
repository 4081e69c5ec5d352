//! The re-ingestion state machine.
//!
//! One batch runs capture → delete → parse → ingest → restore → re-embed, in
//! that order, per project. Batches for the same project are serialized; a
//! batch offered while another is running waits rather than interleaving.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use trawl_core::collab::EmbeddingProvider;
use trawl_core::config::TrawlConfig;
use trawl_core::hash::raw_content_hash;
use trawl_core::ids::ORPHAN_PROJECT_ID;
use trawl_core::store::GraphStore;
use trawl_core::types::{Graph, GraphError};
use trawl_graph::builder::{BuildRequest, GraphBuilder};

use crate::preserve::{CapturedMetadata, MetadataPreserver};
use crate::queue::{ChangeType, FileChange};

/// Where the orchestrator currently is in the batch lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestPhase {
    Idle,
    Capturing,
    Deleting,
    Parsing,
    Ingesting,
    Restoring,
    ReEmbedding,
}

/// Pure transformation applied to the graph before ingestion.
pub type TransformFn = Box<dyn Fn(Graph) -> Graph + Send + Sync>;

pub struct IngestOptions {
    pub generate_embeddings: bool,
    pub transform_graph: Option<TransformFn>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        IngestOptions {
            generate_embeddings: true,
            transform_graph: None,
        }
    }
}

/// User-visible outcome of one `reingest` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionStats {
    pub unchanged: usize,
    pub updated: usize,
    pub created: usize,
    pub deleted: usize,
    pub nodes_created: usize,
    pub embeddings_generated: usize,
    pub embeddings_preserved: usize,
    pub duration_ms: u64,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl IngestionStats {
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct Orchestrator {
    store: Arc<Mutex<dyn GraphStore>>,
    builder: GraphBuilder,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    phase: Mutex<IngestPhase>,
    /// Serializes batches; `reingest` holds it for a whole batch.
    batch_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<Mutex<dyn GraphStore>>,
        config: TrawlConfig,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Self {
        Orchestrator {
            store,
            builder: GraphBuilder::new(config),
            embedder,
            phase: Mutex::new(IngestPhase::Idle),
            batch_lock: Mutex::new(()),
        }
    }

    pub fn phase(&self) -> IngestPhase {
        *self.phase.lock().unwrap()
    }

    /// Whether a batch is currently being processed.
    pub fn is_processing(&self) -> bool {
        self.batch_lock.try_lock().is_err()
    }

    fn set_phase(&self, phase: IngestPhase) {
        *self.phase.lock().unwrap() = phase;
        tracing::debug!("ingest phase: {phase:?}");
    }

    /// Re-ingest a coalesced batch of changes. Changes are grouped by project
    /// (orphans under the reserved id) and each group runs the full lifecycle.
    /// Any step failure surfaces on the returned stats; nothing is swallowed.
    pub fn reingest(&self, changes: &[FileChange], options: &IngestOptions) -> IngestionStats {
        let _batch = self.batch_lock.lock().unwrap();
        let started = Instant::now();
        let mut stats = IngestionStats::default();

        let mut by_project: HashMap<String, Vec<&FileChange>> = HashMap::new();
        for change in changes {
            let project = change
                .project_id
                .clone()
                .unwrap_or_else(|| ORPHAN_PROJECT_ID.to_string());
            by_project.entry(project).or_default().push(change);
        }

        for (project_id, group) in by_project {
            if let Err(e) = self.process_group(&project_id, &group, options, &mut stats) {
                // The delete phase may already have run; the caller must know
                stats.errors.push(format!("{project_id}: {e}"));
                break;
            }
        }

        self.set_phase(IngestPhase::Idle);
        stats.duration_ms = started.elapsed().as_millis() as u64;
        if stats.ok() {
            tracing::info!(
                created = stats.created,
                updated = stats.updated,
                deleted = stats.deleted,
                unchanged = stats.unchanged,
                "batch ingested in {}ms",
                stats.duration_ms
            );
        }
        stats
    }

    fn process_group(
        &self,
        project_id: &str,
        changes: &[&FileChange],
        options: &IngestOptions,
        stats: &mut IngestionStats,
    ) -> Result<(), GraphError> {
        // Pre-parse skip: an updated file whose bytes still match the stored
        // rawContentHash gets zero writes — no capture, no delete, no rebuild.
        let skipped: HashSet<String> = {
            let store = self.store.lock().unwrap();
            changes
                .iter()
                .filter(|c| c.change_type == ChangeType::Updated)
                .filter(|c| {
                    let Ok(bytes) = std::fs::read(&c.path) else {
                        return false;
                    };
                    let current = raw_content_hash(&bytes);
                    stored_raw_hash(&*store, &c.path).as_deref() == Some(current.as_str())
                })
                .map(|c| c.path.clone())
                .collect()
        };
        stats.unchanged += skipped.len();

        let affected: Vec<String> = changes
            .iter()
            .filter(|c| matches!(c.change_type, ChangeType::Updated | ChangeType::Deleted))
            .filter(|c| !skipped.contains(&c.path))
            .map(|c| c.path.clone())
            .collect();
        let rebuild: Vec<String> = changes
            .iter()
            .filter(|c| matches!(c.change_type, ChangeType::Created | ChangeType::Updated))
            .filter(|c| !skipped.contains(&c.path))
            .map(|c| c.path.clone())
            .collect();

        stats.deleted += changes
            .iter()
            .filter(|c| c.change_type == ChangeType::Deleted)
            .count();
        stats.created += changes
            .iter()
            .filter(|c| c.change_type == ChangeType::Created)
            .count();

        // Prior File-node hashes, to tell unchanged from updated afterwards.
        let prior_hashes: HashMap<String, Option<String>> = {
            let store = self.store.lock().unwrap();
            affected
                .iter()
                .map(|file| {
                    let hash = store
                        .nodes_for_file(file)
                        .ok()
                        .and_then(|nodes| {
                            nodes
                                .into_iter()
                                .find(|n| n.label == trawl_core::types::NodeLabel::File)
                        })
                        .and_then(|n| n.content_hash);
                    (file.clone(), hash)
                })
                .collect()
        };

        self.set_phase(IngestPhase::Capturing);
        let captured: CapturedMetadata = {
            let store = self.store.lock().unwrap();
            MetadataPreserver::capture(&*store, &affected)?
        };

        self.set_phase(IngestPhase::Deleting);
        {
            // Deletions must precede insertions for the same path. Created
            // paths are deleted too: a file deleted and recreated within one
            // window arrives as `created`, and its old scopes must not stack.
            let delete_set: Vec<String> = changes
                .iter()
                .filter(|c| !skipped.contains(&c.path))
                .map(|c| c.path.clone())
                .collect();
            let mut store = self.store.lock().unwrap();
            store.delete_nodes_for_files(&delete_set, Some(project_id))?;
        }

        if !rebuild.is_empty() {
            self.set_phase(IngestPhase::Parsing);
            let root = shortest_common_dir(&rebuild)
                .ok_or_else(|| GraphError::Internal("no common root for batch".to_string()))?;
            let include: Vec<String> = rebuild
                .iter()
                .filter_map(|p| {
                    Path::new(p)
                        .strip_prefix(&root)
                        .ok()
                        .map(|rel| rel.to_string_lossy().to_string())
                })
                .collect();

            let request = BuildRequest {
                root: root.clone(),
                project_id: project_id.to_string(),
                include: Some(include),
                existing_uuids: MetadataPreserver::uuid_mapping(&captured),
            };
            let output = self.builder.build(&request)?;
            stats.warnings.extend(output.warnings);

            let graph = match &options.transform_graph {
                Some(transform) => transform(output.graph),
                None => output.graph,
            };

            // Duplicate UUIDs in one batch are a programming error
            let duplicates = graph.duplicate_uuids();
            if !duplicates.is_empty() {
                return Err(GraphError::DuplicateUuids(duplicates));
            }

            self.set_phase(IngestPhase::Ingesting);
            {
                let mut store = self.store.lock().unwrap();
                store.upsert(&graph)?;
            }
            stats.nodes_created += graph.nodes.len();

            for change in changes {
                if change.change_type != ChangeType::Updated || skipped.contains(&change.path) {
                    continue;
                }
                let new_hash = graph
                    .nodes
                    .iter()
                    .find(|n| {
                        n.label == trawl_core::types::NodeLabel::File
                            && n.absolute_path.as_deref() == Some(change.path.as_str())
                    })
                    .and_then(|n| n.content_hash.clone());
                let prior = prior_hashes.get(&change.path).cloned().flatten();
                if new_hash.is_some() && new_hash == prior {
                    stats.unchanged += 1;
                } else {
                    stats.updated += 1;
                }
            }
        }

        self.set_phase(IngestPhase::Restoring);
        let provider_info = self.embedder.as_ref().and_then(|e| e.info());
        {
            let mut store = self.store.lock().unwrap();
            stats.embeddings_preserved +=
                MetadataPreserver::restore(&mut *store, &captured, provider_info.as_ref())?;
        }

        if options.generate_embeddings {
            if let Some(embedder) = &self.embedder {
                self.set_phase(IngestPhase::ReEmbedding);
                stats.embeddings_generated += embedder.generate_for(Some(project_id))?;
            }
        }

        Ok(())
    }
}

impl Orchestrator {
    /// Run the vision/OCR collaborator over media and image-only documents
    /// still awaiting analysis. Per-node failures become warnings on the
    /// node's log line, not batch errors. Returns the number analyzed.
    pub fn analyze_pending_media(
        &self,
        vision: &dyn trawl_core::collab::VisionProvider,
    ) -> Result<usize, GraphError> {
        let pending = {
            let store = self.store.lock().unwrap();
            store.nodes_needing_vision()?
        };
        let document_options = &self.builder.config().document;
        let mut analyzed = 0usize;
        for mut node in pending {
            let is_document = node.label == trawl_core::types::NodeLabel::DocumentFile;
            if is_document && !document_options.use_ocr {
                continue;
            }
            let Some(path) = node.absolute_path.clone() else {
                continue;
            };
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("cannot read {path} for vision pass: {e}");
                    continue;
                }
            };
            let instruction = if is_document {
                format!(
                    "Transcribe the text of this document, first {} pages.",
                    document_options.max_ocr_pages
                )
            } else {
                "Describe this image for code-search retrieval.".to_string()
            };
            match vision.describe(&bytes, &instruction) {
                Ok(description) => {
                    node.properties
                        .insert("visionDescription".into(), description.into());
                    node.properties.insert("analyzed".into(), true.into());
                    node.properties.insert("needsVision".into(), false.into());
                    let graph = Graph {
                        nodes: vec![node],
                        relationships: Vec::new(),
                    };
                    let mut store = self.store.lock().unwrap();
                    store.upsert(&graph)?;
                    analyzed += 1;
                }
                Err(e) => {
                    tracing::warn!("vision analysis failed for {path}: {e}");
                }
            }
        }
        Ok(analyzed)
    }
}

/// The stored File-node `rawContentHash` for a path, when it is indexed.
fn stored_raw_hash(store: &dyn GraphStore, file: &str) -> Option<String> {
    store
        .nodes_for_file(file)
        .ok()?
        .into_iter()
        .find(|n| n.label == trawl_core::types::NodeLabel::File)?
        .properties
        .get("rawContentHash")?
        .as_str()
        .map(str::to_string)
}

/// The deepest directory containing every path in the set.
pub fn shortest_common_dir(paths: &[String]) -> Option<PathBuf> {
    let mut iter = paths.iter();
    let first = iter.next()?;
    let mut common: PathBuf = Path::new(first).parent()?.to_path_buf();
    for path in iter {
        let dir = Path::new(path).parent()?;
        while !dir.starts_with(&common) {
            common = common.parent()?.to_path_buf();
        }
    }
    Some(common)
}
