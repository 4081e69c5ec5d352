use std::collections::HashMap;

use crate::types::{EmbeddingRecord, Graph, GraphError, GraphNode, StoredScope};

/// The graph store contract.
///
/// The ingestion pipeline treats persistence as a collaborator: it composes a
/// [`Graph`] and hands it over, and it never assumes anything about how the
/// store lays data out. Implementations must be safe to share behind a lock
/// across batches.
pub trait GraphStore: Send {
    /// Insert or replace nodes and relationships. Idempotent on node UUIDs and
    /// on `(type, from, to)` relationship triples.
    fn upsert(&mut self, graph: &Graph) -> Result<(), GraphError>;

    /// Delete all nodes (and their relationships and embeddings) whose file is
    /// in `files`, optionally scoped to one project. Returns the number of
    /// deleted nodes.
    fn delete_nodes_for_files(
        &mut self,
        files: &[String],
        project_id: Option<&str>,
    ) -> Result<usize, GraphError>;

    /// Resolve chunk parent UUIDs to their nodes, e.g. to attach section
    /// context to retrieved chunks. Unknown UUIDs are absent from the map.
    fn resolve_chunk_parents(
        &self,
        parent_uuids: &[String],
    ) -> Result<HashMap<String, GraphNode>, GraphError>;

    /// All scope rows defined in the given files. Feeds UUID preservation.
    fn scopes_for_files(&self, files: &[String]) -> Result<Vec<StoredScope>, GraphError>;

    /// All embedding records attached to nodes in the given files.
    fn embeddings_for_files(&self, files: &[String]) -> Result<Vec<EmbeddingRecord>, GraphError>;

    /// Attach (or restore) an embedding record to a node.
    fn put_embedding(&mut self, record: &EmbeddingRecord) -> Result<(), GraphError>;

    /// Look up a node by UUID.
    fn node(&self, uuid: &str) -> Result<Option<GraphNode>, GraphError>;

    /// All nodes whose file matches the given absolute path.
    fn nodes_for_file(&self, file: &str) -> Result<Vec<GraphNode>, GraphError>;

    /// Nodes that have a content hash but no embedding for it yet — the
    /// re-embedding worklist. Optionally scoped to one project.
    fn dirty_nodes(&self, project_id: Option<&str>) -> Result<Vec<GraphNode>, GraphError>;

    /// Media and document nodes still waiting for a vision/OCR pass.
    fn nodes_needing_vision(&self) -> Result<Vec<GraphNode>, GraphError>;
}
