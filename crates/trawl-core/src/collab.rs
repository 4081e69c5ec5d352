//! Collaborator traits for the services the pipeline does not own.
//!
//! Embedding generation and vision/OCR are external: the orchestrator only
//! needs enough surface to schedule work and to decide whether captured
//! embeddings are still valid for the active provider.

use crate::types::GraphError;

/// Identity of the active embedding backend. Captured embeddings are restored
/// only when provider and model both still match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    pub provider: String,
    pub model: String,
}

pub trait EmbeddingProvider: Send + Sync {
    /// The active provider/model, or `None` when embedding is unconfigured.
    fn info(&self) -> Option<ProviderInfo>;

    /// Generate embeddings for dirty nodes, optionally scoped to one project.
    /// Returns the number of embeddings generated.
    fn generate_for(&self, project_id: Option<&str>) -> Result<usize, GraphError>;
}

pub trait VisionProvider: Send + Sync {
    /// Describe an image (or image-only document page) given raw bytes and an
    /// instruction. Failures surface as warnings on the produced node.
    fn describe(&self, bytes: &[u8], instruction: &str) -> Result<String, GraphError>;
}
