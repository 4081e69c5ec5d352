use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Node labels in the property graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeLabel {
    Project,
    File,
    Directory,
    Scope,
    WebDocument,
    VueComponent,
    SvelteComponent,
    Stylesheet,
    MarkdownDocument,
    MarkdownSection,
    CodeBlock,
    DataFile,
    DataSection,
    ImageFile,
    ThreeDFile,
    DocumentFile,
    ExternalLibrary,
    ExternalUrl,
}

impl NodeLabel {
    /// Returns the label string stored in the graph. Stable across ingestions.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Project => "Project",
            NodeLabel::File => "File",
            NodeLabel::Directory => "Directory",
            NodeLabel::Scope => "Scope",
            NodeLabel::WebDocument => "WebDocument",
            NodeLabel::VueComponent => "VueComponent",
            NodeLabel::SvelteComponent => "SvelteComponent",
            NodeLabel::Stylesheet => "Stylesheet",
            NodeLabel::MarkdownDocument => "MarkdownDocument",
            NodeLabel::MarkdownSection => "MarkdownSection",
            NodeLabel::CodeBlock => "CodeBlock",
            NodeLabel::DataFile => "DataFile",
            NodeLabel::DataSection => "DataSection",
            NodeLabel::ImageFile => "ImageFile",
            NodeLabel::ThreeDFile => "ThreeDFile",
            NodeLabel::DocumentFile => "DocumentFile",
            NodeLabel::ExternalLibrary => "ExternalLibrary",
            NodeLabel::ExternalUrl => "ExternalUrl",
        }
    }

    pub fn from_str_label(s: &str) -> Option<Self> {
        Some(match s {
            "Project" => NodeLabel::Project,
            "File" => NodeLabel::File,
            "Directory" => NodeLabel::Directory,
            "Scope" => NodeLabel::Scope,
            "WebDocument" => NodeLabel::WebDocument,
            "VueComponent" => NodeLabel::VueComponent,
            "SvelteComponent" => NodeLabel::SvelteComponent,
            "Stylesheet" => NodeLabel::Stylesheet,
            "MarkdownDocument" => NodeLabel::MarkdownDocument,
            "MarkdownSection" => NodeLabel::MarkdownSection,
            "CodeBlock" => NodeLabel::CodeBlock,
            "DataFile" => NodeLabel::DataFile,
            "DataSection" => NodeLabel::DataSection,
            "ImageFile" => NodeLabel::ImageFile,
            "ThreeDFile" => NodeLabel::ThreeDFile,
            "DocumentFile" => NodeLabel::DocumentFile,
            "ExternalLibrary" => NodeLabel::ExternalLibrary,
            "ExternalUrl" => NodeLabel::ExternalUrl,
            _ => return None,
        })
    }
}

impl std::fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of code construct a Scope node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Function,
    Method,
    Class,
    Interface,
    Type,
    Variable,
    Constant,
    Enum,
    Module,
    Namespace,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Function => "function",
            ScopeKind::Method => "method",
            ScopeKind::Class => "class",
            ScopeKind::Interface => "interface",
            ScopeKind::Type => "type",
            ScopeKind::Variable => "variable",
            ScopeKind::Constant => "constant",
            ScopeKind::Enum => "enum",
            ScopeKind::Module => "module",
            ScopeKind::Namespace => "namespace",
        }
    }

    pub fn from_str_kind(s: &str) -> Option<Self> {
        Some(match s {
            "function" => ScopeKind::Function,
            "method" => ScopeKind::Method,
            "class" => ScopeKind::Class,
            "interface" => ScopeKind::Interface,
            "type" => ScopeKind::Type,
            "variable" => ScopeKind::Variable,
            "constant" => ScopeKind::Constant,
            "enum" => ScopeKind::Enum,
            "module" => ScopeKind::Module,
            "namespace" => ScopeKind::Namespace,
            _ => return None,
        })
    }

    /// Variables and constants key their identity on the declaration line;
    /// every other kind must survive line motion unchanged.
    pub fn is_positional(&self) -> bool {
        matches!(self, ScopeKind::Variable | ScopeKind::Constant)
    }

    /// Value kinds win import tie-breaks over type-level kinds.
    pub fn is_value_kind(&self) -> bool {
        matches!(
            self,
            ScopeKind::Function | ScopeKind::Constant | ScopeKind::Class | ScopeKind::Method
        )
    }
}

impl std::fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship types between graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelType {
    BelongsTo,
    DefinedIn,
    InDirectory,
    ParentOf,
    HasParent,
    Contains,
    HasSection,
    HasChild,
    Consumes,
    InheritsFrom,
    Implements,
    UsesLibrary,
    UsesPackage,
    References,
    ReferencesImage,
    LinksTo,
}

impl RelType {
    /// Returns the edge type string stored in the graph. Stable across ingestions.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelType::BelongsTo => "BELONGS_TO",
            RelType::DefinedIn => "DEFINED_IN",
            RelType::InDirectory => "IN_DIRECTORY",
            RelType::ParentOf => "PARENT_OF",
            RelType::HasParent => "HAS_PARENT",
            RelType::Contains => "CONTAINS",
            RelType::HasSection => "HAS_SECTION",
            RelType::HasChild => "HAS_CHILD",
            RelType::Consumes => "CONSUMES",
            RelType::InheritsFrom => "INHERITS_FROM",
            RelType::Implements => "IMPLEMENTS",
            RelType::UsesLibrary => "USES_LIBRARY",
            RelType::UsesPackage => "USES_PACKAGE",
            RelType::References => "REFERENCES",
            RelType::ReferencesImage => "REFERENCES_IMAGE",
            RelType::LinksTo => "LINKS_TO",
        }
    }

    pub fn from_str_rel(s: &str) -> Option<Self> {
        Some(match s {
            "BELONGS_TO" => RelType::BelongsTo,
            "DEFINED_IN" => RelType::DefinedIn,
            "IN_DIRECTORY" => RelType::InDirectory,
            "PARENT_OF" => RelType::ParentOf,
            "HAS_PARENT" => RelType::HasParent,
            "CONTAINS" => RelType::Contains,
            "HAS_SECTION" => RelType::HasSection,
            "HAS_CHILD" => RelType::HasChild,
            "CONSUMES" => RelType::Consumes,
            "INHERITS_FROM" => RelType::InheritsFrom,
            "IMPLEMENTS" => RelType::Implements,
            "USES_LIBRARY" => RelType::UsesLibrary,
            "USES_PACKAGE" => RelType::UsesPackage,
            "REFERENCES" => RelType::References,
            "REFERENCES_IMAGE" => RelType::ReferencesImage,
            "LINKS_TO" => RelType::LinksTo,
            _ => return None,
        })
    }
}

impl std::fmt::Display for RelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in the property graph.
///
/// Label-specific attributes ride in `properties`; the common columns every
/// consumer needs (identity, location, change detection) are first-class fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub uuid: String,
    pub label: NodeLabel,
    pub name: String,
    /// Path relative to the project root, when the node refers to a file.
    pub path: Option<String>,
    pub absolute_path: Option<String>,
    pub project_id: String,
    /// Semantic content hash; `None` for nodes with no hashable content.
    pub content_hash: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl GraphNode {
    pub fn new(uuid: impl Into<String>, label: NodeLabel, name: impl Into<String>) -> Self {
        GraphNode {
            uuid: uuid.into(),
            label,
            name: name.into(),
            path: None,
            absolute_path: None,
            project_id: String::new(),
            content_hash: None,
            properties: Map::new(),
        }
    }

    pub fn with_paths(mut self, path: impl Into<String>, absolute: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self.absolute_path = Some(absolute.into());
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }

    pub fn prop(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Scope kind, when this node is a Scope.
    pub fn scope_kind(&self) -> Option<ScopeKind> {
        self.properties
            .get("kind")
            .and_then(|v| v.as_str())
            .and_then(ScopeKind::from_str_kind)
    }
}

/// A directed, typed relationship between two node UUIDs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub rel_type: RelType,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Relationship {
    pub fn new(rel_type: RelType, from: impl Into<String>, to: impl Into<String>) -> Self {
        Relationship {
            rel_type,
            from: from.into(),
            to: to.into(),
            properties: Map::new(),
        }
    }

    pub fn prop(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Identity triple used for duplicate suppression and idempotent upserts.
    pub fn triple(&self) -> (RelType, &str, &str) {
        (self.rel_type, self.from.as_str(), self.to.as_str())
    }
}

/// The output of one build: nodes plus relationships, ready for upsert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub relationships: Vec<Relationship>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    pub fn node_by_uuid(&self, uuid: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.uuid == uuid)
    }

    /// UUIDs that appear more than once. A non-empty result is a programming
    /// error and must fail the batch.
    pub fn duplicate_uuids(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut dupes = Vec::new();
        for node in &self.nodes {
            if !seen.insert(node.uuid.as_str()) && !dupes.contains(&node.uuid) {
                dupes.push(node.uuid.clone());
            }
        }
        dupes
    }
}

/// Per-build bookkeeping returned alongside the graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildMetadata {
    pub files_processed: usize,
    pub nodes_generated: usize,
    pub relationships_generated: usize,
    pub parse_time_ms: u64,
}

/// A scope row as remembered by the store, used for UUID preservation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredScope {
    pub uuid: String,
    pub name: String,
    pub file: String,
    pub kind: ScopeKind,
}

/// An embedding vector with the key that decides whether it survives re-ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub node_uuid: String,
    pub file: String,
    pub content_hash: String,
    /// One of `name`, `description`, `content`.
    pub field: String,
    pub provider: String,
    pub model: String,
    pub vector: Vec<f32>,
}

/// Errors that can occur during graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("duplicate UUIDs produced in one batch: {0:?}")]
    DuplicateUuids(Vec<String>),

    #[error("collaborator failure: {0}")]
    Collaborator(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for GraphError {
    fn from(e: rusqlite::Error) -> Self {
        GraphError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rel_type_round_trip() {
        for rel in [
            RelType::BelongsTo,
            RelType::InheritsFrom,
            RelType::UsesPackage,
            RelType::ReferencesImage,
        ] {
            assert_eq!(RelType::from_str_rel(rel.as_str()), Some(rel));
        }
    }

    #[test]
    fn test_scope_kind_positional() {
        assert!(ScopeKind::Variable.is_positional());
        assert!(ScopeKind::Constant.is_positional());
        assert!(!ScopeKind::Function.is_positional());
        assert!(!ScopeKind::Class.is_positional());
    }

    #[test]
    fn test_duplicate_uuid_detection() {
        let mut graph = Graph::new();
        graph.nodes.push(GraphNode::new("file:abc", NodeLabel::File, "a.ts"));
        graph.nodes.push(GraphNode::new("file:abc", NodeLabel::File, "a.ts"));
        graph.nodes.push(GraphNode::new("file:def", NodeLabel::File, "b.ts"));
        assert_eq!(graph.duplicate_uuids(), vec!["file:abc".to_string()]);
    }

    #[test]
    fn test_relationship_triple_identity() {
        let a = Relationship::new(RelType::Consumes, "x", "y");
        let b = Relationship::new(RelType::Consumes, "x", "y").prop("line", 3);
        assert_eq!(a.triple(), b.triple());
    }
}
