//! The uniform intermediate representation every parser produces.
//!
//! One `ParseOutput` per file, with only the sections relevant to the file's
//! format populated. The graph builder turns this into labeled nodes and typed
//! relationships; parsers never emit graph entities directly.

use serde::{Deserialize, Serialize};
use trawl_core::types::ScopeKind;

/// Complete parse output for a single source file.
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    /// Code scopes (functions, classes, methods, variables, …).
    pub scopes: Vec<ScopeDef>,
    /// File-level import statements.
    pub imports: Vec<ImportDef>,
    /// Markdown document structure.
    pub markdown: Option<MarkdownInfo>,
    /// Structured-data traversal output.
    pub data: Option<DataInfo>,
    /// Web component (Vue/Svelte/HTML) structure.
    pub web: Option<WebInfo>,
    /// Stylesheet summary.
    pub stylesheet: Option<StylesheetInfo>,
    /// Media header metadata.
    pub media: Option<MediaInfo>,
    /// Document (PDF/DOCX/XLSX/CSV) extraction output.
    pub document: Option<DocumentInfo>,
    /// Non-fatal per-file diagnostics.
    pub warnings: Vec<String>,
}

impl ParseOutput {
    /// Semantic fingerprint of the parse: hashing this detects whether the
    /// file changed in a way the graph cares about.
    pub fn semantic_summary(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for scope in &self.scopes {
            parts.push(format!("{}:{}:{}", scope.kind, scope.name, scope.signature));
            parts.push(trawl_core::hash::dedent(&scope.source));
        }
        for import in &self.imports {
            parts.push(format!("import:{}:{}", import.source, import.symbol));
        }
        if let Some(md) = &self.markdown {
            for section in &md.sections {
                parts.push(format!("section:{}:{}", section.slug, section.own_content));
            }
            for block in &md.code_blocks {
                parts.push(format!("block:{}:{}", block.language, block.code));
            }
        }
        if let Some(data) = &self.data {
            for section in &data.sections {
                parts.push(format!("data:{}:{}", section.path, section.content));
            }
        }
        if let Some(media) = &self.media {
            parts.push(format!("media:{}", media.hash));
        }
        if let Some(doc) = &self.document {
            parts.push(format!("doc:{}", doc.text.as_deref().unwrap_or("")));
        }
        if let Some(web) = &self.web {
            parts.push(format!("web:{}:{}", web.component_name, web.hash));
        }
        if let Some(style) = &self.stylesheet {
            parts.push(format!("style:{}", style.hash));
        }
        parts.join("\n")
    }
}

/// A code scope extracted from source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeDef {
    /// Simple name of the symbol (e.g. "handleRequest").
    pub name: String,
    pub kind: ScopeKind,
    /// First line of the definition (1-based).
    pub start_line: u32,
    /// Last line of the definition (1-based, inclusive).
    pub end_line: u32,
    /// Raw source text of the whole scope.
    pub source: String,
    /// Canonical declaration string used for identity hashing.
    pub signature: String,
    pub parameters: Vec<String>,
    pub return_type: Option<String>,
    /// Name of the enclosing scope, when nested.
    pub parent_name: Option<String>,
    /// Nesting depth; 0 for top-level scopes.
    pub depth: u32,
    /// Declaration modifiers (export, async, static, abstract, …).
    pub modifiers: Vec<String>,
    pub heritage: Vec<HeritageDef>,
    pub generics: Vec<String>,
    pub decorators: Vec<String>,
    pub docstring: Option<String>,
    /// Enum member names, for `kind == Enum`.
    pub enum_members: Vec<String>,
    /// Identifier use-sites inside this scope.
    pub references: Vec<IdentifierRef>,
}

impl ScopeDef {
    pub fn new(name: impl Into<String>, kind: ScopeKind) -> Self {
        ScopeDef {
            name: name.into(),
            kind,
            start_line: 0,
            end_line: 0,
            source: String::new(),
            signature: String::new(),
            parameters: Vec::new(),
            return_type: None,
            parent_name: None,
            depth: 0,
            modifiers: Vec::new(),
            heritage: Vec::new(),
            generics: Vec::new(),
            decorators: Vec::new(),
            docstring: None,
            enum_members: Vec::new(),
            references: Vec::new(),
        }
    }
}

/// Whether a heritage clause is an `extends` or an `implements`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeritageClause {
    Extends,
    Implements,
}

impl HeritageClause {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeritageClause::Extends => "extends",
            HeritageClause::Implements => "implements",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeritageDef {
    pub clause: HeritageClause,
    /// Name of the parent type as written at the use site.
    pub target: String,
}

/// The flavour of an identifier use-site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// Resolves to a scope in the same file.
    LocalScope,
    /// Brought into scope by an import statement.
    Import,
    /// Unresolvable builtin or ambient global.
    Global,
}

/// An identifier referenced inside a scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierRef {
    pub identifier: String,
    pub kind: RefKind,
    /// Best-effort hint at the defining file, when the parser knows it.
    pub target_file_hint: Option<String>,
    /// A window of source text around the use site.
    pub context: String,
    pub line: u32,
}

/// An import statement extracted from source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDef {
    /// The module specifier as written (`./util`, `@/lib/api`, `lodash`).
    pub source: String,
    /// The imported symbol name; `*` for namespace imports.
    pub symbol: String,
    /// Local alias, when renamed at the import site.
    pub alias: Option<String>,
    /// Whether the specifier points inside the project (relative or aliased).
    pub is_local: bool,
    pub line: u32,
}

impl ImportDef {
    /// The name the import binds in the importing file.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.symbol)
    }
}

// ---------------------------------------------------------------------------
// Markdown
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MarkdownInfo {
    pub title: Option<String>,
    pub sections: Vec<SectionDef>,
    pub code_blocks: Vec<CodeBlockDef>,
    /// Outbound links: (title, url).
    pub links: Vec<(String, String)>,
    /// Referenced image paths/urls.
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDef {
    pub title: String,
    /// Heading level, 1-6.
    pub level: u8,
    pub slug: String,
    /// Text belonging to this section only, children excluded.
    pub own_content: String,
    /// Text of this section and every child section.
    pub full_content: String,
    /// Title of the enclosing section, linked by title text.
    pub parent_title: Option<String>,
    pub start_line: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeBlockDef {
    pub language: String,
    pub code: String,
    pub start_line: u32,
    pub end_line: u32,
}

// ---------------------------------------------------------------------------
// Structured data
// ---------------------------------------------------------------------------

/// Source format of a data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Json,
    Yaml,
    Xml,
    Toml,
    Env,
}

impl DataFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataFormat::Json => "json",
            DataFormat::Yaml => "yaml",
            DataFormat::Xml => "xml",
            DataFormat::Toml => "toml",
            DataFormat::Env => "env",
        }
    }
}

/// JSON-ish value type of a data subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Null,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Object => "object",
            ValueType::Array => "array",
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Null => "null",
        }
    }

    pub fn of(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(_) => ValueType::Object,
            serde_json::Value::Array(_) => ValueType::Array,
            serde_json::Value::String(_) => ValueType::String,
            serde_json::Value::Number(_) => ValueType::Number,
            serde_json::Value::Bool(_) => ValueType::Boolean,
            serde_json::Value::Null => ValueType::Null,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DataInfo {
    pub format: Option<DataFormat>,
    pub sections: Vec<DataSectionDef>,
    pub references: Vec<DataRefDef>,
    pub top_level_keys: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSectionDef {
    /// Dotted path from the root (`dependencies.lodash`).
    pub path: String,
    /// Last path segment.
    pub key: String,
    pub value_type: ValueType,
    pub depth: u32,
    /// Serialized subtree, truncated past 10 000 chars.
    pub content: String,
    pub parent_path: Option<String>,
}

/// How a leaf string value was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataRefKind {
    Url,
    Package,
    File,
    Directory,
    Image,
    Code,
    Config,
}

impl DataRefKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataRefKind::Url => "url",
            DataRefKind::Package => "package",
            DataRefKind::File => "file",
            DataRefKind::Directory => "directory",
            DataRefKind::Image => "image",
            DataRefKind::Code => "code",
            DataRefKind::Config => "config",
        }
    }
}

/// A leaf value that looks like a reference to something outside the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataRefDef {
    /// Dotted path of the leaf.
    pub path: String,
    pub value: String,
    pub kind: DataRefKind,
}

// ---------------------------------------------------------------------------
// Web components, stylesheets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebKind {
    Vue,
    Svelte,
    Html,
}

#[derive(Debug, Clone)]
pub struct WebInfo {
    pub kind: WebKind,
    pub component_name: String,
    pub hash: String,
    pub has_template: bool,
    pub has_script: bool,
    pub has_style: bool,
    /// `lang` attribute of the script block, when present.
    pub script_lang: Option<String>,
    /// PascalCase component tags used in the template.
    pub used_components: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StylesheetInfo {
    pub hash: String,
    pub rule_count: usize,
    pub selector_count: usize,
    pub property_count: usize,
    /// Custom property / SCSS variable names declared in the sheet.
    pub variables: Vec<String>,
    /// URLs pulled in via `@import`.
    pub imports: Vec<String>,
}

// ---------------------------------------------------------------------------
// Media, documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Image,
    ThreeD,
}

impl MediaCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCategory::Image => "image",
            MediaCategory::ThreeD => "3d",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaInfo {
    /// Lowercase format tag (`png`, `gltf`, …).
    pub format: String,
    pub category: MediaCategory,
    /// File size in bytes.
    pub size: u64,
    /// Short hash over the first 64 KiB.
    pub hash: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// glTF metadata, for 3D assets.
    pub gltf: Option<GltfMeta>,
    /// Whether a vision pass has produced a description.
    pub analyzed: bool,
    pub vision_description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GltfMeta {
    pub generator: Option<String>,
    pub version: Option<String>,
    pub mesh_count: usize,
    pub material_count: usize,
    pub node_count: usize,
    pub animation_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentInfo {
    /// Lowercase format tag (`pdf`, `docx`, `xlsx`, `xls`, `csv`).
    pub format: String,
    /// Extracted text, when extraction succeeded.
    pub text: Option<String>,
    pub page_count: Option<u32>,
    /// Sheet names, for spreadsheets.
    pub sheets: Vec<String>,
    /// Header row, for CSV.
    pub headers: Vec<String>,
    pub row_count: Option<u64>,
    pub column_count: Option<u32>,
    /// Set when text extraction failed and the file should be queued for the
    /// vision/OCR collaborator.
    pub needs_vision: bool,
}
