//! Graph composition: drives detection, parsing, and symbol resolution, then
//! assembles labeled nodes and typed relationships with the UUID discipline
//! the store relies on.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use trawl_core::config::TrawlConfig;
use trawl_core::hash::{dedent, raw_content_hash, short_hash};
use trawl_core::ids::{
    data_id, dir_id, doc_id, file_id, lib_id, media_id, section_id, url_id, ORPHAN_PROJECT_ID,
};
use trawl_core::types::{
    BuildMetadata, Graph, GraphError, GraphNode, NodeLabel, RelType, Relationship,
};
use trawl_parsers::detect::Detection;
use trawl_parsers::ir::{MediaCategory, ParseOutput, WebKind};
use trawl_parsers::walker::FileWalker;
use trawl_parsers::ParserRegistry;

use crate::datarefs::link_data_refs;
use crate::imports::ImportResolver;
use crate::symbols::{self, FileScopes, UuidMapping};

/// One build request. The UUID cache and existing mapping are scoped to this
/// request and discarded afterward — never shared across projects.
pub struct BuildRequest {
    pub root: PathBuf,
    /// `project:<name>` or the reserved orphan id.
    pub project_id: String,
    /// Restrict the build to these project-relative paths.
    pub include: Option<Vec<String>>,
    pub existing_uuids: UuidMapping,
}

#[derive(Debug, Default)]
pub struct BuildOutput {
    pub graph: Graph,
    pub metadata: BuildMetadata,
    pub warnings: Vec<String>,
}

struct ParsedFile {
    absolute: String,
    relative: String,
    detection: Detection,
    raw_hash: String,
    content_hash: String,
    mtime: Option<u64>,
    output: ParseOutput,
}

pub struct GraphBuilder {
    registry: Arc<ParserRegistry>,
    config: TrawlConfig,
}

impl GraphBuilder {
    pub fn new(config: TrawlConfig) -> Self {
        GraphBuilder {
            registry: Arc::new(ParserRegistry::new()),
            config,
        }
    }

    pub fn config(&self) -> &TrawlConfig {
        &self.config
    }

    /// Build the graph for a project root (or an include subset of it).
    pub fn build(&self, request: &BuildRequest) -> Result<BuildOutput, GraphError> {
        let started = Instant::now();
        let mut output = BuildOutput::default();

        let files = self.collect_files(request);
        let import_resolver = ImportResolver::new(&request.root);

        // Parser phase: bounded concurrency, cooperative failure.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.parse_concurrency.max(1))
            .build()
            .map_err(|e| GraphError::Internal(e.to_string()))?;

        let parsed: Vec<ParsedFile> = pool.install(|| {
            files
                .par_iter()
                .filter_map(|path| self.parse_one(path, &request.root))
                .collect()
        });

        for file in &parsed {
            for warning in &file.output.warnings {
                output.warnings.push(format!("{}: {warning}", file.relative));
            }
        }

        // Compose the graph.
        let mut graph = Graph::new();
        let mut edge_seen: HashSet<(RelType, String, String)> = HashSet::new();
        let mut add_edge = |graph: &mut Graph, rel: Relationship| {
            let key = (rel.rel_type, rel.from.clone(), rel.to.clone());
            if edge_seen.insert(key) {
                graph.relationships.push(rel);
            }
        };

        let project_uuid = request.project_id.clone();
        let is_orphan_batch = request.project_id == ORPHAN_PROJECT_ID;
        if !is_orphan_batch {
            let name = request
                .project_id
                .strip_prefix("project:")
                .unwrap_or(&request.project_id)
                .to_string();
            let mut project = GraphNode::new(project_uuid.clone(), NodeLabel::Project, name);
            project.project_id = project_uuid.clone();
            project
                .properties
                .insert("rootPath".into(), request.root.to_string_lossy().to_string().into());
            project.properties.insert(
                "indexedAt".into(),
                now_epoch_seconds().into(),
            );
            if let Some(remote) = git_remote_url(&request.root) {
                project.properties.insert("gitRemote".into(), remote.into());
            }
            graph.nodes.push(project);
        }

        // Directory chains.
        let mut dir_uuids: HashMap<String, String> = HashMap::new();
        for file in &parsed {
            self.ensure_directories(
                file,
                request,
                &mut graph,
                &mut dir_uuids,
                &mut add_edge,
            );
        }

        // File nodes.
        let mut file_uuids: HashMap<String, String> = HashMap::new();
        for file in &parsed {
            let uuid = file_id(&file.absolute);
            file_uuids.insert(file.absolute.clone(), uuid.clone());

            let path = Path::new(&file.absolute);
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let extension = path
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default();
            let directory = Path::new(&file.relative)
                .parent()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default();

            let mut node = GraphNode::new(uuid.clone(), NodeLabel::File, name)
                .with_paths(file.relative.clone(), file.absolute.clone())
                .with_hash(file.content_hash.clone());
            node.project_id = request.project_id.clone();
            node.properties.insert("extension".into(), extension.into());
            node.properties.insert("directory".into(), directory.into());
            node.properties
                .insert("rawContentHash".into(), file.raw_hash.clone().into());
            node.properties
                .insert("format".into(), file.detection.format.as_str().into());
            if let Some(mtime) = file.mtime {
                node.properties.insert("mtime".into(), mtime.into());
            }
            graph.nodes.push(node);

            add_edge(
                &mut graph,
                Relationship::new(RelType::BelongsTo, uuid.clone(), project_uuid.clone()),
            );
            if let Some(parent) = Path::new(&file.absolute).parent() {
                if let Some(dir_uuid) = dir_uuids.get(parent.to_string_lossy().as_ref()) {
                    add_edge(
                        &mut graph,
                        Relationship::new(RelType::InDirectory, uuid.clone(), dir_uuid.clone()),
                    );
                }
            }
        }

        // Code scopes across the whole batch.
        let file_scopes: Vec<FileScopes> = parsed
            .iter()
            .filter(|f| !f.output.scopes.is_empty() || !f.output.imports.is_empty())
            .map(|f| FileScopes {
                absolute_path: f.absolute.clone(),
                scopes: f.output.scopes.clone(),
                imports: f.output.imports.clone(),
            })
            .collect();
        let resolution = symbols::resolve(&file_scopes, &request.existing_uuids, &import_resolver);

        for scope in &resolution.scopes {
            let def = &scope.def;
            let content_hash = short_hash(&format!(
                "{}\n{}",
                dedent(&def.source),
                def.docstring.as_deref().unwrap_or("")
            ));
            let relative = parsed
                .iter()
                .find(|f| f.absolute == scope.file)
                .map(|f| f.relative.clone())
                .unwrap_or_default();

            let mut node = GraphNode::new(scope.uuid.clone(), NodeLabel::Scope, def.name.clone())
                .with_paths(relative, scope.file.clone())
                .with_hash(content_hash);
            node.project_id = request.project_id.clone();
            let props = &mut node.properties;
            props.insert("kind".into(), def.kind.as_str().into());
            props.insert("signature".into(), def.signature.clone().into());
            props.insert("signatureHash".into(), scope.signature_hash.clone().into());
            props.insert("startLine".into(), def.start_line.into());
            props.insert("endLine".into(), def.end_line.into());
            props.insert("source".into(), def.source.clone().into());
            props.insert("depth".into(), def.depth.into());
            if let Some(parent) = &def.parent_name {
                props.insert("parentScope".into(), parent.clone().into());
            }
            if !def.parameters.is_empty() {
                props.insert("parameters".into(), def.parameters.clone().into());
            }
            if let Some(ret) = &def.return_type {
                props.insert("returnType".into(), ret.clone().into());
            }
            if !def.modifiers.is_empty() {
                props.insert("modifiers".into(), def.modifiers.clone().into());
            }
            if !def.generics.is_empty() {
                props.insert("generics".into(), def.generics.clone().into());
            }
            if !def.decorators.is_empty() {
                props.insert("decorators".into(), def.decorators.clone().into());
            }
            if !def.enum_members.is_empty() {
                props.insert("enumMembers".into(), def.enum_members.clone().into());
            }
            if let Some(doc) = &def.docstring {
                props.insert("docstring".into(), doc.clone().into());
            }
            if !def.heritage.is_empty() {
                let heritage: Vec<serde_json::Value> = def
                    .heritage
                    .iter()
                    .map(|h| {
                        serde_json::json!({"clause": h.clause.as_str(), "target": h.target})
                    })
                    .collect();
                props.insert("heritage".into(), heritage.into());
            }
            graph.nodes.push(node);

            add_edge(
                &mut graph,
                Relationship::new(RelType::BelongsTo, scope.uuid.clone(), project_uuid.clone()),
            );
            if let Some(file_uuid) = file_uuids.get(&scope.file) {
                add_edge(
                    &mut graph,
                    Relationship::new(RelType::DefinedIn, scope.uuid.clone(), file_uuid.clone()),
                );
            }
        }
        for rel in resolution.relationships {
            add_edge(&mut graph, rel);
        }

        // External library uses from code imports.
        for lib in &resolution.library_uses {
            let uuid = lib_id(&lib.library);
            if graph.node_by_uuid(&uuid).is_none() {
                let mut node = GraphNode::new(uuid.clone(), NodeLabel::ExternalLibrary, &lib.library);
                node.project_id = request.project_id.clone();
                node.properties.insert("registry".into(), "npm".into());
                graph.nodes.push(node);
                add_edge(
                    &mut graph,
                    Relationship::new(RelType::BelongsTo, uuid.clone(), project_uuid.clone()),
                );
            }
            add_edge(
                &mut graph,
                Relationship::new(RelType::UsesLibrary, lib.from_uuid.clone(), uuid)
                    .prop("symbol", lib.symbol.clone()),
            );
        }

        // Non-code artifacts per file.
        for file in &parsed {
            let file_uuid = file_uuids[&file.absolute].clone();
            if let Some(markdown) = &file.output.markdown {
                self.compose_markdown(
                    file, markdown, &file_uuid, &project_uuid, &file_uuids, &mut graph,
                    &mut add_edge,
                );
            }
            if let Some(data) = &file.output.data {
                self.compose_data(
                    file, data, &file_uuid, &project_uuid, request, &file_uuids, &dir_uuids,
                    &mut graph, &mut add_edge,
                );
            }
            if let Some(web) = &file.output.web {
                self.compose_web(file, web, &file_uuid, &project_uuid, &mut graph, &mut add_edge);
            }
            if let Some(style) = &file.output.stylesheet {
                self.compose_stylesheet(file, style, &file_uuid, &project_uuid, &mut graph, &mut add_edge);
            }
            if let Some(media) = &file.output.media {
                self.compose_media(file, media, &file_uuid, &project_uuid, &mut graph, &mut add_edge);
            }
            if let Some(document) = &file.output.document {
                self.compose_document(file, document, &file_uuid, &project_uuid, &mut graph, &mut add_edge);
            }
        }

        output.metadata = BuildMetadata {
            files_processed: parsed.len(),
            nodes_generated: graph.nodes.len(),
            relationships_generated: graph.relationships.len(),
            parse_time_ms: started.elapsed().as_millis() as u64,
        };
        output.graph = graph;
        Ok(output)
    }

    fn collect_files(&self, request: &BuildRequest) -> Vec<PathBuf> {
        match &request.include {
            Some(includes) => includes
                .iter()
                .map(|rel| request.root.join(rel))
                .filter(|p| p.is_file())
                .collect(),
            None => FileWalker::new(&request.root)
                .walk()
                .into_iter()
                .map(|e| e.path)
                .collect(),
        }
    }

    fn parse_one(&self, path: &Path, root: &Path) -> Option<ParsedFile> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("failed to read {}: {e}", path.display());
                return None;
            }
        };
        let raw_hash = raw_content_hash(&bytes);
        let mtime = std::fs::metadata(path)
            .ok()
            .and_then(|m| m.modified().ok())
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs());

        let (detection, parse_output) = match self.registry.parse_file(path, &bytes, &self.config) {
            Ok(result) => result,
            Err(e) => {
                // One bad file never aborts the batch
                tracing::warn!("failed to parse {}: {e}", path.display());
                return None;
            }
        };

        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string();
        let content_hash = short_hash(&parse_output.semantic_summary());

        Some(ParsedFile {
            absolute: path.to_string_lossy().to_string(),
            relative,
            detection,
            raw_hash,
            content_hash,
            mtime,
            output: parse_output,
        })
    }

    fn ensure_directories(
        &self,
        file: &ParsedFile,
        request: &BuildRequest,
        graph: &mut Graph,
        dir_uuids: &mut HashMap<String, String>,
        add_edge: &mut impl FnMut(&mut Graph, Relationship),
    ) {
        let relative = Path::new(&file.relative);
        let mut chain: Vec<(String, String, u32)> = Vec::new(); // (abs, rel, depth)
        let mut current = relative.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            let abs = request.root.join(dir).to_string_lossy().to_string();
            let rel = dir.to_string_lossy().to_string();
            let depth = dir.components().count() as u32;
            chain.push((abs, rel, depth));
            current = dir.parent();
        }
        chain.reverse();

        let mut parent_uuid: Option<String> = None;
        for (abs, rel, depth) in chain {
            let uuid = dir_uuids.entry(abs.clone()).or_insert_with(|| {
                let uuid = dir_id(&abs);
                let name = Path::new(&rel)
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| rel.clone());
                let mut node = GraphNode::new(uuid.clone(), NodeLabel::Directory, name)
                    .with_paths(rel.clone(), abs.clone());
                node.project_id = request.project_id.clone();
                node.properties.insert("depth".into(), depth.into());
                graph.nodes.push(node);
                add_edge(
                    graph,
                    Relationship::new(RelType::BelongsTo, uuid.clone(), request.project_id.clone()),
                );
                uuid
            });
            let uuid = uuid.clone();
            if let Some(parent) = &parent_uuid {
                add_edge(
                    graph,
                    Relationship::new(RelType::ParentOf, parent.clone(), uuid.clone()),
                );
            }
            parent_uuid = Some(uuid);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn compose_markdown(
        &self,
        file: &ParsedFile,
        markdown: &trawl_parsers::ir::MarkdownInfo,
        file_uuid: &str,
        project_uuid: &str,
        file_uuids: &HashMap<String, String>,
        graph: &mut Graph,
        add_edge: &mut impl FnMut(&mut Graph, Relationship),
    ) {
        let doc_uuid = doc_id(&file.absolute);
        let title = markdown
            .title
            .clone()
            .unwrap_or_else(|| file.relative.clone());
        let mut doc = GraphNode::new(doc_uuid.clone(), NodeLabel::MarkdownDocument, title)
            .with_paths(file.relative.clone(), file.absolute.clone())
            .with_hash(file.content_hash.clone());
        doc.project_id = project_uuid.to_string();
        doc.properties
            .insert("sectionCount".into(), markdown.sections.len().into());
        graph.nodes.push(doc);
        add_edge(
            graph,
            Relationship::new(RelType::BelongsTo, doc_uuid.clone(), project_uuid.to_string()),
        );
        add_edge(
            graph,
            Relationship::new(RelType::DefinedIn, doc_uuid.clone(), file_uuid.to_string()),
        );

        // Duplicate slugs within one file get an occurrence suffix.
        let mut slug_counts: HashMap<&str, usize> = HashMap::new();
        let mut section_uuids: Vec<String> = Vec::new();
        for section in &markdown.sections {
            let count = slug_counts.entry(section.slug.as_str()).or_insert(0);
            let key = if *count == 0 {
                section.slug.clone()
            } else {
                format!("{}-{}", section.slug, count)
            };
            *count += 1;

            let uuid = section_id(&file.absolute, &key);
            section_uuids.push(uuid.clone());
            let hash = short_hash(&section.own_content);
            let mut node =
                GraphNode::new(uuid.clone(), NodeLabel::MarkdownSection, section.title.clone())
                    .with_paths(file.relative.clone(), file.absolute.clone())
                    .with_hash(hash);
            node.project_id = project_uuid.to_string();
            node.properties.insert("level".into(), section.level.into());
            node.properties.insert("slug".into(), section.slug.clone().into());
            node.properties
                .insert("content".into(), section.own_content.clone().into());
            node.properties
                .insert("fullContent".into(), section.full_content.clone().into());
            node.properties
                .insert("startLine".into(), section.start_line.into());
            if let Some(parent) = &section.parent_title {
                node.properties
                    .insert("parentSection".into(), parent.clone().into());
            }
            graph.nodes.push(node);

            add_edge(
                graph,
                Relationship::new(RelType::BelongsTo, uuid.clone(), project_uuid.to_string()),
            );
            add_edge(
                graph,
                Relationship::new(RelType::HasSection, doc_uuid.clone(), uuid.clone()),
            );
        }

        // Parent links by title text.
        for (i, section) in markdown.sections.iter().enumerate() {
            let Some(parent_title) = &section.parent_title else {
                continue;
            };
            let parent = markdown.sections[..i]
                .iter()
                .rposition(|s| &s.title == parent_title);
            if let Some(parent_idx) = parent {
                add_edge(
                    graph,
                    Relationship::new(
                        RelType::HasParent,
                        section_uuids[i].clone(),
                        section_uuids[parent_idx].clone(),
                    ),
                );
            }
        }

        for block in &markdown.code_blocks {
            let uuid = section_id(&file.absolute, &format!("block:{}", block.start_line));
            let mut node = GraphNode::new(
                uuid.clone(),
                NodeLabel::CodeBlock,
                format!("{}:{}", file.relative, block.start_line),
            )
            .with_paths(file.relative.clone(), file.absolute.clone())
            .with_hash(short_hash(&block.code));
            node.project_id = project_uuid.to_string();
            node.properties
                .insert("language".into(), block.language.clone().into());
            node.properties.insert("code".into(), block.code.clone().into());
            node.properties
                .insert("startLine".into(), block.start_line.into());
            node.properties.insert("endLine".into(), block.end_line.into());
            graph.nodes.push(node);
            add_edge(
                graph,
                Relationship::new(RelType::BelongsTo, uuid.clone(), project_uuid.to_string()),
            );
            add_edge(
                graph,
                Relationship::new(RelType::Contains, doc_uuid.clone(), uuid),
            );
        }

        // Outbound links and images.
        for (_, url) in &markdown.links {
            if url.starts_with("http://") || url.starts_with("https://") {
                let uuid = url_id(url);
                if graph.node_by_uuid(&uuid).is_none() {
                    let mut node = GraphNode::new(uuid.clone(), NodeLabel::ExternalUrl, url.clone());
                    node.properties.insert("url".into(), url.clone().into());
                    graph.nodes.push(node);
                    add_edge(
                        graph,
                        Relationship::new(RelType::BelongsTo, uuid.clone(), project_uuid.to_string()),
                    );
                }
                add_edge(
                    graph,
                    Relationship::new(RelType::LinksTo, doc_uuid.clone(), uuid),
                );
            }
        }
        for image in &markdown.images {
            let dir = Path::new(&file.absolute)
                .parent()
                .unwrap_or(Path::new("."))
                .to_path_buf();
            let resolved = dir.join(image.trim_start_matches("./"));
            let key = resolved.to_string_lossy();
            if let Some(target) = file_uuids.get(key.as_ref()) {
                add_edge(
                    graph,
                    Relationship::new(RelType::ReferencesImage, doc_uuid.clone(), target.clone()),
                );
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn compose_data(
        &self,
        file: &ParsedFile,
        data: &trawl_parsers::ir::DataInfo,
        file_uuid: &str,
        project_uuid: &str,
        request: &BuildRequest,
        file_uuids: &HashMap<String, String>,
        dir_uuids: &HashMap<String, String>,
        graph: &mut Graph,
        add_edge: &mut impl FnMut(&mut Graph, Relationship),
    ) {
        let data_uuid = data_id(&file.absolute);
        let name = Path::new(&file.absolute)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut node = GraphNode::new(data_uuid.clone(), NodeLabel::DataFile, name)
            .with_paths(file.relative.clone(), file.absolute.clone())
            .with_hash(file.content_hash.clone());
        node.project_id = project_uuid.to_string();
        if let Some(format) = data.format {
            node.properties.insert("format".into(), format.as_str().into());
        }
        node.properties
            .insert("topLevelKeys".into(), data.top_level_keys.into());
        graph.nodes.push(node);
        add_edge(
            graph,
            Relationship::new(RelType::BelongsTo, data_uuid.clone(), project_uuid.to_string()),
        );
        add_edge(
            graph,
            Relationship::new(RelType::DefinedIn, data_uuid.clone(), file_uuid.to_string()),
        );

        let mut section_uuids: HashMap<&str, String> = HashMap::new();
        for section in &data.sections {
            let uuid = section_id(&file.absolute, &section.path);
            section_uuids.insert(section.path.as_str(), uuid.clone());
            let mut node = GraphNode::new(uuid.clone(), NodeLabel::DataSection, section.key.clone())
                .with_paths(file.relative.clone(), file.absolute.clone())
                .with_hash(short_hash(&section.content));
            node.project_id = project_uuid.to_string();
            node.properties.insert("path".into(), section.path.clone().into());
            node.properties
                .insert("valueType".into(), section.value_type.as_str().into());
            node.properties.insert("depth".into(), section.depth.into());
            node.properties
                .insert("content".into(), section.content.clone().into());
            if let Some(parent) = &section.parent_path {
                node.properties
                    .insert("parentPath".into(), parent.clone().into());
            }
            graph.nodes.push(node);

            add_edge(
                graph,
                Relationship::new(RelType::BelongsTo, uuid.clone(), project_uuid.to_string()),
            );
            match &section.parent_path {
                Some(parent) => {
                    if let Some(parent_uuid) = section_uuids.get(parent.as_str()) {
                        add_edge(
                            graph,
                            Relationship::new(RelType::HasChild, parent_uuid.clone(), uuid),
                        );
                    }
                }
                None => {
                    add_edge(
                        graph,
                        Relationship::new(RelType::HasSection, data_uuid.clone(), uuid),
                    );
                }
            }
        }

        let dir = Path::new(&file.absolute)
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        let links = link_data_refs(
            &data.references,
            &data_uuid,
            &dir,
            &request.root,
            file_uuids,
            dir_uuids,
        );
        for mut node in links.nodes {
            if graph.node_by_uuid(&node.uuid).is_none() {
                node.project_id = request.project_id.clone();
                add_edge(
                    graph,
                    Relationship::new(RelType::BelongsTo, node.uuid.clone(), project_uuid.to_string()),
                );
                graph.nodes.push(node);
            }
        }
        for rel in links.relationships {
            add_edge(graph, rel);
        }
    }

    fn compose_web(
        &self,
        file: &ParsedFile,
        web: &trawl_parsers::ir::WebInfo,
        file_uuid: &str,
        project_uuid: &str,
        graph: &mut Graph,
        add_edge: &mut impl FnMut(&mut Graph, Relationship),
    ) {
        let uuid = doc_id(&file.absolute);
        let label = match web.kind {
            WebKind::Vue => NodeLabel::VueComponent,
            WebKind::Svelte => NodeLabel::SvelteComponent,
            WebKind::Html => NodeLabel::WebDocument,
        };
        let mut node = GraphNode::new(uuid.clone(), label, web.component_name.clone())
            .with_paths(file.relative.clone(), file.absolute.clone())
            .with_hash(web.hash.clone());
        node.project_id = project_uuid.to_string();
        node.properties.insert("hasTemplate".into(), web.has_template.into());
        node.properties.insert("hasScript".into(), web.has_script.into());
        node.properties.insert("hasStyle".into(), web.has_style.into());
        if let Some(lang) = &web.script_lang {
            node.properties.insert("scriptLang".into(), lang.clone().into());
        }
        if !web.used_components.is_empty() {
            node.properties
                .insert("usedComponents".into(), web.used_components.clone().into());
        }
        if !file.output.imports.is_empty() {
            let imports: Vec<String> = file
                .output
                .imports
                .iter()
                .map(|i| i.source.clone())
                .collect();
            node.properties.insert("imports".into(), imports.into());
        }
        graph.nodes.push(node);
        add_edge(
            graph,
            Relationship::new(RelType::BelongsTo, uuid.clone(), project_uuid.to_string()),
        );
        add_edge(
            graph,
            Relationship::new(RelType::DefinedIn, uuid, file_uuid.to_string()),
        );
    }

    fn compose_stylesheet(
        &self,
        file: &ParsedFile,
        style: &trawl_parsers::ir::StylesheetInfo,
        file_uuid: &str,
        project_uuid: &str,
        graph: &mut Graph,
        add_edge: &mut impl FnMut(&mut Graph, Relationship),
    ) {
        let uuid = doc_id(&file.absolute);
        let name = Path::new(&file.absolute)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut node = GraphNode::new(uuid.clone(), NodeLabel::Stylesheet, name)
            .with_paths(file.relative.clone(), file.absolute.clone())
            .with_hash(style.hash.clone());
        node.project_id = project_uuid.to_string();
        node.properties.insert("ruleCount".into(), style.rule_count.into());
        node.properties
            .insert("selectorCount".into(), style.selector_count.into());
        node.properties
            .insert("propertyCount".into(), style.property_count.into());
        if !style.variables.is_empty() {
            node.properties
                .insert("variables".into(), style.variables.clone().into());
        }
        if !style.imports.is_empty() {
            node.properties
                .insert("imports".into(), style.imports.clone().into());
        }
        graph.nodes.push(node);
        add_edge(
            graph,
            Relationship::new(RelType::BelongsTo, uuid.clone(), project_uuid.to_string()),
        );
        add_edge(
            graph,
            Relationship::new(RelType::DefinedIn, uuid, file_uuid.to_string()),
        );
    }

    fn compose_media(
        &self,
        file: &ParsedFile,
        media: &trawl_parsers::ir::MediaInfo,
        file_uuid: &str,
        project_uuid: &str,
        graph: &mut Graph,
        add_edge: &mut impl FnMut(&mut Graph, Relationship),
    ) {
        let uuid = media_id(&file.absolute);
        let label = match media.category {
            MediaCategory::ThreeD => NodeLabel::ThreeDFile,
            MediaCategory::Image => NodeLabel::ImageFile,
        };
        let name = Path::new(&file.absolute)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut node = GraphNode::new(uuid.clone(), label, name)
            .with_paths(file.relative.clone(), file.absolute.clone())
            .with_hash(media.hash.clone());
        node.project_id = project_uuid.to_string();
        node.properties.insert("format".into(), media.format.clone().into());
        node.properties
            .insert("category".into(), media.category.as_str().into());
        node.properties.insert("size".into(), media.size.into());
        node.properties.insert("analyzed".into(), media.analyzed.into());
        if let Some(width) = media.width {
            node.properties.insert("width".into(), width.into());
        }
        if let Some(height) = media.height {
            node.properties.insert("height".into(), height.into());
        }
        if let Some(gltf) = &media.gltf {
            node.properties.insert(
                "gltf".into(),
                serde_json::to_value(gltf).unwrap_or_default(),
            );
        }
        if let Some(description) = &media.vision_description {
            node.properties
                .insert("visionDescription".into(), description.clone().into());
        }
        graph.nodes.push(node);
        add_edge(
            graph,
            Relationship::new(RelType::BelongsTo, uuid.clone(), project_uuid.to_string()),
        );
        add_edge(
            graph,
            Relationship::new(RelType::DefinedIn, uuid, file_uuid.to_string()),
        );
    }

    fn compose_document(
        &self,
        file: &ParsedFile,
        document: &trawl_parsers::ir::DocumentInfo,
        file_uuid: &str,
        project_uuid: &str,
        graph: &mut Graph,
        add_edge: &mut impl FnMut(&mut Graph, Relationship),
    ) {
        let uuid = doc_id(&file.absolute);
        let name = Path::new(&file.absolute)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut node = GraphNode::new(uuid.clone(), NodeLabel::DocumentFile, name)
            .with_paths(file.relative.clone(), file.absolute.clone())
            .with_hash(file.content_hash.clone());
        node.project_id = project_uuid.to_string();
        node.properties
            .insert("format".into(), document.format.clone().into());
        node.properties
            .insert("needsVision".into(), document.needs_vision.into());
        if let Some(text) = &document.text {
            node.properties.insert("text".into(), text.clone().into());
        }
        if let Some(pages) = document.page_count {
            node.properties.insert("pageCount".into(), pages.into());
        }
        if !document.sheets.is_empty() {
            node.properties
                .insert("sheets".into(), document.sheets.clone().into());
        }
        if !document.headers.is_empty() {
            node.properties
                .insert("headers".into(), document.headers.clone().into());
        }
        if let Some(rows) = document.row_count {
            node.properties.insert("rowCount".into(), rows.into());
        }
        if let Some(cols) = document.column_count {
            node.properties.insert("columnCount".into(), cols.into());
        }
        graph.nodes.push(node);
        add_edge(
            graph,
            Relationship::new(RelType::BelongsTo, uuid.clone(), project_uuid.to_string()),
        );
        add_edge(
            graph,
            Relationship::new(RelType::DefinedIn, uuid, file_uuid.to_string()),
        );
    }
}

fn now_epoch_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// First remote url in `.git/config`, read directly — no git subprocess.
fn git_remote_url(root: &Path) -> Option<String> {
    let config = std::fs::read_to_string(root.join(".git").join("config")).ok()?;
    let mut in_remote = false;
    for line in config.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_remote = line.starts_with("[remote ");
            continue;
        }
        if in_remote {
            if let Some(url) = line.strip_prefix("url") {
                return Some(url.trim_start_matches(['=', ' ', '\t']).trim().to_string());
            }
        }
    }
    None
}
