//! Cross-file symbol resolution: stable UUID assignment, parent linking,
//! use-site edges, import-backed edges, and inheritance detection.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use trawl_core::hash::dedent;
use trawl_core::ids::{scope_uuid, signature_hash};
use trawl_core::types::{RelType, Relationship, ScopeKind};
use trawl_parsers::ir::{HeritageClause, RefKind, ScopeDef};
use trawl_parsers::ir::ImportDef;

use crate::imports::ImportResolver;

/// One parsed file as the resolver consumes it.
#[derive(Debug, Clone)]
pub struct FileScopes {
    pub absolute_path: String,
    pub scopes: Vec<ScopeDef>,
    pub imports: Vec<ImportDef>,
}

/// A prior-graph UUID candidate, keyed by name in [`UuidMapping`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingUuid {
    pub uuid: String,
    pub file: String,
    pub kind: ScopeKind,
}

/// name → candidates, seeded from the graph store before a re-ingest.
pub type UuidMapping = HashMap<String, Vec<ExistingUuid>>;

/// A scope with its assigned UUID.
#[derive(Debug, Clone)]
pub struct ResolvedScope {
    pub uuid: String,
    pub file: String,
    pub signature_hash: String,
    pub def: ScopeDef,
}

/// An import that resolved to an external module rather than a project file.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryUse {
    pub from_uuid: String,
    pub library: String,
    pub symbol: String,
}

#[derive(Debug, Default)]
pub struct SymbolResolution {
    pub scopes: Vec<ResolvedScope>,
    pub relationships: Vec<Relationship>,
    pub library_uses: Vec<LibraryUse>,
}

#[derive(Debug, Clone)]
struct Candidate {
    uuid: String,
    file: String,
    kind: ScopeKind,
}

fn extends_sig_re(target: &str) -> Regex {
    Regex::new(&format!(r"extends\s+{}\b", regex::escape(target))).expect("extends regex")
}

fn py_class_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^class\s+\w+\s*\(([^)]*)\)\s*:").expect("py class regex"))
}

/// Resolve a batch of parsed files against the prior graph's UUID mapping.
pub fn resolve(
    files: &[FileScopes],
    existing: &UuidMapping,
    import_resolver: &ImportResolver,
) -> SymbolResolution {
    let mut out = SymbolResolution::default();

    // Pass 1: UUID assignment. Exact (name, file, kind) matches in the prior
    // graph keep their UUID so embeddings and external references survive.
    for file in files {
        for def in &file.scopes {
            let signature = if def.signature.is_empty() {
                None
            } else {
                Some(def.signature.as_str())
            };
            let sig_hash = signature_hash(
                def.parent_name.as_deref(),
                &def.name,
                def.kind,
                signature,
                &dedent(&def.source),
                def.start_line,
            );
            let computed = scope_uuid(&file.absolute_path, &def.name, def.kind, &sig_hash);
            let uuid = existing
                .get(&def.name)
                .and_then(|candidates| {
                    candidates
                        .iter()
                        .find(|c| c.file == file.absolute_path && c.kind == def.kind)
                })
                .map(|c| c.uuid.clone())
                .unwrap_or(computed);
            out.scopes.push(ResolvedScope {
                uuid,
                file: file.absolute_path.clone(),
                signature_hash: sig_hash,
                def: def.clone(),
            });
        }
    }

    // Pass 2: global name index — current batch unioned with the prior graph.
    let mut index: HashMap<&str, Vec<Candidate>> = HashMap::new();
    for scope in &out.scopes {
        index.entry(scope.def.name.as_str()).or_default().push(Candidate {
            uuid: scope.uuid.clone(),
            file: scope.file.clone(),
            kind: scope.def.kind,
        });
    }
    for (name, candidates) in existing {
        let entry = index.entry(name.as_str()).or_default();
        for c in candidates {
            if !entry.iter().any(|e| e.uuid == c.uuid) {
                entry.push(Candidate {
                    uuid: c.uuid.clone(),
                    file: c.file.clone(),
                    kind: c.kind,
                });
            }
        }
    }

    let kind_of: HashMap<&str, ScopeKind> = out
        .scopes
        .iter()
        .map(|s| (s.uuid.as_str(), s.def.kind))
        .collect();

    let mut seen: HashSet<(RelType, String, String)> = HashSet::new();
    let mut consumes: Vec<Relationship> = Vec::new();
    let mut inheritance: Vec<Relationship> = Vec::new();
    let mut push_unique = |edges: &mut Vec<Relationship>,
                           seen: &mut HashSet<(RelType, String, String)>,
                           rel: Relationship| {
        let key = (rel.rel_type, rel.from.clone(), rel.to.clone());
        if seen.insert(key) {
            edges.push(rel);
        }
    };

    // Pass 3: parent linking within each file.
    for i in 0..out.scopes.len() {
        let Some(parent_name) = out.scopes[i].def.parent_name.clone() else {
            continue;
        };
        let parent_uuid = out
            .scopes
            .iter()
            .find(|p| p.file == out.scopes[i].file && p.def.name == parent_name)
            .map(|p| p.uuid.clone());
        // No parent in this batch: leave unresolved, the name itself is kept
        // as a node property.
        if let Some(parent_uuid) = parent_uuid {
            push_unique(
                &mut out.relationships,
                &mut seen,
                Relationship::new(RelType::HasParent, out.scopes[i].uuid.clone(), parent_uuid),
            );
        }
    }

    // Pass 4: identifier references.
    let files_by_path: HashMap<&str, &FileScopes> = files
        .iter()
        .map(|f| (f.absolute_path.as_str(), f))
        .collect();

    for i in 0..out.scopes.len() {
        let scope_uuid_str = out.scopes[i].uuid.clone();
        let scope_file = out.scopes[i].file.clone();
        let references = out.scopes[i].def.references.clone();

        for reference in &references {
            match reference.kind {
                RefKind::LocalScope => {
                    let target = index
                        .get(reference.identifier.as_str())
                        .and_then(|c| pick_candidate(c, Some(&scope_file)));
                    if let Some(target) = target {
                        if target.uuid != scope_uuid_str {
                            push_unique(
                                &mut consumes,
                                &mut seen,
                                Relationship::new(
                                    RelType::Consumes,
                                    scope_uuid_str.clone(),
                                    target.uuid.clone(),
                                ),
                            );
                        }
                    }
                }
                RefKind::Import => {
                    let Some(file) = files_by_path.get(scope_file.as_str()) else {
                        continue;
                    };
                    let Some(import) = file
                        .imports
                        .iter()
                        .find(|imp| imp.local_name() == reference.identifier)
                    else {
                        continue;
                    };
                    match resolve_import_target(
                        import,
                        &reference.identifier,
                        &scope_file,
                        &index,
                        import_resolver,
                    ) {
                        ImportTarget::Scope(uuid) => {
                            push_unique(
                                &mut consumes,
                                &mut seen,
                                Relationship::new(
                                    RelType::Consumes,
                                    scope_uuid_str.clone(),
                                    uuid,
                                ),
                            );
                        }
                        ImportTarget::External => {
                            let library = LibraryUse {
                                from_uuid: scope_uuid_str.clone(),
                                library: import.source.clone(),
                                symbol: import.symbol.clone(),
                            };
                            if !out.library_uses.contains(&library) {
                                out.library_uses.push(library);
                            }
                        }
                        ImportTarget::Unresolved => {}
                    }
                }
                RefKind::Global => {}
            }
        }
    }

    // Pass 5a: explicit inheritance from heritage clauses.
    let mut explicit_pairs: HashSet<(String, String)> = HashSet::new();
    for i in 0..out.scopes.len() {
        let scope = &out.scopes[i];
        if scope.def.heritage.is_empty() {
            continue;
        }
        let from_uuid = scope.uuid.clone();
        let scope_file = scope.file.clone();
        let heritage = scope.def.heritage.clone();

        for clause in &heritage {
            let target_uuid = resolve_heritage_target(
                &clause.target,
                &scope_file,
                &files_by_path,
                &index,
                import_resolver,
            );
            let Some(target_uuid) = target_uuid else {
                // Unresolvable parent type: no dangling edges
                continue;
            };
            let rel_type = match clause.clause {
                HeritageClause::Extends => RelType::InheritsFrom,
                HeritageClause::Implements => RelType::Implements,
            };
            explicit_pairs.insert((from_uuid.clone(), target_uuid.clone()));
            push_unique(
                &mut inheritance,
                &mut seen,
                Relationship::new(rel_type, from_uuid.clone(), target_uuid)
                    .prop("explicit", true)
                    .prop("clause", clause.clause.as_str()),
            );
        }
    }

    // Explicit heritage beats the use-site edge for the same pair.
    consumes.retain(|c| !explicit_pairs.contains(&(c.from.clone(), c.to.clone())));

    // Pass 5b: heuristic inheritance — class-to-class CONSUMES edges whose
    // source shows `extends`-shaped evidence become INHERITS_FROM.
    let scope_by_uuid: HashMap<&str, &ResolvedScope> =
        out.scopes.iter().map(|s| (s.uuid.as_str(), s)).collect();
    let mut kept_consumes = Vec::with_capacity(consumes.len());
    for edge in consumes {
        let both_classes = kind_of.get(edge.from.as_str()) == Some(&ScopeKind::Class)
            && kind_of.get(edge.to.as_str()) == Some(&ScopeKind::Class);
        if !both_classes {
            kept_consumes.push(edge);
            continue;
        }
        let (Some(source_scope), Some(target_scope)) = (
            scope_by_uuid.get(edge.from.as_str()),
            scope_by_uuid.get(edge.to.as_str()),
        ) else {
            kept_consumes.push(edge);
            continue;
        };
        if heuristic_inherits(source_scope, &target_scope.def.name) {
            let rel = Relationship::new(RelType::InheritsFrom, edge.from, edge.to)
                .prop("explicit", false);
            let key = (rel.rel_type, rel.from.clone(), rel.to.clone());
            if seen.insert(key) {
                inheritance.push(rel);
            }
        } else {
            kept_consumes.push(edge);
        }
    }

    // Pass 6: class membership — a class consumes its same-file members.
    for i in 0..out.scopes.len() {
        if out.scopes[i].def.kind != ScopeKind::Class {
            continue;
        }
        let class_uuid = out.scopes[i].uuid.clone();
        let class_name = out.scopes[i].def.name.clone();
        let class_file = out.scopes[i].file.clone();
        for member in &out.scopes {
            if member.file == class_file
                && member.def.parent_name.as_deref() == Some(class_name.as_str())
            {
                push_unique(
                    &mut kept_consumes,
                    &mut seen,
                    Relationship::new(RelType::Consumes, class_uuid.clone(), member.uuid.clone()),
                );
            }
        }
    }

    out.relationships.extend(inheritance);
    out.relationships.extend(kept_consumes);
    out
}

enum ImportTarget {
    Scope(String),
    External,
    Unresolved,
}

fn resolve_import_target(
    import: &ImportDef,
    local_identifier: &str,
    current_file: &str,
    index: &HashMap<&str, Vec<Candidate>>,
    import_resolver: &ImportResolver,
) -> ImportTarget {
    let Some(resolved) = import_resolver.resolve(&import.source, Path::new(current_file)) else {
        return ImportTarget::External;
    };

    // Default and namespace imports chase under the local binding's name;
    // named imports chase the original exported symbol.
    let chase_symbol = if import.symbol == "default" || import.symbol == "*" {
        local_identifier
    } else {
        import.symbol.as_str()
    };
    let (defining, defining_symbol) = import_resolver.chase_reexports(&resolved, chase_symbol);
    let defining_str = defining.to_string_lossy();

    let candidates = index.get(defining_symbol.as_str());
    let picked = candidates.and_then(|c| pick_candidate(c, Some(defining_str.as_ref())));
    match picked {
        Some(c) => ImportTarget::Scope(c.uuid.clone()),
        // Resolved into the project but the symbol is not indexed: leave the
        // edge unresolved rather than guessing.
        None => ImportTarget::Unresolved,
    }
}

fn resolve_heritage_target(
    target: &str,
    scope_file: &str,
    files_by_path: &HashMap<&str, &FileScopes>,
    index: &HashMap<&str, Vec<Candidate>>,
    import_resolver: &ImportResolver,
) -> Option<String> {
    let candidates = index.get(target)?;

    // Same-file definition wins
    if let Some(local) = candidates.iter().find(|c| c.file == scope_file) {
        return Some(local.uuid.clone());
    }

    // Then the file the heritage target was imported from
    if let Some(file) = files_by_path.get(scope_file) {
        if let Some(import) = file.imports.iter().find(|imp| imp.local_name() == target) {
            if let Some(resolved) = import_resolver.resolve(&import.source, Path::new(scope_file)) {
                let chase_symbol = if import.symbol == "default" || import.symbol == "*" {
                    target
                } else {
                    import.symbol.as_str()
                };
                let (defining, defining_symbol) = import_resolver.chase_reexports(&resolved, chase_symbol);
                let defining_str = defining.to_string_lossy();
                let defining_candidates = index
                    .get(defining_symbol.as_str())
                    .map(|c| c.as_slice())
                    .unwrap_or(candidates.as_slice());
                if let Some(c) = pick_candidate(defining_candidates, Some(defining_str.as_ref())) {
                    return Some(c.uuid.clone());
                }
            }
        }
    }

    // Fall back to any candidate, preferring type-defining kinds
    candidates
        .iter()
        .find(|c| matches!(c.kind, ScopeKind::Class | ScopeKind::Interface))
        .or_else(|| candidates.first())
        .map(|c| c.uuid.clone())
}

/// Tie-break: filter by file when given, then prefer value kinds (function,
/// constant, class, method) over type-level kinds (interface, type).
fn pick_candidate<'a>(candidates: &'a [Candidate], file: Option<&str>) -> Option<&'a Candidate> {
    let filtered: Vec<&Candidate> = match file {
        Some(f) => candidates.iter().filter(|c| c.file == f).collect(),
        None => candidates.iter().collect(),
    };
    if filtered.is_empty() {
        return None;
    }
    filtered
        .iter()
        .find(|c| c.kind.is_value_kind())
        .copied()
        .or_else(|| filtered.first().copied())
}

/// The heuristic inheritance signal: reference context carrying `extends`,
/// an `extends <Target>` signature, or a Python base-class list.
fn heuristic_inherits(source: &ResolvedScope, target_name: &str) -> bool {
    let context_has_extends = source.def.references.iter().any(|r| {
        r.identifier == target_name
            && r.context.split_whitespace().any(|token| token == "extends")
    });
    if context_has_extends {
        return true;
    }
    if extends_sig_re(target_name).is_match(&source.def.signature) {
        return true;
    }
    if source.file.ends_with(".py") {
        if let Some(first_line) = source.def.source.lines().next() {
            if let Some(caps) = py_class_line_re().captures(first_line.trim()) {
                let bases = &caps[1];
                if bases
                    .split(',')
                    .any(|base| base.trim().split('.').next_back() == Some(target_name))
                {
                    return true;
                }
            }
        }
    }
    false
}
