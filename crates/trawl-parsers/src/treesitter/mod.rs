//! Tree-sitter front end for the code parsers.
//!
//! Scope extraction walks the AST recursively so nesting depth and parent
//! names fall out of the traversal; call/new references come from the compiled
//! queries in `queries/`. Identifier references are attached to the innermost
//! scope whose span contains them and classified against the file's own scopes
//! and imports.

pub mod python;
pub mod typescript;

use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Parser, Query, QueryCursor};

use crate::detect::Format;
use crate::ir::{IdentifierRef, ImportDef, RefKind, ScopeDef};
use crate::queries;
use crate::ParseError;

/// Output of the code front end: scopes plus file-level imports.
#[derive(Debug, Clone, Default)]
pub struct CodeParse {
    pub scopes: Vec<ScopeDef>,
    pub imports: Vec<ImportDef>,
}

pub struct TreeSitterParser {
    parser: Parser,
}

impl TreeSitterParser {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    /// Parse one code file into scopes, imports, and classified references.
    pub fn parse_file(
        &mut self,
        format: Format,
        path: &Path,
        source: &str,
    ) -> Result<CodeParse, ParseError> {
        let lang = language_for(format, path)?;
        self.parser
            .set_language(&lang)
            .map_err(|e| ParseError::Language(format!("{e}")))?;
        let tree = self
            .parser
            .parse(source.as_bytes(), None)
            .ok_or(ParseError::ParseFailed)?;
        let root = tree.root_node();

        let (mut scopes, imports) = match format {
            Format::Python => (
                python::extract_scopes(root, source),
                python::extract_imports(root, source),
            ),
            _ => (
                typescript::extract_scopes(root, source),
                typescript::extract_imports(root, source),
            ),
        };

        let raw_refs = extract_raw_references(&lang, format, root, source)?;
        attach_references(&mut scopes, &imports, raw_refs, source);

        Ok(CodeParse { scopes, imports })
    }
}

impl Default for TreeSitterParser {
    fn default() -> Self {
        Self::new()
    }
}

fn language_for(format: Format, path: &Path) -> Result<Language, ParseError> {
    match format {
        Format::TypeScript | Format::JavaScript => {
            let tsx = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| matches!(e, "tsx" | "jsx"));
            if tsx {
                Ok(tree_sitter_typescript::LANGUAGE_TSX.into())
            } else {
                Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            }
        }
        Format::Python => Ok(tree_sitter_python::LANGUAGE.into()),
        other => Err(ParseError::UnsupportedFormat(other.as_str().to_string())),
    }
}

/// A call/new/extends use-site before scope attachment.
#[derive(Debug, Clone)]
pub(crate) struct RawReference {
    pub identifier: String,
    pub line: u32,
}

fn extract_raw_references(
    lang: &Language,
    format: Format,
    root: tree_sitter::Node<'_>,
    source: &str,
) -> Result<Vec<RawReference>, ParseError> {
    let query_source = queries::query_for_format(format)?;
    let query = Query::new(lang, query_source)
        .map_err(|e| ParseError::Query(format!("{e}")))?;
    let mut cursor = QueryCursor::new();
    let capture_names = query.capture_names();
    let mut refs = Vec::new();
    let mut matches = cursor.matches(&query, root, source.as_bytes());

    while let Some(m) = matches.next() {
        for cap in m.captures {
            let cap_name = capture_names[cap.index as usize];
            if matches!(cap_name, "ref.call.name" | "ref.new.name" | "ref.type.name") {
                let text = cap
                    .node
                    .utf8_text(source.as_bytes())
                    .unwrap_or("")
                    .to_string();
                if text.is_empty() {
                    continue;
                }
                refs.push(RawReference {
                    identifier: text,
                    line: cap.node.start_position().row as u32 + 1,
                });
            }
        }
    }
    Ok(refs)
}

/// Assign each raw reference to the innermost enclosing scope and classify it
/// against same-file scope names and the import table.
fn attach_references(
    scopes: &mut [ScopeDef],
    imports: &[ImportDef],
    raw_refs: Vec<RawReference>,
    source: &str,
) {
    let scope_names: std::collections::HashSet<String> =
        scopes.iter().map(|s| s.name.clone()).collect();

    // (index, start_line, end_line) sorted so the innermost (shortest) span wins
    let spans: Vec<(usize, u32, u32)> = scopes
        .iter()
        .enumerate()
        .map(|(i, s)| (i, s.start_line, s.end_line))
        .collect();

    let lines: Vec<&str> = source.lines().collect();

    for raw in raw_refs {
        let owner = spans
            .iter()
            .filter(|(_, start, end)| raw.line >= *start && raw.line <= *end)
            .min_by_key(|(_, start, end)| end - start)
            .map(|(i, _, _)| *i);
        let Some(owner) = owner else { continue };

        // A scope referencing itself (recursion, declaration) is noise
        if scopes[owner].name == raw.identifier {
            continue;
        }

        let context = lines
            .get(raw.line as usize - 1)
            .map(|l| l.trim().to_string())
            .unwrap_or_default();

        let (kind, hint) = if let Some(import) = imports
            .iter()
            .find(|imp| imp.local_name() == raw.identifier)
        {
            (RefKind::Import, Some(import.source.clone()))
        } else if scope_names.contains(&raw.identifier) {
            (RefKind::LocalScope, None)
        } else {
            (RefKind::Global, None)
        };

        scopes[owner].references.push(IdentifierRef {
            identifier: raw.identifier,
            kind,
            target_file_hint: hint,
            context,
            line: raw.line,
        });
    }
}

/// Shared helper: text of a node.
pub(crate) fn node_text<'a>(node: tree_sitter::Node<'a>, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Shared helper: 1-based line span of a node.
pub(crate) fn node_lines(node: tree_sitter::Node<'_>) -> (u32, u32) {
    (
        node.start_position().row as u32 + 1,
        node.end_position().row as u32 + 1,
    )
}
