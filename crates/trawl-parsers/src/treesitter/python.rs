//! Python scope and import extraction.

use tree_sitter::Node;
use trawl_core::types::ScopeKind;

use super::{node_lines, node_text};
use crate::ir::{HeritageClause, HeritageDef, ImportDef, ScopeDef};

pub fn extract_scopes(root: Node<'_>, source: &str) -> Vec<ScopeDef> {
    let mut scopes = Vec::new();
    let mut ancestors: Vec<(String, ScopeKind)> = Vec::new();
    walk(root, source, &mut ancestors, &mut scopes, &[]);
    scopes
}

fn walk(
    node: Node<'_>,
    source: &str,
    ancestors: &mut Vec<(String, ScopeKind)>,
    out: &mut Vec<ScopeDef>,
    decorators: &[String],
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "decorated_definition" => {
                let decs: Vec<String> = child
                    .children(&mut child.walk())
                    .filter(|c| c.kind() == "decorator")
                    .map(|c| node_text(c, source).to_string())
                    .collect();
                if let Some(def) = child.child_by_field_name("definition") {
                    process_definition(def, source, ancestors, out, &decs);
                }
            }
            "function_definition" | "class_definition" => {
                process_definition(child, source, ancestors, out, decorators);
            }
            "expression_statement" => {
                // Module- and class-level assignments only; locals inside
                // functions are not addressable scopes
                let in_function = ancestors
                    .last()
                    .is_some_and(|(_, k)| matches!(k, ScopeKind::Function | ScopeKind::Method));
                if !in_function {
                    extract_assignment(child, source, ancestors, out);
                }
            }
            _ => {
                if child.named_child_count() > 0 {
                    walk(child, source, ancestors, out, &[]);
                }
            }
        }
    }
}

fn process_definition(
    node: Node<'_>,
    source: &str,
    ancestors: &mut Vec<(String, ScopeKind)>,
    out: &mut Vec<ScopeDef>,
    decorators: &[String],
) {
    match node.kind() {
        "function_definition" => {
            if let Some(scope) = extract_function(node, source, ancestors, decorators) {
                let entry = (scope.name.clone(), scope.kind);
                out.push(scope);
                if let Some(body) = node.child_by_field_name("body") {
                    ancestors.push(entry);
                    walk(body, source, ancestors, out, &[]);
                    ancestors.pop();
                }
            }
        }
        "class_definition" => {
            if let Some(scope) = extract_class(node, source, ancestors, decorators) {
                let entry = (scope.name.clone(), ScopeKind::Class);
                out.push(scope);
                if let Some(body) = node.child_by_field_name("body") {
                    ancestors.push(entry);
                    walk(body, source, ancestors, out, &[]);
                    ancestors.pop();
                }
            }
        }
        _ => {}
    }
}

fn extract_function(
    node: Node<'_>,
    source: &str,
    ancestors: &[(String, ScopeKind)],
    decorators: &[String],
) -> Option<ScopeDef> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source).to_string();
    let params_text = node
        .child_by_field_name("parameters")
        .map(|p| node_text(p, source))
        .unwrap_or("()");
    let return_type = node
        .child_by_field_name("return_type")
        .map(|r| node_text(r, source).to_string());

    let in_class = ancestors.last().is_some_and(|(_, k)| *k == ScopeKind::Class);
    let kind = if in_class {
        ScopeKind::Method
    } else {
        ScopeKind::Function
    };

    let mut signature = format!("{name}{params_text}");
    if let Some(ret) = &return_type {
        signature.push_str(&format!(" -> {ret}"));
    }

    let (start_line, end_line) = node_lines(node);
    let mut scope = ScopeDef::new(name, kind);
    scope.start_line = start_line;
    scope.end_line = end_line;
    scope.source = node_text(node, source).to_string();
    scope.signature = signature;
    scope.parameters = extract_parameters(node.child_by_field_name("parameters"), source);
    scope.return_type = return_type;
    scope.parent_name = ancestors.last().map(|(n, _)| n.clone());
    scope.depth = ancestors.len() as u32;
    if source_has_async(node, source) {
        scope.modifiers.push("async".to_string());
    }
    if scope.name.starts_with('_') && !scope.name.starts_with("__") {
        scope.modifiers.push("private".to_string());
    }
    scope.decorators = decorators.to_vec();
    scope.docstring = body_docstring(node, source);
    Some(scope)
}

fn extract_class(
    node: Node<'_>,
    source: &str,
    ancestors: &[(String, ScopeKind)],
    decorators: &[String],
) -> Option<ScopeDef> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source).to_string();

    let mut heritage = Vec::new();
    if let Some(supers) = node.child_by_field_name("superclasses") {
        let mut cursor = supers.walk();
        for base in supers.children(&mut cursor) {
            match base.kind() {
                "identifier" => heritage.push(HeritageDef {
                    clause: HeritageClause::Extends,
                    target: node_text(base, source).to_string(),
                }),
                "attribute" => {
                    // `class Model(db.Model)` — keep the final attribute
                    if let Some(attr) = base.child_by_field_name("attribute") {
                        heritage.push(HeritageDef {
                            clause: HeritageClause::Extends,
                            target: node_text(attr, source).to_string(),
                        });
                    }
                }
                _ => {}
            }
        }
    }

    let mut signature = format!("class {name}");
    if !heritage.is_empty() {
        let bases: Vec<&str> = heritage.iter().map(|h| h.target.as_str()).collect();
        signature.push_str(&format!("({})", bases.join(", ")));
    }

    let (start_line, end_line) = node_lines(node);
    let mut scope = ScopeDef::new(name, ScopeKind::Class);
    scope.start_line = start_line;
    scope.end_line = end_line;
    scope.source = node_text(node, source).to_string();
    scope.signature = signature;
    scope.parent_name = ancestors.last().map(|(n, _)| n.clone());
    scope.depth = ancestors.len() as u32;
    scope.heritage = heritage;
    scope.decorators = decorators.to_vec();
    scope.docstring = body_docstring(node, source);
    Some(scope)
}

fn extract_assignment(
    stmt: Node<'_>,
    source: &str,
    ancestors: &[(String, ScopeKind)],
    out: &mut Vec<ScopeDef>,
) {
    let Some(assignment) = stmt.named_child(0).filter(|c| c.kind() == "assignment") else {
        return;
    };
    let Some(left) = assignment.child_by_field_name("left") else {
        return;
    };
    if left.kind() != "identifier" {
        return;
    }
    let name = node_text(left, source).to_string();
    if name.starts_with("__") && name.ends_with("__") {
        // Dunders (__all__, __version__) are metadata, not scopes
        return;
    }
    let is_constant = name.chars().all(|c| c.is_ascii_uppercase() || c == '_' || c.is_ascii_digit());
    let kind = if is_constant {
        ScopeKind::Constant
    } else {
        ScopeKind::Variable
    };

    let (start_line, end_line) = node_lines(stmt);
    let mut scope = ScopeDef::new(name, kind);
    scope.start_line = start_line;
    scope.end_line = end_line;
    scope.source = node_text(stmt, source).to_string();
    scope.parent_name = ancestors.last().map(|(n, _)| n.clone());
    scope.depth = ancestors.len() as u32;
    out.push(scope);
}

fn extract_parameters(params: Option<Node<'_>>, source: &str) -> Vec<String> {
    let Some(params) = params else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut cursor = params.walk();
    for child in params.children(&mut cursor) {
        match child.kind() {
            "identifier" | "typed_parameter" | "default_parameter" | "typed_default_parameter"
            | "list_splat_pattern" | "dictionary_splat_pattern" => {
                let text = node_text(child, source).to_string();
                if text != "self" && text != "cls" {
                    out.push(text);
                }
            }
            _ => {}
        }
    }
    out
}

fn source_has_async(node: Node<'_>, source: &str) -> bool {
    node_text(node, source).trim_start().starts_with("async ")
}

/// The string literal opening a function/class body.
fn body_docstring(node: Node<'_>, source: &str) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string = first.named_child(0)?;
    if string.kind() != "string" {
        return None;
    }
    let text = node_text(string, source);
    let trimmed = text
        .trim_start_matches("r\"\"\"")
        .trim_start_matches("\"\"\"")
        .trim_start_matches("'''")
        .trim_end_matches("\"\"\"")
        .trim_end_matches("'''")
        .trim();
    Some(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

pub fn extract_imports(root: Node<'_>, source: &str) -> Vec<ImportDef> {
    let mut imports = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "import_statement" => extract_plain_import(child, source, &mut imports),
            "import_from_statement" => extract_from_import(child, source, &mut imports),
            _ => {}
        }
    }
    imports
}

/// `import a.b` / `import a.b as c`
fn extract_plain_import(node: Node<'_>, source: &str, out: &mut Vec<ImportDef>) {
    let line = node.start_position().row as u32 + 1;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "dotted_name" => {
                let module = node_text(child, source).to_string();
                let symbol = module.rsplit('.').next().unwrap_or(&module).to_string();
                out.push(ImportDef {
                    source: module,
                    symbol,
                    alias: None,
                    is_local: false,
                    line,
                });
            }
            "aliased_import" => {
                let module = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source).to_string())
                    .unwrap_or_default();
                let alias = child
                    .child_by_field_name("alias")
                    .map(|a| node_text(a, source).to_string());
                let symbol = module.rsplit('.').next().unwrap_or(&module).to_string();
                out.push(ImportDef {
                    source: module,
                    symbol,
                    alias,
                    is_local: false,
                    line,
                });
            }
            _ => {}
        }
    }
}

/// `from m import a, b as c` / `from . import x`
fn extract_from_import(node: Node<'_>, source: &str, out: &mut Vec<ImportDef>) {
    let line = node.start_position().row as u32 + 1;
    let module = node
        .child_by_field_name("module_name")
        .map(|m| node_text(m, source).to_string())
        .unwrap_or_default();
    let is_local = module.starts_with('.');

    let mut cursor = node.walk();
    let mut past_import_kw = false;
    for child in node.children(&mut cursor) {
        if child.kind() == "import" {
            past_import_kw = true;
            continue;
        }
        if !past_import_kw {
            continue;
        }
        match child.kind() {
            "dotted_name" | "identifier" => {
                out.push(ImportDef {
                    source: module.clone(),
                    symbol: node_text(child, source).to_string(),
                    alias: None,
                    is_local,
                    line,
                });
            }
            "aliased_import" => {
                let symbol = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source).to_string())
                    .unwrap_or_default();
                let alias = child
                    .child_by_field_name("alias")
                    .map(|a| node_text(a, source).to_string());
                out.push(ImportDef {
                    source: module.clone(),
                    symbol,
                    alias,
                    is_local,
                    line,
                });
            }
            "wildcard_import" => {
                out.push(ImportDef {
                    source: module.clone(),
                    symbol: "*".to_string(),
                    alias: None,
                    is_local,
                    line,
                });
            }
            _ => {}
        }
    }
}
