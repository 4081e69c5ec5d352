//! TypeScript / JavaScript scope and import extraction.

use tree_sitter::Node;
use trawl_core::types::ScopeKind;

use super::{node_lines, node_text};
use crate::ir::{HeritageClause, HeritageDef, ImportDef, ScopeDef};

pub fn extract_scopes(root: Node<'_>, source: &str) -> Vec<ScopeDef> {
    let mut scopes = Vec::new();
    let mut ancestors: Vec<(String, ScopeKind)> = Vec::new();
    walk_children(root, source, &mut ancestors, &mut scopes);
    scopes
}

fn in_function_body(ancestors: &[(String, ScopeKind)]) -> bool {
    ancestors
        .last()
        .is_some_and(|(_, kind)| matches!(kind, ScopeKind::Function | ScopeKind::Method))
}

fn walk_children(
    node: Node<'_>,
    source: &str,
    ancestors: &mut Vec<(String, ScopeKind)>,
    out: &mut Vec<ScopeDef>,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        process(child, source, ancestors, out, false);
    }
}

fn process(
    node: Node<'_>,
    source: &str,
    ancestors: &mut Vec<(String, ScopeKind)>,
    out: &mut Vec<ScopeDef>,
    exported: bool,
) {
    match node.kind() {
        "export_statement" => {
            if let Some(decl) = node.child_by_field_name("declaration") {
                process(decl, source, ancestors, out, true);
            }
        }
        "function_declaration" | "generator_function_declaration" => {
            let scope = extract_function(node, source, ancestors, exported, ScopeKind::Function);
            if let Some(scope) = scope {
                let entry = (scope.name.clone(), ScopeKind::Function);
                out.push(scope);
                ancestors.push(entry);
                walk_children(node, source, ancestors, out);
                ancestors.pop();
            }
        }
        "class_declaration" | "abstract_class_declaration" => {
            if let Some(scope) = extract_class(node, source, ancestors, exported) {
                let entry = (scope.name.clone(), ScopeKind::Class);
                out.push(scope);
                if let Some(body) = node.child_by_field_name("body") {
                    ancestors.push(entry);
                    walk_class_body(body, source, ancestors, out);
                    ancestors.pop();
                }
            }
        }
        "interface_declaration" => {
            if let Some(scope) = extract_interface(node, source, ancestors, exported) {
                out.push(scope);
            }
        }
        "type_alias_declaration" => {
            if let Some(scope) = extract_named(node, source, ancestors, exported, ScopeKind::Type) {
                out.push(scope);
            }
        }
        "enum_declaration" => {
            if let Some(scope) = extract_enum(node, source, ancestors, exported) {
                out.push(scope);
            }
        }
        "internal_module" | "module" => {
            let kind = if node.kind() == "internal_module" {
                ScopeKind::Namespace
            } else {
                ScopeKind::Module
            };
            if let Some(scope) = extract_named(node, source, ancestors, exported, kind) {
                let entry = (scope.name.clone(), kind);
                out.push(scope);
                if let Some(body) = node.child_by_field_name("body") {
                    ancestors.push(entry);
                    walk_children(body, source, ancestors, out);
                    ancestors.pop();
                }
            }
        }
        "lexical_declaration" | "variable_declaration" => {
            extract_variables(node, source, ancestors, out, exported);
        }
        // Recurse into blocks and bodies so nested declarations are found
        _ => {
            if node.named_child_count() > 0 {
                walk_children(node, source, ancestors, out);
            }
        }
    }
}

fn walk_class_body(
    body: Node<'_>,
    source: &str,
    ancestors: &mut Vec<(String, ScopeKind)>,
    out: &mut Vec<ScopeDef>,
) {
    let mut cursor = body.walk();
    for member in body.children(&mut cursor) {
        match member.kind() {
            "method_definition" | "abstract_method_signature" => {
                if let Some(scope) =
                    extract_function(member, source, ancestors, false, ScopeKind::Method)
                {
                    let entry = (scope.name.clone(), ScopeKind::Method);
                    out.push(scope);
                    ancestors.push(entry);
                    walk_children(member, source, ancestors, out);
                    ancestors.pop();
                }
            }
            "public_field_definition" => {
                if let Some(scope) = extract_class_field(member, source, ancestors) {
                    out.push(scope);
                }
            }
            _ => {}
        }
    }
}

fn extract_function(
    node: Node<'_>,
    source: &str,
    ancestors: &[(String, ScopeKind)],
    exported: bool,
    kind: ScopeKind,
) -> Option<ScopeDef> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source).to_string();
    let params_node = node.child_by_field_name("parameters");
    let params_text = params_node.map(|p| node_text(p, source)).unwrap_or("()");
    let return_type = node
        .child_by_field_name("return_type")
        .map(|r| node_text(r, source).trim_start_matches(':').trim().to_string());
    let generics = extract_generics(node, source);

    let mut signature = name.clone();
    if !generics.is_empty() {
        signature.push_str(&format!("<{}>", generics.join(", ")));
    }
    signature.push_str(params_text);
    if let Some(ret) = &return_type {
        signature.push_str(&format!(": {ret}"));
    }

    let (start_line, end_line) = node_lines(node);
    let mut scope = ScopeDef::new(name, kind);
    scope.start_line = start_line;
    scope.end_line = end_line;
    scope.source = node_text(node, source).to_string();
    scope.signature = signature;
    scope.parameters = extract_parameters(params_node, source);
    scope.return_type = return_type;
    scope.parent_name = ancestors.last().map(|(n, _)| n.clone());
    scope.depth = ancestors.len() as u32;
    scope.modifiers = collect_modifiers(node, source, exported);
    scope.generics = generics;
    scope.decorators = collect_decorators(node, source);
    scope.docstring = leading_doc_comment(node, source);
    Some(scope)
}

fn extract_class(
    node: Node<'_>,
    source: &str,
    ancestors: &[(String, ScopeKind)],
    exported: bool,
) -> Option<ScopeDef> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source).to_string();
    let heritage = extract_heritage(node, source);
    let generics = extract_generics(node, source);

    let mut signature = format!("class {name}");
    if !generics.is_empty() {
        signature.push_str(&format!("<{}>", generics.join(", ")));
    }
    for h in &heritage {
        match h.clause {
            HeritageClause::Extends => signature.push_str(&format!(" extends {}", h.target)),
            HeritageClause::Implements => signature.push_str(&format!(" implements {}", h.target)),
        }
    }

    let (start_line, end_line) = node_lines(node);
    let mut scope = ScopeDef::new(name, ScopeKind::Class);
    scope.start_line = start_line;
    scope.end_line = end_line;
    scope.source = node_text(node, source).to_string();
    scope.signature = signature;
    scope.parent_name = ancestors.last().map(|(n, _)| n.clone());
    scope.depth = ancestors.len() as u32;
    scope.modifiers = collect_modifiers(node, source, exported);
    scope.heritage = heritage;
    scope.generics = generics;
    scope.decorators = collect_decorators(node, source);
    scope.docstring = leading_doc_comment(node, source);
    Some(scope)
}

fn extract_interface(
    node: Node<'_>,
    source: &str,
    ancestors: &[(String, ScopeKind)],
    exported: bool,
) -> Option<ScopeDef> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source).to_string();
    let heritage = extract_heritage(node, source);
    let generics = extract_generics(node, source);

    let mut signature = format!("interface {name}");
    if !generics.is_empty() {
        signature.push_str(&format!("<{}>", generics.join(", ")));
    }
    for h in &heritage {
        signature.push_str(&format!(" extends {}", h.target));
    }

    let (start_line, end_line) = node_lines(node);
    let mut scope = ScopeDef::new(name, ScopeKind::Interface);
    scope.start_line = start_line;
    scope.end_line = end_line;
    scope.source = node_text(node, source).to_string();
    scope.signature = signature;
    scope.parent_name = ancestors.last().map(|(n, _)| n.clone());
    scope.depth = ancestors.len() as u32;
    scope.modifiers = collect_modifiers(node, source, exported);
    scope.heritage = heritage;
    scope.generics = generics;
    scope.docstring = leading_doc_comment(node, source);
    Some(scope)
}

fn extract_named(
    node: Node<'_>,
    source: &str,
    ancestors: &[(String, ScopeKind)],
    exported: bool,
    kind: ScopeKind,
) -> Option<ScopeDef> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source).to_string();
    let generics = extract_generics(node, source);

    let mut signature = format!("{} {name}", kind.as_str());
    if !generics.is_empty() {
        signature.push_str(&format!("<{}>", generics.join(", ")));
    }

    let (start_line, end_line) = node_lines(node);
    let mut scope = ScopeDef::new(name, kind);
    scope.start_line = start_line;
    scope.end_line = end_line;
    scope.source = node_text(node, source).to_string();
    scope.signature = signature;
    scope.parent_name = ancestors.last().map(|(n, _)| n.clone());
    scope.depth = ancestors.len() as u32;
    scope.modifiers = collect_modifiers(node, source, exported);
    scope.generics = generics;
    scope.docstring = leading_doc_comment(node, source);
    Some(scope)
}

fn extract_enum(
    node: Node<'_>,
    source: &str,
    ancestors: &[(String, ScopeKind)],
    exported: bool,
) -> Option<ScopeDef> {
    let mut scope = extract_named(node, source, ancestors, exported, ScopeKind::Enum)?;
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for member in body.children(&mut cursor) {
            match member.kind() {
                "property_identifier" => {
                    scope.enum_members.push(node_text(member, source).to_string());
                }
                "enum_assignment" => {
                    if let Some(name) = member.child_by_field_name("name") {
                        scope.enum_members.push(node_text(name, source).to_string());
                    }
                }
                _ => {}
            }
        }
    }
    Some(scope)
}

fn extract_class_field(
    node: Node<'_>,
    source: &str,
    ancestors: &[(String, ScopeKind)],
) -> Option<ScopeDef> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source).to_string();
    // Arrow-function fields are really methods
    let is_function = node
        .child_by_field_name("value")
        .is_some_and(|v| matches!(v.kind(), "arrow_function" | "function_expression"));
    let kind = if is_function {
        ScopeKind::Method
    } else {
        ScopeKind::Variable
    };

    let (start_line, end_line) = node_lines(node);
    let mut scope = ScopeDef::new(name, kind);
    scope.start_line = start_line;
    scope.end_line = end_line;
    scope.source = node_text(node, source).to_string();
    if is_function {
        scope.signature = node_text(name_node, source).to_string()
            + node
                .child_by_field_name("value")
                .and_then(|v| v.child_by_field_name("parameters"))
                .map(|p| node_text(p, source))
                .unwrap_or("()");
    }
    scope.parent_name = ancestors.last().map(|(n, _)| n.clone());
    scope.depth = ancestors.len() as u32;
    scope.modifiers = collect_modifiers(node, source, false);
    Some(scope)
}

fn extract_variables(
    node: Node<'_>,
    source: &str,
    ancestors: &mut Vec<(String, ScopeKind)>,
    out: &mut Vec<ScopeDef>,
    exported: bool,
) {
    // Locals inside function bodies are not addressable scopes
    if in_function_body(ancestors) {
        return;
    }
    let declaration_text = node_text(node, source);
    let is_const = declaration_text.trim_start().starts_with("const");

    let mut cursor = node.walk();
    for declarator in node.children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(name_node) = declarator.child_by_field_name("name") else {
            continue;
        };
        if name_node.kind() != "identifier" {
            // Destructuring patterns don't make addressable scopes
            continue;
        }
        let name = node_text(name_node, source).to_string();
        let value = declarator.child_by_field_name("value");
        let is_function_value =
            value.is_some_and(|v| matches!(v.kind(), "arrow_function" | "function_expression"));

        let kind = if is_function_value {
            ScopeKind::Function
        } else if is_const {
            ScopeKind::Constant
        } else {
            ScopeKind::Variable
        };

        let (start_line, end_line) = node_lines(declarator);
        let mut scope = ScopeDef::new(name.clone(), kind);
        scope.start_line = start_line;
        scope.end_line = end_line;
        scope.source = node_text(node, source).to_string();
        if is_function_value {
            let value = value.unwrap();
            let params = value
                .child_by_field_name("parameters")
                .map(|p| node_text(p, source).to_string())
                .unwrap_or_else(|| "()".to_string());
            let ret = value
                .child_by_field_name("return_type")
                .map(|r| node_text(r, source).trim_start_matches(':').trim().to_string());
            scope.signature = format!("{name}{params}");
            if let Some(ret) = &ret {
                scope.signature.push_str(&format!(": {ret}"));
            }
            scope.parameters = extract_parameters(value.child_by_field_name("parameters"), source);
            scope.return_type = ret;
        }
        scope.parent_name = ancestors.last().map(|(n, _)| n.clone());
        scope.depth = ancestors.len() as u32;
        if exported {
            scope.modifiers.push("export".to_string());
        }
        scope.docstring = leading_doc_comment(node, source);
        let recurse = is_function_value;
        let scope_name = scope.name.clone();
        out.push(scope);
        if recurse {
            ancestors.push((scope_name, kind));
            walk_children(declarator, source, ancestors, out);
            ancestors.pop();
        }
    }
}

fn extract_heritage(node: Node<'_>, source: &str) -> Vec<HeritageDef> {
    let mut heritage = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "class_heritage" => {
                let mut inner = child.walk();
                for clause in child.children(&mut inner) {
                    collect_heritage_clause(clause, source, &mut heritage);
                }
            }
            "extends_clause" | "extends_type_clause" | "implements_clause" => {
                collect_heritage_clause(child, source, &mut heritage);
            }
            _ => {}
        }
    }
    heritage
}

fn collect_heritage_clause(clause: Node<'_>, source: &str, out: &mut Vec<HeritageDef>) {
    let clause_kind = match clause.kind() {
        "extends_clause" | "extends_type_clause" => HeritageClause::Extends,
        "implements_clause" => HeritageClause::Implements,
        _ => return,
    };
    let mut cursor = clause.walk();
    for target in clause.children(&mut cursor) {
        match target.kind() {
            "identifier" | "type_identifier" => {
                out.push(HeritageDef {
                    clause: clause_kind,
                    target: node_text(target, source).to_string(),
                });
            }
            "generic_type" => {
                if let Some(name) = target.child_by_field_name("name") {
                    out.push(HeritageDef {
                        clause: clause_kind,
                        target: node_text(name, source).to_string(),
                    });
                }
            }
            "member_expression" | "nested_type_identifier" => {
                // `extends ns.Base` — keep the final segment
                let text = node_text(target, source);
                if let Some(last) = text.rsplit('.').next() {
                    out.push(HeritageDef {
                        clause: clause_kind,
                        target: last.to_string(),
                    });
                }
            }
            _ => {}
        }
    }
}

fn extract_generics(node: Node<'_>, source: &str) -> Vec<String> {
    let Some(params) = node.child_by_field_name("type_parameters") else {
        return Vec::new();
    };
    let mut generics = Vec::new();
    let mut cursor = params.walk();
    for child in params.children(&mut cursor) {
        if child.kind() == "type_parameter" {
            generics.push(node_text(child, source).to_string());
        }
    }
    generics
}

fn extract_parameters(params: Option<Node<'_>>, source: &str) -> Vec<String> {
    let Some(params) = params else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut cursor = params.walk();
    for child in params.children(&mut cursor) {
        if matches!(
            child.kind(),
            "required_parameter" | "optional_parameter" | "identifier" | "rest_pattern"
        ) {
            out.push(node_text(child, source).to_string());
        }
    }
    out
}

fn collect_modifiers(node: Node<'_>, source: &str, exported: bool) -> Vec<String> {
    let mut modifiers = Vec::new();
    if exported {
        modifiers.push("export".to_string());
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "async" | "static" | "abstract" | "readonly" | "declare" | "get" | "set" => {
                modifiers.push(node_text(child, source).to_string());
            }
            "accessibility_modifier" => {
                modifiers.push(node_text(child, source).to_string());
            }
            _ => {}
        }
    }
    modifiers
}

fn collect_decorators(node: Node<'_>, source: &str) -> Vec<String> {
    let mut decorators = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "decorator" {
            decorators.push(node_text(child, source).to_string());
        }
    }
    // Decorators on exported declarations sit on the export statement's parent
    if decorators.is_empty() {
        let mut prev = node.prev_sibling();
        while let Some(p) = prev {
            if p.kind() == "decorator" {
                decorators.insert(0, node_text(p, source).to_string());
                prev = p.prev_sibling();
            } else {
                break;
            }
        }
    }
    decorators
}

/// The `/** … */` block immediately above a declaration.
fn leading_doc_comment(node: Node<'_>, source: &str) -> Option<String> {
    // For `export function f…` the comment sits above the export statement
    let anchor = match node.parent() {
        Some(parent) if parent.kind() == "export_statement" => parent,
        _ => node,
    };
    let mut prev = anchor.prev_sibling();
    // Skip decorators between the comment and the declaration
    while let Some(p) = prev {
        if p.kind() == "decorator" {
            prev = p.prev_sibling();
        } else {
            break;
        }
    }
    let prev = prev?;
    if prev.kind() != "comment" {
        return None;
    }
    let text = node_text(prev, source);
    if !text.starts_with("/**") {
        return None;
    }
    Some(
        text.trim_start_matches("/**")
            .trim_end_matches("*/")
            .lines()
            .map(|l| l.trim().trim_start_matches('*').trim())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string(),
    )
}

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

pub fn extract_imports(root: Node<'_>, source: &str) -> Vec<ImportDef> {
    let mut imports = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() == "import_statement" {
            extract_import_statement(child, source, &mut imports);
        }
    }
    imports
}

fn extract_import_statement(node: Node<'_>, source: &str, out: &mut Vec<ImportDef>) {
    let Some(source_node) = node.child_by_field_name("source") else {
        return;
    };
    let module = node_text(source_node, source)
        .trim_matches('"')
        .trim_matches('\'')
        .to_string();
    let is_local = module.starts_with('.') || module.starts_with('/');
    let line = node.start_position().row as u32 + 1;

    let Some(clause) = node
        .children(&mut node.walk())
        .find(|c| c.kind() == "import_clause")
    else {
        // Side-effect import: `import "./styles.css"`
        out.push(ImportDef {
            source: module,
            symbol: "*".to_string(),
            alias: None,
            is_local,
            line,
        });
        return;
    };

    let mut cursor = clause.walk();
    for item in clause.children(&mut cursor) {
        match item.kind() {
            "identifier" => {
                // Default import
                out.push(ImportDef {
                    source: module.clone(),
                    symbol: "default".to_string(),
                    alias: Some(node_text(item, source).to_string()),
                    is_local,
                    line,
                });
            }
            "namespace_import" => {
                let alias = item
                    .children(&mut item.walk())
                    .find(|c| c.kind() == "identifier")
                    .map(|c| node_text(c, source).to_string());
                out.push(ImportDef {
                    source: module.clone(),
                    symbol: "*".to_string(),
                    alias,
                    is_local,
                    line,
                });
            }
            "named_imports" => {
                let mut spec_cursor = item.walk();
                for spec in item.children(&mut spec_cursor) {
                    if spec.kind() != "import_specifier" {
                        continue;
                    }
                    let name = spec
                        .child_by_field_name("name")
                        .map(|n| node_text(n, source).to_string())
                        .unwrap_or_default();
                    let alias = spec
                        .child_by_field_name("alias")
                        .map(|a| node_text(a, source).to_string());
                    if name.is_empty() {
                        continue;
                    }
                    out.push(ImportDef {
                        source: module.clone(),
                        symbol: name,
                        alias,
                        is_local,
                        line,
                    });
                }
            }
            _ => {}
        }
    }
}
