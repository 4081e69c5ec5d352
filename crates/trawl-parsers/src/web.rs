//! Vue SFC, Svelte, and HTML/Astro parsing.
//!
//! These formats are split with regexes rather than a grammar: the graph only
//! needs block flags, the script's imports, and the component tags used in the
//! template.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::ir::{ImportDef, WebInfo, WebKind};
use trawl_core::hash::short_hash;

fn script_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<script([^>]*)>(.*?)</script>"#).expect("script regex")
    })
}

fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?m)^\s*import\s+(?:(?P<default>[A-Za-z_$][\w$]*)\s*,?\s*)?(?:\{(?P<named>[^}]*)\}|\*\s+as\s+(?P<ns>[A-Za-z_$][\w$]*))?\s*(?:from\s+)?['"](?P<source>[^'"]+)['"]"#,
        )
        .expect("import regex")
    })
}

fn component_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<([A-Z][A-Za-z0-9]*)[\s/>]").expect("component tag regex"))
}

/// Parse a web component file. Returns the component info plus its imports.
pub fn parse(kind: WebKind, path: &Path, source: &str) -> (WebInfo, Vec<ImportDef>) {
    let component_name = component_name_from_path(path);

    let script_block = script_re().captures(source);
    let (script_attrs, script_body) = match &script_block {
        Some(caps) => (caps.get(1).map_or("", |m| m.as_str()), caps.get(2).map_or("", |m| m.as_str())),
        None => ("", ""),
    };

    // Astro keeps its script in `---` frontmatter instead of a script tag
    let frontmatter = if kind == WebKind::Html && script_body.is_empty() {
        extract_frontmatter(source)
    } else {
        None
    };
    let effective_script = frontmatter.as_deref().unwrap_or(script_body);

    let script_lang = extract_lang_attr(script_attrs);
    let has_template = match kind {
        WebKind::Vue => source.contains("<template"),
        // Svelte/HTML markup is everything outside script and style blocks
        _ => !strip_blocks(source).trim().is_empty(),
    };
    let has_style = source.contains("<style");

    let template_text = match kind {
        WebKind::Vue => {
            let template_re = Regex::new(r"(?s)<template[^>]*>(.*)</template>").expect("template regex");
            template_re
                .captures(source)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        }
        _ => strip_blocks(source),
    };

    let mut used_components: Vec<String> = component_tag_re()
        .captures_iter(&template_text)
        .map(|c| c[1].to_string())
        .collect();
    used_components.sort();
    used_components.dedup();

    let imports = extract_script_imports(effective_script);

    let info = WebInfo {
        kind,
        component_name,
        hash: short_hash(source),
        has_template,
        has_script: !effective_script.trim().is_empty(),
        has_style,
        script_lang,
        used_components,
    };
    (info, imports)
}

fn component_name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Component");
    // kebab- and snake-case stems become PascalCase component names
    let mut name = String::with_capacity(stem.len());
    let mut upper_next = true;
    for c in stem.chars() {
        if c == '-' || c == '_' || c == '.' {
            upper_next = true;
        } else if upper_next {
            name.extend(c.to_uppercase());
            upper_next = false;
        } else {
            name.push(c);
        }
    }
    name
}

fn extract_lang_attr(attrs: &str) -> Option<String> {
    let lang_re = Regex::new(r#"lang\s*=\s*["']([^"']+)["']"#).expect("lang regex");
    lang_re.captures(attrs).map(|c| c[1].to_string())
}

fn extract_frontmatter(source: &str) -> Option<String> {
    let trimmed = source.trim_start();
    let rest = trimmed.strip_prefix("---")?;
    let end = rest.find("\n---")?;
    Some(rest[..end].to_string())
}

fn strip_blocks(source: &str) -> String {
    let style_re = Regex::new(r"(?s)<style[^>]*>.*?</style>").expect("style regex");
    let without_scripts = script_re().replace_all(source, "");
    style_re.replace_all(&without_scripts, "").to_string()
}

/// Pull import statements out of a script block.
pub fn extract_script_imports(script: &str) -> Vec<ImportDef> {
    let mut imports = Vec::new();
    for (line_idx, line) in script.lines().enumerate() {
        let Some(caps) = import_re().captures(line) else {
            continue;
        };
        let source = caps["source"].to_string();
        let is_local = source.starts_with('.') || source.starts_with('/');
        let line_no = line_idx as u32 + 1;

        if let Some(default) = caps.name("default") {
            imports.push(ImportDef {
                source: source.clone(),
                symbol: "default".to_string(),
                alias: Some(default.as_str().to_string()),
                is_local,
                line: line_no,
            });
        }
        if let Some(ns) = caps.name("ns") {
            imports.push(ImportDef {
                source: source.clone(),
                symbol: "*".to_string(),
                alias: Some(ns.as_str().to_string()),
                is_local,
                line: line_no,
            });
        }
        if let Some(named) = caps.name("named") {
            for item in named.as_str().split(',') {
                let item = item.trim();
                if item.is_empty() {
                    continue;
                }
                let mut parts = item.split(" as ");
                let symbol = parts.next().unwrap_or("").trim().to_string();
                let alias = parts.next().map(|a| a.trim().to_string());
                imports.push(ImportDef {
                    source: source.clone(),
                    symbol,
                    alias,
                    is_local,
                    line: line_no,
                });
            }
        }
        if caps.name("default").is_none() && caps.name("ns").is_none() && caps.name("named").is_none()
        {
            // Side-effect import
            imports.push(ImportDef {
                source,
                symbol: "*".to_string(),
                alias: None,
                is_local,
                line: line_no,
            });
        }
    }
    imports
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VUE_SFC: &str = r#"<template>
  <div>
    <UserCard :user="user" />
    <app-footer />
    <BaseButton>Save</BaseButton>
  </div>
</template>

<script lang="ts">
import { defineComponent } from 'vue'
import UserCard from './UserCard.vue'
import BaseButton from '@/components/BaseButton.vue'

export default defineComponent({ name: 'UserPage' })
</script>

<style scoped>
div { color: red; }
</style>
"#;

    #[test]
    fn test_vue_blocks_and_lang() {
        let (info, imports) = parse(WebKind::Vue, &PathBuf::from("src/UserPage.vue"), VUE_SFC);
        assert_eq!(info.component_name, "UserPage");
        assert!(info.has_template);
        assert!(info.has_script);
        assert!(info.has_style);
        assert_eq!(info.script_lang.as_deref(), Some("ts"));
        assert_eq!(imports.len(), 3);
        assert!(imports.iter().any(|i| i.source == "./UserCard.vue" && i.is_local));
        assert!(imports.iter().any(|i| i.source == "vue" && !i.is_local));
    }

    #[test]
    fn test_vue_used_components() {
        let (info, _) = parse(WebKind::Vue, &PathBuf::from("UserPage.vue"), VUE_SFC);
        assert_eq!(info.used_components, vec!["BaseButton", "UserCard"]);
    }

    #[test]
    fn test_svelte_component() {
        let source = "<script>\nimport Card from './Card.svelte'\n</script>\n\n<Card title=\"hi\" />\n";
        let (info, imports) = parse(WebKind::Svelte, &PathBuf::from("list-view.svelte"), source);
        assert_eq!(info.component_name, "ListView");
        assert!(info.has_template);
        assert_eq!(info.used_components, vec!["Card"]);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].alias.as_deref(), Some("Card"));
    }

    #[test]
    fn test_astro_frontmatter_imports() {
        let source = "---\nimport Layout from '../layouts/Layout.astro'\n---\n<Layout title=\"x\" />\n";
        let (info, imports) = parse(WebKind::Html, &PathBuf::from("index.astro"), source);
        assert!(info.has_script);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].source, "../layouts/Layout.astro");
    }

    #[test]
    fn test_component_name_from_kebab() {
        assert_eq!(component_name_from_path(&PathBuf::from("user-card.vue")), "UserCard");
        assert_eq!(component_name_from_path(&PathBuf::from("AppHeader.vue")), "AppHeader");
    }
}
