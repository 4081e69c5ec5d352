#[path = "../common/mod.rs"]
mod common;

use trawl_core::config::TrawlConfig;
use trawl_parsers::detect::{Format, FormatCategory};
use trawl_parsers::walker::FileWalker;
use trawl_parsers::ParserRegistry;

#[test]
fn test_walker_detects_every_format() {
    let (_dir, root) = common::polyglot_project();
    let entries = FileWalker::new(&root).walk();

    let formats: Vec<Format> = entries.iter().map(|e| e.detection.format).collect();
    assert!(formats.contains(&Format::TypeScript));
    assert!(formats.contains(&Format::Python));
    assert!(formats.contains(&Format::Vue));
    assert!(formats.contains(&Format::Css));
    assert!(formats.contains(&Format::Markdown));
    assert!(formats.contains(&Format::Json));
    assert!(formats.contains(&Format::Env));
    assert!(formats.contains(&Format::Csv));
}

#[test]
fn test_registry_parses_whole_tree() {
    let (_dir, root) = common::polyglot_project();
    let registry = ParserRegistry::new();
    let config = TrawlConfig::default();

    let mut scope_count = 0usize;
    let mut section_count = 0usize;
    for entry in FileWalker::new(&root).walk() {
        let bytes = std::fs::read(&entry.path).unwrap();
        let (detection, output) = registry.parse_file(&entry.path, &bytes, &config).unwrap();
        match detection.category {
            FormatCategory::Code => {
                scope_count += output.scopes.len();
                if let Some(markdown) = &output.markdown {
                    section_count += markdown.sections.len();
                }
            }
            FormatCategory::Data => {
                assert!(output.data.is_some());
            }
            FormatCategory::Document => {
                assert!(output.document.is_some());
            }
            _ => {}
        }
    }
    // Base, describe, id, Derived, describe, MAX_SIZE, clamp at minimum
    assert!(scope_count >= 7, "found {scope_count} scopes");
    assert!(section_count >= 2, "found {section_count} sections");
}

#[test]
fn test_env_secrets_never_reach_ir() {
    let (_dir, root) = common::polyglot_project();
    let registry = ParserRegistry::new();
    let config = TrawlConfig::default();

    let path = root.join("config/.env");
    let bytes = std::fs::read(&path).unwrap();
    let (_, output) = registry.parse_file(&path, &bytes, &config).unwrap();
    let data = output.data.unwrap();
    for section in &data.sections {
        assert!(!section.content.contains("hunter2"));
    }
}

#[test]
fn test_vue_component_ir() {
    let (_dir, root) = common::polyglot_project();
    let registry = ParserRegistry::new();
    let config = TrawlConfig::default();

    let path = root.join("components/Card.vue");
    let bytes = std::fs::read(&path).unwrap();
    let (_, output) = registry.parse_file(&path, &bytes, &config).unwrap();
    let web = output.web.unwrap();
    assert_eq!(web.component_name, "Card");
    assert_eq!(web.used_components, vec!["BaseButton"]);
    assert_eq!(web.script_lang.as_deref(), Some("ts"));
    assert_eq!(output.imports.len(), 1);
}
