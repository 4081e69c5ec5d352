//! Structured-data parsing: JSON, YAML, TOML, XML, and ENV files are decoded
//! into one JSON value tree, then traversed for DataSections and reference
//! classification.

use serde_json::Value;

use crate::ir::{DataFormat, DataInfo, DataRefDef, DataRefKind, DataSectionDef, ValueType};
use crate::ParseError;

/// A subtree must be at least this interesting to earn its own section.
const MIN_OBJECT_KEYS: usize = 2;
const MIN_ARRAY_ELEMENTS: usize = 3;
/// Sections deeper than this are folded into their parent's content.
const MAX_SECTION_DEPTH: u32 = 3;
/// Content strings larger than this are cut with an explicit marker.
const MAX_CONTENT_CHARS: usize = 10_000;
const TRUNCATION_MARKER: &str = "… [truncated]";

/// Keys whose object children name external packages.
const DEPENDENCY_KEYS: &[&str] = &[
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// Parse a data file into sections and references.
pub fn parse(format: DataFormat, bytes: &[u8]) -> Result<DataInfo, ParseError> {
    let value = decode(format, bytes)?;
    let mut info = DataInfo {
        format: Some(format),
        ..DataInfo::default()
    };
    if let Value::Object(map) = &value {
        info.top_level_keys = map.len();
    }
    traverse(&value, "$", "$", 0, None, &mut info);
    Ok(info)
}

fn decode(format: DataFormat, bytes: &[u8]) -> Result<Value, ParseError> {
    match format {
        DataFormat::Json => {
            serde_json::from_slice(bytes).map_err(|e| ParseError::Data(e.to_string()))
        }
        DataFormat::Yaml => {
            serde_yaml::from_slice(bytes).map_err(|e| ParseError::Data(e.to_string()))
        }
        DataFormat::Toml => {
            let text = std::str::from_utf8(bytes).map_err(|e| ParseError::Data(e.to_string()))?;
            let parsed: toml::Value =
                toml::from_str(text).map_err(|e| ParseError::Data(e.to_string()))?;
            serde_json::to_value(parsed).map_err(|e| ParseError::Data(e.to_string()))
        }
        DataFormat::Xml => xml_to_value(bytes),
        DataFormat::Env => env_to_value(bytes),
    }
}

fn traverse(
    value: &Value,
    path: &str,
    key: &str,
    depth: u32,
    parent_path: Option<&str>,
    info: &mut DataInfo,
) {
    let qualifies = match value {
        Value::Object(map) => map.len() >= MIN_OBJECT_KEYS,
        Value::Array(items) => items.len() >= MIN_ARRAY_ELEMENTS,
        _ => false,
    };

    let own_path = if qualifies && depth <= MAX_SECTION_DEPTH {
        let content = serialize_truncated(value);
        info.sections.push(DataSectionDef {
            path: path.to_string(),
            key: key.to_string(),
            value_type: ValueType::of(value),
            depth,
            content,
            parent_path: parent_path.map(str::to_string),
        });
        Some(path.to_string())
    } else {
        parent_path.map(str::to_string)
    };

    // Dependency tables name packages in their keys
    if DEPENDENCY_KEYS.contains(&key) {
        if let Value::Object(map) = value {
            for package in map.keys() {
                info.references.push(DataRefDef {
                    path: format!("{path}.{package}"),
                    value: package.clone(),
                    kind: DataRefKind::Package,
                });
            }
        }
    }

    match value {
        Value::Object(map) => {
            if depth < MAX_SECTION_DEPTH {
                for (child_key, child) in map {
                    let child_path = format!("{path}.{child_key}");
                    traverse(child, &child_path, child_key, depth + 1, own_path.as_deref(), info);
                }
            }
        }
        Value::Array(items) => {
            if depth < MAX_SECTION_DEPTH {
                for (i, child) in items.iter().enumerate() {
                    let child_path = format!("{path}[{i}]");
                    traverse(child, &child_path, key, depth + 1, own_path.as_deref(), info);
                }
            }
        }
        Value::String(s) => {
            if let Some(kind) = classify_leaf(key, path, s) {
                info.references.push(DataRefDef {
                    path: path.to_string(),
                    value: s.clone(),
                    kind,
                });
            }
        }
        _ => {}
    }
}

fn serialize_truncated(value: &Value) -> String {
    let mut content = serde_json::to_string(value).unwrap_or_default();
    if content.chars().count() > MAX_CONTENT_CHARS {
        content = content.chars().take(MAX_CONTENT_CHARS).collect();
        content.push_str(TRUNCATION_MARKER);
    }
    content
}

/// Classify a leaf string into a reference kind, or `None` for plain values.
pub fn classify_leaf(key: &str, path: &str, value: &str) -> Option<DataRefKind> {
    if value.is_empty() || value.len() > 500 {
        return None;
    }
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(DataRefKind::Url);
    }

    let in_dependency_context = DEPENDENCY_KEYS.iter().any(|k| path.contains(k));
    if in_dependency_context {
        // Values under dependency keys are version specs, not references
        return None;
    }

    let lower = value.to_ascii_lowercase();
    let image_exts = [".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".ico", ".bmp"];
    if image_exts.iter().any(|e| lower.ends_with(e)) {
        return Some(DataRefKind::Image);
    }
    let code_exts = [".ts", ".tsx", ".js", ".jsx", ".py", ".vue", ".svelte", ".mjs", ".cjs"];
    if code_exts.iter().any(|e| lower.ends_with(e)) {
        return Some(DataRefKind::Code);
    }
    let config_exts = [".json", ".yaml", ".yml", ".toml", ".xml", ".env"];
    if config_exts.iter().any(|e| lower.ends_with(e)) {
        return Some(DataRefKind::Config);
    }

    let path_like = value.starts_with("./") || value.starts_with("../") || value.starts_with('/');
    if path_like {
        if value.ends_with('/') {
            return Some(DataRefKind::Directory);
        }
        let last = value.rsplit('/').next().unwrap_or(value);
        if last.contains('.') {
            return Some(DataRefKind::File);
        }
        return Some(DataRefKind::Directory);
    }

    // `"main": "dist/index.js"` style keys whose values point at files
    let file_keys = ["main", "module", "types", "bin", "entry", "source", "input", "output"];
    if file_keys.contains(&key) && value.contains('/') {
        return Some(DataRefKind::File);
    }
    None
}

// ---------------------------------------------------------------------------
// XML and ENV front ends
// ---------------------------------------------------------------------------

/// Convert XML into a JSON object tree: element names become keys, attributes
/// become `@name` keys, text content becomes `#text`.
fn xml_to_value(bytes: &[u8]) -> Result<Value, ParseError> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<(String, serde_json::Map<String, Value>)> = Vec::new();
    let mut root: Option<Value> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let mut map = serde_json::Map::new();
                for attr in e.attributes().flatten() {
                    let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
                    let val = String::from_utf8_lossy(&attr.value).to_string();
                    map.insert(key, Value::String(val));
                }
                stack.push((name, map));
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let mut map = serde_json::Map::new();
                for attr in e.attributes().flatten() {
                    let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
                    let val = String::from_utf8_lossy(&attr.value).to_string();
                    map.insert(key, Value::String(val));
                }
                attach(&mut stack, &mut root, name, Value::Object(map));
            }
            Ok(Event::Text(t)) => {
                if let Some((_, map)) = stack.last_mut() {
                    let text = t.unescape().unwrap_or_default().to_string();
                    if !text.is_empty() {
                        map.insert("#text".to_string(), Value::String(text));
                    }
                }
            }
            Ok(Event::End(_)) => {
                if let Some((name, map)) = stack.pop() {
                    attach(&mut stack, &mut root, name, Value::Object(map));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Data(format!("xml: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| ParseError::Data("xml: empty document".to_string()))
}

fn attach(
    stack: &mut [(String, serde_json::Map<String, Value>)],
    root: &mut Option<Value>,
    name: String,
    value: Value,
) {
    if let Some((_, parent)) = stack.last_mut() {
        // Repeated sibling elements collapse into an array
        match parent.remove(&name) {
            Some(Value::Array(mut items)) => {
                items.push(value);
                parent.insert(name, Value::Array(items));
            }
            Some(existing) => {
                parent.insert(name, Value::Array(vec![existing, value]));
            }
            None => {
                parent.insert(name, value);
            }
        }
    } else if root.is_none() {
        let mut map = serde_json::Map::new();
        map.insert(name, value);
        *root = Some(Value::Object(map));
    }
}

/// Keys that suggest a value should never be stored in the graph.
const SECRET_KEY_HINTS: &[&str] = &["KEY", "SECRET", "TOKEN", "PASSWORD", "CREDENTIAL"];

fn env_to_value(bytes: &[u8]) -> Result<Value, ParseError> {
    let mut map = serde_json::Map::new();
    for item in dotenvy::from_read_iter(bytes) {
        let (key, value) = item.map_err(|e| ParseError::Data(format!("env: {e}")))?;
        let upper = key.to_ascii_uppercase();
        let redacted = SECRET_KEY_HINTS.iter().any(|hint| upper.contains(hint));
        let stored = if redacted {
            "[redacted]".to_string()
        } else {
            value
        };
        map.insert(key, Value::String(stored));
    }
    Ok(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_section_threshold() {
        let one_key = parse(DataFormat::Json, br#"{"a": 1}"#).unwrap();
        assert!(one_key.sections.is_empty());

        let two_keys = parse(DataFormat::Json, br#"{"a": 1, "b": 2}"#).unwrap();
        assert_eq!(two_keys.sections.len(), 1);
        assert_eq!(two_keys.sections[0].path, "$");
    }

    #[test]
    fn test_array_section_threshold() {
        let two = parse(DataFormat::Json, br#"[1, 2]"#).unwrap();
        assert!(two.sections.is_empty());

        let three = parse(DataFormat::Json, br#"[1, 2, 3]"#).unwrap();
        assert_eq!(three.sections.len(), 1);
        assert_eq!(three.sections[0].value_type, ValueType::Array);
    }

    #[test]
    fn test_package_json_dependencies() {
        let info = parse(
            DataFormat::Json,
            br#"{"name": "app", "dependencies": {"lodash": "^4", "react": "^18"}}"#,
        )
        .unwrap();
        let packages: Vec<&str> = info
            .references
            .iter()
            .filter(|r| r.kind == DataRefKind::Package)
            .map(|r| r.value.as_str())
            .collect();
        assert!(packages.contains(&"lodash"));
        assert!(packages.contains(&"react"));
        // Version specs themselves are not references
        assert!(!info.references.iter().any(|r| r.value == "^4"));
    }

    #[test]
    fn test_leaf_classification() {
        assert_eq!(classify_leaf("homepage", "$.homepage", "https://x.dev"), Some(DataRefKind::Url));
        assert_eq!(classify_leaf("logo", "$.logo", "./assets/logo.png"), Some(DataRefKind::Image));
        assert_eq!(classify_leaf("entry", "$.entry", "./src/index.ts"), Some(DataRefKind::Code));
        assert_eq!(classify_leaf("extends", "$.extends", "./base.json"), Some(DataRefKind::Config));
        assert_eq!(classify_leaf("outDir", "$.outDir", "./dist/"), Some(DataRefKind::Directory));
        assert_eq!(classify_leaf("name", "$.name", "my-app"), None);
    }

    #[test]
    fn test_depth_limit() {
        let deep = br#"{"a": {"b": {"c": {"d": {"x": 1, "y": 2, "e": {"x": 1, "y": 2}}}}}}"#;
        let info = parse(DataFormat::Json, deep).unwrap();
        assert!(info.sections.iter().all(|s| s.depth <= 3));
    }

    #[test]
    fn test_content_truncation() {
        let big: String = format!(r#"{{"a": "{}", "b": 1}}"#, "x".repeat(20_000));
        let info = parse(DataFormat::Json, big.as_bytes()).unwrap();
        let section = &info.sections[0];
        assert!(section.content.ends_with(TRUNCATION_MARKER));
        assert!(section.content.chars().count() <= MAX_CONTENT_CHARS + TRUNCATION_MARKER.len());
    }

    #[test]
    fn test_yaml_and_toml_decode() {
        let yaml = parse(DataFormat::Yaml, b"a: 1\nb: 2\n").unwrap();
        assert_eq!(yaml.sections.len(), 1);

        let toml_info = parse(DataFormat::Toml, b"[server]\nhost = \"0.0.0.0\"\nport = 8080\n").unwrap();
        assert!(toml_info
            .sections
            .iter()
            .any(|s| s.path == "$.server"));
    }

    #[test]
    fn test_xml_decode() {
        let xml = br#"<config><host env="prod">example.com</host><port>80</port></config>"#;
        let info = parse(DataFormat::Xml, xml).unwrap();
        assert!(!info.sections.is_empty());
    }

    #[test]
    fn test_env_redaction() {
        let env = b"API_KEY=supersecret\nHOST=localhost\nDB_PASSWORD=hunter2\n";
        let info = parse(DataFormat::Env, env).unwrap();
        let section = &info.sections[0];
        assert!(!section.content.contains("supersecret"));
        assert!(!section.content.contains("hunter2"));
        assert!(section.content.contains("localhost"));
    }

    #[test]
    fn test_parent_path_linking() {
        let info = parse(
            DataFormat::Json,
            br#"{"a": {"x": 1, "y": 2}, "b": {"p": 1, "q": 2}}"#,
        )
        .unwrap();
        let child = info.sections.iter().find(|s| s.path == "$.a").unwrap();
        assert_eq!(child.parent_path.as_deref(), Some("$"));
    }
}
