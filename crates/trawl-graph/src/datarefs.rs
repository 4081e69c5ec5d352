//! DataReference linking: classified leaf values from data files become edges
//! to files, directories, external libraries, or external URLs. References
//! that resolve to nothing are dropped — never a dangling edge.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use trawl_core::ids::{lib_id, url_id};
use trawl_core::types::{GraphNode, NodeLabel, RelType, Relationship};
use trawl_parsers::ir::{DataRefDef, DataRefKind};

#[derive(Debug, Default)]
pub struct DataRefLinks {
    /// ExternalLibrary / ExternalUrl nodes minted for this file.
    pub nodes: Vec<GraphNode>,
    pub relationships: Vec<Relationship>,
}

/// Turn a data file's classified references into graph links.
///
/// `file_uuids` / `dir_uuids` map absolute paths of the batch's files and
/// directories to their node UUIDs.
pub fn link_data_refs(
    refs: &[DataRefDef],
    data_file_uuid: &str,
    file_dir: &Path,
    project_root: &Path,
    file_uuids: &HashMap<String, String>,
    dir_uuids: &HashMap<String, String>,
) -> DataRefLinks {
    let mut links = DataRefLinks::default();
    let mut minted: std::collections::HashSet<String> = std::collections::HashSet::new();

    for reference in refs {
        match reference.kind {
            DataRefKind::Url => {
                let uuid = url_id(&reference.value);
                if minted.insert(uuid.clone()) {
                    let mut node =
                        GraphNode::new(uuid.clone(), NodeLabel::ExternalUrl, &reference.value);
                    node.properties
                        .insert("url".into(), reference.value.clone().into());
                    node.properties
                        .insert("domain".into(), domain_of(&reference.value).into());
                    links.nodes.push(node);
                }
                links.relationships.push(
                    Relationship::new(RelType::LinksTo, data_file_uuid, uuid)
                        .prop("path", reference.path.clone()),
                );
            }
            DataRefKind::Package => {
                let uuid = lib_id(&reference.value);
                if minted.insert(uuid.clone()) {
                    let mut node =
                        GraphNode::new(uuid.clone(), NodeLabel::ExternalLibrary, &reference.value);
                    node.properties.insert("registry".into(), "npm".into());
                    links.nodes.push(node);
                }
                links.relationships.push(
                    Relationship::new(RelType::UsesPackage, data_file_uuid, uuid)
                        .prop("symbol", reference.value.clone()),
                );
            }
            DataRefKind::Image => {
                if let Some(target) =
                    resolve_path(&reference.value, file_dir, project_root, file_uuids)
                {
                    links.relationships.push(
                        Relationship::new(RelType::ReferencesImage, data_file_uuid, target)
                            .prop("path", reference.path.clone()),
                    );
                }
            }
            DataRefKind::File | DataRefKind::Code | DataRefKind::Config => {
                if let Some(target) =
                    resolve_path(&reference.value, file_dir, project_root, file_uuids)
                {
                    links.relationships.push(
                        Relationship::new(RelType::References, data_file_uuid, target)
                            .prop("path", reference.path.clone())
                            .prop("kind", reference.kind.as_str()),
                    );
                }
            }
            DataRefKind::Directory => {
                if let Some(target) =
                    resolve_path(&reference.value, file_dir, project_root, dir_uuids)
                {
                    links.relationships.push(
                        Relationship::new(RelType::References, data_file_uuid, target)
                            .prop("path", reference.path.clone())
                            .prop("kind", "directory"),
                    );
                }
            }
        }
    }

    links
}

/// Try the value against the data file's directory, then the project root.
fn resolve_path(
    value: &str,
    file_dir: &Path,
    project_root: &Path,
    uuids: &HashMap<String, String>,
) -> Option<String> {
    let cleaned = value.trim_end_matches('/');
    for base in [file_dir, project_root] {
        let candidate = normalize(&base.join(cleaned));
        let key = candidate.to_string_lossy();
        if let Some(uuid) = uuids.get(key.as_ref()) {
            return Some(uuid.clone());
        }
    }
    None
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn domain_of(url: &str) -> String {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    without_scheme
        .split('/')
        .next()
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs_fixture() -> Vec<DataRefDef> {
        vec![
            DataRefDef {
                path: "$.homepage".into(),
                value: "https://example.com/docs".into(),
                kind: DataRefKind::Url,
            },
            DataRefDef {
                path: "$.dependencies.lodash".into(),
                value: "lodash".into(),
                kind: DataRefKind::Package,
            },
            DataRefDef {
                path: "$.main".into(),
                value: "./src/index.ts".into(),
                kind: DataRefKind::Code,
            },
            DataRefDef {
                path: "$.missing".into(),
                value: "./not/there.ts".into(),
                kind: DataRefKind::File,
            },
        ]
    }

    #[test]
    fn test_url_and_package_nodes_minted() {
        let links = link_data_refs(
            &refs_fixture(),
            "data:x",
            Path::new("/p"),
            Path::new("/p"),
            &HashMap::new(),
            &HashMap::new(),
        );
        let labels: Vec<NodeLabel> = links.nodes.iter().map(|n| n.label).collect();
        assert!(labels.contains(&NodeLabel::ExternalUrl));
        assert!(labels.contains(&NodeLabel::ExternalLibrary));

        let url_node = links.nodes.iter().find(|n| n.label == NodeLabel::ExternalUrl).unwrap();
        assert_eq!(url_node.properties["domain"], "example.com");
        assert!(url_node.uuid.starts_with("url:"));

        assert!(links
            .relationships
            .iter()
            .any(|r| r.rel_type == RelType::UsesPackage && r.properties["symbol"] == "lodash"));
    }

    #[test]
    fn test_file_reference_resolves_against_dir() {
        let mut file_uuids = HashMap::new();
        file_uuids.insert("/p/src/index.ts".to_string(), "file:idx".to_string());

        let links = link_data_refs(
            &refs_fixture(),
            "data:x",
            Path::new("/p"),
            Path::new("/p"),
            &file_uuids,
            &HashMap::new(),
        );
        assert!(links
            .relationships
            .iter()
            .any(|r| r.rel_type == RelType::References && r.to == "file:idx"));
    }

    #[test]
    fn test_unresolved_reference_is_dropped() {
        let links = link_data_refs(
            &refs_fixture(),
            "data:x",
            Path::new("/p"),
            Path::new("/p"),
            &HashMap::new(),
            &HashMap::new(),
        );
        // The "./not/there.ts" ref resolves to nothing and emits nothing
        assert!(!links.relationships.iter().any(|r| r.properties.get("path")
            == Some(&serde_json::Value::String("$.missing".into()))));
    }

    #[test]
    fn test_image_reference_edge_type() {
        let mut file_uuids = HashMap::new();
        file_uuids.insert("/p/logo.png".to_string(), "file:logo".to_string());
        let refs = vec![DataRefDef {
            path: "$.icon".into(),
            value: "./logo.png".into(),
            kind: DataRefKind::Image,
        }];
        let links = link_data_refs(
            &refs,
            "data:x",
            Path::new("/p"),
            Path::new("/p"),
            &file_uuids,
            &HashMap::new(),
        );
        assert!(links
            .relationships
            .iter()
            .any(|r| r.rel_type == RelType::ReferencesImage && r.to == "file:logo"));
    }
}
