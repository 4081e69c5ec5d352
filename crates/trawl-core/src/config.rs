//! Configuration file loading for trawl.
//!
//! Reads `.trawl/trawl.json` and provides typed access to all settings.
//! Falls back to sensible defaults when the config file is missing or incomplete.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level trawl configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrawlConfig {
    /// Queue debounce window in milliseconds.
    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,
    /// Queue flush threshold.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Cap on ad-hoc tracked files outside any registered project.
    #[serde(default = "default_max_orphan_files")]
    pub max_orphan_files: usize,
    /// Eviction horizon for orphan bookkeeping, in days.
    #[serde(default = "default_orphan_retention_days")]
    pub orphan_retention_days: u64,
    #[serde(default)]
    pub verbose: bool,
    /// Bounded concurrency for the parser phase.
    #[serde(default = "default_parse_concurrency")]
    pub parse_concurrency: usize,
    #[serde(default)]
    pub markdown: MarkdownOptions,
    #[serde(default)]
    pub document: DocumentOptions,
    #[serde(default)]
    pub media: MediaOptions,
}

/// Markdown parser options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkdownOptions {
    #[serde(default = "default_true")]
    pub parse_code_blocks: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self { parse_code_blocks: true }
    }
}

/// Document parser options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentOptions {
    #[serde(default = "default_true")]
    pub extract_text: bool,
    #[serde(default)]
    pub use_ocr: bool,
    #[serde(default = "default_max_ocr_pages")]
    pub max_ocr_pages: u32,
    #[serde(default)]
    pub extract_images: bool,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            extract_text: true,
            use_ocr: false,
            max_ocr_pages: default_max_ocr_pages(),
            extract_images: false,
        }
    }
}

/// Media parser options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaOptions {
    #[serde(default = "default_true")]
    pub extract_dimensions: bool,
    #[serde(default = "default_true")]
    pub parse_gltf_metadata: bool,
}

impl Default for MediaOptions {
    fn default() -> Self {
        Self {
            extract_dimensions: true,
            parse_gltf_metadata: true,
        }
    }
}

impl Default for TrawlConfig {
    fn default() -> Self {
        Self {
            batch_interval_ms: default_batch_interval_ms(),
            max_batch_size: default_max_batch_size(),
            max_orphan_files: default_max_orphan_files(),
            orphan_retention_days: default_orphan_retention_days(),
            verbose: false,
            parse_concurrency: default_parse_concurrency(),
            markdown: MarkdownOptions::default(),
            document: DocumentOptions::default(),
            media: MediaOptions::default(),
        }
    }
}

impl TrawlConfig {
    /// Load configuration from `<root>/.trawl/trawl.json`, falling back to
    /// defaults when the file is missing or malformed.
    pub fn load_or_default(root: &Path) -> Self {
        let path = root.join(".trawl").join("trawl.json");
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("invalid config at {}: {e}; using defaults", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

fn default_batch_interval_ms() -> u64 {
    1000
}
fn default_max_batch_size() -> usize {
    100
}
fn default_max_orphan_files() -> usize {
    100
}
fn default_orphan_retention_days() -> u64 {
    7
}
fn default_parse_concurrency() -> usize {
    10
}
fn default_max_ocr_pages() -> u32 {
    10
}
fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrawlConfig::default();
        assert_eq!(config.batch_interval_ms, 1000);
        assert_eq!(config.max_batch_size, 100);
        assert_eq!(config.max_orphan_files, 100);
        assert_eq!(config.orphan_retention_days, 7);
        assert_eq!(config.parse_concurrency, 10);
        assert!(!config.verbose);
        assert!(config.markdown.parse_code_blocks);
        assert!(config.media.extract_dimensions);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: TrawlConfig =
            serde_json::from_str(r#"{"max_batch_size": 25, "verbose": true}"#).unwrap();
        assert_eq!(config.max_batch_size, 25);
        assert!(config.verbose);
        assert_eq!(config.batch_interval_ms, 1000);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrawlConfig::load_or_default(dir.path());
        assert_eq!(config, TrawlConfig::default());
    }

    #[test]
    fn test_load_from_dotdir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".trawl")).unwrap();
        std::fs::write(
            dir.path().join(".trawl/trawl.json"),
            r#"{"batch_interval_ms": 50}"#,
        )
        .unwrap();
        let config = TrawlConfig::load_or_default(dir.path());
        assert_eq!(config.batch_interval_ms, 50);
    }
}
