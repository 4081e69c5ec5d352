//! Bookkeeping for ad-hoc tracked files outside any registered project.
//!
//! Orphans are indexed under the reserved project id and persisted in
//! `.trawl/orphans.json`. The set is capped, and entries older than the
//! retention horizon are evicted together with their subgraphs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use trawl_core::config::TrawlConfig;

const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Debug, Default, Serialize, Deserialize)]
struct OrphanFile {
    /// file path → first-seen epoch seconds.
    entries: HashMap<String, u64>,
}

pub struct OrphanTracker {
    path: PathBuf,
    state: OrphanFile,
    max_files: usize,
    retention_days: u64,
}

impl OrphanTracker {
    /// Load (or initialize) the tracker from `<root>/.trawl/orphans.json`.
    pub fn load(root: &Path, config: &TrawlConfig) -> Self {
        let path = root.join(".trawl").join("orphans.json");
        let state = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        OrphanTracker {
            path,
            state,
            max_files: config.max_orphan_files,
            retention_days: config.orphan_retention_days,
        }
    }

    /// Record an orphan file at `now`. When the cap is exceeded, the oldest
    /// entries are evicted and returned so their subgraphs can be deleted.
    pub fn track(&mut self, file: &str, now: u64) -> Vec<String> {
        self.state.entries.entry(file.to_string()).or_insert(now);

        let mut evicted = Vec::new();
        while self.state.entries.len() > self.max_files {
            let oldest = self
                .state
                .entries
                .iter()
                .min_by_key(|(_, seen)| **seen)
                .map(|(path, _)| path.clone());
            let Some(oldest) = oldest else { break };
            self.state.entries.remove(&oldest);
            evicted.push(oldest);
        }
        evicted
    }

    /// Files past the retention horizon. They are removed from the tracker
    /// and must be deleted from the graph by the caller.
    pub fn evict_expired(&mut self, now: u64) -> Vec<String> {
        let horizon = self.retention_days.saturating_mul(SECONDS_PER_DAY);
        let expired: Vec<String> = self
            .state
            .entries
            .iter()
            .filter(|(_, seen)| now.saturating_sub(**seen) > horizon)
            .map(|(path, _)| path.clone())
            .collect();
        for path in &expired {
            self.state.entries.remove(path);
        }
        expired
    }

    pub fn contains(&self, file: &str) -> bool {
        self.state.entries.contains_key(file)
    }

    pub fn len(&self) -> usize {
        self.state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.entries.is_empty()
    }

    /// Persist the tracker to disk.
    pub fn save(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.state)?;
        std::fs::write(&self.path, content)
    }
}
