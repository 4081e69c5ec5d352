//! Filesystem watcher bridging `notify` events into the change queue.
//!
//! `pause()`/`resume()` drop events rather than queueing them, so edits the
//! hosting agent makes programmatically do not trigger a second ingestion
//! path. `with_pause` wraps such an edit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::queue::{ChangeQueue, ChangeType, FileChange};

/// Directories that never produce ingestion events.
const IGNORED_DIRS: &[&str] = &[
    ".trawl",
    ".git",
    "node_modules",
    "__pycache__",
    "target",
    "dist",
    "build",
    ".next",
    ".venv",
];

pub struct ProjectWatcher {
    _watcher: RecommendedWatcher,
    queue: Arc<ChangeQueue>,
}

impl ProjectWatcher {
    /// Watch `root` recursively, offering filtered events to `queue` under
    /// `project_id`.
    pub fn start(
        root: &Path,
        project_id: String,
        queue: Arc<ChangeQueue>,
    ) -> Result<Self, notify::Error> {
        let root = root.to_path_buf();
        let event_queue = Arc::clone(&queue);
        let root_clone = root.clone();

        let mut watcher =
            notify::recommended_watcher(move |result: Result<Event, notify::Error>| {
                let Ok(event) = result else { return };
                let Some(change_type) = change_type_of(&event.kind) else {
                    return;
                };
                for path in event.paths {
                    if !should_watch(&root_clone, &path) {
                        continue;
                    }
                    event_queue.offer(
                        FileChange::new(path.to_string_lossy().to_string(), change_type)
                            .for_project(project_id.clone()),
                    );
                }
            })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        Ok(ProjectWatcher {
            _watcher: watcher,
            queue,
        })
    }

    /// Stop feeding events into the queue. Events seen while paused are lost
    /// on purpose.
    pub fn pause(&self) {
        self.queue.pause();
    }

    pub fn resume(&self) {
        self.queue.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.queue.is_paused()
    }

    /// Run `f` with the watcher paused, resuming afterwards even on panic.
    pub fn with_pause<T>(&self, f: impl FnOnce() -> T) -> T {
        self.pause();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));
        self.resume();
        match result {
            Ok(value) => value,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

fn change_type_of(kind: &EventKind) -> Option<ChangeType> {
    match kind {
        EventKind::Create(_) => Some(ChangeType::Created),
        EventKind::Modify(_) => Some(ChangeType::Updated),
        EventKind::Remove(_) => Some(ChangeType::Deleted),
        _ => None,
    }
}

/// Check if a path should produce an ingestion event.
fn should_watch(root: &Path, path: &Path) -> bool {
    if path.file_name().is_none() {
        return false;
    }
    if let Ok(rel) = path.strip_prefix(root) {
        for component in rel.components() {
            if let std::path::Component::Normal(name) = component {
                if let Some(name_str) = name.to_str() {
                    if IGNORED_DIRS.contains(&name_str) {
                        return false;
                    }
                }
            }
        }
    }
    true
}

/// Convenience for tests and the CLI: all files under `root` as a created
/// batch.
pub fn initial_scan(root: &Path, project_id: &str) -> Vec<FileChange> {
    trawl_parsers::walker::FileWalker::new(root)
        .walk()
        .into_iter()
        .map(|entry| {
            FileChange::new(
                entry.path.to_string_lossy().to_string(),
                ChangeType::Created,
            )
            .for_project(project_id.to_string())
        })
        .collect()
}
