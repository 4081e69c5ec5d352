use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::detect::{self, Detection, FormatCategory};

/// Directories that are never worth ingesting.
const SKIPPED_DIRS: &[&str] = &[
    ".git",
    ".trawl",
    "node_modules",
    "__pycache__",
    "target",
    "dist",
    "build",
    ".next",
    ".venv",
];

/// Ignore bookkeeping files that would only ever parse as plain text.
const SKIPPED_FILES: &[&str] = &[".gitignore", ".trawlignore", ".gitattributes"];

pub struct WalkEntry {
    pub path: PathBuf,
    pub detection: Detection,
}

pub struct FileWalker {
    root: PathBuf,
}

impl FileWalker {
    /// Creates a new file walker rooted at the given directory.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Walks the root directory and returns all ingestable files, respecting
    /// gitignore and `.trawlignore`. Dotfiles are kept — `.env` and rc-file
    /// configs are first-class ingestion targets.
    pub fn walk(&self) -> Vec<WalkEntry> {
        let mut entries = Vec::new();

        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .add_custom_ignore_filename(".trawlignore")
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    !SKIPPED_DIRS.contains(&name.as_ref())
                } else {
                    !SKIPPED_FILES.contains(&name.as_ref())
                }
            })
            .build();

        for result in walker {
            let entry = match result {
                Ok(e) => e,
                Err(_) => continue,
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.into_path();
            let detection = detect::detect(&path, None);
            entries.push(WalkEntry { path, detection });
        }

        entries
    }

    /// Walk, keeping only files whose detected category is in `categories`.
    pub fn walk_categories(&self, categories: &[FormatCategory]) -> Vec<WalkEntry> {
        self.walk()
            .into_iter()
            .filter(|e| categories.contains(&e.detection.category))
            .collect()
    }
}
