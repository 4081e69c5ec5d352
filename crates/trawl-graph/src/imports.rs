//! Module specifier resolution and re-export chasing.
//!
//! Relative specifiers resolve against the importing file's directory; bare
//! specifiers consult the tsconfig path-alias table; everything else is an
//! external module. A resolved path is probed through a fixed candidate ladder
//! (extension swap, as-is, appended extensions, index files) and the first
//! existing file wins.

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

/// Barrel chains longer than this stop at the last visited file.
const MAX_REEXPORT_HOPS: usize = 10;

fn star_reexport_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"export\s+\*\s+from\s+['"]([^'"]+)['"]"#).expect("star re-export regex")
    })
}

fn named_reexport_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"export\s+\{([^}]*)\}\s+from\s+['"]([^'"]+)['"]"#)
            .expect("named re-export regex")
    })
}

pub struct ImportResolver {
    base_url: PathBuf,
    /// Alias prefix (sans `/*`) → substitution targets (sans `/*`), in
    /// declaration order. First match wins.
    aliases: Vec<(String, Vec<String>)>,
}

impl ImportResolver {
    pub fn new(project_root: &Path) -> Self {
        let mut resolver = ImportResolver {
            base_url: project_root.to_path_buf(),
            aliases: Vec::new(),
        };
        resolver.load_tsconfig_paths(project_root);
        resolver
    }

    /// Loads tsconfig.json path aliases (`compilerOptions.paths` against
    /// `baseUrl`) from the project root.
    fn load_tsconfig_paths(&mut self, project_root: &Path) {
        let tsconfig_path = project_root.join("tsconfig.json");
        let content = match std::fs::read_to_string(&tsconfig_path) {
            Ok(c) => c,
            Err(_) => return,
        };
        let json: serde_json::Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(_) => return,
        };

        if let Some(base_url) = json
            .pointer("/compilerOptions/baseUrl")
            .and_then(|b| b.as_str())
        {
            self.base_url = project_root.join(base_url);
        }

        if let Some(paths) = json
            .pointer("/compilerOptions/paths")
            .and_then(|p| p.as_object())
        {
            for (alias, targets) in paths {
                let clean_alias = alias.trim_end_matches("/*").to_string();
                let clean_targets: Vec<String> = targets
                    .as_array()
                    .map(|a| {
                        a.iter()
                            .filter_map(|t| t.as_str())
                            .map(|t| t.trim_end_matches("/*").to_string())
                            .collect()
                    })
                    .unwrap_or_default();
                if !clean_targets.is_empty() {
                    self.aliases.push((clean_alias, clean_targets));
                }
            }
        }
    }

    /// Register an alias programmatically (tests, non-tsconfig projects).
    pub fn add_alias(&mut self, pattern: &str, targets: &[&str]) {
        self.aliases.push((
            pattern.trim_end_matches("/*").to_string(),
            targets
                .iter()
                .map(|t| t.trim_end_matches("/*").to_string())
                .collect(),
        ));
    }

    /// Resolve a module specifier from `current_file` to the absolute path of
    /// a definition file. `None` means external module.
    pub fn resolve(&self, specifier: &str, current_file: &Path) -> Option<PathBuf> {
        if specifier.starts_with('.') || specifier.starts_with('/') {
            let dir = current_file.parent().unwrap_or(Path::new("."));
            let joined = if specifier.starts_with('/') {
                PathBuf::from(specifier)
            } else {
                dir.join(specifier)
            };
            return self.probe_candidates(&normalize(&joined), specifier);
        }

        // Path alias table
        for (alias, targets) in &self.aliases {
            let matches = specifier == alias
                || specifier.starts_with(&format!("{alias}/"));
            if !matches {
                continue;
            }
            let suffix = specifier.strip_prefix(alias.as_str()).unwrap_or("");
            let suffix = suffix.trim_start_matches('/');
            for target in targets {
                let substituted = if suffix.is_empty() {
                    self.base_url.join(target)
                } else {
                    self.base_url.join(target).join(suffix)
                };
                if let Some(found) = self.probe_candidates(&normalize(&substituted), specifier) {
                    return Some(found);
                }
            }
            return None;
        }

        None
    }

    /// The candidate ladder. Order is contract.
    fn probe_candidates(&self, resolved: &Path, specifier: &str) -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = Vec::new();

        // 1. Extension swap: .js → .ts, .jsx → .tsx
        let spec_ext = Path::new(specifier).extension().and_then(|e| e.to_str());
        match spec_ext {
            Some("js") => candidates.push(resolved.with_extension("ts")),
            Some("jsx") => candidates.push(resolved.with_extension("tsx")),
            _ => {}
        }

        // 2. As-is
        candidates.push(resolved.to_path_buf());

        // 3–4. Appended extensions
        candidates.push(append_extension(resolved, "ts"));
        candidates.push(append_extension(resolved, "tsx"));

        // 5–6. Index expansion
        candidates.push(resolved.join("index.ts"));
        candidates.push(resolved.join("index.tsx"));

        // 7. `.js` inputs also try `<basename>/index.ts`
        if spec_ext == Some("js") {
            candidates.push(resolved.with_extension("").join("index.ts"));
        }

        candidates.into_iter().find(|c| c.is_file())
    }

    /// Follow `export * from` / `export { a, b as c } from` chains from
    /// `file` until `symbol`'s defining file is reached. Returns the defining
    /// file together with the symbol's name there (re-exports may rename).
    /// Bounded at [`MAX_REEXPORT_HOPS`]; cycles and over-long chains return
    /// the last visited file.
    pub fn chase_reexports(&self, file: &Path, symbol: &str) -> (PathBuf, String) {
        let mut current = file.to_path_buf();
        let mut visited: HashSet<PathBuf> = HashSet::new();
        visited.insert(current.clone());
        let mut symbol = symbol.to_string();

        for _ in 0..MAX_REEXPORT_HOPS {
            let Ok(text) = std::fs::read_to_string(&current) else {
                return (current, symbol);
            };
            let Some((inner_specifier, inner_symbol)) = find_reexport(&text, &symbol) else {
                return (current, symbol);
            };
            let Some(next) = self.resolve(&inner_specifier, &current) else {
                return (current, symbol);
            };
            if !visited.insert(next.clone()) {
                return (current, symbol);
            }
            current = next;
            symbol = inner_symbol;
        }
        (current, symbol)
    }
}

/// Scan a file's text for a re-export matching `symbol`. Returns the inner
/// specifier and the symbol's name on the other side of the re-export.
/// Ambiguous multi-source re-exports pick the first match in statement order.
fn find_reexport(text: &str, symbol: &str) -> Option<(String, String)> {
    struct Found {
        offset: usize,
        specifier: String,
        inner_symbol: String,
    }
    let mut best: Option<Found> = None;

    for caps in named_reexport_re().captures_iter(text) {
        let offset = caps.get(0).unwrap().start();
        let names = &caps[1];
        let specifier = caps[2].to_string();
        for item in names.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (original, exported) = match item.split_once(" as ") {
                Some((orig, alias)) => (orig.trim(), alias.trim()),
                None => (item, item),
            };
            if exported == symbol && best.as_ref().map_or(true, |b| offset < b.offset) {
                best = Some(Found {
                    offset,
                    specifier: specifier.clone(),
                    inner_symbol: original.to_string(),
                });
            }
        }
    }

    for caps in star_reexport_re().captures_iter(text) {
        let offset = caps.get(0).unwrap().start();
        if best.as_ref().map_or(true, |b| offset < b.offset) {
            best = Some(Found {
                offset,
                specifier: caps[1].to_string(),
                inner_symbol: symbol.to_string(),
            });
        }
    }

    best.map(|f| (f.specifier, f.inner_symbol))
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

/// Collapse `.` and `..` components without touching the filesystem.
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
