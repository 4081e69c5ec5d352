pub mod completion;
pub mod index;
pub mod stats;
pub mod watch;

use std::path::Path;
use std::sync::{Arc, Mutex};

use trawl_core::config::TrawlConfig;
use trawl_core::sqlite::SqliteGraphStore;
use trawl_core::store::GraphStore;

pub type CliResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Open (or create) the project's graph store at `.trawl/graph.db`.
pub fn open_store(root: &Path) -> CliResult<Arc<Mutex<dyn GraphStore>>> {
    let dotdir = root.join(".trawl");
    std::fs::create_dir_all(&dotdir)?;
    let db_path = dotdir.join("graph.db");
    let store = SqliteGraphStore::open(&db_path.to_string_lossy())?;
    Ok(Arc::new(Mutex::new(store)))
}

/// Load the project config, honoring the `--verbose` override.
pub fn load_config(root: &Path, verbose: bool) -> TrawlConfig {
    let mut config = TrawlConfig::load_or_default(root);
    if verbose {
        config.verbose = true;
    }
    config
}
