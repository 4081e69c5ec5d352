use std::path::Path;

use trawl_core::sqlite::SqliteGraphStore;

use super::CliResult;

pub fn run(path: &Path) -> CliResult<()> {
    let root = path.canonicalize()?;
    let db_path = root.join(".trawl").join("graph.db");
    if !db_path.exists() {
        return Err(format!("no graph store at {}", db_path.display()).into());
    }
    let store = SqliteGraphStore::open(&db_path.to_string_lossy())?;
    println!("nodes:  {}", store.node_count()?);
    println!("edges:  {}", store.edge_count()?);
    println!("schema: v{}", store.schema_version()?);
    Ok(())
}
