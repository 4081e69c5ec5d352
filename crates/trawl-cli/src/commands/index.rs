use std::path::Path;

use trawl_ingest::orchestrator::{IngestOptions, Orchestrator};
use trawl_ingest::watcher::initial_scan;

use super::{load_config, open_store, CliResult};
use crate::cli_args::project_id_for;

pub fn run(
    path: &Path,
    name: &Option<String>,
    no_embeddings: bool,
    verbose: bool,
) -> CliResult<()> {
    let root = path.canonicalize()?;
    let config = load_config(&root, verbose);
    let store = open_store(&root)?;
    let project_id = project_id_for(&root, name);

    let orchestrator = Orchestrator::new(store, config, None);
    let changes = initial_scan(&root, &project_id);
    tracing::info!("indexing {} files under {}", changes.len(), root.display());

    let options = IngestOptions {
        generate_embeddings: !no_embeddings,
        transform_graph: None,
    };
    let stats = orchestrator.reingest(&changes, &options);

    println!(
        "indexed {} files: {} nodes, {} created, {} updated, {} unchanged, {} deleted ({}ms)",
        changes.len(),
        stats.nodes_created,
        stats.created,
        stats.updated,
        stats.unchanged,
        stats.deleted,
        stats.duration_ms,
    );
    for warning in &stats.warnings {
        eprintln!("warning: {warning}");
    }
    if !stats.ok() {
        for error in &stats.errors {
            eprintln!("error: {error}");
        }
        return Err("ingestion failed".into());
    }
    Ok(())
}
