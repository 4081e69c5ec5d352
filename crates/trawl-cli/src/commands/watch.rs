use std::path::Path;
use std::sync::Arc;

use trawl_ingest::orchestrator::{IngestOptions, Orchestrator};
use trawl_ingest::queue::ChangeQueue;
use trawl_ingest::watcher::{initial_scan, ProjectWatcher};

use super::{load_config, open_store, CliResult};
use crate::cli_args::project_id_for;

pub async fn run(path: &Path, name: &Option<String>, verbose: bool) -> CliResult<()> {
    let root = path.canonicalize()?;
    let config = load_config(&root, verbose);
    let store = open_store(&root)?;
    let project_id = project_id_for(&root, name);

    let orchestrator = Arc::new(Orchestrator::new(store, config.clone(), None));
    let options = IngestOptions::default();

    // Full pass first, then incremental batches from the watcher.
    let changes = initial_scan(&root, &project_id);
    let stats = orchestrator.reingest(&changes, &options);
    println!(
        "initial index: {} nodes from {} files ({}ms)",
        stats.nodes_created,
        changes.len(),
        stats.duration_ms
    );

    let (queue, mut batches) = ChangeQueue::new(&config);
    let queue = Arc::new(queue);
    let _watcher = ProjectWatcher::start(&root, project_id.clone(), Arc::clone(&queue))?;
    println!("watching {} — ctrl-c to stop", root.display());

    loop {
        tokio::select! {
            batch = batches.recv() => {
                let Some(batch) = batch else { break };
                let orchestrator = Arc::clone(&orchestrator);
                // Batches arrive one at a time; a batch landing mid-ingest
                // waits in the channel instead of interleaving.
                let stats = tokio::task::spawn_blocking(move || {
                    orchestrator.reingest(&batch, &IngestOptions::default())
                })
                .await?;
                println!(
                    "re-ingested: {} created, {} updated, {} unchanged, {} deleted ({}ms)",
                    stats.created, stats.updated, stats.unchanged, stats.deleted, stats.duration_ms
                );
                for error in &stats.errors {
                    eprintln!("error: {error}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                let leftover = queue.flush_now();
                if !leftover.is_empty() {
                    let orchestrator = Arc::clone(&orchestrator);
                    tokio::task::spawn_blocking(move || {
                        orchestrator.reingest(&leftover, &IngestOptions::default())
                    })
                    .await?;
                }
                break;
            }
        }
    }
    Ok(())
}
