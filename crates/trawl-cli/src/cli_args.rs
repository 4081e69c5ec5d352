use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "trawl",
    version,
    about = "Ingest code and documents into a typed property graph"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Raise the log filter to debug.
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Index a project tree into the graph store.
    Index {
        /// Project root to ingest.
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Project name; defaults to the root directory's name.
        #[arg(long)]
        name: Option<String>,

        /// Skip embedding generation.
        #[arg(long)]
        no_embeddings: bool,
    },

    /// Index, then watch for changes and re-ingest incrementally.
    Watch {
        /// Project root to watch.
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Project name; defaults to the root directory's name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Print graph store statistics.
    Stats {
        /// Project root holding the `.trawl` directory.
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Generate shell completions.
    Completion {
        /// Shell to generate for.
        shell: clap_complete::Shell,
    },
}

/// Derive the `project:<name>` id for a root directory.
pub fn project_id_for(path: &std::path::Path, name: &Option<String>) -> String {
    let name = name.clone().unwrap_or_else(|| {
        path.canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .unwrap_or_else(|| "project".to_string())
    });
    format!("project:{name}")
}
