//! Incremental re-ingestion for trawl.
//!
//! - [`queue`] — debounced, coalescing change queue
//! - [`preserve`] — embedding/UUID capture and restore around deletions
//! - [`orphans`] — bookkeeping for files outside any registered project
//! - [`orchestrator`] — the capture → delete → parse → ingest → restore →
//!   re-embed state machine
//! - [`watcher`] — notify bridge with pause/resume semantics

pub mod orchestrator;
pub mod orphans;
pub mod preserve;
pub mod queue;
pub mod watcher;

pub use orchestrator::{IngestOptions, IngestPhase, IngestionStats, Orchestrator};
pub use orphans::OrphanTracker;
pub use preserve::{CapturedMetadata, MetadataPreserver};
pub use queue::{ChangeQueue, ChangeType, FileChange};
pub use watcher::ProjectWatcher;
