//! The change queue: coalesces file events into batches with debouncing.
//!
//! Events for the same `(path, project)` pair within one batch window collapse
//! into a single change — the latest event wins, so `deleted` dominates only
//! when it is the last thing that happened. Batches flush on size or on the
//! debounce timer, whichever comes first. While paused, events are dropped
//! outright — host-mediated edits must not trigger a second ingestion path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use trawl_core::config::TrawlConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Created,
    Updated,
    Deleted,
}

/// A single file event offered to the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    /// Absolute path of the affected file.
    pub path: String,
    pub change_type: ChangeType,
    /// `project:<name>`; `None` routes the file to the orphan project.
    pub project_id: Option<String>,
}

impl FileChange {
    pub fn new(path: impl Into<String>, change_type: ChangeType) -> Self {
        FileChange {
            path: path.into(),
            change_type,
            project_id: None,
        }
    }

    pub fn for_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }
}

pub struct ChangeQueue {
    pending: Arc<Mutex<Vec<FileChange>>>,
    paused: Arc<AtomicBool>,
    batch_tx: mpsc::UnboundedSender<Vec<FileChange>>,
    max_batch_size: usize,
}

impl ChangeQueue {
    /// Create a queue and the receiver its batches arrive on. The debounce
    /// timer task stops when the queue is dropped.
    pub fn new(config: &TrawlConfig) -> (Self, mpsc::UnboundedReceiver<Vec<FileChange>>) {
        let (batch_tx, batch_rx) = mpsc::unbounded_channel();
        let pending: Arc<Mutex<Vec<FileChange>>> = Arc::new(Mutex::new(Vec::new()));

        let weak: Weak<Mutex<Vec<FileChange>>> = Arc::downgrade(&pending);
        let timer_tx = batch_tx.clone();
        let interval = Duration::from_millis(config.batch_interval_ms.max(1));
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(pending) = weak.upgrade() else {
                    break;
                };
                let batch = {
                    let mut guard = pending.lock().unwrap();
                    std::mem::take(&mut *guard)
                };
                if !batch.is_empty() && timer_tx.send(batch).is_err() {
                    break;
                }
            }
        });

        let queue = ChangeQueue {
            pending,
            paused: Arc::new(AtomicBool::new(false)),
            batch_tx,
            max_batch_size: config.max_batch_size.max(1),
        };
        (queue, batch_rx)
    }

    /// Offer one event. Dropped while paused; otherwise coalesced and flushed
    /// when the batch reaches `max_batch_size`.
    pub fn offer(&self, change: FileChange) {
        if self.paused.load(Ordering::SeqCst) {
            return;
        }
        let batch = {
            let mut pending = self.pending.lock().unwrap();
            coalesce(&mut pending, change);
            if pending.len() >= self.max_batch_size {
                Some(std::mem::take(&mut *pending))
            } else {
                None
            }
        };
        if let Some(batch) = batch {
            let _ = self.batch_tx.send(batch);
        }
    }

    /// Drain the pending set synchronously, bypassing the timer.
    pub fn flush_now(&self) -> Vec<FileChange> {
        let mut pending = self.pending.lock().unwrap();
        std::mem::take(&mut *pending)
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

/// Merge `change` into the pending set: one entry per `(path, project)`, the
/// latest event wins. A file deleted and recreated within one window must
/// re-ingest, so an earlier `deleted` does not stick.
fn coalesce(pending: &mut Vec<FileChange>, change: FileChange) {
    let existing = pending
        .iter_mut()
        .find(|c| c.path == change.path && c.project_id == change.project_id);
    match existing {
        Some(existing) => existing.change_type = change.change_type,
        None => pending.push(change),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(interval_ms: u64, max_batch: usize) -> TrawlConfig {
        TrawlConfig {
            batch_interval_ms: interval_ms,
            max_batch_size: max_batch,
            ..TrawlConfig::default()
        }
    }

    #[tokio::test]
    async fn test_coalesce_created_then_deleted() {
        let (queue, _rx) = ChangeQueue::new(&config(10_000, 100));
        queue.offer(FileChange::new("/p/a.ts", ChangeType::Created));
        queue.offer(FileChange::new("/p/a.ts", ChangeType::Deleted));

        let batch = queue.flush_now();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].change_type, ChangeType::Deleted);
    }

    #[tokio::test]
    async fn test_coalesce_keeps_latest() {
        let (queue, _rx) = ChangeQueue::new(&config(10_000, 100));
        queue.offer(FileChange::new("/p/a.ts", ChangeType::Created));
        queue.offer(FileChange::new("/p/a.ts", ChangeType::Updated));

        let batch = queue.flush_now();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].change_type, ChangeType::Updated);
    }

    #[tokio::test]
    async fn test_deleted_then_created_keeps_created() {
        let (queue, _rx) = ChangeQueue::new(&config(10_000, 100));
        queue.offer(FileChange::new("/p/a.ts", ChangeType::Deleted));
        queue.offer(FileChange::new("/p/a.ts", ChangeType::Created));

        // The latest event is not deleted, so the recreated file re-ingests
        let batch = queue.flush_now();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].change_type, ChangeType::Created);
    }

    #[tokio::test]
    async fn test_distinct_projects_do_not_coalesce() {
        let (queue, _rx) = ChangeQueue::new(&config(10_000, 100));
        queue.offer(FileChange::new("/p/a.ts", ChangeType::Updated).for_project("project:one"));
        queue.offer(FileChange::new("/p/a.ts", ChangeType::Updated).for_project("project:two"));
        assert_eq!(queue.flush_now().len(), 2);
    }

    #[tokio::test]
    async fn test_size_flush() {
        let (queue, mut rx) = ChangeQueue::new(&config(10_000, 3));
        for i in 0..3 {
            queue.offer(FileChange::new(format!("/p/f{i}.ts"), ChangeType::Updated));
        }
        let batch = rx.recv().await.unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(queue.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_timer_flush() {
        let (queue, mut rx) = ChangeQueue::new(&config(20, 100));
        queue.offer(FileChange::new("/p/a.ts", ChangeType::Updated));
        let batch = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timer should flush")
            .unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn test_paused_drops_events() {
        let (queue, _rx) = ChangeQueue::new(&config(10_000, 100));
        queue.pause();
        queue.offer(FileChange::new("/p/a.ts", ChangeType::Updated));
        assert_eq!(queue.pending_len(), 0);

        queue.resume();
        queue.offer(FileChange::new("/p/b.ts", ChangeType::Updated));
        assert_eq!(queue.pending_len(), 1);
    }
}
