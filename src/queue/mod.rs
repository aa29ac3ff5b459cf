//! `RepoQueueManager`: bounded-queue-per-repo, single-worker-per-queue
//! scheduler. Serializes [`crate::pipeline::CheckPipeline`]
//! invocations within a repo while allowing full parallelism across repos.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::model::PullRequest;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("repo queue is full for {repo_key}")]
    Full { repo_key: String },
}

/// One queued unit of work. `work` is intentionally opaque to the queue:
/// it only needs to move the closure to the worker, not inspect it.
pub struct CheckRequest {
    pub pull_request: PullRequest,
    pub enqueued_at: Instant,
    pub work: BoxedWork,
}

pub type BoxedWork = Box<dyn FnOnce(PullRequest) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

struct RepoQueue {
    sender: Mutex<Option<mpsc::Sender<CheckRequest>>>,
    capacity: usize,
    processed: Arc<AtomicU64>,
    created_at: Instant,
    worker: Mutex<Option<JoinHandle<()>>>,
    shutting_down: Arc<AtomicBool>,
    dropped: Arc<Mutex<Vec<PullRequest>>>,
}

/// Snapshot of one repo queue's state, for `GetStats`.
#[derive(Debug, Clone)]
pub struct QueueStat {
    pub repo_key: String,
    pub queued: usize,
    pub capacity: usize,
    pub processed: u64,
    pub queued_since: Instant,
}

#[derive(Debug, Clone)]
pub struct Stats {
    pub total_queues: usize,
    pub per_queue: Vec<QueueStat>,
}

/// Global `repoKey → RepoQueue` map. Each queue is lazily created on first
/// use and lives until [`RepoQueueManager::shutdown`].
pub struct RepoQueueManager {
    queues: RwLock<HashMap<String, Arc<RepoQueue>>>,
    queue_size: usize,
}

impl RepoQueueManager {
    #[must_use]
    pub fn new(queue_size: usize) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            queue_size,
        }
    }

    /// Enqueue `work` under `repo_key`, creating the queue (and its single
    /// worker task) on first use. Non-blocking: returns `QueueError::Full`
    /// immediately if the channel is saturated.
    pub async fn enqueue(&self, repo_key: String, pull_request: PullRequest, work: BoxedWork) -> Result<(), QueueError> {
        let queue = self.get_or_create(&repo_key).await;
        let request = CheckRequest {
            pull_request,
            enqueued_at: Instant::now(),
            work,
        };
        let sender = queue.sender.lock().await;
        let Some(sender) = sender.as_ref() else {
            return Err(QueueError::Full { repo_key });
        };
        sender.try_send(request).map_err(move |_| QueueError::Full { repo_key })
    }

    async fn get_or_create(&self, repo_key: &str) -> Arc<RepoQueue> {
        if let Some(q) = self.queues.read().await.get(repo_key) {
            return q.clone();
        }
        let mut queues = self.queues.write().await;
        if let Some(q) = queues.get(repo_key) {
            return q.clone();
        }
        let (tx, rx) = mpsc::channel(self.queue_size);
        let processed = Arc::new(AtomicU64::new(0));
        let shutting_down = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(Mutex::new(Vec::new()));
        let repo_key_owned = repo_key.to_string();
        let handle = tokio::spawn(worker_loop(
            repo_key_owned,
            rx,
            processed.clone(),
            shutting_down.clone(),
            dropped.clone(),
        ));
        let queue = Arc::new(RepoQueue {
            sender: Mutex::new(Some(tx)),
            capacity: self.queue_size,
            processed,
            created_at: Instant::now(),
            worker: Mutex::new(Some(handle)),
            shutting_down,
            dropped,
        });
        queues.insert(repo_key.to_string(), queue.clone());
        queue
    }

    #[must_use]
    pub async fn stats(&self) -> Stats {
        let queues = self.queues.read().await;
        let mut per_queue = Vec::with_capacity(queues.len());
        for (key, q) in queues.iter() {
            let queued = match q.sender.lock().await.as_ref() {
                Some(s) => s.max_capacity() - s.capacity(),
                None => 0,
            };
            per_queue.push(QueueStat {
                repo_key: key.clone(),
                queued,
                capacity: q.capacity,
                processed: q.processed.load(Ordering::Relaxed),
                queued_since: q.created_at,
            });
        }
        Stats {
            total_queues: queues.len(),
            per_queue,
        }
    }

    /// Stop accepting new work, let every queue's in-flight item finish,
    /// drop anything still buffered (recorded per-PR instead of run), and
    /// wait for all workers, bounded by `deadline`.
    ///
    /// Returns the deduplicated (by `full_name`/`check_id`) list of dropped
    /// PRs so the caller (`RequestEntry`/VCS layer) can post a single
    /// "request dropped, re-trigger via replan" notification per PR —
    /// posting itself is a VCS concern and stays outside the core.
    pub async fn shutdown(&self, deadline: std::time::Duration) -> Result<Vec<PullRequest>, &'static str> {
        let queues = self.queues.write().await;
        let mut handles: Vec<JoinHandle<()>> = Vec::new();
        let mut queue_refs: Vec<Arc<RepoQueue>> = Vec::new();
        for queue in queues.values() {
            queue.shutting_down.store(true, Ordering::SeqCst);
            // Drop our sender so the worker's `recv()` observes the channel
            // closed once whatever is already queued has drained.
            queue.sender.lock().await.take();
            if let Some(h) = queue.worker.lock().await.take() {
                handles.push(h);
            }
            queue_refs.push(queue.clone());
        }
        drop(queues);

        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(deadline, wait_all).await.is_err() {
            return Err("shutdown deadline exceeded");
        }

        let mut dropped = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for queue in queue_refs {
            for pr in queue.dropped.lock().await.drain(..) {
                if seen.insert(pr.dedup_key()) {
                    dropped.push(pr);
                }
            }
        }
        Ok(dropped)
    }
}

async fn worker_loop(
    repo_key: String,
    mut rx: mpsc::Receiver<CheckRequest>,
    processed: Arc<AtomicU64>,
    shutting_down: Arc<AtomicBool>,
    dropped: Arc<Mutex<Vec<PullRequest>>>,
) {
    info!(%repo_key, "repo queue worker started");
    while let Some(request) = rx.recv().await {
        if shutting_down.load(Ordering::SeqCst) {
            dropped.lock().await.push(request.pull_request);
            continue;
        }
        let pr = request.pull_request.clone();
        let full_name = pr.full_name.clone();
        let started = Instant::now();
        let result = std::panic::AssertUnwindSafe((request.work)(pr))
            .catch_unwind()
            .await;
        match result {
            Ok(()) => {
                processed.fetch_add(1, Ordering::Relaxed);
            }
            Err(panic) => {
                warn!(%repo_key, %full_name, ?panic, "check pipeline panicked, worker continues");
                processed.fetch_add(1, Ordering::Relaxed);
            }
        }
        let _ = started.elapsed();
    }
    info!(%repo_key, "repo queue worker exiting: channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn test_pr(id: i64) -> PullRequest {
        PullRequest {
            base_ref: "main".into(),
            head_ref: "feature".into(),
            default_branch: "main".into(),
            clone_url: "https://github.com/acme/infra".into(),
            full_name: "acme/infra".into(),
            owner: "acme".into(),
            name: "infra".into(),
            check_id: id,
            sha: "deadbeef".into(),
            labels: vec![],
            username: "bot".into(),
            email: "bot@example.com".into(),
            config: Default::default(),
        }
    }

    #[tokio::test]
    async fn serializes_within_repo_key_in_enqueue_order() {
        let manager = RepoQueueManager::new(10);
        let order = Arc::new(Mutex::new(Vec::<i64>::new()));
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_concurrent = Arc::new(AtomicUsize::new(0));

        for i in 0..3 {
            let order = order.clone();
            let concurrent = concurrent.clone();
            let max_concurrent = max_concurrent.clone();
            let work: BoxedWork = Box::new(move |pr: PullRequest| {
                Box::pin(async move {
                    let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                    max_concurrent.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    order.lock().await.push(pr.check_id);
                    concurrent.fetch_sub(1, Ordering::SeqCst);
                })
            });
            manager
                .enqueue("github.com/acme/infra".to_string(), test_pr(i), work)
                .await
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*order.lock().await, vec![0, 1, 2]);
        assert_eq!(max_concurrent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn queue_full_is_returned_synchronously() {
        let manager = RepoQueueManager::new(1);
        let block: BoxedWork = Box::new(|_pr| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
            })
        });
        manager
            .enqueue("github.com/acme/infra".to_string(), test_pr(0), block)
            .await
            .unwrap();
        // First item is immediately picked up by the worker, so this second
        // send fills the one-slot buffered channel...
        let filler: BoxedWork = Box::new(|_pr| Box::pin(async move {}));
        manager
            .enqueue("github.com/acme/infra".to_string(), test_pr(1), filler)
            .await
            .unwrap();
        // ...and this third send should now see the channel full.
        let rejected: BoxedWork = Box::new(|_pr| Box::pin(async move {}));
        let result = manager
            .enqueue("github.com/acme/infra".to_string(), test_pr(2), rejected)
            .await;
        assert!(matches!(result, Err(QueueError::Full { .. })));
    }
}
