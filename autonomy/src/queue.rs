//! Per-actor serialization of mission work.
//!
//! Each actor key owns a chain: a new operation waits for the previous one on
//! the same key to finish, whatever its outcome, and then runs. Different keys
//! never wait on each other.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

/// Resolves once the most recently enqueued operation for a key is done.
type Tail = Shared<BoxFuture<'static, ()>>;

type Chains = Arc<Mutex<HashMap<String, (u64, Tail)>>>;

#[derive(Default)]
pub struct ActorQueue {
    chains: Chains,
    next_seq: AtomicU64,
}

impl std::fmt::Debug for ActorQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorQueue")
            .field("active_keys", &self.active_keys())
            .finish_non_exhaustive()
    }
}

impl ActorQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `task` to `key`'s chain and return a handle to its output.
    ///
    /// The task starts only after every earlier task for `key` has finished,
    /// including ones that failed or panicked.
    pub fn enqueue<F, Fut, T>(&self, key: &str, task: F) -> JoinHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel::<()>();
        let tail: Tail = done_rx.map(|_| ()).boxed().shared();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let previous = self
            .chains
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), (seq, tail))
            .map(|(_, tail)| tail);
        debug!(key, seq, waits = previous.is_some(), "operation queued");

        let link = Link {
            chains: self.chains.clone(),
            key: key.to_string(),
            seq,
            done: Some(done_tx),
        };
        tokio::spawn(async move {
            // Dropped on every exit path, panics included, which releases the
            // next operation in the chain.
            let _link = link;
            if let Some(previous) = previous {
                previous.await;
            }
            task().await
        })
    }

    /// Number of keys with queued or running work.
    pub fn active_keys(&self) -> usize {
        self.chains.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// One position in a key's chain.
struct Link {
    chains: Chains,
    key: String,
    seq: u64,
    done: Option<oneshot::Sender<()>>,
}

impl Drop for Link {
    fn drop(&mut self) {
        let mut chains = self.chains.lock().unwrap_or_else(|e| e.into_inner());
        if chains.get(&self.key).is_some_and(|(seq, _)| *seq == self.seq) {
            chains.remove(&self.key);
        }
        drop(chains);
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
    }
}
