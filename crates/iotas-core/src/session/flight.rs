// ── Single-flight slot ──
//
// Concurrent callers share one pending future. The slot is emptied by the
// flight itself as it settles, so the next call after settlement starts
// fresh. The slot lock is never held across the shared await.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

struct Flight<T> {
    id: u64,
    future: Shared<BoxFuture<'static, T>>,
}

pub(crate) struct SingleFlight<T> {
    slot: Arc<Mutex<Option<Flight<T>>>>,
    next_id: AtomicU64,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
        }
    }

    /// Join the pending flight, or start one with `start`.
    pub(crate) async fn run<F>(&self, start: F) -> T
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let shared = {
            let mut slot = self.slot.lock().await;
            match slot.as_ref() {
                Some(flight) => flight.future.clone(),
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let work = start();
                    let owner = Arc::clone(&self.slot);
                    let future = async move {
                        let output = work.await;
                        let mut slot = owner.lock().await;
                        if slot.as_ref().is_some_and(|f| f.id == id) {
                            *slot = None;
                        }
                        output
                    }
                    .boxed()
                    .shared();
                    *slot = Some(Flight {
                        id,
                        future: future.clone(),
                    });
                    future
                }
            }
        };
        shared.await
    }
}
