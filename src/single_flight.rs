// Single-flight coordination
// At most one instance of an operation runs at a time; concurrent callers
// await a shared handle to the same outcome instead of starting their own.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

/// A slot holding at most one pending operation.
///
/// The first caller of [`run`](SingleFlight::run) starts the operation;
/// every caller that arrives while it is pending awaits the same shared
/// future. The slot is cleared once the operation settles, whatever the
/// outcome, so a later failure wave can start a fresh attempt.
pub struct SingleFlight<T> {
    pending: Arc<Mutex<Option<Shared<BoxFuture<'static, T>>>>>,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Join the in-flight operation if one exists, otherwise start `operation`.
    pub async fn run<F, Fut>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut pending = self.pending.lock().await;
            match pending.as_ref() {
                Some(inflight) => inflight.clone(),
                None => {
                    // The slot is only written while None, so the operation
                    // can clear it unconditionally once it settles.
                    let slot = Arc::clone(&self.pending);
                    let fut = operation();
                    let shared = async move {
                        let outcome = fut.await;
                        slot.lock().await.take();
                        outcome
                    }
                    .boxed()
                    .shared();
                    *pending = Some(shared.clone());
                    shared
                }
            }
        };

        shared.await
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
