//! Run device handlers as Tokio tasks.
use futures::{FutureExt as _, future::Map};
use tokio::task::{JoinError, JoinHandle};

use crate::worker::JobSpawner;

/// Spawns each device handler onto the ambient Tokio runtime.
///
/// A handler that panics is logged and its job stays assigned; the worker
/// keeps polling.
pub struct TokioSpawner;

pub type TokioJobHandle = Map<JoinHandle<()>, fn(Result<(), JoinError>)>;

fn log_join_error(result: Result<(), JoinError>) {
    match result {
        Ok(()) => {}
        Err(error) if error.is_panic() => tracing::error!(error = %error, "Device handler panicked"),
        Err(error) => tracing::warn!(error = %error, "Device handler was cancelled"),
    }
}

impl JobSpawner for TokioSpawner {
    type JobHandle<Fut>
        = TokioJobHandle
    where
        Fut: Future<Output = ()> + Send + 'static;

    fn spawn<Fut>(fut: Fut) -> Self::JobHandle<Fut>
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(fut).map(log_join_error as fn(_))
    }
}
