//! Core contract between a polled AES device and the job store that feeds it.
//!
//! Why: the device is slow, polled, and sometimes wrong. Keep the pieces that
//! judge it small and predictable.
//! - The store hands out one job at a time and never retries on its own.
//! - Device replies are normalized, then compared byte-for-byte against a
//!   software reference. Mismatches are answers, not faults.
//! - The worker drives polling and reporting; storage policy stays behind the
//!   [`backend`] traits.
pub mod backend;
pub mod job;
pub mod normalize;
pub mod reference;
pub mod request;
pub mod text;
pub mod timing;
pub mod utils;
pub mod worker;

#[cfg(feature = "rt-tokio")]
mod tokio_spawner;
#[cfg(feature = "rt-tokio")]
pub use tokio_spawner::TokioSpawner;

pub use backend::{BackEndDriver, JobSource, Lease, LeaseContext};
pub use job::{Block, Completion, Direction, GroupId, Job, JobId, JobState, RoundtripLink};
pub use normalize::{CanonicalHex, normalize_response};
pub use reference::CipherError;
pub use request::{BlockRequest, RequestError};
pub use timing::{TimingEstimate, TimingModel};
pub use worker::{Worker, WorkerBuilder};

#[derive(Debug, Clone, PartialEq, Eq)]
/// What a device handler observed for one job.
///
/// Why: a device either says something or says nothing. Garbage still counts
/// as saying something; the store decides whether it was right.
/// - `Report`: raw payload exactly as the device produced it.
/// - `Silent`: no answer; the job stays assigned until superseded.
pub enum DeviceResponse {
    /// Hand this raw payload back to the store.
    Report(String),
    /// Leave the job unanswered.
    Silent,
}

/// An async function that takes one claimed job to the device and back.
///
/// `M` only disambiguates the blanket impls below; pick the extractors you
/// need in the function signature and the matching impl is inferred:
///
/// ```ignore
/// async fn device(JobData(job): JobData<Job>, WorkerContext(port): WorkerContext<Port>) -> DeviceResponse
/// ```
pub trait JobHandler<M>: Send + Sync + Clone + 'static {
    type Data: Send + 'static;
    type Context: Send + 'static;
    type Future: Future<Output = DeviceResponse> + Send;

    fn call(self, data: Self::Data, context: Self::Context) -> Self::Future;
}

/// Extractor for the claimed job.
pub struct JobData<T>(pub T);

/// Extractor for the worker's shared context, cloned once per job.
pub struct WorkerContext<S>(pub S);

impl<F, Fut> JobHandler<()> for F
where
    F: FnOnce() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = DeviceResponse> + Send,
{
    type Data = ();
    type Context = ();
    type Future = Fut;

    fn call(self, _data: Self::Data, _context: Self::Context) -> Self::Future {
        self()
    }
}

impl<F, Fut, T> JobHandler<JobData<T>> for F
where
    T: Send + 'static,
    F: FnOnce(JobData<T>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = DeviceResponse> + Send,
{
    type Data = T;
    type Context = ();
    type Future = Fut;

    fn call(self, data: Self::Data, _context: Self::Context) -> Self::Future {
        self(JobData(data))
    }
}

impl<F, Fut, S> JobHandler<WorkerContext<S>> for F
where
    S: Send + 'static,
    F: FnOnce(WorkerContext<S>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = DeviceResponse> + Send,
{
    type Data = ();
    type Context = S;
    type Future = Fut;

    fn call(self, _data: Self::Data, context: Self::Context) -> Self::Future {
        self(WorkerContext(context))
    }
}

impl<F, Fut, T, S> JobHandler<(JobData<T>, WorkerContext<S>)> for F
where
    T: Send + 'static,
    S: Send + 'static,
    F: FnOnce(JobData<T>, WorkerContext<S>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = DeviceResponse> + Send,
{
    type Data = T;
    type Context = S;
    type Future = Fut;

    fn call(self, data: Self::Data, context: Self::Context) -> Self::Future {
        self(JobData(data), WorkerContext(context))
    }
}
