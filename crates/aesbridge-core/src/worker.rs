//! Device-side polling loop.
//!
//! One worker serves one lane. On every tick it claims at most one job, runs
//! the device handler on it, and reports whatever the device said. In-flight
//! handlers are capped; a tick that arrives at the cap is skipped, not queued.
use std::marker::PhantomData;
use std::time::Duration;

use futures::{FutureExt as _, Stream, StreamExt as _, stream::FuturesUnordered};

use crate::{
    DeviceResponse, JobHandler,
    backend::{JobSource, Lease, LeaseContext},
    utils::Ticker,
};

/// How handler futures are executed (inline, Tokio, etc.).
pub trait JobSpawner {
    type JobHandle<Fut>: Future<Output = ()> + Send + 'static
    where
        Fut: Future<Output = ()> + Send + 'static;
    fn spawn<Fut>(fut: Fut) -> Self::JobHandle<Fut>
    where
        Fut: Future<Output = ()> + Send + 'static;
}

/// Runs handlers on the worker's own task. No runtime needed.
pub struct InlineSpawner;

impl JobSpawner for InlineSpawner {
    type JobHandle<Fut>
        = Fut
    where
        Fut: Future<Output = ()> + Send + 'static;
    fn spawn<Fut>(fut: Fut) -> Self::JobHandle<Fut>
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        fut
    }
}

/// Stream that wakes the worker to poll its lane.
pub trait TickStream: Stream<Item = ()> + Send {}

impl<St> TickStream for St where St: Stream<Item = ()> + Send {}

/// Shutdown signal of a worker that runs until its ticks run out.
pub type NoShutdown = std::future::Pending<()>;

pub struct Worker<Tick, Source, F, M, Sp = InlineSpawner, Signal = NoShutdown>
where
    F: JobHandler<M>,
{
    tick: Tick,
    source: Source,
    handler: F,
    context: F::Context,
    max_in_flight: usize,
    shutdown: Signal,
    marker: PhantomData<fn() -> (M, Sp)>,
}

impl<Tick, Source, F, M, Sp, Signal> Worker<Tick, Source, F, M, Sp, Signal>
where
    Tick: TickStream,
    F: JobHandler<M>,
    F::Context: Clone,
    M: 'static,
    Source: JobSource<Data = F::Data> + 'static,
    Sp: JobSpawner,
    Signal: Future<Output = ()> + Send,
{
    /// Stop claiming once `signal` resolves, then wait for in-flight handlers.
    pub fn with_graceful_shutdown<Signal2>(self, signal: Signal2) -> Worker<Tick, Source, F, M, Sp, Signal2>
    where
        Signal2: Future<Output = ()> + Send,
    {
        Worker {
            tick: self.tick,
            source: self.source,
            handler: self.handler,
            context: self.context,
            max_in_flight: self.max_in_flight,
            shutdown: signal,
            marker: PhantomData,
        }
    }

    /// Poll until the tick stream ends or shutdown is signalled.
    pub fn run(self) -> impl Future<Output = ()> + Send {
        run_worker(self)
    }
}

async fn run_worker<Tick, Source, F, M, Sp, Signal>(worker: Worker<Tick, Source, F, M, Sp, Signal>)
where
    Tick: TickStream,
    F: JobHandler<M>,
    F::Context: Clone,
    M: 'static,
    Source: JobSource<Data = F::Data> + 'static,
    Sp: JobSpawner,
    Signal: Future<Output = ()> + Send,
{
    let Worker {
        tick,
        mut source,
        handler,
        context,
        max_in_flight,
        shutdown,
        marker: _,
    } = worker;
    let tick = std::pin::pin!(tick);
    let shutdown = std::pin::pin!(shutdown);
    let mut tick = tick.fuse();
    let mut shutdown = shutdown.fuse();
    let mut in_flight = FuturesUnordered::new();

    loop {
        futures::select! {
            beat = tick.next() => match beat {
                None => break,
                Some(()) if in_flight.len() >= max_in_flight => {
                    tracing::trace!(in_flight = in_flight.len(), "At capacity; skipping tick");
                }
                Some(()) => {
                    if let Some(lease) = claim(&mut source).await {
                        let job = drive_one::<F, M, Source>(lease, handler.clone(), context.clone());
                        in_flight.push(Sp::spawn(job));
                    }
                }
            },
            _ = in_flight.next() => {},
            () = shutdown => {
                tracing::debug!(in_flight = in_flight.len(), "Shutdown requested; draining device handlers");
                break;
            }
        }
    }

    while in_flight.next().await.is_some() {}
}

async fn claim<Source>(source: &mut Source) -> Option<Lease<Source::Data, Source::Context>>
where
    Source: JobSource,
{
    match source.poll_job().await {
        Ok(lease) => lease,
        Err(error) => {
            tracing::error!(error = %error, "Failed to claim job");
            None
        }
    }
}

/// Run one job through the device, then report what it said.
async fn drive_one<F, M, Source>(
    lease: Lease<F::Data, Source::Context>,
    handler: F,
    context: F::Context,
) where
    F: JobHandler<M>,
    Source: JobSource<Data = F::Data>,
{
    let (job, lease) = lease.split_parts();
    tracing::trace!("Start device handler");
    let response = handler.call(job, context).await;
    tracing::trace!("Finish device handler");

    match response {
        DeviceResponse::Report(raw) => match LeaseContext::report(lease, raw).await {
            Ok(completion) => {
                tracing::debug!(job_id = %completion.job_id, valid = completion.valid, "Reported device output")
            }
            Err(error) => tracing::error!(error = %error, "Failed to report job"),
        },
        DeviceResponse::Silent => tracing::debug!("Device stayed silent; job left assigned"),
    }
}

/// Typestate builder for [`Worker`]: tick source first, then handler and
/// context in any order, then [`WorkerBuilder::build`] with the lane.
pub struct WorkerBuilder<Tick = (), Handler = (), M = (), Ctx = (), Sp = InlineSpawner> {
    tick: Tick,
    max_in_flight: usize,
    handler: Handler,
    context: Ctx,
    marker: PhantomData<fn() -> (M, Sp)>,
}

impl WorkerBuilder {
    /// Poll once right away, then every `interval`.
    pub fn new(interval: Duration) -> WorkerBuilder<Ticker> {
        Self::new_with_tick(Ticker::immediate(interval))
    }

    pub fn new_with_tick<Tick>(tick: Tick) -> WorkerBuilder<Tick> {
        WorkerBuilder {
            tick,
            max_in_flight: 1,
            handler: (),
            context: (),
            marker: PhantomData,
        }
    }
}

impl<Tick, Handler, M, Ctx, Sp> WorkerBuilder<Tick, Handler, M, Ctx, Sp> {
    /// Cap on handlers in flight at once; at least one.
    pub fn concurrent(mut self, concurrent: usize) -> Self {
        self.max_in_flight = concurrent.max(1);
        self
    }

    /// Choose how to spawn handlers.
    pub fn job_spawner<Sp2>(self, _spawner: Sp2) -> WorkerBuilder<Tick, Handler, M, Ctx, Sp2>
    where
        Sp2: JobSpawner,
    {
        let WorkerBuilder {
            tick,
            max_in_flight,
            handler,
            context,
            ..
        } = self;
        WorkerBuilder {
            tick,
            max_in_flight,
            handler,
            context,
            marker: PhantomData,
        }
    }
}

impl<Tick, Ctx, Sp> WorkerBuilder<Tick, (), (), Ctx, Sp> {
    pub fn handler<F, M>(self, handler: F) -> WorkerBuilder<Tick, F, M, Ctx, Sp>
    where
        F: JobHandler<M>,
    {
        let WorkerBuilder {
            tick,
            max_in_flight,
            context,
            ..
        } = self;
        WorkerBuilder {
            tick,
            max_in_flight,
            handler,
            context,
            marker: PhantomData,
        }
    }
}

impl<Tick, Handler, M, Sp> WorkerBuilder<Tick, Handler, M, (), Sp> {
    /// Shared context, cloned for each job.
    pub fn context<Ctx>(self, context: Ctx) -> WorkerBuilder<Tick, Handler, M, Ctx, Sp>
    where
        Ctx: Clone + Send,
    {
        let WorkerBuilder {
            tick,
            max_in_flight,
            handler,
            ..
        } = self;
        WorkerBuilder {
            tick,
            max_in_flight,
            handler,
            context,
            marker: PhantomData,
        }
    }
}

impl<Tick, Handler, M, Sp> WorkerBuilder<Tick, Handler, M, Handler::Context, Sp>
where
    Tick: TickStream,
    Handler: JobHandler<M>,
    Sp: JobSpawner,
{
    /// Attach the lane the worker claims from.
    pub fn build<Source>(self, source: Source) -> Worker<Tick, Source, Handler, M, Sp>
    where
        Source: JobSource<Data = Handler::Data>,
    {
        Worker {
            tick: self.tick,
            source,
            handler: self.handler,
            context: self.context,
            max_in_flight: self.max_in_flight,
            shutdown: std::future::pending(),
            marker: PhantomData,
        }
    }
}
