//! Hand AES jobs to a polled device one at a time and check its answers.
//!
//! Re-exports the core contract and, with the default `memory` feature, the
//! in-process [`Bridge`].
pub use aesbridge_core::{
    BlockRequest, CanonicalHex, Completion, DeviceResponse, Direction, GroupId, Job, JobData,
    JobId, JobState, TimingEstimate, TimingModel, Worker, WorkerBuilder, WorkerContext,
};
pub use aesbridge_core::{backend, job, normalize, reference, request, text, timing, worker};

#[cfg(feature = "rt-tokio")]
pub use aesbridge_core::TokioSpawner;

#[cfg(feature = "memory")]
pub use aesbridge_memory::{
    Bridge, BridgeConfig, ConfigError, JobSnapshot, Lane, LaneLease, LegSnapshot,
    RoundtripSnapshot, RoundtripStatus, RoundtripTicket, StoreError,
};
