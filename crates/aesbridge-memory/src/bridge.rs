//! Shared handle over both lanes and the roundtrip coordinator.
//!
//! Every operation takes the same lock, so a leg verdict and the decrypt job
//! it chains become visible together: no reader sees an encrypt leg marked
//! done while the decrypt lane is still empty.
use std::sync::Arc;

use aesbridge_core::{
    BackEndDriver, Block, BlockRequest, Completion, Direction, GroupId, Job, JobId, Lease,
    TimingModel,
    backend::{JobSource, LeaseContext},
};
use parking_lot::Mutex;

use crate::{
    config::{BridgeConfig, ConfigError},
    roundtrip::{RoundtripCoordinator, RoundtripSnapshot, RoundtripTicket},
    store::{JobSnapshot, JobStore, StoreError},
};

#[derive(Debug)]
struct State {
    encrypt: JobStore,
    decrypt: JobStore,
    roundtrip: RoundtripCoordinator,
    timing: TimingModel,
}

impl State {
    fn store_mut(&mut self, direction: Direction) -> &mut JobStore {
        match direction {
            Direction::Encrypt => &mut self.encrypt,
            Direction::Decrypt => &mut self.decrypt,
        }
    }

    fn store(&self, direction: Direction) -> &JobStore {
        match direction {
            Direction::Encrypt => &self.encrypt,
            Direction::Decrypt => &self.decrypt,
        }
    }
}

/// Cloneable handle to both lanes and the active roundtrip.
#[derive(Debug, Clone)]
pub struct Bridge {
    inner: Arc<Mutex<State>>,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::with_timing(BridgeConfig::default().timing_model())
    }
}

impl Bridge {
    /// Build a bridge from `config`, refusing a zero clock or cycle count.
    pub fn new(config: BridgeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_timing(config.timing_model()))
    }

    fn with_timing(timing: TimingModel) -> Self {
        let state = State {
            encrypt: JobStore::new(Direction::Encrypt),
            decrypt: JobStore::new(Direction::Decrypt),
            roundtrip: RoundtripCoordinator::new(),
            timing,
        };
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    pub fn lane(&self, direction: Direction) -> Lane {
        Lane {
            bridge: self.clone(),
            direction,
        }
    }

    pub fn encrypt(&self) -> Lane {
        self.lane(Direction::Encrypt)
    }

    pub fn decrypt(&self) -> Lane {
        self.lane(Direction::Decrypt)
    }

    pub fn timing(&self) -> TimingModel {
        self.inner.lock().timing
    }

    /// Start a roundtrip for `block` under `key`, replacing any active one.
    pub fn start_roundtrip(&self, key: Vec<u8>, block: Block, tag: impl Into<String>) -> RoundtripTicket {
        let mut state = self.inner.lock();
        let State {
            encrypt, roundtrip, ..
        } = &mut *state;
        roundtrip.start(encrypt, key, block, tag)
    }

    pub fn start_roundtrip_request(&self, request: BlockRequest) -> RoundtripTicket {
        self.start_roundtrip(request.key, request.block, request.tag)
    }

    pub fn roundtrip_status(&self, group_id: GroupId) -> Option<RoundtripSnapshot> {
        let state = self.inner.lock();
        state.roundtrip.status_of(group_id, &state.timing)
    }

    /// Forget every job and group. Ids are not reused afterwards.
    pub fn reset(&self) {
        let mut state = self.inner.lock();
        state.encrypt.clear();
        state.decrypt.clear();
        state.roundtrip.clear();
        tracing::info!("Bridge reset");
    }
}

/// One direction of the bridge, as seen by submitters and by the device worker.
#[derive(Debug, Clone)]
pub struct Lane {
    bridge: Bridge,
    direction: Direction,
}

impl Lane {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Submit a standalone job, replacing whatever the lane held.
    pub fn create_job(&self, key: Vec<u8>, block: Vec<u8>, tag: impl Into<String>) -> Job {
        self.bridge
            .inner
            .lock()
            .store_mut(self.direction)
            .create(key, block, tag, None)
    }

    pub fn create_request(&self, request: BlockRequest) -> Job {
        self.create_job(request.key, request.block.to_vec(), request.tag)
    }

    pub fn claim_for_worker(&self) -> Option<Job> {
        self.bridge.inner.lock().store_mut(self.direction).claim_for_worker()
    }

    /// Judge the device's reply and, for roundtrip legs, advance the group
    /// before the lock is released.
    pub fn complete(&self, job_id: JobId, raw: &str) -> Result<Completion, StoreError> {
        let mut state = self.bridge.inner.lock();
        let outcome = state.store_mut(self.direction).complete(job_id, raw)?;
        if let Some(event) = outcome.event {
            let State {
                decrypt, roundtrip, ..
            } = &mut *state;
            roundtrip.on_leg_event(event, decrypt);
        }
        Ok(outcome.completion)
    }

    pub fn status_of(&self, job_id: JobId) -> Option<JobSnapshot> {
        self.bridge.inner.lock().store(self.direction).status_of(job_id)
    }
}

/// Driver marker for the in-process backend; declines surface as [`StoreError`].
pub struct MemoryDriver;

impl BackEndDriver for MemoryDriver {
    type Error = StoreError;
}

/// Authority to answer one job claimed from a [`Lane`].
pub struct LaneLease {
    lane: Lane,
    job_id: JobId,
}

impl LaneLease {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }
}

impl LeaseContext for LaneLease {
    type Driver = MemoryDriver;

    async fn report(self, raw: String) -> Result<Completion, StoreError> {
        self.lane.complete(self.job_id, &raw)
    }
}

impl JobSource for Lane {
    type Driver = MemoryDriver;
    type Data = Job;
    type Context = LaneLease;

    async fn poll_job(&mut self) -> Result<Option<Lease<Job, LaneLease>>, StoreError> {
        Ok(self.claim_for_worker().map(|job| {
            let context = LaneLease {
                lane: self.clone(),
                job_id: job.id,
            };
            Lease::from_parts(job, context)
        }))
    }
}
