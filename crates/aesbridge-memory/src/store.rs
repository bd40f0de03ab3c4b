//! Single-slot job store for one lane.
//!
//! Holds the latest job and, once answered, its verdict. Creating a job
//! discards whatever was there; a worker still holding the old id will find
//! its report declined.
use aesbridge_core::{
    CanonicalHex, Completion, Direction, GroupId, Job, JobId, JobState, RoundtripLink,
    normalize_response, reference,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
/// Why a completion report was declined.
pub enum StoreError {
    /// No current job, or the id belongs to a superseded job.
    #[error("job-not-found: {0}")]
    JobNotFound(JobId),
    /// The job already has a verdict; verdicts are immutable.
    #[error("job-already-done: {0}")]
    AlreadyCompleted(JobId),
}

impl StoreError {
    /// Stable reason string for the transport layer.
    pub fn reason(&self) -> &'static str {
        match self {
            StoreError::JobNotFound(_) => "job-not-found",
            StoreError::AlreadyCompleted(_) => "job-already-done",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Emitted when a job that belongs to a roundtrip gets its verdict.
pub struct LegEvent {
    pub group_id: GroupId,
    pub leg: Direction,
    pub job_id: JobId,
    pub output: CanonicalHex,
    pub valid: bool,
    pub expected: Option<CanonicalHex>,
}

#[derive(Debug)]
/// What `complete` produced: the verdict, plus an event for the roundtrip
/// coordinator if the job was part of a roundtrip.
pub struct Outcome {
    pub completion: Completion,
    pub event: Option<LegEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Point-in-time view of the current job. Result fields are `None` until done.
pub struct JobSnapshot {
    pub job_id: JobId,
    pub state: JobState,
    pub output: Option<CanonicalHex>,
    pub valid: Option<bool>,
    pub expected: Option<CanonicalHex>,
}

#[derive(Debug)]
struct Slot {
    job: Job,
    result: Option<Completion>,
}

#[derive(Debug)]
pub struct JobStore {
    direction: Direction,
    last_seq: u64,
    slot: Option<Slot>,
}

impl JobStore {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            last_seq: 0,
            slot: None,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The job currently in the slot, whatever its state.
    pub fn current(&self) -> Option<&Job> {
        self.slot.as_ref().map(|slot| &slot.job)
    }

    /// Replace the current job with a fresh pending one.
    ///
    /// Lengths are not checked here; see [`aesbridge_core::request`].
    pub fn create(
        &mut self,
        key: Vec<u8>,
        block: Vec<u8>,
        tag: impl Into<String>,
        roundtrip: Option<RoundtripLink>,
    ) -> Job {
        self.last_seq += 1;
        let job = Job {
            id: JobId::new(self.direction, self.last_seq),
            key,
            block,
            tag: tag.into(),
            state: JobState::Pending,
            roundtrip,
        };
        if let Some(previous) = self.slot.as_ref().filter(|slot| slot.job.state != JobState::Done) {
            tracing::debug!(job_id = %previous.job.id, state = ?previous.job.state, "Abandoning unfinished job");
        }
        tracing::debug!(job_id = %job.id, "Created job");
        self.slot = Some(Slot {
            job: job.clone(),
            result: None,
        });
        job
    }

    /// Hand the current job to a worker, once.
    pub fn claim_for_worker(&mut self) -> Option<Job> {
        let slot = self.slot.as_mut()?;
        if slot.job.state != JobState::Pending {
            return None;
        }
        slot.job.state = JobState::Assigned;
        tracing::debug!(job_id = %slot.job.id, "Assigned job to worker");
        Some(slot.job.clone())
    }

    /// Accept the device's raw reply for `job_id` and judge it.
    ///
    /// A reply for a job that was never claimed is accepted too; only the id
    /// has to match.
    pub fn complete(&mut self, job_id: JobId, raw: &str) -> Result<Outcome, StoreError> {
        let Some(slot) = self.slot.as_mut().filter(|slot| slot.job.id == job_id) else {
            tracing::warn!(job_id = %job_id, "Declined report for unknown job");
            return Err(StoreError::JobNotFound(job_id));
        };
        if slot.job.state == JobState::Done {
            tracing::warn!(job_id = %job_id, "Declined second report for job");
            return Err(StoreError::AlreadyCompleted(job_id));
        }

        let output = normalize_response(self.direction, raw);
        let expected = match reference::transform(self.direction, &slot.job.key, &slot.job.block) {
            Ok(block) => Some(CanonicalHex::from_bytes(&block)),
            Err(error) => {
                tracing::warn!(job_id = %job_id, error = %error, "No reference value for job");
                None
            }
        };
        let valid = expected.as_ref().is_some_and(|expected| *expected == output);

        let completion = Completion {
            job_id,
            output,
            valid,
            expected,
        };
        slot.job.state = JobState::Done;
        slot.result = Some(completion.clone());
        tracing::info!(job_id = %job_id, valid, "Completed job");

        let event = slot.job.roundtrip.map(|link| LegEvent {
            group_id: link.group_id,
            leg: link.leg,
            job_id,
            output: completion.output.clone(),
            valid,
            expected: completion.expected.clone(),
        });
        Ok(Outcome { completion, event })
    }

    /// Snapshot of `job_id`, if it is still the current job.
    pub fn status_of(&self, job_id: JobId) -> Option<JobSnapshot> {
        let slot = self.slot.as_ref().filter(|slot| slot.job.id == job_id)?;
        let result = slot.result.as_ref();
        Some(JobSnapshot {
            job_id,
            state: slot.job.state,
            output: result.map(|r| r.output.clone()),
            valid: result.map(|r| r.valid),
            expected: result.and_then(|r| r.expected.clone()),
        })
    }

    /// Drop the current job. Ids keep counting up, so stale reports stay stale.
    pub fn clear(&mut self) {
        self.slot = None;
    }
}
