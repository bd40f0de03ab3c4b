//! Encrypt-then-decrypt roundtrips across the two lanes.
//!
//! One group at a time. The coordinator owns the group, starts the encrypt
//! leg, and on the encrypt verdict feeds the normalized ciphertext straight
//! into the decrypt lane. It refers to jobs by id only and learns about
//! verdicts through [`LegEvent`]s; the stores never see the coordinator.
//!
//! There is no failure state. If the encrypt leg yields nothing usable the
//! group waits for a decrypt leg that never comes; callers read the per-leg
//! `valid` flags to tell why.
use aesbridge_core::{
    Block, CanonicalHex, Direction, GroupId, JobId, RoundtripLink, TimingEstimate, TimingModel,
    text::hex_to_ascii,
};
use serde::Serialize;

use crate::store::{JobStore, LegEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoundtripStatus {
    WaitingEnc,
    WaitingDec,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundtripTicket {
    pub group_id: GroupId,
    pub enc_job_id: JobId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Verdict of one leg, copied from the lane's store.
pub struct LegSnapshot {
    pub job_id: JobId,
    pub output: CanonicalHex,
    pub valid: bool,
    pub expected: Option<CanonicalHex>,
}

impl From<LegEvent> for LegSnapshot {
    fn from(event: LegEvent) -> Self {
        Self {
            job_id: event.job_id,
            output: event.output,
            valid: event.valid,
            expected: event.expected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundtripSnapshot {
    pub group_id: GroupId,
    pub status: RoundtripStatus,
    pub tag: String,
    pub key_hex: String,
    pub pt_hex_in: CanonicalHex,
    pub enc_job_id: JobId,
    pub dec_job_id: Option<JobId>,
    pub enc: Option<LegSnapshot>,
    pub dec: Option<LegSnapshot>,
    /// Done, and the decrypt output reproduces the original block.
    pub roundtrip_ok: bool,
    pub pt_ascii_original: String,
    pub pt_ascii: String,
    pub timing: TimingEstimate,
}

#[derive(Debug)]
struct Group {
    group_id: GroupId,
    key: Vec<u8>,
    original: Block,
    tag: String,
    enc_job_id: JobId,
    dec_job_id: Option<JobId>,
    enc: Option<LegSnapshot>,
    dec: Option<LegSnapshot>,
}

impl Group {
    fn status(&self) -> RoundtripStatus {
        match (&self.enc, &self.dec) {
            (_, Some(_)) => RoundtripStatus::Done,
            (Some(_), None) => RoundtripStatus::WaitingDec,
            (None, None) => RoundtripStatus::WaitingEnc,
        }
    }
}

#[derive(Debug, Default)]
pub struct RoundtripCoordinator {
    last_seq: u64,
    active: Option<Group>,
}

impl RoundtripCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any active group and submit its encrypt leg.
    pub fn start(
        &mut self,
        encrypt: &mut JobStore,
        key: Vec<u8>,
        block: Block,
        tag: impl Into<String>,
    ) -> RoundtripTicket {
        debug_assert_eq!(encrypt.direction(), Direction::Encrypt);
        self.last_seq += 1;
        let group_id = GroupId::new(self.last_seq);
        let tag = tag.into();
        let link = RoundtripLink {
            group_id,
            leg: Direction::Encrypt,
        };
        let job = encrypt.create(key.clone(), block.to_vec(), tag.clone(), Some(link));
        tracing::info!(group_id = %group_id, enc_job_id = %job.id, "Started roundtrip");
        self.active = Some(Group {
            group_id,
            key,
            original: block,
            tag,
            enc_job_id: job.id,
            dec_job_id: None,
            enc: None,
            dec: None,
        });
        RoundtripTicket {
            group_id,
            enc_job_id: job.id,
        }
    }

    /// Record a leg verdict; an encrypt verdict with output chains the
    /// decrypt leg. Events for other groups or superseded jobs are ignored.
    pub fn on_leg_event(&mut self, event: LegEvent, decrypt: &mut JobStore) {
        debug_assert_eq!(decrypt.direction(), Direction::Decrypt);
        let Some(group) = self
            .active
            .as_mut()
            .filter(|group| group.group_id == event.group_id)
        else {
            tracing::debug!(group_id = %event.group_id, "Ignoring event for inactive group");
            return;
        };

        match event.leg {
            Direction::Encrypt => {
                if group.enc_job_id != event.job_id || group.enc.is_some() {
                    tracing::debug!(job_id = %event.job_id, "Ignoring stale encrypt event");
                    return;
                }
                if event.output.is_empty() {
                    tracing::warn!(group_id = %group.group_id, "Encrypt leg produced no ciphertext; roundtrip stalls");
                } else {
                    let link = RoundtripLink {
                        group_id: group.group_id,
                        leg: Direction::Decrypt,
                    };
                    let job = decrypt.create(
                        group.key.clone(),
                        event.output.to_bytes(),
                        group.tag.clone(),
                        Some(link),
                    );
                    tracing::info!(group_id = %group.group_id, dec_job_id = %job.id, "Chained decrypt leg");
                    group.dec_job_id = Some(job.id);
                }
                group.enc = Some(event.into());
            }
            Direction::Decrypt => {
                if group.dec_job_id != Some(event.job_id) || group.dec.is_some() {
                    tracing::debug!(job_id = %event.job_id, "Ignoring stale decrypt event");
                    return;
                }
                tracing::info!(group_id = %group.group_id, valid = event.valid, "Roundtrip finished");
                group.dec = Some(event.into());
            }
        }
    }

    /// Snapshot of `group_id`, if it is still the active group.
    pub fn status_of(&self, group_id: GroupId, timing: &TimingModel) -> Option<RoundtripSnapshot> {
        let group = self
            .active
            .as_ref()
            .filter(|group| group.group_id == group_id)?;
        let status = group.status();
        let pt_hex_in = CanonicalHex::from_bytes(&group.original);
        let decrypted = group.dec.as_ref().map(|dec| &dec.output);
        let roundtrip_ok = status == RoundtripStatus::Done
            && !pt_hex_in.is_empty()
            && decrypted == Some(&pt_hex_in);

        Some(RoundtripSnapshot {
            group_id,
            status,
            tag: group.tag.clone(),
            key_hex: hex::encode_upper(&group.key),
            pt_ascii_original: hex_to_ascii(pt_hex_in.as_str()),
            pt_ascii: decrypted.map(|hex| hex_to_ascii(hex.as_str())).unwrap_or_default(),
            pt_hex_in,
            enc_job_id: group.enc_job_id,
            dec_job_id: group.dec_job_id,
            enc: group.enc.clone(),
            dec: group.dec.clone(),
            roundtrip_ok,
            timing: timing.estimate(1),
        })
    }

    pub fn clear(&mut self) {
        self.active = None;
    }
}
