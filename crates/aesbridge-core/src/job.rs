//! Jobs, identifiers and lifecycle states shared by stores and workers.
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::normalize::CanonicalHex;

/// Size of one cipher block in bytes.
pub const BLOCK_LEN: usize = 16;

/// One cipher block.
pub type Block = [u8; BLOCK_LEN];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Which transform a job asks the device for. Also names a roundtrip leg.
pub enum Direction {
    Encrypt,
    Decrypt,
}

impl Direction {
    fn prefix(self) -> &'static str {
        match self {
            Direction::Encrypt => "enc",
            Direction::Decrypt => "dec",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Encrypt => f.write_str("encrypt"),
            Direction::Decrypt => f.write_str("decrypt"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed identifier: {0:?}")]
pub struct ParseIdError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Job identifier, unique per lane for the life of the process.
///
/// Renders as `enc-<n>` / `dec-<n>`.
pub struct JobId {
    direction: Direction,
    seq: u64,
}

impl JobId {
    pub const fn new(direction: Direction, seq: u64) -> Self {
        Self { direction, seq }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.direction.prefix(), self.seq)
    }
}

impl std::str::FromStr for JobId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseIdError(s.to_owned());
        let (prefix, seq) = s.split_once('-').ok_or_else(malformed)?;
        let direction = match prefix {
            "enc" => Direction::Encrypt,
            "dec" => Direction::Decrypt,
            _ => return Err(malformed()),
        };
        let seq = seq.parse().map_err(|_| malformed())?;
        Ok(JobId::new(direction, seq))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Roundtrip group identifier. Renders as `rt-<n>`.
pub struct GroupId(u64);

impl GroupId {
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    pub fn seq(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rt-{}", self.0)
    }
}

impl std::str::FromStr for GroupId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("rt-")
            .and_then(|seq| seq.parse().ok())
            .map(GroupId)
            .ok_or_else(|| ParseIdError(s.to_owned()))
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(JobId);
string_serde!(GroupId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
/// Forward-only job lifecycle.
pub enum JobState {
    Pending,
    Assigned,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Back-reference from a job to the roundtrip group it serves.
pub struct RoundtripLink {
    pub group_id: GroupId,
    pub leg: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// A unit of device work.
///
/// `key` and `block` are whatever the creator supplied; the reference cipher
/// decides later whether their lengths are usable.
pub struct Job {
    pub id: JobId,
    #[serde(rename = "keyHex", serialize_with = "upper_hex")]
    pub key: Vec<u8>,
    #[serde(rename = "blockHex", serialize_with = "upper_hex")]
    pub block: Vec<u8>,
    pub tag: String,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roundtrip: Option<RoundtripLink>,
}

impl Job {
    pub fn direction(&self) -> Direction {
        self.id.direction()
    }

    pub fn key_hex(&self) -> String {
        hex::encode_upper(&self.key)
    }

    pub fn block_hex(&self) -> String {
        hex::encode_upper(&self.block)
    }
}

fn upper_hex<T, S>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_str(&hex::encode_upper(bytes.as_ref()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Verdict for an accepted completion report.
pub struct Completion {
    pub job_id: JobId,
    /// Normalized device output.
    pub output: CanonicalHex,
    /// `true` iff `output` equals `expected` exactly.
    pub valid: bool,
    /// Reference output; absent when the reference could not be computed.
    pub expected: Option<CanonicalHex>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ids_render_and_parse() {
        let id = JobId::new(Direction::Decrypt, 42);
        assert_eq!(id.to_string(), "dec-42");
        assert_eq!("dec-42".parse::<JobId>().unwrap(), id);
        assert!("xyz-1".parse::<JobId>().is_err());
        assert!("enc-".parse::<JobId>().is_err());
        assert!("enc7".parse::<JobId>().is_err());
    }

    #[test]
    fn group_ids_render_and_parse() {
        let id = GroupId::new(3);
        assert_eq!(id.to_string(), "rt-3");
        assert_eq!("rt-3".parse::<GroupId>().unwrap(), id);
        assert!("3".parse::<GroupId>().is_err());
    }

    #[test]
    fn job_serializes_with_hex_fields() {
        let job = Job {
            id: JobId::new(Direction::Encrypt, 1),
            key: vec![0x0a; 16],
            block: vec![0xff, 0x01],
            tag: "0".into(),
            state: JobState::Pending,
            roundtrip: None,
        };
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["id"], "enc-1");
        assert_eq!(json["keyHex"], "0A".repeat(16));
        assert_eq!(json["blockHex"], "FF01");
        assert_eq!(json["state"], "pending");
        assert!(json.get("roundtrip").is_none());
    }
}
