//! In-process backend: one slot per lane, one roundtrip at a time.
//!
//! State lives for the life of the process. A new job replaces the old one
//! in its lane; an unanswered job is simply forgotten.
mod bridge;
pub mod config;
pub mod roundtrip;
pub mod store;

pub use bridge::{Bridge, Lane, LaneLease, MemoryDriver};
pub use config::{BridgeConfig, ConfigError};
pub use roundtrip::{LegSnapshot, RoundtripSnapshot, RoundtripStatus, RoundtripTicket};
pub use store::{JobSnapshot, StoreError};
