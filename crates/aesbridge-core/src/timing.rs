//! Theoretical core time for a roundtrip.
//!
//! A static estimate from two constants, not a measurement. It tells the
//! operator how long the AES core itself should take, which is orders of
//! magnitude below the polling latency they actually see.
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingModel {
    clock_hz: u64,
    cycles_per_block: u32,
}

impl TimingModel {
    pub const fn new(clock_hz: u64, cycles_per_block: u32) -> Self {
        Self {
            clock_hz,
            cycles_per_block,
        }
    }

    pub fn clock_hz(&self) -> u64 {
        self.clock_hz
    }

    pub fn cycles_per_block(&self) -> u32 {
        self.cycles_per_block
    }

    /// `cycles_per_block / clock_hz`, in seconds.
    pub fn per_block_seconds(&self) -> f64 {
        f64::from(self.cycles_per_block) / self.clock_hz as f64
    }

    /// Estimate for `blocks` blocks through each leg.
    pub fn estimate(&self, blocks: u32) -> TimingEstimate {
        let per_block = self.per_block_seconds();
        let enc = f64::from(blocks) * per_block;
        let dec = f64::from(blocks) * per_block;
        TimingEstimate {
            fclk_mhz: self.clock_hz as f64 / 1e6,
            cycles_per_block: self.cycles_per_block,
            blocks,
            per_block_time_s: per_block,
            enc_time_s: enc,
            dec_time_s: dec,
            total_time_s: enc + dec,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingEstimate {
    #[serde(rename = "fclkMHz")]
    pub fclk_mhz: f64,
    #[serde(rename = "cyclesPerBlock")]
    pub cycles_per_block: u32,
    pub blocks: u32,
    #[serde(rename = "perBlockTime_s")]
    pub per_block_time_s: f64,
    #[serde(rename = "encTime_s")]
    pub enc_time_s: f64,
    #[serde(rename = "decTime_s")]
    pub dec_time_s: f64,
    #[serde(rename = "totalTime_s")]
    pub total_time_s: f64,
}

impl std::fmt::Display for TimingEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "f = {} MHz, {} cycles/block: ENC {}, DEC {}, total {}",
            self.fclk_mhz,
            self.cycles_per_block,
            format_seconds(self.enc_time_s),
            format_seconds(self.dec_time_s),
            format_seconds(self.total_time_s),
        )
    }
}

/// Render a duration in the largest unit that keeps it under 1000.
pub fn format_seconds(seconds: f64) -> String {
    let ns = seconds * 1e9;
    if ns < 1000.0 {
        return format!("{ns:.1} ns");
    }
    let us = ns / 1e3;
    if us < 1000.0 {
        return format!("{us:.1} µs");
    }
    format!("{:.3} ms", us / 1e3)
}
