//! Trace replay — drive an autoscaler from recorded samples.
//!
//! Sample times are offsets from the start of the trace. The autoscaler
//! is ticked every `tick` from the first tick up to one tick past the last
//! sample; every sample taken before a tick is recorded before it.

use std::io::BufRead;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use surge_autoscale::{Autoscaler, AutoscalerConfig, NoopReporter, ScaleMode, Stat};

/// One line of a recorded trace.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Sample {
    /// Milliseconds since the start of the trace.
    pub at_ms: u64,
    pub replica: String,
    pub concurrency: f64,
}

/// One decision produced during replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionLine {
    pub at_ms: u64,
    /// `None` when the autoscaler had no opinion.
    pub desired: Option<u32>,
    pub mode: &'static str,
}

/// Parse JSON-lines samples, skipping blank lines.
pub fn read_samples(reader: impl BufRead) -> anyhow::Result<Vec<Sample>> {
    let mut samples = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let sample: Sample = serde_json::from_str(&line)
            .with_context(|| format!("invalid sample on line {}", idx + 1))?;
        samples.push(sample);
    }
    Ok(samples)
}

pub fn replay(config: AutoscalerConfig, mut samples: Vec<Sample>, tick: Duration) -> Vec<DecisionLine> {
    samples.sort_by_key(|s| s.at_ms);

    let tick_ms = tick.as_millis().max(1) as u64;
    let end_ms = samples.last().map_or(0, |s| s.at_ms) + tick_ms;
    // Anchor on a whole second so bucket boundaries line up with the trace.
    let origin = UNIX_EPOCH + Duration::from_secs(1_000_000_000);
    let at = |ms: u64| -> SystemTime { origin + Duration::from_millis(ms) };

    let scaler = Autoscaler::new("replay", config, NoopReporter);
    let mut pending = samples.into_iter().peekable();
    let mut decisions = Vec::new();

    let mut now_ms = tick_ms;
    while now_ms <= end_ms {
        while let Some(sample) = pending.next_if(|s| s.at_ms < now_ms) {
            scaler.record(Stat::new(at(sample.at_ms), sample.replica, sample.concurrency));
        }

        let decision = scaler.scale(at(now_ms));
        decisions.push(DecisionLine {
            at_ms: now_ms,
            desired: decision.desired(),
            mode: match scaler.mode() {
                ScaleMode::Stable => "stable",
                ScaleMode::Panicking => "panic",
            },
        });
        now_ms += tick_ms;
    }

    decisions
}
