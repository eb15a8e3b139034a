//! Threshold checks attached to estimates as non-fatal warnings.

use serde::{Deserialize, Serialize};

use crate::Channel;

/// Outcome of a threshold check; denials always carry their reason.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl PolicyDecision {
    const PASS: Self = Self {
        allowed: true,
        reason: None,
    };

    fn violation(reason: String) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Inclusive bitrate bounds allowed for a channel slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BitrateRange {
    pub min_mbps: f64,
    pub max_mbps: f64,
}

impl BitrateRange {
    pub fn contains(&self, bitrate_mbps: f64) -> bool {
        bitrate_mbps >= self.min_mbps && bitrate_mbps <= self.max_mbps
    }
}

/// Checks the aggregate nominal bitrate against the model's hardware ceiling.
pub fn evaluate_ceiling(ceiling_mbps: Option<f64>, total_bitrate_mbps: f64) -> PolicyDecision {
    match ceiling_mbps {
        Some(ceiling) if total_bitrate_mbps > ceiling => PolicyDecision::violation(format!(
            "aggregate bitrate {total_bitrate_mbps:.2} Mbps exceeds hardware ceiling {ceiling:.2} Mbps"
        )),
        _ => PolicyDecision::PASS,
    }
}

/// Checks a channel's nominal bitrate against its slot's allowed range.
pub fn evaluate_bitrate_range(channel: &Channel, range: &BitrateRange) -> PolicyDecision {
    if !channel.active || range.contains(channel.bitrate_mbps) {
        return PolicyDecision::PASS;
    }
    PolicyDecision::violation(format!(
        "channel {} bitrate {} Mbps is outside device range ({}-{} Mbps)",
        channel.id, channel.bitrate_mbps, range.min_mbps, range.max_mbps
    ))
}

/// Reason of a denied decision, attached to results as a warning.
pub fn into_warning(decision: PolicyDecision) -> Option<String> {
    decision.reason.filter(|_| !decision.allowed)
}
