//! Presentation helpers for estimate output.
//!
//! The engine only produces numbers; this module turns them into the
//! language-neutral summary printed by the CLI.

use serde::Serialize;

use crate::engine::{calibration::Prediction, partition::CalculationResult};

/// Coarse retention classification of a recording duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetentionTier {
    /// Three days or more.
    Excellent,
    Good,
    Fair,
    Low,
    /// Under twelve hours.
    Critical,
    /// Nothing is being recorded.
    Unconstrained,
}

impl RetentionTier {
    pub fn classify(hours: f64) -> Self {
        match hours {
            h if !h.is_finite() => RetentionTier::Unconstrained,
            h if h >= 72.0 => RetentionTier::Excellent,
            h if h >= 48.0 => RetentionTier::Good,
            h if h >= 24.0 => RetentionTier::Fair,
            h if h >= 12.0 => RetentionTier::Low,
            _ => RetentionTier::Critical,
        }
    }
}

/// Compact duration: `45 min`, `4h 48min`, `3d 6h`.
///
/// Unbounded or non-positive durations render as `-`.
pub fn format_duration(hours: f64) -> String {
    if !hours.is_finite() || hours <= 0.0 {
        return "-".to_string();
    }

    let total_minutes = (hours * 60.0).round() as u64;
    if total_minutes < 60 {
        return format!("{total_minutes} min");
    }
    if total_minutes < 24 * 60 {
        let (h, m) = (total_minutes / 60, total_minutes % 60);
        return if m == 0 {
            format!("{h}h")
        } else {
            format!("{h}h {m}min")
        };
    }

    let total_hours = hours.round() as u64;
    let (days, rest) = (total_hours / 24, total_hours % 24);
    if rest == 0 {
        format!("{days}d")
    } else {
        format!("{days}d {rest}h")
    }
}

/// Estimate enriched with calibrated predictions and display fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateReport {
    pub result: CalculationResult,
    pub predictions: Vec<Prediction>,
    pub formatted_duration: String,
    pub tier: RetentionTier,
}

impl EstimateReport {
    pub fn build(result: CalculationResult, predictions: Vec<Prediction>) -> Self {
        Self {
            formatted_duration: format_duration(result.system_recording_hours),
            tier: RetentionTier::classify(result.system_recording_hours),
            result,
            predictions,
        }
    }
}
