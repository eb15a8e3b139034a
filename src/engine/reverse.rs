//! Reverse calculation: desired duration to required per-channel bitrate.

use serde::Serialize;
use tracing::instrument;

use super::{EngineConfig, units};

/// Below this per-channel bitrate footage quality is impractical.
pub const LOW_BITRATE_MBPS: f64 = 0.5;
/// Above this per-channel bitrate the recorder hardware cannot keep up.
pub const HIGH_BITRATE_MBPS: f64 = 8.0;
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

/// A commonly deployed resolution / fps / bitrate combination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Preset {
    pub resolution: &'static str,
    pub fps: u32,
    pub bitrate_mbps: f64,
    pub quality: &'static str,
}

const fn preset(resolution: &'static str, fps: u32, bitrate_mbps: f64, quality: &'static str) -> Preset {
    Preset {
        resolution,
        fps,
        bitrate_mbps,
        quality,
    }
}

pub const COMMON_PRESETS: [Preset; 10] = [
    preset("1080", 25, 8.0, "high"),
    preset("1080", 25, 6.0, "medium-high"),
    preset("1080", 15, 4.0, "medium"),
    preset("720", 25, 4.0, "high"),
    preset("720", 25, 3.0, "medium-high"),
    preset("720", 25, 2.0, "medium"),
    preset("720", 15, 2.0, "medium-low"),
    preset("480", 25, 2.0, "medium"),
    preset("480", 15, 1.0, "low"),
    preset("360", 15, 0.5, "very-low"),
];

/// Preset ranked by distance from the target bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PresetMatch {
    #[serde(flatten)]
    pub preset: Preset,
    pub difference_mbps: f64,
    /// `100 - |difference| / target * 100`; negative for very poor matches.
    pub match_percentage: f64,
}

impl PresetMatch {
    /// Match percentage floored at zero for display.
    pub fn display_percentage(&self) -> f64 {
        self.match_percentage.max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feasibility {
    /// Increase card capacity or shorten the desired duration.
    TooLow,
    Viable,
    /// Lower resolution or record fewer channels.
    TooHigh,
}

impl Feasibility {
    pub fn classify(bitrate_mbps: f64) -> Self {
        if bitrate_mbps < LOW_BITRATE_MBPS {
            Feasibility::TooLow
        } else if bitrate_mbps > HIGH_BITRATE_MBPS {
            Feasibility::TooHigh
        } else {
            Feasibility::Viable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReverseResult {
    pub card_gb: f64,
    pub desired_hours: f64,
    pub desired_days: f64,
    pub active_channels: u32,
    pub usable_megabytes: f64,
    pub required_total_mb_per_hour: f64,
    pub required_mb_per_hour_per_channel: f64,
    pub required_bitrate_per_channel_mbps: f64,
    pub feasibility: Feasibility,
    pub suggestions: Vec<PresetMatch>,
}

/// Spreads the card evenly over `active_channels` for `desired_hours`.
///
/// `desired_hours` and `active_channels` must be positive; callers validate.
#[instrument(skip(config))]
pub fn reverse_suggest(
    capacity_gb: f64,
    desired_hours: f64,
    active_channels: u32,
    config: &EngineConfig,
    limit: usize,
) -> ReverseResult {
    let usable_megabytes =
        units::usable_megabytes(capacity_gb, config.usable_fraction, config.units());
    let required_total_mb_per_hour = usable_megabytes / desired_hours;
    let required_mb_per_hour_per_channel = required_total_mb_per_hour / f64::from(active_channels);
    let required_bitrate_per_channel_mbps =
        required_mb_per_hour_per_channel / config.mb_per_hour_per_mbps;

    ReverseResult {
        card_gb: capacity_gb,
        desired_hours,
        desired_days: desired_hours / 24.0,
        active_channels,
        usable_megabytes,
        required_total_mb_per_hour,
        required_mb_per_hour_per_channel,
        required_bitrate_per_channel_mbps,
        feasibility: Feasibility::classify(required_bitrate_per_channel_mbps),
        suggestions: nearest_presets(required_bitrate_per_channel_mbps, limit),
    }
}

/// The `limit` presets closest to `target_mbps`, nearest first.
///
/// Equally distant presets keep their table order.
pub fn nearest_presets(target_mbps: f64, limit: usize) -> Vec<PresetMatch> {
    let mut matches: Vec<PresetMatch> = COMMON_PRESETS
        .iter()
        .map(|preset| {
            let difference_mbps = (preset.bitrate_mbps - target_mbps).abs();
            PresetMatch {
                preset: *preset,
                difference_mbps,
                match_percentage: 100.0 - difference_mbps / target_mbps * 100.0,
            }
        })
        .collect();
    matches.sort_by(|a, b| a.difference_mbps.total_cmp(&b.difference_mbps));
    matches.truncate(limit);
    matches
}
