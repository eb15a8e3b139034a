//! Per-card recording time calculator.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::Channel;

use super::{
    EngineConfig,
    units::{self, CorrectionFactor},
};

/// Per-channel detail row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelDetail {
    pub id: String,
    pub name: String,
    pub nominal_bitrate_mbps: f64,
    pub correction_factor: f64,
    pub correction_terms: BTreeMap<&'static str, f64>,
    /// Diagnostic only; durations are derived from the nominal bitrate.
    pub effective_bitrate_mbps: f64,
    pub consumption_mb_per_hour: f64,
}

/// Totals for one physical storage unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardResult {
    pub id: String,
    pub assigned_channel_ids: Vec<String>,
    pub usable_megabytes: f64,
    pub total_bitrate_mbps: f64,
    pub effective_bitrate_mbps: f64,
    pub consumption_mb_per_hour: f64,
    pub gb_per_hour: f64,
    pub gb_per_day: f64,
    /// `f64::INFINITY` when nothing is written to the card.
    pub recording_hours: f64,
    pub channels: Vec<ChannelDetail>,
}

impl CardResult {
    /// True when the card fills up in finite time.
    pub fn is_constrained(&self) -> bool {
        self.recording_hours.is_finite()
    }

    pub fn recording_days(&self) -> f64 {
        self.recording_hours / 24.0
    }
}

/// Worst-case (CBR) duration, or `f64::INFINITY` when nothing is consumed.
pub fn recording_hours(usable_megabytes: f64, consumption_mb_per_hour: f64) -> f64 {
    if consumption_mb_per_hour > 0.0 {
        usable_megabytes / consumption_mb_per_hour
    } else {
        f64::INFINITY
    }
}

/// Stateless calculator bound to one engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct CardEstimator<'a> {
    config: &'a EngineConfig,
}

impl<'a> CardEstimator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    pub fn correction(&self, channel: &Channel) -> CorrectionFactor {
        units::correction_factor(
            channel.codec,
            channel.base_multiplier(),
            self.config.corrections_enabled,
            &self.config.overhead,
        )
    }

    pub fn channel_detail(&self, channel: &Channel) -> ChannelDetail {
        let correction = self.correction(channel);
        let nominal = channel.contributed_bitrate();
        ChannelDetail {
            id: channel.id.clone(),
            name: channel.name.clone(),
            nominal_bitrate_mbps: nominal,
            correction_factor: correction.factor,
            correction_terms: correction.terms,
            effective_bitrate_mbps: nominal * correction.factor,
            consumption_mb_per_hour: self.config.consumption_mb_per_hour(nominal),
        }
    }

    /// Computes one card's totals from the active members of `channels`.
    pub fn compute<'c, I>(&self, card_id: &str, channels: I, usable_megabytes: f64) -> CardResult
    where
        I: IntoIterator<Item = &'c Channel>,
    {
        let details: Vec<ChannelDetail> = channels
            .into_iter()
            .filter(|channel| channel.active)
            .map(|channel| self.channel_detail(channel))
            .collect();

        let total_bitrate_mbps: f64 = details.iter().map(|d| d.nominal_bitrate_mbps).sum();
        let effective_bitrate_mbps: f64 = details.iter().map(|d| d.effective_bitrate_mbps).sum();
        let consumption_mb_per_hour = self.config.consumption_mb_per_hour(total_bitrate_mbps);
        let recording_hours = recording_hours(usable_megabytes, consumption_mb_per_hour);
        let gb_per_hour = consumption_mb_per_hour / units::bytes_per_unit(self.config.units());

        debug!(
            card = card_id,
            channels = details.len(),
            total_bitrate_mbps,
            recording_hours,
            "card computed"
        );

        CardResult {
            id: card_id.to_string(),
            assigned_channel_ids: details.iter().map(|d| d.id.clone()).collect(),
            usable_megabytes,
            total_bitrate_mbps,
            effective_bitrate_mbps,
            consumption_mb_per_hour,
            gb_per_hour,
            gb_per_day: gb_per_hour * 24.0,
            recording_hours,
            channels: details,
        }
    }
}
