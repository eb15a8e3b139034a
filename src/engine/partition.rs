//! Model-specific partitioning of channels onto storage cards.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::{CardSpec, Channel};

use super::{
    EngineConfig,
    card::{CardEstimator, CardResult, ChannelDetail},
    policy::{self, BitrateRange},
    units::{self, UnitConvention, VariationRange},
};

fn default_mirror_cards() -> u8 {
    2
}

/// Channels recorded onto one card of an independent split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardAssignment {
    pub card_id: String,
    pub channel_ids: Vec<String>,
}

/// Rule assigning channels to physical storage cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PartitioningScheme {
    /// One card receives every channel.
    Single,
    /// Static channel-to-card map; the first card to fill limits the system.
    IndependentSplit { cards: Vec<CardAssignment> },
    /// Every present card records every channel.
    Mirror {
        #[serde(default = "default_mirror_cards")]
        cards: u8,
    },
}

impl PartitioningScheme {
    pub fn label(&self) -> &'static str {
        match self {
            PartitioningScheme::Single => "single",
            PartitioningScheme::IndependentSplit { .. } => "independent-split",
            PartitioningScheme::Mirror { .. } => "mirror",
        }
    }

    /// Number of physical cards the scheme writes to.
    pub fn card_count(&self) -> usize {
        match self {
            PartitioningScheme::Single => 1,
            PartitioningScheme::IndependentSplit { cards } => cards.len(),
            PartitioningScheme::Mirror { cards } => usize::from(*cards).max(1),
        }
    }

    /// Card owning `channel_id` under an independent split.
    pub fn card_for_channel(&self, channel_id: &str) -> Option<&str> {
        match self {
            PartitioningScheme::IndependentSplit { cards } => cards
                .iter()
                .find(|card| card.channel_ids.iter().any(|id| id == channel_id))
                .map(|card| card.card_id.as_str()),
            _ => None,
        }
    }
}

/// Everything needed for one system-level estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateRequest {
    pub model: Option<String>,
    pub scheme: PartitioningScheme,
    pub channels: Vec<Channel>,
    /// Capacity of each physical card.
    pub card: CardSpec,
    pub bitrate_ceiling_mbps: Option<f64>,
    /// Allowed nominal bitrate per channel id.
    pub bitrate_ranges: BTreeMap<String, BitrateRange>,
}

impl EstimateRequest {
    pub fn new(scheme: PartitioningScheme, channels: Vec<Channel>, card: CardSpec) -> Self {
        Self {
            model: None,
            scheme,
            channels,
            card,
            bitrate_ceiling_mbps: None,
            bitrate_ranges: BTreeMap::new(),
        }
    }

    pub fn with_ceiling(mut self, ceiling_mbps: f64) -> Self {
        self.bitrate_ceiling_mbps = Some(ceiling_mbps);
        self
    }
}

/// System-level estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationResult {
    pub model: Option<String>,
    pub scheme: &'static str,
    pub units: UnitConvention,
    pub per_channel: Vec<ChannelDetail>,
    pub per_storage_unit: Vec<CardResult>,
    pub total_bitrate_mbps: f64,
    pub total_consumption_mb_per_hour: f64,
    /// `f64::INFINITY` when no card is constrained.
    pub system_recording_hours: f64,
    pub system_recording_days: f64,
    /// Card that fills first; ties may report either card.
    pub limiting_unit: Option<String>,
    pub variation_range: VariationRange,
    pub warnings: Vec<String>,
}

impl CalculationResult {
    pub fn is_unbounded(&self) -> bool {
        !self.system_recording_hours.is_finite()
    }

    pub fn storage_unit(&self, id: &str) -> Option<&CardResult> {
        self.per_storage_unit.iter().find(|card| card.id == id)
    }
}

/// Computes the system recording time under the request's partitioning scheme.
///
/// Durations always derive from the nominal bitrate sum; correction factors
/// are reported per channel without influencing the duration.
#[instrument(skip_all, fields(scheme = request.scheme.label(), channels = request.channels.len()))]
pub fn estimate(config: &EngineConfig, request: &EstimateRequest) -> CalculationResult {
    let estimator = CardEstimator::new(config);
    let fraction = request.card.usable_fraction_or(config.usable_fraction);
    let usable = units::usable_megabytes(request.card.capacity_gb, fraction, config.units());
    let mut warnings = Vec::new();

    let cards: Vec<CardResult> = match &request.scheme {
        PartitioningScheme::Single => {
            vec![estimator.compute(&request.card.id, &request.channels, usable)]
        }
        PartitioningScheme::IndependentSplit { cards } => {
            for channel in request.channels.iter().filter(|c| c.active) {
                if request.scheme.card_for_channel(&channel.id).is_none() {
                    warnings.push(format!(
                        "channel {} is not assigned to any storage unit and was excluded",
                        channel.id
                    ));
                }
            }
            let mut claimed = HashSet::new();
            cards
                .iter()
                .map(|assignment| {
                    let members = request.channels.iter().filter(|channel| {
                        assignment.channel_ids.contains(&channel.id)
                            && claimed.insert(channel.id.as_str())
                    });
                    estimator.compute(&assignment.card_id, members, usable)
                })
                .collect()
        }
        PartitioningScheme::Mirror { .. } => {
            // Each card holds the full channel set and fills at the same rate.
            let mirrored = estimator.compute("SD1", &request.channels, usable);
            (0..request.scheme.card_count())
                .map(|index| CardResult {
                    id: format!("SD{}", index + 1),
                    ..mirrored.clone()
                })
                .collect()
        }
    };

    let (system_recording_hours, limiting_unit) = limiting_card(&cards);

    let mut seen = HashSet::new();
    let per_channel: Vec<ChannelDetail> = cards
        .iter()
        .flat_map(|card| card.channels.iter())
        .filter(|detail| seen.insert(detail.id.clone()))
        .cloned()
        .collect();
    let total_bitrate_mbps: f64 = per_channel.iter().map(|d| d.nominal_bitrate_mbps).sum();

    let encoded_bitrate: f64 = request.channels.iter().map(Channel::contributed_bitrate).sum();
    warnings.extend(policy::into_warning(policy::evaluate_ceiling(
        request.bitrate_ceiling_mbps,
        encoded_bitrate,
    )));
    for channel in &request.channels {
        if let Some(range) = request.bitrate_ranges.get(&channel.id) {
            warnings.extend(policy::into_warning(policy::evaluate_bitrate_range(
                channel, range,
            )));
        }
    }
    for warning in &warnings {
        warn!(model = ?request.model, "{warning}");
    }

    CalculationResult {
        model: request.model.clone(),
        scheme: request.scheme.label(),
        units: config.units(),
        per_channel,
        total_bitrate_mbps,
        total_consumption_mb_per_hour: config.consumption_mb_per_hour(total_bitrate_mbps),
        system_recording_hours,
        system_recording_days: system_recording_hours / 24.0,
        limiting_unit,
        variation_range: units::variation_range(system_recording_hours, config.variation_margin),
        per_storage_unit: cards,
        warnings,
    }
}

/// Minimum duration over constrained cards, with the card that reaches it.
///
/// Cards with no assigned active channels impose no constraint.
pub fn limiting_card(cards: &[CardResult]) -> (f64, Option<String>) {
    cards
        .iter()
        .filter(|card| card.is_constrained())
        .min_by(|a, b| a.recording_hours.total_cmp(&b.recording_hours))
        .map(|card| (card.recording_hours, Some(card.id.clone())))
        .unwrap_or((f64::INFINITY, None))
}
