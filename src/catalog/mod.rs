//! Declarative device model catalog.
//!
//! Models are plain data: channel slots with their allowed settings, the
//! storage partitioning scheme, an optional aggregate bitrate ceiling and the
//! tag selecting the provisioning command format.

pub mod commands;

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    CardSpec, Channel, Codec, EstimatorError,
    engine::{
        partition::{EstimateRequest, PartitioningScheme},
        policy::BitrateRange,
    },
};

use self::commands::CommandFormat;

/// Every model known to the estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCatalog {
    pub models: Vec<ModelSpec>,
}

/// Codec offered by a model, with its default multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecOption {
    pub codec: Codec,
    pub multiplier: f64,
}

/// Resolution offered by a slot and the bitrates allowed with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionOption {
    pub value: String,
    #[serde(default)]
    pub label: String,
    pub bitrates: Vec<f64>,
}

/// Numbered setting bundle selected by index on preset-driven models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotPreset {
    pub index: u8,
    pub resolution: String,
    pub fps: f64,
    pub bitrate_mbps: f64,
}

/// One camera input of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSlot {
    pub id: String,
    pub name: String,
    /// Fixed slots cannot be reconfigured and need no provisioning command.
    #[serde(default)]
    pub fixed: bool,
    /// Falls back to the model-level list when empty.
    #[serde(default)]
    pub resolutions: Vec<ResolutionOption>,
    #[serde(default)]
    pub fps: Vec<f64>,
    #[serde(default)]
    pub presets: Vec<SlotPreset>,
}

/// A recorder model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub id: String,
    pub name: String,
    pub max_capacity_gb: u32,
    #[serde(default)]
    pub card_sizes_gb: Vec<u32>,
    pub scheme: PartitioningScheme,
    #[serde(default)]
    pub max_total_bitrate_mbps: Option<f64>,
    pub command_format: CommandFormat,
    #[serde(default)]
    pub codecs: Vec<CodecOption>,
    #[serde(default)]
    pub resolutions: Vec<ResolutionOption>,
    #[serde(default)]
    pub fps: Vec<f64>,
    pub channels: Vec<ChannelSlot>,
}

impl ModelCatalog {
    pub fn get(&self, id: &str) -> Result<&ModelSpec, EstimatorError> {
        self.models
            .iter()
            .find(|model| model.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| EstimatorError::UnknownModel(id.to_string()))
    }

    pub fn validate(&self) -> Result<(), EstimatorError> {
        let mut model_ids = HashSet::new();
        for model in &self.models {
            if !model_ids.insert(model.id.to_ascii_uppercase()) {
                return Err(EstimatorError::Catalog(format!(
                    "duplicate model id {}",
                    model.id
                )));
            }
            model.validate()?;
        }
        Ok(())
    }
}

impl ModelSpec {
    pub fn slot(&self, channel_id: &str) -> Option<&ChannelSlot> {
        self.channels.iter().find(|slot| slot.id == channel_id)
    }

    pub fn resolutions_for<'a>(&'a self, slot: &'a ChannelSlot) -> &'a [ResolutionOption] {
        if slot.resolutions.is_empty() {
            &self.resolutions
        } else {
            &slot.resolutions
        }
    }

    pub fn fps_for<'a>(&'a self, slot: &'a ChannelSlot) -> &'a [f64] {
        if slot.fps.is_empty() { &self.fps } else { &slot.fps }
    }

    /// Bitrate bounds allowed for `channel` at its configured resolution.
    ///
    /// Preset-driven slots derive the bounds from presets at that resolution.
    pub fn bitrate_range(&self, channel: &Channel) -> Option<BitrateRange> {
        let slot = self.slot(&channel.id)?;
        let resolution = channel.resolution.trim();
        let bitrates: Vec<f64> = match self
            .resolutions_for(slot)
            .iter()
            .find(|option| option.value == resolution)
        {
            Some(option) => option.bitrates.clone(),
            None => slot
                .presets
                .iter()
                .filter(|preset| preset.resolution == resolution)
                .map(|preset| preset.bitrate_mbps)
                .collect(),
        };
        let min_mbps = bitrates.iter().copied().reduce(f64::min)?;
        let max_mbps = bitrates.iter().copied().reduce(f64::max)?;
        Some(BitrateRange { min_mbps, max_mbps })
    }

    /// Multiplier the model documents for `codec`, if any.
    pub fn codec_multiplier(&self, codec: Codec) -> Option<f64> {
        self.codecs
            .iter()
            .find(|option| option.codec == codec)
            .map(|option| option.multiplier)
    }

    /// Builds an engine request for this model.
    ///
    /// Channels without an explicit codec multiplier take the model's
    /// documented one. `scheme` overrides the model's partitioning scheme.
    pub fn request(
        &self,
        card: CardSpec,
        channels: Vec<Channel>,
        scheme: Option<PartitioningScheme>,
    ) -> EstimateRequest {
        let channels: Vec<Channel> = channels
            .into_iter()
            .map(|mut channel| {
                if channel.codec_multiplier.is_none() {
                    channel.codec_multiplier = self.codec_multiplier(channel.codec);
                }
                channel
            })
            .collect();
        let bitrate_ranges: BTreeMap<String, BitrateRange> = channels
            .iter()
            .filter_map(|channel| Some((channel.id.clone(), self.bitrate_range(channel)?)))
            .collect();

        EstimateRequest {
            model: Some(self.id.clone()),
            scheme: scheme.unwrap_or_else(|| self.scheme.clone()),
            channels,
            card,
            bitrate_ceiling_mbps: self.max_total_bitrate_mbps,
            bitrate_ranges,
        }
    }

    /// Default channel configuration: first preset, else the first offered
    /// resolution with its highest bitrate and the first offered frame rate.
    pub fn default_channels(&self) -> Vec<Channel> {
        self.channels
            .iter()
            .filter_map(|slot| {
                let mut channel = if let Some(preset) = slot.presets.first() {
                    let mut channel = Channel::new(slot.id.clone(), preset.bitrate_mbps)
                        .with_resolution(preset.resolution.clone())
                        .with_fps(preset.fps);
                    channel.preset = Some(preset.index);
                    channel
                } else {
                    let option = self.resolutions_for(slot).first()?;
                    let bitrate = option.bitrates.iter().copied().reduce(f64::max)?;
                    let fps = self.fps_for(slot).first().copied().unwrap_or_default();
                    Channel::new(slot.id.clone(), bitrate)
                        .with_resolution(option.value.clone())
                        .with_fps(fps)
                };
                channel.name = slot.name.clone();
                Some(channel)
            })
            .collect()
    }

    fn validate(&self) -> Result<(), EstimatorError> {
        let mut slot_ids = HashSet::new();
        for slot in &self.channels {
            if !slot_ids.insert(slot.id.as_str()) {
                return Err(EstimatorError::Catalog(format!(
                    "model {} declares slot {} twice",
                    self.id, slot.id
                )));
            }
        }

        if let Some(ceiling) = self.max_total_bitrate_mbps {
            if ceiling <= 0.0 {
                return Err(EstimatorError::Catalog(format!(
                    "model {} has non-positive bitrate ceiling {ceiling}",
                    self.id
                )));
            }
        }

        if let PartitioningScheme::IndependentSplit { cards } = &self.scheme {
            let mut assigned = HashSet::new();
            for card in cards {
                for channel_id in &card.channel_ids {
                    if !slot_ids.contains(channel_id.as_str()) {
                        return Err(EstimatorError::Catalog(format!(
                            "model {} assigns unknown channel {channel_id} to {}",
                            self.id, card.card_id
                        )));
                    }
                    if !assigned.insert(channel_id.as_str()) {
                        return Err(EstimatorError::Catalog(format!(
                            "model {} assigns channel {channel_id} to more than one card",
                            self.id
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
