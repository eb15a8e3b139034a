//! Core library for the DVR retention estimator.
//!
//! The crate exposes the channel and storage models consumed by the estimation
//! engine, the declarative model catalog, configuration loading utilities, and
//! the entry point used by the CLI application.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod report;

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::{
    config::{AppConfig, Task},
    engine::{calibration, partition, reverse},
};

/// Video codec configured on a channel.
///
/// H.264 is the reference codec; its multiplier is normalized to 1.0 and all
/// overhead corrections are added to it. H.265 is the compressed variant whose
/// multiplier is already a fraction of the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Codec {
    #[default]
    #[serde(rename = "H.264")]
    H264,
    #[serde(rename = "H.265")]
    H265,
}

impl Codec {
    /// Parses loosely formatted codec labels (`H.265`, `h265`, `HEVC`).
    ///
    /// Anything that is not recognisably H.265 is treated as the reference codec.
    pub fn parse(label: &str) -> Self {
        let normalized: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "H265" | "HEVC" | "X265" => Codec::H265,
            _ => Codec::H264,
        }
    }

    /// Multiplier applied to the nominal bitrate when the channel has no override.
    pub fn default_multiplier(self) -> f64 {
        match self {
            Codec::H264 => 1.0,
            Codec::H265 => 0.7,
        }
    }

    pub fn is_reference(self) -> bool {
        matches!(self, Codec::H264)
    }
}

impl From<String> for Codec {
    fn from(label: String) -> Self {
        Codec::parse(&label)
    }
}

impl Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Codec::H264 => f.write_str("H.264"),
            Codec::H265 => f.write_str("H.265"),
        }
    }
}

fn default_active() -> bool {
    true
}

/// One video source stream configured on the recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Inactive channels contribute nothing to any aggregate.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Either `WIDTHxHEIGHT` or a bare height such as `720`.
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub fps: f64,
    pub bitrate_mbps: f64,
    #[serde(default)]
    pub codec: Codec,
    /// Overrides the codec's default multiplier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec_multiplier: Option<f64>,
    /// Preset index for preset-driven models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<u8>,
}

impl Channel {
    /// Active H.264 channel with the given nominal bitrate.
    pub fn new(id: impl Into<String>, bitrate_mbps: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            active: true,
            resolution: String::new(),
            fps: 0.0,
            bitrate_mbps,
            codec: Codec::H264,
            codec_multiplier: None,
            preset: None,
        }
    }

    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = resolution.into();
        self
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_codec_multiplier(mut self, multiplier: f64) -> Self {
        self.codec_multiplier = Some(multiplier);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Codec multiplier in effect for this channel.
    pub fn base_multiplier(&self) -> f64 {
        self.codec_multiplier
            .unwrap_or_else(|| self.codec.default_multiplier())
    }

    /// Nominal bitrate counted towards aggregates; zero when inactive.
    pub fn contributed_bitrate(&self) -> f64 {
        if self.active { self.bitrate_mbps } else { 0.0 }
    }
}

fn default_card_id() -> String {
    "SD1".to_string()
}

/// Physical storage card parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSpec {
    #[serde(default = "default_card_id")]
    pub id: String,
    pub capacity_gb: f64,
    /// Falls back to the engine-wide usable fraction when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usable_fraction: Option<f64>,
}

impl CardSpec {
    pub fn new(capacity_gb: f64) -> Self {
        Self {
            id: default_card_id(),
            capacity_gb,
            usable_fraction: None,
        }
    }

    pub fn with_usable_fraction(mut self, fraction: f64) -> Self {
        self.usable_fraction = Some(fraction);
        self
    }

    pub fn usable_fraction_or(&self, default: f64) -> f64 {
        self.usable_fraction.unwrap_or(default)
    }
}

/// Errors returned at the configuration and CLI boundary.
///
/// Engine computations themselves never fail; degenerate inputs map to
/// documented defaults or the unbounded duration sentinel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EstimatorError {
    #[error("I/O failure: {0}")]
    Io(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error("unknown model '{0}'")]
    UnknownModel(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("serialization failure: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EstimatorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Executes the configured task and renders its output document.
///
/// Estimates, reverse suggestions and calibration runs render as pretty JSON;
/// provisioning commands render as one command per line.
#[instrument(skip_all)]
pub fn run(config: &AppConfig) -> Result<String, EstimatorError> {
    let engine = &config.engine;
    match &config.task {
        Task::Estimate(scenario) => {
            let model = config.catalog.get(&scenario.model)?;
            let request = model.request(
                scenario.card.clone(),
                scenario.channels.clone(),
                scenario.scheme.clone(),
            );
            let result = partition::estimate(engine, &request);
            let predictions = request
                .channels
                .iter()
                .filter(|channel| channel.active)
                .map(|channel| {
                    calibration::predict(channel, Some(model.id.as_str()), &config.calibration, engine)
                })
                .collect();
            let report = report::EstimateReport::build(result, predictions);
            info!(
                model = %model.id,
                hours = report.result.system_recording_hours,
                duration = %report.formatted_duration,
                "estimate complete"
            );
            Ok(serde_json::to_string_pretty(&report)?)
        }
        Task::Reverse(params) => {
            let result = reverse::reverse_suggest(
                params.card_gb,
                params.desired_hours,
                params.active_channels,
                engine,
                params.limit,
            );
            Ok(serde_json::to_string_pretty(&result)?)
        }
        Task::Calibrate(field_report) => {
            config.catalog.get(&field_report.model)?;
            let suggestions =
                calibration::derive_calibration(field_report, &config.calibration, engine);
            let mut table = config.calibration.clone();
            table.merge(&field_report.model, &suggestions);
            let document = calibration::CalibrationRun {
                model: field_report.model.clone(),
                suggestions,
                table,
            };
            Ok(serde_json::to_string_pretty(&document)?)
        }
        Task::Commands(scenario) => {
            let model = config.catalog.get(&scenario.model)?;
            Ok(catalog::commands::format_commands(model, &scenario.channels).join("\n"))
        }
    }
}
