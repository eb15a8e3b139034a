//! Empirical calibration of predicted bitrates against field measurements.
//!
//! A raw prediction scales the nominal bitrate by the model scale, the codec
//! correction, the resolution factor and the fps factor. A per-model output
//! multiplier keyed by `resolution@fps` then pulls that prediction onto the
//! bitrate observed in field reports.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::Channel;

use super::{EngineConfig, card::CardEstimator, units};

fn unit_scale() -> f64 {
    1.0
}

/// Calibration data for one device model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCalibration {
    #[serde(default = "unit_scale")]
    pub bitrate_scale: f64,
    #[serde(default)]
    pub output_multipliers: BTreeMap<String, f64>,
}

impl Default for ModelCalibration {
    fn default() -> Self {
        Self {
            bitrate_scale: unit_scale(),
            output_multipliers: BTreeMap::new(),
        }
    }
}

/// Output multiplier found for a channel configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationLookup {
    pub multiplier: f64,
    pub calibrated: bool,
}

impl CalibrationLookup {
    pub fn uncalibrated() -> Self {
        Self {
            multiplier: 1.0,
            calibrated: false,
        }
    }
}

/// Calibration entries keyed by model identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationTable {
    models: BTreeMap<String, ModelCalibration>,
}

impl CalibrationTable {
    pub fn get(&self, model: &str) -> Option<&ModelCalibration> {
        self.models.get(model)
    }

    /// Global bitrate scale for `model`; 1.0 when unknown.
    pub fn model_scale(&self, model: Option<&str>) -> f64 {
        model
            .and_then(|id| self.models.get(id))
            .map_or(1.0, |entry| entry.bitrate_scale)
    }

    pub fn output_multiplier(&self, model: Option<&str>, resolution: &str, fps: f64) -> CalibrationLookup {
        let key = calibration_key(resolution, fps);
        model
            .and_then(|id| self.models.get(id))
            .and_then(|entry| entry.output_multipliers.get(&key))
            .map_or_else(CalibrationLookup::uncalibrated, |&multiplier| {
                CalibrationLookup {
                    multiplier,
                    calibrated: true,
                }
            })
    }

    pub fn set_scale(&mut self, model: &str, bitrate_scale: f64) {
        self.models.entry(model.to_string()).or_default().bitrate_scale = bitrate_scale;
    }

    pub fn insert_multiplier(&mut self, model: &str, key: impl Into<String>, multiplier: f64) {
        self.models
            .entry(model.to_string())
            .or_default()
            .output_multipliers
            .insert(key.into(), multiplier);
    }

    /// Stores every suggestion for `model`; later keys overwrite earlier ones.
    pub fn merge(&mut self, model: &str, suggestions: &[CalibrationSuggestion]) {
        for suggestion in suggestions {
            self.insert_multiplier(model, suggestion.key.clone(), suggestion.multiplier);
        }
    }

    pub fn models(&self) -> impl Iterator<Item = (&String, &ModelCalibration)> {
        self.models.iter()
    }
}

/// Lookup key `WIDTHxHEIGHT@fps`, e.g. `1280x720@25` or `720x480@12.5`.
///
/// Bare heights normalize to their 16:9 dimensions, so `720` and `1280x720`
/// share a key. Unparsable descriptors are kept verbatim.
pub fn calibration_key(resolution: &str, fps: f64) -> String {
    match units::parse_dimensions(resolution) {
        Some((width, height)) => format!("{width}x{height}@{fps}"),
        None => format!("{}@{}", resolution.trim(), fps),
    }
}

/// Multiplier mapping a raw prediction onto a measured bitrate.
///
/// Undefined (and skipped) when the raw prediction is not positive.
pub fn suggest_calibration(predicted_raw: f64, measured: f64) -> Option<f64> {
    (predicted_raw > 0.0).then(|| measured / predicted_raw)
}

/// Breakdown of a calibrated bitrate prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub channel_id: String,
    pub key: String,
    pub nominal_bitrate_mbps: f64,
    pub model_scale: f64,
    pub correction_factor: f64,
    pub resolution_factor: f64,
    pub fps_factor: f64,
    pub predicted_raw_mbps: f64,
    pub output_multiplier: f64,
    pub predicted_mbps: f64,
    pub calibrated: bool,
}

impl Prediction {
    /// Product of every factor except the nominal bitrate and output multiplier.
    pub fn combined_factor(&self) -> f64 {
        self.model_scale * self.correction_factor * self.resolution_factor * self.fps_factor
    }

    /// Nominal bitrate that would yield `measured` before the output multiplier.
    pub fn required_nominal(&self, measured: f64) -> Option<f64> {
        let factor = self.combined_factor();
        (factor > 0.0).then(|| measured / factor)
    }
}

/// Predicts the on-media bitrate of `channel` for `model`.
pub fn predict(
    channel: &Channel,
    model: Option<&str>,
    table: &CalibrationTable,
    config: &EngineConfig,
) -> Prediction {
    let correction = CardEstimator::new(config).correction(channel);
    let model_scale = table.model_scale(model);
    let resolution_factor = units::resolution_factor(&channel.resolution);
    let fps_factor = units::fps_factor(channel.fps);
    let predicted_raw_mbps =
        channel.bitrate_mbps * model_scale * correction.factor * resolution_factor * fps_factor;
    let lookup = table.output_multiplier(model, &channel.resolution, channel.fps);

    Prediction {
        channel_id: channel.id.clone(),
        key: calibration_key(&channel.resolution, channel.fps),
        nominal_bitrate_mbps: channel.bitrate_mbps,
        model_scale,
        correction_factor: correction.factor,
        resolution_factor,
        fps_factor,
        predicted_raw_mbps,
        output_multiplier: lookup.multiplier,
        predicted_mbps: predicted_raw_mbps * lookup.multiplier,
        calibrated: lookup.calibrated,
    }
}

/// One measured channel from a field report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSample {
    #[serde(flatten)]
    pub channel: Channel,
    pub measured_mbps: f64,
}

/// Measured bitrates collected from a deployed device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldReport {
    pub model: String,
    pub samples: Vec<FieldSample>,
}

/// Output multiplier proposed for one `resolution@fps` key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationSuggestion {
    pub key: String,
    pub channel_id: String,
    pub nominal_bitrate_mbps: f64,
    pub predicted_raw_mbps: f64,
    pub measured_mbps: f64,
    /// Rounded to three decimals.
    pub multiplier: f64,
    pub required_nominal_mbps: Option<f64>,
}

/// Output of a calibration run: the suggestions and the merged table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationRun {
    pub model: String,
    pub suggestions: Vec<CalibrationSuggestion>,
    pub table: CalibrationTable,
}

/// Proposes output multipliers for every sample with a positive raw prediction.
#[instrument(skip_all, fields(model = %report.model, samples = report.samples.len()))]
pub fn derive_calibration(
    report: &FieldReport,
    table: &CalibrationTable,
    config: &EngineConfig,
) -> Vec<CalibrationSuggestion> {
    report
        .samples
        .iter()
        .filter_map(|sample| {
            let prediction = predict(&sample.channel, Some(report.model.as_str()), table, config);
            let Some(multiplier) =
                suggest_calibration(prediction.predicted_raw_mbps, sample.measured_mbps)
            else {
                debug!(channel = %sample.channel.id, "raw prediction not positive; sample skipped");
                return None;
            };
            Some(CalibrationSuggestion {
                key: prediction.key.clone(),
                channel_id: sample.channel.id.clone(),
                nominal_bitrate_mbps: sample.channel.bitrate_mbps,
                predicted_raw_mbps: prediction.predicted_raw_mbps,
                measured_mbps: sample.measured_mbps,
                multiplier: round_to(multiplier, 3),
                required_nominal_mbps: prediction.required_nominal(sample.measured_mbps),
            })
        })
        .collect()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
