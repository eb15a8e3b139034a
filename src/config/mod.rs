//! Configuration loading and validation utilities.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::{debug, instrument};

use crate::{
    CardSpec, Channel, EstimatorError,
    catalog::ModelCatalog,
    engine::{
        EngineConfig, calibration::CalibrationTable, calibration::FieldReport,
        partition::PartitioningScheme, reverse::DEFAULT_SUGGESTION_LIMIT,
    },
};

/// Command-line arguments used to bootstrap the estimator.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "DVR recording-time estimator")]
pub struct CliArgs {
    /// Location of the engine settings and calibration document.
    #[arg(long, value_name = "PATH", default_value = "engine.toml")]
    pub engine: PathBuf,
    /// Location of the model catalog.
    #[arg(long, value_name = "PATH", default_value = "models.toml")]
    pub models: PathBuf,
    /// Usable fraction override.
    #[arg(long, value_name = "FRACTION", env = "DVR_USABLE_FRACTION")]
    pub usable_fraction: Option<f64>,
    /// Use binary (1024-based) byte multiples.
    #[arg(long, env = "DVR_BINARY_UNITS")]
    pub binary_units: bool,
    /// Disable overhead corrections on per-channel figures.
    #[arg(long, env = "DVR_NO_CORRECTIONS")]
    pub no_corrections: bool,
    /// Variation margin override.
    #[arg(long, value_name = "FRACTION", env = "DVR_VARIATION_MARGIN")]
    pub variation_margin: Option<f64>,
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Estimate recording time for a scenario document.
    Estimate {
        #[arg(long, value_name = "PATH")]
        scenario: PathBuf,
    },
    /// Suggest a per-channel bitrate for a desired recording time.
    Reverse {
        #[arg(long, value_name = "GB")]
        card_gb: f64,
        #[arg(long, value_name = "HOURS")]
        hours: f64,
        #[arg(long, value_name = "COUNT")]
        channels: u32,
        #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_SUGGESTION_LIMIT)]
        limit: usize,
    },
    /// Derive calibration multipliers from a field report.
    Calibrate {
        #[arg(long, value_name = "PATH")]
        report: PathBuf,
    },
    /// Print provisioning commands for a scenario document.
    Commands {
        #[arg(long, value_name = "PATH")]
        scenario: PathBuf,
    },
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
struct EngineDocument {
    #[serde(default)]
    engine: EngineConfig,
    #[serde(default)]
    calibration: CalibrationTable,
}

/// Channel configuration for one recorder.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Scenario {
    pub model: String,
    pub card: CardSpec,
    /// Overrides the model's partitioning scheme.
    #[serde(default)]
    pub scheme: Option<PartitioningScheme>,
    pub channels: Vec<Channel>,
}

/// Validated reverse-calculation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ReverseParams {
    pub card_gb: f64,
    pub desired_hours: f64,
    pub active_channels: u32,
    pub limit: usize,
}

impl ReverseParams {
    pub fn new(
        card_gb: f64,
        desired_hours: f64,
        active_channels: u32,
        limit: usize,
    ) -> Result<Self, EstimatorError> {
        if !(card_gb.is_finite() && card_gb > 0.0) {
            return Err(EstimatorError::InvalidInput(format!(
                "card size must be positive, got {card_gb}"
            )));
        }
        if !(desired_hours.is_finite() && desired_hours > 0.0) {
            return Err(EstimatorError::InvalidInput(format!(
                "desired hours must be positive, got {desired_hours}"
            )));
        }
        if active_channels == 0 {
            return Err(EstimatorError::InvalidInput(
                "active channel count must be positive".to_string(),
            ));
        }
        Ok(Self {
            card_gb,
            desired_hours,
            active_channels,
            limit: limit.max(1),
        })
    }
}

/// Work selected on the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    Estimate(Scenario),
    Reverse(ReverseParams),
    Calibrate(FieldReport),
    Commands(Scenario),
}

impl EngineConfig {
    /// Rejects settings the engine cannot compute with.
    pub fn validate(&self) -> Result<(), EstimatorError> {
        if !(self.usable_fraction > 0.0 && self.usable_fraction <= 1.0) {
            return Err(EstimatorError::Config(format!(
                "usable fraction must be in (0, 1], got {}",
                self.usable_fraction
            )));
        }
        if !(self.mb_per_hour_per_mbps.is_finite() && self.mb_per_hour_per_mbps > 0.0) {
            return Err(EstimatorError::Config(format!(
                "mb_per_hour_per_mbps must be positive, got {}",
                self.mb_per_hour_per_mbps
            )));
        }
        if !(0.0..1.0).contains(&self.variation_margin) {
            return Err(EstimatorError::Config(format!(
                "variation margin must be in [0, 1), got {}",
                self.variation_margin
            )));
        }
        let overhead = &self.overhead;
        for (name, value) in [
            ("container", overhead.container),
            ("audio", overhead.audio),
            ("vbr", overhead.vbr),
            ("filesystem", overhead.filesystem),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(EstimatorError::Config(format!(
                    "overhead term {name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Fully merged configuration set.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub cli: CliArgs,
    pub engine: EngineConfig,
    pub calibration: CalibrationTable,
    pub catalog: ModelCatalog,
    pub task: Task,
}

impl AppConfig {
    #[instrument(skip_all)]
    pub async fn load(cli: CliArgs) -> Result<Self, EstimatorError> {
        let document: EngineDocument = read_document(&cli.engine, "engine settings").await?;
        let catalog: ModelCatalog = read_document(&cli.models, "model catalog").await?;
        catalog.validate()?;

        let mut engine = document.engine;
        if let Some(fraction) = cli.usable_fraction {
            engine.usable_fraction = fraction;
        }
        if let Some(margin) = cli.variation_margin {
            engine.variation_margin = margin;
        }
        if cli.binary_units {
            engine.use_decimal_units = false;
        }
        if cli.no_corrections {
            engine.corrections_enabled = false;
        }
        engine.validate()?;

        let task = match &cli.command {
            CliCommand::Estimate { scenario } => {
                Task::Estimate(load_scenario(scenario, &catalog).await?)
            }
            CliCommand::Commands { scenario } => {
                Task::Commands(load_scenario(scenario, &catalog).await?)
            }
            CliCommand::Reverse {
                card_gb,
                hours,
                channels,
                limit,
            } => Task::Reverse(ReverseParams::new(*card_gb, *hours, *channels, *limit)?),
            CliCommand::Calibrate { report } => {
                let report: FieldReport = read_document(report, "field report").await?;
                catalog.get(&report.model)?;
                Task::Calibrate(report)
            }
        };

        debug!(units = ?engine.units(), corrections = engine.corrections_enabled, "configuration loaded");

        Ok(Self {
            cli,
            engine,
            calibration: document.calibration,
            catalog,
            task,
        })
    }
}

/// Loads a scenario and checks it against the catalog.
pub async fn load_scenario(path: &Path, catalog: &ModelCatalog) -> Result<Scenario, EstimatorError> {
    let scenario: Scenario = read_document(path, "scenario").await?;
    let model = catalog.get(&scenario.model)?;
    if !(scenario.card.capacity_gb.is_finite() && scenario.card.capacity_gb > 0.0) {
        return Err(EstimatorError::InvalidInput(format!(
            "card capacity must be positive, got {}",
            scenario.card.capacity_gb
        )));
    }
    if let Some(fraction) = scenario.card.usable_fraction {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(EstimatorError::InvalidInput(format!(
                "card usable fraction must be in (0, 1], got {fraction}"
            )));
        }
    }
    if scenario.card.capacity_gb > f64::from(model.max_capacity_gb) {
        return Err(EstimatorError::InvalidInput(format!(
            "model {} supports cards up to {} GB, got {}",
            model.id, model.max_capacity_gb, scenario.card.capacity_gb
        )));
    }
    for channel in &scenario.channels {
        if !(channel.bitrate_mbps.is_finite() && channel.bitrate_mbps >= 0.0) {
            return Err(EstimatorError::InvalidInput(format!(
                "channel {} bitrate must be a non-negative number, got {}",
                channel.id, channel.bitrate_mbps
            )));
        }
    }
    Ok(scenario)
}

async fn read_document<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T, EstimatorError> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|err| EstimatorError::Io(format!("failed to read {what} {}: {err}", path.display())))?;
    toml::from_str(&raw).map_err(|err| EstimatorError::Config(format!("invalid {what} document: {err}")))
}
