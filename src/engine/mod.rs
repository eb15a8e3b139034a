//! Recording-time estimation engine.
//!
//! Every function in this module tree is a pure computation over immutable
//! inputs. The [`EngineConfig`] value is passed explicitly into each call so
//! concurrent estimates never share mutable state.

pub mod calibration;
pub mod card;
pub mod partition;
pub mod policy;
pub mod reverse;
pub mod units;

use serde::{Deserialize, Serialize};

use self::units::UnitConvention;

/// Share of raw card capacity assumed writable after filesystem reservations.
pub const DEFAULT_USABLE_FRACTION: f64 = 0.90;
/// Megabytes written per hour by a 1 Mbps constant-bitrate stream.
pub const DEFAULT_MB_PER_HOUR_PER_MBPS: f64 = 428.222_656_25;
/// Symmetric margin reported around the predicted duration.
pub const DEFAULT_VARIATION_MARGIN: f64 = 0.10;

/// Named overhead terms, each a fraction of the nominal bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverheadTerms {
    /// Container and index structures written alongside the video.
    pub container: f64,
    /// Audio track multiplexed into the recording.
    pub audio: f64,
    /// Variable-bitrate peaks; only meaningful for the reference codec.
    pub vbr: f64,
    /// Block slack left by the card filesystem.
    pub filesystem: f64,
}

impl Default for OverheadTerms {
    fn default() -> Self {
        Self {
            container: 0.04,
            audio: 0.02,
            vbr: 0.08,
            filesystem: 0.01,
        }
    }
}

impl OverheadTerms {
    pub fn zero() -> Self {
        Self {
            container: 0.0,
            audio: 0.0,
            vbr: 0.0,
            filesystem: 0.0,
        }
    }
}

/// Engine-wide calculation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub usable_fraction: f64,
    /// Expressed in megabytes of the selected unit convention.
    pub mb_per_hour_per_mbps: f64,
    pub use_decimal_units: bool,
    pub corrections_enabled: bool,
    pub overhead: OverheadTerms,
    pub variation_margin: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            usable_fraction: DEFAULT_USABLE_FRACTION,
            mb_per_hour_per_mbps: DEFAULT_MB_PER_HOUR_PER_MBPS,
            use_decimal_units: true,
            corrections_enabled: true,
            overhead: OverheadTerms::default(),
            variation_margin: DEFAULT_VARIATION_MARGIN,
        }
    }
}

impl EngineConfig {
    pub fn units(&self) -> UnitConvention {
        UnitConvention::from_decimal_flag(self.use_decimal_units)
    }

    /// Consumption in megabytes per hour for an aggregate nominal bitrate.
    pub fn consumption_mb_per_hour(&self, bitrate_mbps: f64) -> f64 {
        bitrate_mbps * self.mb_per_hour_per_mbps
    }

    pub fn with_units(mut self, convention: UnitConvention) -> Self {
        self.use_decimal_units = matches!(convention, UnitConvention::Decimal);
        self
    }

    pub fn with_corrections(mut self, enabled: bool) -> Self {
        self.corrections_enabled = enabled;
        self
    }
}
