//! Unit conversion and per-channel correction primitives.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Codec;

use super::OverheadTerms;

/// Reference frame area for resolution scaling (1920x1080).
pub const REFERENCE_AREA: f64 = 1920.0 * 1080.0;
/// Frame rate at which the fps factor equals 1.0.
pub const REFERENCE_FPS: f64 = 30.0;
pub const MIN_RESOLUTION_FACTOR: f64 = 0.1;
pub const MIN_FPS_FACTOR: f64 = 0.6;
pub const MAX_FPS_FACTOR: f64 = 1.2;

/// Byte-multiple convention used to turn gigabytes into megabytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitConvention {
    /// 1 GB = 1000 MB.
    Decimal,
    /// 1 GiB = 1024 MiB.
    Binary,
}

impl UnitConvention {
    pub fn from_decimal_flag(use_decimal: bool) -> Self {
        if use_decimal {
            UnitConvention::Decimal
        } else {
            UnitConvention::Binary
        }
    }
}

/// Megabytes per gigabyte under the given convention.
pub fn bytes_per_unit(convention: UnitConvention) -> f64 {
    match convention {
        UnitConvention::Decimal => 1000.0,
        UnitConvention::Binary => 1024.0,
    }
}

/// Writable megabytes on a card of `capacity_gb`.
pub fn usable_megabytes(capacity_gb: f64, usable_fraction: f64, convention: UnitConvention) -> f64 {
    capacity_gb * usable_fraction * bytes_per_unit(convention)
}

/// Combined correction factor with the terms that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionFactor {
    pub factor: f64,
    /// Empty when corrections are disabled.
    pub terms: BTreeMap<&'static str, f64>,
}

/// Derives the multiplier turning a nominal bitrate into an on-media bitrate.
///
/// The reference codec is normalized to 1.0, so overheads add to the base
/// multiplier. A compressed codec's base is already scaled, so overheads
/// multiply it instead, and the VBR term does not apply.
pub fn correction_factor(
    codec: Codec,
    base_multiplier: f64,
    enabled: bool,
    overhead: &OverheadTerms,
) -> CorrectionFactor {
    if !enabled {
        return CorrectionFactor {
            factor: base_multiplier.max(0.0),
            terms: BTreeMap::new(),
        };
    }

    let mut terms = BTreeMap::from([
        ("codec_multiplier", base_multiplier),
        ("container", overhead.container),
        ("audio", overhead.audio),
        ("filesystem", overhead.filesystem),
    ]);
    let shared = overhead.container + overhead.audio + overhead.filesystem;

    let factor = if codec.is_reference() {
        terms.insert("vbr", overhead.vbr);
        base_multiplier + shared + overhead.vbr
    } else {
        base_multiplier * (1.0 + shared)
    };

    CorrectionFactor {
        factor: factor.max(0.0),
        terms,
    }
}

/// Parses `WIDTHxHEIGHT` or a bare height into frame dimensions.
///
/// Bare heights assume a 16:9 frame. Non-digit characters inside each
/// `WIDTHxHEIGHT` component are ignored, so `1280x720p` parses; a descriptor
/// with more than one separator does not.
pub fn parse_dimensions(descriptor: &str) -> Option<(f64, f64)> {
    let descriptor = descriptor.trim();
    if descriptor.is_empty() {
        return None;
    }

    let parts: Vec<&str> = descriptor.split(['x', 'X']).collect();
    match parts[..] {
        [width, height] => {
            let width = digits_value(width)?;
            let height = digits_value(height)?;
            (width > 0.0 && height > 0.0).then_some((width, height))
        }
        [height] if height.chars().all(|c| c.is_ascii_digit()) => {
            let height: f64 = height.parse().ok()?;
            (height > 0.0).then_some(((height * 16.0 / 9.0).round(), height))
        }
        _ => None,
    }
}

fn digits_value(component: &str) -> Option<f64> {
    let digits: String = component.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Square root of the frame area relative to 1080p, floored at 0.1.
///
/// Unparsable descriptors scale by 1.0.
pub fn resolution_factor(descriptor: &str) -> f64 {
    match parse_dimensions(descriptor) {
        Some((width, height)) => (width * height / REFERENCE_AREA)
            .sqrt()
            .max(MIN_RESOLUTION_FACTOR),
        None => 1.0,
    }
}

/// Frame rate relative to 30 fps, clamped to `[0.6, 1.2]`.
///
/// Missing or invalid rates (zero, negative, non-finite) count as 30 fps.
pub fn fps_factor(fps: f64) -> f64 {
    let fps = if fps.is_finite() && fps > 0.0 {
        fps
    } else {
        REFERENCE_FPS
    };
    (fps / REFERENCE_FPS).clamp(MIN_FPS_FACTOR, MAX_FPS_FACTOR)
}

/// Symmetric band around a predicted duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VariationRange {
    pub min_hours: f64,
    pub max_hours: f64,
}

pub fn variation_range(base_hours: f64, margin: f64) -> VariationRange {
    VariationRange {
        min_hours: base_hours * (1.0 - margin),
        max_hours: base_hours * (1.0 + margin),
    }
}
