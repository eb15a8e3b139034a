use dvr_retention::{
    Codec,
    engine::{
        OverheadTerms,
        units::{
            UnitConvention, bytes_per_unit, correction_factor, fps_factor, parse_dimensions,
            resolution_factor, usable_megabytes, variation_range,
        },
    },
};

fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual}"
    );
}

fn overhead() -> OverheadTerms {
    OverheadTerms {
        container: 0.04,
        audio: 0.02,
        vbr: 0.08,
        filesystem: 0.01,
    }
}

#[test]
fn byte_multiples_follow_convention() {
    assert_eq!(bytes_per_unit(UnitConvention::Decimal), 1000.0);
    assert_eq!(bytes_per_unit(UnitConvention::Binary), 1024.0);
    assert_eq!(UnitConvention::from_decimal_flag(false), UnitConvention::Binary);
}

#[test]
fn switching_convention_scales_usable_space_by_1024_over_1000() {
    for capacity in [16.0, 32.0, 256.0] {
        let decimal = usable_megabytes(capacity, 0.9, UnitConvention::Decimal);
        let binary = usable_megabytes(capacity, 0.9, UnitConvention::Binary);
        assert_close(decimal, capacity * 0.9 * 1000.0, 1e-9);
        assert_close(binary / decimal, 1024.0 / 1000.0, 1e-12);
    }
}

#[test]
fn reference_codec_adds_every_overhead_term() {
    let correction = correction_factor(Codec::H264, 1.0, true, &overhead());
    assert_close(correction.factor, 1.15, 1e-12);
    assert_eq!(correction.terms.get("vbr"), Some(&0.08));
    assert_eq!(correction.terms.get("codec_multiplier"), Some(&1.0));
}

#[test]
fn compressed_codec_scales_without_vbr_term() {
    let correction = correction_factor(Codec::H265, 0.7, true, &overhead());
    assert_close(correction.factor, 0.7 * 1.07, 1e-12);
    assert!(!correction.terms.contains_key("vbr"));
}

#[test]
fn disabled_corrections_return_raw_multiplier() {
    let correction = correction_factor(Codec::H265, 0.7, false, &overhead());
    assert_eq!(correction.factor, 0.7);
    assert!(correction.terms.is_empty());
}

#[test]
fn correction_factor_never_negative() {
    let correction = correction_factor(Codec::H265, -2.0, true, &overhead());
    assert_eq!(correction.factor, 0.0);
}

#[test]
fn resolution_factor_parses_both_descriptor_forms() {
    assert_close(resolution_factor("1920x1080"), 1.0, 1e-12);
    assert_close(resolution_factor("1280x720"), 2.0 / 3.0, 1e-9);
    // 720 -> 1280x720 under the 16:9 assumption.
    assert_close(resolution_factor("720"), 2.0 / 3.0, 1e-9);
    assert_eq!(parse_dimensions("480"), Some((853.0, 480.0)));
    assert_eq!(parse_dimensions(" 1280x720p "), Some((1280.0, 720.0)));
    assert_eq!(parse_dimensions("1280x720x3"), None);
}

#[test]
fn resolution_factor_defaults_on_malformed_input() {
    for descriptor in [
        "", "HD", "0x720", "1280x", "-720", "720P", "1280x720x3", "1x2x3", "x",
    ] {
        assert_eq!(resolution_factor(descriptor), 1.0, "descriptor {descriptor:?}");
    }
}

#[test]
fn resolution_factor_is_floored() {
    assert_close(resolution_factor("16x9"), 0.1, 1e-12);
}

#[test]
fn fps_factor_clamps_and_defaults() {
    assert_close(fps_factor(25.0), 25.0 / 30.0, 1e-12);
    assert_eq!(fps_factor(5.0), 0.6);
    assert_eq!(fps_factor(90_000.0), 1.2);
    assert_eq!(fps_factor(0.0), 1.0);
    assert_eq!(fps_factor(f64::NAN), 1.0);
    assert_eq!(fps_factor(-15.0), 1.0);
}

#[test]
fn variation_range_is_symmetric() {
    let range = variation_range(10.0, 0.1);
    assert_close(range.min_hours, 9.0, 1e-12);
    assert_close(range.max_hours, 11.0, 1e-12);

    let unbounded = variation_range(f64::INFINITY, 0.1);
    assert!(unbounded.min_hours.is_infinite());
}
