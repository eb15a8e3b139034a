use dvr_retention::{
    CardSpec, Channel, Codec,
    engine::{
        EngineConfig,
        partition::{self, CardAssignment, EstimateRequest, PartitioningScheme},
        units::UnitConvention,
    },
};

fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual}"
    );
}

fn assignment(card_id: &str, channel_ids: &[&str]) -> CardAssignment {
    CardAssignment {
        card_id: card_id.into(),
        channel_ids: channel_ids.iter().map(|id| id.to_string()).collect(),
    }
}

fn split(cards: Vec<CardAssignment>) -> PartitioningScheme {
    PartitioningScheme::IndependentSplit { cards }
}

fn config_with_rate(mb_per_hour_per_mbps: f64) -> EngineConfig {
    EngineConfig {
        mb_per_hour_per_mbps,
        ..EngineConfig::default()
    }
}

#[test]
fn single_card_two_channels_matches_reference_figure() {
    let config = EngineConfig::default();
    let request = EstimateRequest::new(
        PartitioningScheme::Single,
        vec![Channel::new("OUT", 8.0), Channel::new("IN", 6.0)],
        CardSpec::new(32.0),
    );

    let result = partition::estimate(&config, &request);

    assert_eq!(result.total_bitrate_mbps, 14.0);
    assert_eq!((result.system_recording_hours * 100.0).round() / 100.0, 4.80);
    assert_close(result.system_recording_days, result.system_recording_hours / 24.0, 1e-12);
    assert_eq!(result.limiting_unit.as_deref(), Some("SD1"));
    assert_eq!(result.scheme, "single");
    assert!(result.warnings.is_empty());
}

#[test]
fn no_active_channels_is_unbounded() {
    let config = EngineConfig::default();
    let request = EstimateRequest::new(
        PartitioningScheme::Single,
        vec![Channel::new("CH1", 4.0).inactive(), Channel::new("CH2", 2.0).inactive()],
        CardSpec::new(64.0),
    );

    let result = partition::estimate(&config, &request);

    assert!(result.is_unbounded());
    assert_eq!(result.total_bitrate_mbps, 0.0);
    assert!(result.limiting_unit.is_none());
    assert!(result.per_channel.is_empty());
    assert!(result.variation_range.max_hours.is_infinite());
}

#[test]
fn raising_a_bitrate_strictly_shortens_duration() {
    let config = EngineConfig::default();
    let mut channels = vec![Channel::new("CH1", 2.0), Channel::new("CH2", 3.0)];
    let mut previous = f64::INFINITY;

    for bitrate in [0.5, 1.0, 2.0, 4.0, 8.0] {
        channels[0].bitrate_mbps = bitrate;
        let request =
            EstimateRequest::new(PartitioningScheme::Single, channels.clone(), CardSpec::new(32.0));
        let hours = partition::estimate(&config, &request).system_recording_hours;
        assert!(hours < previous, "{hours} >= {previous} at {bitrate} Mbps");
        previous = hours;
    }
}

#[test]
fn split_duration_only_follows_the_limiting_card() {
    let config = EngineConfig::default();
    let scheme = split(vec![assignment("SD1", &["CH1", "CH2"]), assignment("SD2", &["CH3"])]);
    let channels = vec![
        Channel::new("CH1", 4.0),
        Channel::new("CH2", 4.0),
        Channel::new("CH3", 2.0),
    ];
    let run = |channels: &[Channel]| {
        partition::estimate(
            &config,
            &EstimateRequest::new(scheme.clone(), channels.to_vec(), CardSpec::new(64.0)),
        )
    };
    let baseline = run(&channels);
    assert_eq!(baseline.limiting_unit.as_deref(), Some("SD1"));

    let mut other_card = channels.clone();
    other_card[2].bitrate_mbps = 3.0;
    let raised_elsewhere = run(&other_card);
    assert_eq!(raised_elsewhere.system_recording_hours, baseline.system_recording_hours);
    assert_eq!(raised_elsewhere.limiting_unit.as_deref(), Some("SD1"));

    let mut limiting_card = channels;
    limiting_card[0].bitrate_mbps = 5.0;
    let raised_on_limiting = run(&limiting_card);
    assert!(raised_on_limiting.system_recording_hours < baseline.system_recording_hours);
}

#[test]
fn mirror_duration_matches_single_card() {
    let config = EngineConfig::default();
    let channels = vec![
        Channel::new("CH1", 4.0),
        Channel::new("CH2", 3.0),
        Channel::new("CH3", 3.0),
    ];

    let one = partition::estimate(
        &config,
        &EstimateRequest::new(PartitioningScheme::Mirror { cards: 1 }, channels.clone(), CardSpec::new(32.0)),
    );
    let two = partition::estimate(
        &config,
        &EstimateRequest::new(PartitioningScheme::Mirror { cards: 2 }, channels, CardSpec::new(32.0)),
    );

    assert_eq!(one.system_recording_hours, two.system_recording_hours);
    assert_eq!((two.system_recording_hours * 100.0).round() / 100.0, 6.73);
    let ids: Vec<&str> = two.per_storage_unit.iter().map(|card| card.id.as_str()).collect();
    assert_eq!(ids, vec!["SD1", "SD2"]);
    assert_eq!(two.per_channel.len(), 3);
    assert_eq!(two.total_bitrate_mbps, 10.0);
}

#[test]
fn split_is_limited_by_the_fuller_card() {
    let config = config_with_rate(400.0);
    let request = EstimateRequest::new(
        split(vec![assignment("SD1", &["CH1", "CH2"]), assignment("SD2", &["CH3", "CH4"])]),
        vec![
            Channel::new("CH1", 10.0),
            Channel::new("CH2", 12.5),
            Channel::new("CH3", 9.0),
            Channel::new("CH4", 6.0),
        ],
        CardSpec::new(100.0),
    );

    let result = partition::estimate(&config, &request);

    assert_close(result.storage_unit("SD1").expect("SD1").recording_hours, 10.0, 1e-9);
    assert_close(result.storage_unit("SD2").expect("SD2").recording_hours, 15.0, 1e-9);
    assert_close(result.system_recording_hours, 10.0, 1e-9);
    assert_eq!(result.limiting_unit.as_deref(), Some("SD1"));
    assert_eq!(result.total_bitrate_mbps, 37.5);
}

#[test]
fn split_tie_reports_shared_duration() {
    let config = config_with_rate(450.0);
    let request = EstimateRequest::new(
        split(vec![
            assignment("SD1", &["CH1", "CH2", "CH3"]),
            assignment("SD2", &["CH4", "CH5"]),
        ]),
        vec![
            Channel::new("CH1", 8.0),
            Channel::new("CH2", 6.0),
            Channel::new("CH3", 6.0),
            Channel::new("CH4", 12.0),
            Channel::new("CH5", 8.0),
        ],
        CardSpec::new(100.0),
    );

    let result = partition::estimate(&config, &request);

    assert_close(result.system_recording_hours, 10.0, 1e-9);
    let limiting = result.limiting_unit.expect("limiting card");
    assert!(limiting == "SD1" || limiting == "SD2");
}

#[test]
fn split_card_without_active_channels_imposes_no_constraint() {
    let config = EngineConfig::default();
    let request = EstimateRequest::new(
        split(vec![assignment("SD1", &["CH1"]), assignment("SD2", &["CH2"])]),
        vec![Channel::new("CH1", 4.0), Channel::new("CH2", 4.0).inactive()],
        CardSpec::new(64.0),
    );

    let result = partition::estimate(&config, &request);

    assert!(result.storage_unit("SD2").expect("SD2").recording_hours.is_infinite());
    assert_eq!(
        result.system_recording_hours,
        result.storage_unit("SD1").expect("SD1").recording_hours
    );
    assert_eq!(result.limiting_unit.as_deref(), Some("SD1"));
}

#[test]
fn split_warns_about_unassigned_channels() {
    let config = EngineConfig::default();
    let request = EstimateRequest::new(
        split(vec![assignment("SD1", &["CH1"])]),
        vec![Channel::new("CH1", 4.0), Channel::new("CH9", 2.0)],
        CardSpec::new(64.0),
    );

    let result = partition::estimate(&config, &request);

    assert_eq!(result.total_bitrate_mbps, 4.0);
    assert!(result.warnings.iter().any(|w| w.contains("CH9") && w.contains("not assigned")));
}

#[test]
fn split_counts_a_channel_listed_twice_only_once() {
    let config = EngineConfig::default();
    let request = EstimateRequest::new(
        split(vec![assignment("SD1", &["CH1"]), assignment("SD2", &["CH1", "CH2"])]),
        vec![Channel::new("CH1", 4.0), Channel::new("CH2", 2.0)],
        CardSpec::new(64.0),
    );

    let result = partition::estimate(&config, &request);

    assert_eq!(result.storage_unit("SD2").expect("SD2").assigned_channel_ids, vec!["CH2"]);
    assert_eq!(result.total_bitrate_mbps, 6.0);
}

#[test]
fn corrections_toggle_changes_factors_but_not_duration() {
    let channels = vec![
        Channel::new("CH1", 4.0),
        Channel::new("CH2", 2.0).with_codec(Codec::H265),
    ];
    let request = EstimateRequest::new(PartitioningScheme::Single, channels, CardSpec::new(64.0));

    let enabled = partition::estimate(&EngineConfig::default(), &request);
    let disabled = partition::estimate(&EngineConfig::default().with_corrections(false), &request);

    assert_eq!(enabled.system_recording_hours, disabled.system_recording_hours);
    for (on, off) in enabled.per_channel.iter().zip(&disabled.per_channel) {
        assert_ne!(on.correction_factor, off.correction_factor, "channel {}", on.id);
        assert!(off.correction_terms.is_empty());
    }
}

#[test]
fn binary_units_extend_duration_by_2_4_percent() {
    let request = EstimateRequest::new(
        PartitioningScheme::Single,
        vec![Channel::new("CH1", 4.0)],
        CardSpec::new(32.0),
    );

    let decimal = partition::estimate(&EngineConfig::default(), &request);
    let binary = partition::estimate(
        &EngineConfig::default().with_units(UnitConvention::Binary),
        &request,
    );

    assert_eq!(binary.units, UnitConvention::Binary);
    assert_close(
        binary.system_recording_hours / decimal.system_recording_hours,
        1.024,
        1e-12,
    );
}

#[test]
fn card_usable_fraction_overrides_engine_default() {
    let config = EngineConfig::default();
    let channels = vec![Channel::new("CH1", 4.0)];
    let full = partition::estimate(
        &config,
        &EstimateRequest::new(
            PartitioningScheme::Single,
            channels.clone(),
            CardSpec::new(32.0).with_usable_fraction(1.0),
        ),
    );
    let default = partition::estimate(
        &config,
        &EstimateRequest::new(PartitioningScheme::Single, channels, CardSpec::new(32.0)),
    );

    assert_close(full.system_recording_hours / default.system_recording_hours, 1.0 / 0.9, 1e-12);
}

#[test]
fn ceiling_and_range_warnings_are_attached() {
    let config = EngineConfig::default();
    let mut request = EstimateRequest::new(
        PartitioningScheme::Single,
        vec![Channel::new("OUT", 8.0), Channel::new("IN", 6.0)],
        CardSpec::new(32.0),
    )
    .with_ceiling(12.0);
    request.bitrate_ranges.insert(
        "IN".into(),
        dvr_retention::engine::policy::BitrateRange {
            min_mbps: 3.0,
            max_mbps: 4.0,
        },
    );

    let result = partition::estimate(&config, &request);

    assert_eq!(result.warnings.len(), 2);
    assert!(result.warnings.iter().any(|w| w.contains("exceeds hardware ceiling")));
    assert!(result.warnings.iter().any(|w| w.contains("channel IN")));
    assert!(result.system_recording_hours.is_finite());
}

#[test]
fn limiting_card_of_empty_slice_is_unbounded() {
    let (hours, limiting) = partition::limiting_card(&[]);
    assert!(hours.is_infinite());
    assert!(limiting.is_none());
}

#[test]
fn scheme_metadata() {
    let scheme = split(vec![assignment("SD1", &["CH1"]), assignment("SD2", &["CH2"])]);
    assert_eq!(scheme.label(), "independent-split");
    assert_eq!(scheme.card_count(), 2);
    assert_eq!(scheme.card_for_channel("CH2"), Some("SD2"));
    assert_eq!(PartitioningScheme::Single.card_for_channel("CH1"), None);
    assert_eq!(PartitioningScheme::Mirror { cards: 0 }.card_count(), 1);
}
