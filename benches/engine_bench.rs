use criterion::{Criterion, criterion_group, criterion_main};
use dvr_retention::{
    CardSpec, Channel,
    engine::{
        EngineConfig,
        partition::{self, CardAssignment, EstimateRequest, PartitioningScheme},
        reverse,
    },
};

fn channels(count: usize) -> Vec<Channel> {
    (0..count)
        .map(|index| Channel::new(format!("CH{}", index + 1), 1.0 + (index % 4) as f64))
        .collect()
}

fn halves(channels: &[Channel]) -> PartitioningScheme {
    let (first, second) = channels.split_at(channels.len() / 2);
    let ids = |slice: &[Channel]| slice.iter().map(|c| c.id.clone()).collect();
    PartitioningScheme::IndependentSplit {
        cards: vec![
            CardAssignment {
                card_id: "SD1".into(),
                channel_ids: ids(first),
            },
            CardAssignment {
                card_id: "SD2".into(),
                channel_ids: ids(second),
            },
        ],
    }
}

fn bench_estimate(c: &mut Criterion) {
    let config = EngineConfig::default();
    let mut group = c.benchmark_group("estimate");
    for &count in &[2usize, 5, 16, 64] {
        let channels = channels(count);
        for scheme in [
            PartitioningScheme::Single,
            PartitioningScheme::Mirror { cards: 2 },
            halves(&channels),
        ] {
            let label = format!("{}_{count}", scheme.label());
            let request = EstimateRequest::new(scheme, channels.clone(), CardSpec::new(128.0));
            group.bench_function(label, |b| b.iter(|| partition::estimate(&config, &request)));
        }
    }
    group.finish();
}

fn bench_reverse(c: &mut Criterion) {
    let config = EngineConfig::default();
    c.bench_function("reverse_suggest", |b| {
        b.iter(|| reverse::reverse_suggest(64.0, 72.0, 4, &config, reverse::DEFAULT_SUGGESTION_LIMIT))
    });
}

criterion_group!(benches, bench_estimate, bench_reverse);
criterion_main!(benches);
