use criterion::{Criterion, black_box, criterion_group, criterion_main};
use partylaps::timing::{LapCurve, LapRecorder, LapSample, ReferencePolicy, reference_time};
use partylaps::{AppConfig, RecordBook, SessionTracker, TelemetryFrame};
use std::time::Duration;

/// A 100 s lap sampled at 60 Hz
fn create_sample_curve() -> LapCurve {
    let samples = (0..6000)
        .map(|i| LapSample::new(i as f32 / 6000., (i as u32 * 100_000) / 6000))
        .chain(std::iter::once(LapSample::new(1., 100_000)))
        .collect();
    LapCurve::from_samples(samples)
}

fn bench_delta(c: &mut Criterion) {
    let mut group = c.benchmark_group("delta");
    let curve = create_sample_curve();

    group.bench_function("delta_lap_start", |b| {
        b.iter(|| black_box(curve.delta(black_box(0.01), black_box(1_050))));
    });

    group.bench_function("delta_lap_end", |b| {
        b.iter(|| black_box(curve.delta(black_box(0.99), black_box(99_500))));
    });

    group.finish();
}

fn bench_recorder(c: &mut Criterion) {
    let mut group = c.benchmark_group("recorder");

    group.bench_function("record_full_lap", |b| {
        b.iter(|| {
            let mut recorder = LapRecorder::new();
            for i in 0..6000u32 {
                recorder.record(i as f32 / 6000., i * 16);
            }
            black_box(recorder.finalize(96_000))
        });
    });

    group.finish();
}

fn bench_reference(c: &mut Criterion) {
    let mut group = c.benchmark_group("reference");
    let laps: Vec<u32> = (0..200).map(|i| 95_000 + (i * 7_919) % 5_000).collect();

    for policy in [ReferencePolicy::Median, ReferencePolicy::Top25] {
        group.bench_function(format!("{:?}_200_laps", policy), |b| {
            b.iter(|| black_box(reference_time(policy, black_box(&laps), 95_000)));
        });
    }

    group.finish();
}

fn bench_session_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");
    let config = AppConfig::default();

    group.bench_function("update_frame", |b| {
        let mut tracker = SessionTracker::new(RecordBook::default());
        let mut lap_time_ms = 0u32;
        b.iter(|| {
            lap_time_ms = (lap_time_ms + 16) % 100_000;
            let frame = TelemetryFrame {
                session_id: 1,
                laps_completed: 3,
                lap_time_ms,
                track_position: lap_time_ms as f32 / 100_000.,
                ..TelemetryFrame::default()
            };
            black_box(tracker.update(&frame, &config))
        });
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets = bench_delta, bench_recorder, bench_reference, bench_session_frame
}
criterion_main!(benches);
