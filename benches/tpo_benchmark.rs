use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use market_profile::market_profile::{
    compute_volume_profile, BlockSize, PriceQuantizer, TickSizeSetting, TpoOptions, VolumeProfileOptions,
};
use market_profile::render::{LinearPriceScale, Rect, RecordingCanvas};
use market_profile::{candles_from_json, compute_tpo_profiles, Candle, ProfileRenderPrimitive, RenderOptions};

const DAY_ONE: i64 = 1_704_153_600;

fn minute_candles(count: usize, start_price: f64) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let price = start_price + ((i % 240) as f64 - 120.0).abs() * 0.1;
            Candle::new(DAY_ONE + i as i64 * 60, price, price + 0.8, price - 0.6, price + 0.2, 500.0)
        })
        .collect()
}

fn bench_tpo_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("tpo_pipeline");

    for count in [1_440usize, 10_080, 43_200] {
        let candles = minute_candles(count, 100.0);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("auto_tick_30m", count), &candles, |b, candles| {
            let options = TpoOptions::default();
            b.iter(|| compute_tpo_profiles(black_box(candles), &options))
        });

        group.bench_with_input(BenchmarkId::new("fixed_tick_5m", count), &candles, |b, candles| {
            let options = TpoOptions {
                block_size: BlockSize::M5,
                tick_size: TickSizeSetting::Fixed(0.05),
                ..Default::default()
            };
            b.iter(|| compute_tpo_profiles(black_box(candles), &options))
        });
    }

    group.finish();
}

fn bench_volume_profile(c: &mut Criterion) {
    let candles = minute_candles(10_080, 100.0);
    let options = VolumeProfileOptions::default();

    c.bench_function("volume_profile_week", |b| {
        b.iter(|| compute_volume_profile(black_box(&candles), &options))
    });
}

fn bench_quantizer(c: &mut Criterion) {
    let quantizer = PriceQuantizer::new(0.25);

    c.bench_function("price_levels_100", |b| {
        b.iter(|| quantizer.price_levels(black_box(100.0), black_box(125.0)))
    });
}

fn bench_candle_decoding(c: &mut Criterion) {
    let payload = serde_json::json!(minute_candles(10_080, 100.0));

    c.bench_function("candles_from_json_week", |b| {
        b.iter(|| candles_from_json(black_box(&payload)))
    });
}

fn bench_render(c: &mut Criterion) {
    let candles = minute_candles(1_440, 100.0);
    let sessions = compute_tpo_profiles(&candles, &TpoOptions::default())
        .map(|r| r.sessions)
        .unwrap_or_default();

    let mut primitive = ProfileRenderPrimitive::new(RenderOptions::default());
    primitive.attach(Box::new(LinearPriceScale::new(130.0, 90.0, 0.0, 900.0)), None);
    primitive.set_data(sessions);
    let viewport = Rect::from_ltwh(0.0, 0.0, 1600.0, 900.0);

    c.bench_function("render_latest_session", |b| {
        b.iter(|| {
            let mut canvas = RecordingCanvas::new();
            primitive.draw(&mut canvas, viewport);
            black_box(canvas.len())
        })
    });
}

criterion_group!(
    benches,
    bench_tpo_pipeline,
    bench_volume_profile,
    bench_quantizer,
    bench_candle_decoding,
    bench_render
);
criterion_main!(benches);
