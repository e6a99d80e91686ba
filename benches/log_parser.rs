use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use wallpaper_extractor::services::LogParser;

/// A log with `items` ids, each subscribed, touched again and sometimes removed,
/// interleaved with lines for other apps
fn synthetic_log(items: u64) -> Vec<String> {
    let mut lines = Vec::new();
    for id in 0..items {
        let minute = id % 60;
        lines.push(format!(
            "[2024-03-01 10:{:02}:00] [AppID 431960] Detected workshop change : added subscribed item {}",
            minute, id
        ));
        lines.push(format!(
            "[2024-03-01 10:{:02}:30] [AppID 550] Detected workshop change : added subscribed item {}",
            minute, id
        ));
        if id % 3 == 0 {
            lines.push(format!(
                "[2024-03-01 11:{:02}:00] [AppID 431960] Detected workshop change : removing unsubscribed item {}",
                minute, id
            ));
        }
        if id % 7 == 0 {
            lines.push(format!(
                "[2024-03-01 12:{:02}:00] [AppID 431960] Detected workshop change : removing unused item {}",
                minute, id
            ));
        }
    }
    lines
}

fn bench_analyze(c: &mut Criterion) {
    let parser = LogParser::new();
    let lines = synthetic_log(10_000);

    c.bench_function("analyze_10k_items_unfiltered", |b| {
        b.iter(|| parser.analyze(black_box(&lines), None))
    });

    c.bench_function("analyze_10k_items_filtered", |b| {
        b.iter(|| parser.analyze(black_box(&lines), Some("2024-03-01 11:00:00")))
    });
}

criterion_group!(benches, bench_analyze);
criterion_main!(benches);
