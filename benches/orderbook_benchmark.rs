//! Benchmarks for order book and codec operations

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use market_gateway::adapter::{OkxAdapter, ParsedBook, PriceLevel, VenueAdapter};
use market_gateway::feed::codec;
use market_gateway::orderbook::OrderBook;
use market_gateway::Venue;

fn levels(count: usize, base: u64, step: i64) -> Vec<PriceLevel> {
    (0..count)
        .map(|i| PriceLevel {
            price: (base as i64 + step * i as i64) as u64,
            quantity: 1.5,
        })
        .collect()
}

fn sample_update(count: usize) -> ParsedBook {
    ParsedBook {
        instrument: "ETH-USDT-SWAP".to_string(),
        is_snapshot: true,
        timestamp_ms: 1_700_000_000_000,
        bids: levels(count, 5_000_000_000_000, -100_000_000),
        asks: levels(count, 5_000_100_000_000, 100_000_000),
    }
}

fn benchmark_apply_snapshot(c: &mut Criterion) {
    let update = sample_update(100);

    c.bench_function("apply_snapshot_100_levels", |b| {
        b.iter(|| {
            let book = OrderBook::new();
            book.apply_snapshot(black_box(&update.bids), black_box(&update.asks));
        })
    });
}

fn benchmark_apply_delta(c: &mut Criterion) {
    let update = sample_update(100);
    let book = OrderBook::new();
    book.apply_snapshot(&update.bids, &update.asks);

    let delta_bids = levels(1, 4_999_900_000_000, 0);
    let delta_asks = levels(1, 5_000_200_000_000, 0);

    c.bench_function("apply_delta", |b| {
        b.iter(|| {
            book.apply_delta(black_box(&delta_bids), black_box(&delta_asks));
        })
    });

    c.bench_function("bbo", |b| {
        b.iter(|| {
            black_box(book.bbo());
        })
    });
}

fn benchmark_codec(c: &mut Criterion) {
    let update = sample_update(50);
    let mut buf = Vec::with_capacity(4096);

    c.bench_function("encode_datagram_50_levels", |b| {
        b.iter(|| {
            codec::encode(black_box(&update), Venue::Okx, 42, &mut buf);
            black_box(&buf);
        })
    });

    codec::encode(&update, Venue::Okx, 42, &mut buf);
    c.bench_function("decode_datagram_50_levels", |b| {
        b.iter(|| {
            black_box(codec::decode(black_box(&buf)));
        })
    });
}

fn benchmark_parse_book(c: &mut Criterion) {
    let adapter = OkxAdapter;
    let frame = r#"{"arg":{"channel":"books5","instId":"ETH-USDT-SWAP"},"data":[{"bids":[["2500.10","1.5"],["2500.00","2.0"],["2499.90","0.5"]],"asks":[["2500.20","1.0"],["2500.30","3.0"]],"ts":"1700000000000"}]}"#;

    c.bench_function("parse_okx_books5", |b| {
        b.iter(|| {
            black_box(adapter.parse_book(black_box(frame)));
        })
    });
}

criterion_group!(
    benches,
    benchmark_apply_snapshot,
    benchmark_apply_delta,
    benchmark_codec,
    benchmark_parse_book
);
criterion_main!(benches);
