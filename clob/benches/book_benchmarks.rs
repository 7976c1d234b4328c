use clob::book::Book;
use clob::types::Side;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

// Benchmark for resting a limit order in an empty book
fn bench_resting_limit_order(c: &mut Criterion) {
    c.bench_function("rest_limit_order", |b| {
        b.iter_with_setup(Book::new, |mut book| {
            black_box(book.place_limit(1, 1, Side::Bid, 10100, 10)).ok();
        })
    });
}

// Benchmark for an immediately matching limit order
fn bench_immediate_match(c: &mut Criterion) {
    c.bench_function("immediate_match_limit", |b| {
        b.iter_with_setup(
            || {
                let mut book = Book::new();
                book.place_limit(1, 1, Side::Ask, 10100, 10).unwrap();
                book
            },
            |mut book| {
                black_box(book.place_limit(2, 2, Side::Bid, 10100, 5)).ok();
            },
        )
    });
}

// Benchmark for a market order sweeping several price levels
fn bench_market_order_sweep(c: &mut Criterion) {
    c.bench_function("market_order_sweep", |b| {
        b.iter_with_setup(
            || {
                let mut book = Book::new();
                // Populate the ask side
                for i in 0..10 {
                    book.place_limit(i + 1, 1, Side::Ask, 10100 + i, 10).unwrap();
                }
                book
            },
            |mut book| {
                black_box(book.place_market(100, 2, Side::Bid, 25)).ok();
            },
        )
    });
}

// Benchmark for cancelling a resting order
fn bench_order_cancellation(c: &mut Criterion) {
    c.bench_function("cancel_order", |b| {
        b.iter_with_setup(
            || {
                let mut book = Book::new();
                book.place_limit(1, 1, Side::Bid, 10100, 10).unwrap();
                book
            },
            |mut book| {
                black_box(book.cancel(1)).ok();
            },
        )
    });
}

// Benchmark for placements into a populated book
fn bench_deep_book_insert(c: &mut Criterion) {
    c.bench_function("insert_into_deep_book", |b| {
        b.iter_with_setup(
            || {
                let mut book = Book::new();
                for i in 0..500 {
                    book.place_limit(i + 1, 1, Side::Bid, 9000 + i, 5).unwrap();
                    book.place_limit(i + 1000, 2, Side::Ask, 10000 + i, 5).unwrap();
                }
                book
            },
            |mut book| {
                black_box(book.place_limit(5000, 3, Side::Bid, 9250, 5)).ok();
            },
        )
    });
}

criterion_group!(
    benches,
    bench_resting_limit_order,
    bench_immediate_match,
    bench_market_order_sweep,
    bench_order_cancellation,
    bench_deep_book_insert
);
criterion_main!(benches);
