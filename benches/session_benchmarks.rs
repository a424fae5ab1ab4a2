//! Session Engine Benchmarks
//!
//! Measures id generation and the decision path against the in-memory store.
//!
//! Run with: cargo bench --bench session_benchmarks

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use turnstile::{
    Claims, CookieSettings, MemorySessionStore, SessionEngine, find_cookie, generate_session_id,
};

fn bench_token(c: &mut Criterion) {
    let mut group = c.benchmark_group("token");

    group.bench_function("generate", |b| {
        b.iter(|| black_box(generate_session_id().unwrap()))
    });

    group.finish();
}

fn bench_cookie(c: &mut Criterion) {
    let mut group = c.benchmark_group("cookie");
    let sid = generate_session_id().unwrap();
    let header = format!("theme=dark; lang=en; sessionid={}; tracking=off", sid);
    let settings = CookieSettings::default();

    group.bench_function("find", |b| {
        b.iter(|| black_box(find_cookie(black_box(&header), "sessionid")))
    });

    group.bench_function("set_cookie", |b| {
        b.iter(|| black_box(settings.set_cookie(black_box(&sid))))
    });

    group.finish();
}

fn bench_decide(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("decide");

    let engine = SessionEngine::new(Arc::new(MemorySessionStore::new()));
    let claims = Claims::new("alice", "teamA");
    let sid = rt
        .block_on(engine.decide(None, Some(&claims)))
        .unwrap()
        .new_session()
        .cloned()
        .unwrap();

    group.bench_function("live_cookie", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(engine.decide(Some(sid.as_str()), None).await.unwrap())
        })
    });

    group.bench_function("malformed_cookie", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(engine.decide(Some("abc123"), None).await.unwrap())
        })
    });

    group.bench_function("deny", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(engine.decide(None, None).await.unwrap()) })
    });

    group.bench_function("mint", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(engine.decide(None, Some(&claims)).await.unwrap())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_token, bench_cookie, bench_decide);
criterion_main!(benches);
