use criterion::{criterion_group, criterion_main, Criterion};
use searchbox_core::snippet::build_snippet;
use searchbox_core::tokenizer::tokenize;
use std::collections::HashSet;

fn sample_text() -> String {
    "The quick brown fox jumps over the lazy dog; Pack my box with five dozen liquor jugs! "
        .repeat(500)
}

fn bench_tokenize(c: &mut Criterion) {
    let text = sample_text();
    c.bench_function("tokenize_sample", |b| b.iter(|| tokenize(&text)));
}

fn bench_snippet(c: &mut Criterion) {
    let text = sample_text();
    let terms: HashSet<String> = ["fox".to_string(), "jugs".to_string()].into_iter().collect();
    c.bench_function("snippet_sample", |b| b.iter(|| build_snippet(&text, &terms, 30)));
}

criterion_group!(benches, bench_tokenize, bench_snippet);
criterion_main!(benches);
