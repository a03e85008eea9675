use criterion::{criterion_group, criterion_main, Criterion};
use search_core::tokenizer::tokenize;
use search_core::{Generation, Message};
use time::macros::datetime;
use time::Duration;

const WORDS: &[&str] = &[
    "book", "flight", "Paris", "dinner", "table", "urgent", "jet", "hotel", "suite", "car", "tonight",
    "tomorrow", "please", "confirm", "reservation", "tickets", "opera", "yacht", "villa", "spa",
];

fn synthetic(n: usize) -> Vec<Message> {
    let base = datetime!(2025-01-01 0:00 UTC);
    (0..n)
        .map(|i| {
            let text: Vec<&str> = (0..12).map(|k| WORDS[(i * 7 + k * 13) % WORDS.len()]).collect();
            Message::new(
                format!("{i:08}"),
                format!("member{}", i % 97),
                text.join(" "),
                base + Duration::seconds(i as i64),
            )
        })
        .collect()
}

fn bench_tokenize(c: &mut Criterion) {
    let text = "Please book a private jet to Paris for this Friday, and confirm the villa!";
    c.bench_function("tokenize_message", |b| b.iter(|| tokenize(text)));
}

fn bench_search(c: &mut Criterion) {
    let generation = Generation::build(1, synthetic(50_000)).expect("unique ids");
    let engine = generation.engine();
    c.bench_function("search_single_term", |b| b.iter(|| engine.search("flight", 1, 10)));
    c.bench_function("search_two_terms", |b| b.iter(|| engine.search("flight urgent", 3, 10)));
    c.bench_function("search_author", |b| b.iter(|| engine.search("@member42 paris", 1, 10)));
}

criterion_group!(benches, bench_tokenize, bench_search);
criterion_main!(benches);
