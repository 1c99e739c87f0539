//! Benchmark suite for adaptive-difficulty
//!
//! Run with: cargo bench

use adaptive_difficulty::{
    calculate_adaptive_context, parse_adaptive_profile, serialize_adaptive_profile,
    AdaptiveDifficultyMode, AdaptiveProfile, ContextOptions, FlashcardRating, SignalInput,
    SignalProcessor,
};
use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn sample_profile() -> AdaptiveProfile {
    let processor = SignalProcessor::default();
    let mut profile = processor.default_profile(Utc::now());
    let now = Utc::now();
    for i in 0..20 {
        let subject = format!("subject-{i}");
        let quiz = SignalInput::quiz_result(&subject, 70.0, "quiz");
        processor.apply_signal(&mut profile, &quiz, now);
        processor.apply_signal(
            &mut profile,
            &SignalInput::flashcard_rating(&subject, FlashcardRating::Hard, "deck"),
            now,
        );
    }
    profile
}

fn bench_apply_signal(c: &mut Criterion) {
    let processor = SignalProcessor::default();
    let signal = SignalInput::quiz_result("math", 82.0, "quiz");
    let now = Utc::now();
    c.bench_function("SignalProcessor::apply_signal", |b| {
        let mut profile = sample_profile();
        b.iter(|| processor.apply_signal(&mut profile, black_box(&signal), now))
    });
}

fn bench_calculate_context(c: &mut Criterion) {
    let profile = sample_profile();
    let options = ContextOptions::new(AdaptiveDifficultyMode::Automatic)
        .subject("subject-7")
        .pragmatic(true);
    c.bench_function("calculate_adaptive_context", |b| {
        b.iter(|| calculate_adaptive_context(black_box(&profile), black_box(&options)))
    });
}

fn bench_codec(c: &mut Criterion) {
    let profile = sample_profile();
    let text = serialize_adaptive_profile(&profile).unwrap_or_default();
    c.bench_function("parse_adaptive_profile", |b| {
        b.iter(|| parse_adaptive_profile(black_box(Some(text.as_str()))))
    });
}

criterion_group!(benches, bench_apply_signal, bench_calculate_context, bench_codec);
criterion_main!(benches);
