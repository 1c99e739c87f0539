//! # adaptive-difficulty
//!
//! Adaptive difficulty engine for tutoring sessions.
//!
//! - [`processor`] - folds behavioral signals (frustration, repeat requests,
//!   questions, response latency, quiz results, flashcard ratings) into a
//!   learner profile with decay and EMA smoothing
//! - [`calculator`] - derives a bounded, explainable target difficulty from a
//!   profile snapshot, a mode and a subject
//! - [`codec`] - JSON transport for profiles; rejected input falls back to defaults
//! - [`directive`] - structured directive for the content generator
//! - [`engine`] - [`AdaptiveEngine`] facade over all of the above
//!
//! Everything is synchronous and free of I/O. The only mutation is the
//! in-place profile update performed by the processor.
//!
//! ```rust
//! use adaptive_difficulty::{
//!     AdaptiveDifficultyMode, AdaptiveEngine, ContextOptions, SignalInput,
//! };
//!
//! let engine = AdaptiveEngine::default();
//! let mut profile = engine.load_profile(None);
//! engine.apply_signal(&mut profile, &SignalInput::frustration(Some(1.0), "chat"));
//! engine.apply_signal(&mut profile, &SignalInput::quiz_result("Math", 80.0, "quiz"));
//!
//! let context = engine.calculate_context(
//!     &profile,
//!     &ContextOptions::new(AdaptiveDifficultyMode::Balanced).subject("math"),
//! );
//! assert!(context.target_difficulty <= context.constraints.max_difficulty);
//! let stored = engine.store_profile(&profile).unwrap();
//! assert_eq!(engine.load_profile(Some(stored.as_str())), profile);
//! ```

pub mod calculator;
pub mod codec;
pub mod config;
pub mod directive;
pub mod engine;
pub mod error;
pub mod numeric;
pub mod processor;
pub mod types;

pub use calculator::{calculate_adaptive_context, DifficultyCalculator};
pub use codec::{
    parse_adaptive_profile, serialize_adaptive_profile, try_parse_adaptive_profile,
    validate_adaptive_profile,
};
pub use config::AdaptiveConfig;
pub use directive::{AdaptiveDirective, DifficultyBand, DirectiveHint};
pub use engine::AdaptiveEngine;
pub use error::{ConfigError, ProfileDecodeError, ProfileEncodeError};
pub use processor::{
    apply_signal, apply_signal_at, ensure_subject_profile, ensure_subject_profile_at,
    update_global_signals, update_global_signals_at, update_subject_signals,
    update_subject_signals_at, SignalProcessor,
};
pub use types::*;
