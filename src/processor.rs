//! Signal processing: decay plus EMA updates applied to a profile in place.
//!
//! Every function here takes `&mut AdaptiveProfile`, so within one process
//! the borrow checker already guarantees a single writer. Across requests
//! the caller must serialize read-modify-write cycles per learner (a
//! per-key lock, optimistic versioning or a single-writer queue); two
//! concurrent load/update/store cycles on the same learner lose updates.

use chrono::{DateTime, Utc};

use crate::config::SignalParams;
use crate::numeric::{clamp, ema};
use crate::types::{
    normalize_subject_key, AdaptiveContext, AdaptiveProfile, FlashcardRating, SignalInput,
    SignalKind, SubjectProfile, MAX_MASTERY,
};

pub struct SignalProcessor {
    params: SignalParams,
}

impl SignalProcessor {
    pub fn new(params: SignalParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SignalParams {
        &self.params
    }

    /// A profile with no history under these parameters.
    pub fn default_profile(&self, now: DateTime<Utc>) -> AdaptiveProfile {
        let mut profile = AdaptiveProfile::new(now);
        profile.global.average_response_ms = self.params.default_average_response_ms;
        profile
    }

    /// Decay the rate signals, then fold in `signal` if it is a global one.
    ///
    /// Decay runs for every signal type, including subject-only signals and
    /// response-time signals that carry no usable sample.
    pub fn update_global_signals(
        &self,
        profile: &mut AdaptiveProfile,
        signal: &SignalInput,
        now: DateTime<Utc>,
    ) {
        let p = &self.params;
        let global = &mut profile.global;

        global.frustration *= p.decay_factor;
        global.repeat_rate *= p.decay_factor;
        global.question_rate *= p.decay_factor;

        match &signal.kind {
            SignalKind::Frustration { value } => {
                let sample = value.unwrap_or(1.0);
                if sample.is_finite() {
                    global.frustration =
                        clamp(ema(global.frustration, sample, p.frustration_alpha), 0.0, 1.0);
                } else {
                    tracing::debug!(
                        source = %signal.source,
                        "Ignoring non-finite frustration value"
                    );
                }
            }
            SignalKind::RepeatRequest => {
                global.repeat_rate = clamp(ema(global.repeat_rate, 1.0, p.repeat_alpha), 0.0, 1.0);
            }
            SignalKind::Question => {
                global.question_rate =
                    clamp(ema(global.question_rate, 1.0, p.question_alpha), 0.0, 1.0);
            }
            SignalKind::ResponseTimeMs { response_time_ms } => {
                if let Some(ms) = response_time_ms.filter(|ms| ms.is_finite() && *ms > 0.0) {
                    global.average_response_ms =
                        ema(global.average_response_ms, ms, p.response_time_alpha);
                }
            }
            SignalKind::QuizResult { .. } | SignalKind::FlashcardRating { .. } => {}
        }

        global.clamp_ranges();
        global.last_updated_at = now;
        profile.updated_at = now;
    }

    /// Update subject mastery for quiz results and flashcard ratings.
    ///
    /// Signals without a usable subject or payload are skipped.
    pub fn update_subject_signals(
        &self,
        profile: &mut AdaptiveProfile,
        signal: &SignalInput,
        now: DateTime<Utc>,
    ) {
        let p = &self.params;
        match &signal.kind {
            SignalKind::QuizResult { subject, value } => {
                let (Some(subject), Some(score)) = (subject, value.filter(|v| v.is_finite())) else {
                    tracing::debug!(
                        source = %signal.source,
                        "Skipping quiz_result without subject or score"
                    );
                    return;
                };
                let Some(entry) = self.ensure_subject_profile(profile, subject, now) else {
                    return;
                };
                let score = clamp(score, 0.0, MAX_MASTERY);
                entry.mastery = clamp(ema(entry.mastery, score, p.quiz_alpha), 0.0, MAX_MASTERY);
                entry.last_quiz_score = Some(score);
                entry.last_updated_at = now;
            }
            SignalKind::FlashcardRating { subject, rating } => {
                let Some(subject) = subject else {
                    tracing::debug!(
                        source = %signal.source,
                        "Skipping flashcard_rating without subject"
                    );
                    return;
                };
                let delta = self.flashcard_delta(rating.unwrap_or_default());
                let Some(entry) = self.ensure_subject_profile(profile, subject, now) else {
                    return;
                };
                entry.mastery = clamp(entry.mastery + delta, 0.0, MAX_MASTERY);
                entry.last_updated_at = now;
            }
            _ => return,
        }
        profile.updated_at = now;
    }

    /// Global update followed by the subject update.
    pub fn apply_signal(
        &self,
        profile: &mut AdaptiveProfile,
        signal: &SignalInput,
        now: DateTime<Utc>,
    ) {
        tracing::debug!(
            signal = signal.kind.as_str(),
            source = %signal.source,
            subject = signal.kind.subject().unwrap_or(""),
            "Applying adaptive signal"
        );
        self.update_global_signals(profile, signal, now);
        self.update_subject_signals(profile, signal, now);
    }

    /// Resolve the subject entry, creating it with defaults on first use.
    ///
    /// Returns `None`, leaving `profile.subjects` untouched, for empty or
    /// reserved subject names.
    pub fn ensure_subject_profile<'a>(
        &self,
        profile: &'a mut AdaptiveProfile,
        subject: &str,
        now: DateTime<Utc>,
    ) -> Option<&'a mut SubjectProfile> {
        let Some(key) = normalize_subject_key(subject) else {
            tracing::warn!(subject = %subject, "Rejected subject key");
            return None;
        };
        Some(profile.subjects.entry(key).or_insert_with(|| {
            SubjectProfile::new(
                self.params.default_mastery,
                self.params.default_target_difficulty,
                now,
            )
        }))
    }

    /// Store the calculator's target on the subject it was computed for.
    pub fn record_target_difficulty(
        &self,
        profile: &mut AdaptiveProfile,
        context: &AdaptiveContext,
        now: DateTime<Utc>,
    ) {
        let Some(subject) = context.subject.as_deref() else {
            return;
        };
        if let Some(entry) = self.ensure_subject_profile(profile, subject, now) {
            entry.target_difficulty = context.target_difficulty;
            entry.clamp_ranges();
            entry.last_updated_at = now;
            profile.updated_at = now;
        }
    }

    fn flashcard_delta(&self, rating: FlashcardRating) -> f64 {
        let deltas = &self.params.flashcard;
        match rating {
            FlashcardRating::Again => deltas.again,
            FlashcardRating::Hard => deltas.hard,
            FlashcardRating::Good => deltas.good,
            FlashcardRating::Easy => deltas.easy,
        }
    }
}

impl Default for SignalProcessor {
    fn default() -> Self {
        Self::new(SignalParams::default())
    }
}

pub fn update_global_signals(profile: &mut AdaptiveProfile, signal: &SignalInput) {
    update_global_signals_at(profile, signal, Utc::now());
}

pub fn update_global_signals_at(
    profile: &mut AdaptiveProfile,
    signal: &SignalInput,
    now: DateTime<Utc>,
) {
    SignalProcessor::default().update_global_signals(profile, signal, now);
}

pub fn update_subject_signals(profile: &mut AdaptiveProfile, signal: &SignalInput) {
    update_subject_signals_at(profile, signal, Utc::now());
}

pub fn update_subject_signals_at(
    profile: &mut AdaptiveProfile,
    signal: &SignalInput,
    now: DateTime<Utc>,
) {
    SignalProcessor::default().update_subject_signals(profile, signal, now);
}

pub fn apply_signal(profile: &mut AdaptiveProfile, signal: &SignalInput) {
    apply_signal_at(profile, signal, Utc::now());
}

pub fn apply_signal_at(profile: &mut AdaptiveProfile, signal: &SignalInput, now: DateTime<Utc>) {
    SignalProcessor::default().apply_signal(profile, signal, now);
}

pub fn ensure_subject_profile<'a>(
    profile: &'a mut AdaptiveProfile,
    subject: &str,
) -> Option<&'a mut SubjectProfile> {
    ensure_subject_profile_at(profile, subject, Utc::now())
}

pub fn ensure_subject_profile_at<'a>(
    profile: &'a mut AdaptiveProfile,
    subject: &str,
    now: DateTime<Utc>,
) -> Option<&'a mut SubjectProfile> {
    SignalProcessor::default().ensure_subject_profile(profile, subject, now)
}
