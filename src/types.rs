use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::numeric::clamp;

/// Subject keys that would alias object internals in a dynamic runtime.
/// Rejected so that profiles stay portable to consumers keyed by plain objects.
pub const RESERVED_SUBJECT_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

pub const DEFAULT_AVERAGE_RESPONSE_MS: f64 = 12000.0;
pub const DEFAULT_SUBJECT_MASTERY: f64 = 50.0;
pub const DEFAULT_TARGET_DIFFICULTY: f64 = 3.0;

pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 5.0;
pub const MAX_MASTERY: f64 = 100.0;

/// Lowercased, trimmed subject key, or `None` for empty and reserved names.
pub fn normalize_subject_key(raw: &str) -> Option<String> {
    let key = raw.trim().to_lowercase();
    if key.is_empty() || RESERVED_SUBJECT_KEYS.contains(&key.as_str()) {
        return None;
    }
    Some(key)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSignals {
    pub frustration: f64,
    pub repeat_rate: f64,
    pub question_rate: f64,
    pub average_response_ms: f64,
    pub last_updated_at: DateTime<Utc>,
}

impl GlobalSignals {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            frustration: 0.0,
            repeat_rate: 0.0,
            question_rate: 0.0,
            average_response_ms: DEFAULT_AVERAGE_RESPONSE_MS,
            last_updated_at: now,
        }
    }

    /// Pull every field back into its declared range.
    pub fn clamp_ranges(&mut self) {
        self.frustration = clamp(self.frustration, 0.0, 1.0);
        self.repeat_rate = clamp(self.repeat_rate, 0.0, 1.0);
        self.question_rate = clamp(self.question_rate, 0.0, 1.0);
        self.average_response_ms = clamp(self.average_response_ms, 0.0, f64::MAX);
    }
}

impl Default for GlobalSignals {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProfile {
    /// Competence estimate, 0-100.
    pub mastery: f64,
    /// Last suggested difficulty, 1-5. Informational only.
    pub target_difficulty: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_quiz_score: Option<f64>,
    pub last_updated_at: DateTime<Utc>,
}

impl SubjectProfile {
    pub fn new(mastery: f64, target_difficulty: f64, now: DateTime<Utc>) -> Self {
        Self {
            mastery,
            target_difficulty,
            last_quiz_score: None,
            last_updated_at: now,
        }
    }

    pub fn clamp_ranges(&mut self) {
        self.mastery = clamp(self.mastery, 0.0, MAX_MASTERY);
        self.target_difficulty = clamp(self.target_difficulty, MIN_DIFFICULTY, MAX_DIFFICULTY);
        self.last_quiz_score = self.last_quiz_score.map(|s| clamp(s, 0.0, MAX_MASTERY));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveProfile {
    pub global: GlobalSignals,
    pub subjects: BTreeMap<String, SubjectProfile>,
    pub updated_at: DateTime<Utc>,
}

impl AdaptiveProfile {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            global: GlobalSignals::new(now),
            subjects: BTreeMap::new(),
            updated_at: now,
        }
    }

    /// Look up a subject by raw name; reserved and empty names never match.
    pub fn subject(&self, name: &str) -> Option<&SubjectProfile> {
        normalize_subject_key(name).and_then(|key| self.subjects.get(&key))
    }
}

impl Default for AdaptiveProfile {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

pub fn create_default_adaptive_profile() -> AdaptiveProfile {
    AdaptiveProfile::default()
}

/// How much autonomy the engine has, ordered from least to most.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AdaptiveDifficultyMode {
    Manual,
    Guided,
    #[default]
    Balanced,
    Automatic,
}

impl AdaptiveDifficultyMode {
    pub const ALL: [Self; 4] = [Self::Manual, Self::Guided, Self::Balanced, Self::Automatic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Guided => "guided",
            Self::Balanced => "balanced",
            Self::Automatic => "automatic",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "manual" => Self::Manual,
            "guided" => Self::Guided,
            "automatic" => Self::Automatic,
            _ => Self::Balanced,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashcardRating {
    Again,
    Hard,
    #[default]
    Good,
    Easy,
}

impl FlashcardRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Again => "again",
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
        }
    }
}

/// Type-specific payload of a [`SignalInput`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalKind {
    Frustration {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<f64>,
    },
    RepeatRequest,
    Question,
    ResponseTimeMs {
        #[serde(default, rename = "responseTimeMs", skip_serializing_if = "Option::is_none")]
        response_time_ms: Option<f64>,
    },
    QuizResult {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subject: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<f64>,
    },
    FlashcardRating {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subject: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rating: Option<FlashcardRating>,
    },
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Frustration { .. } => "frustration",
            Self::RepeatRequest => "repeat_request",
            Self::Question => "question",
            Self::ResponseTimeMs { .. } => "response_time_ms",
            Self::QuizResult { .. } => "quiz_result",
            Self::FlashcardRating { .. } => "flashcard_rating",
        }
    }

    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::QuizResult { subject, .. } | Self::FlashcardRating { subject, .. } => {
                subject.as_deref()
            }
            _ => None,
        }
    }
}

/// One behavioral observation. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalInput {
    #[serde(flatten)]
    pub kind: SignalKind,
    /// Free-form emitter tag, e.g. "chat" or "quiz".
    #[serde(default)]
    pub source: String,
}

impl SignalInput {
    pub fn new(kind: SignalKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub fn frustration(value: Option<f64>, source: impl Into<String>) -> Self {
        Self::new(SignalKind::Frustration { value }, source)
    }

    pub fn repeat_request(source: impl Into<String>) -> Self {
        Self::new(SignalKind::RepeatRequest, source)
    }

    pub fn question(source: impl Into<String>) -> Self {
        Self::new(SignalKind::Question, source)
    }

    pub fn response_time(response_time_ms: f64, source: impl Into<String>) -> Self {
        Self::new(
            SignalKind::ResponseTimeMs {
                response_time_ms: Some(response_time_ms),
            },
            source,
        )
    }

    pub fn quiz_result(subject: impl Into<String>, score: f64, source: impl Into<String>) -> Self {
        Self::new(
            SignalKind::QuizResult {
                subject: Some(subject.into()),
                value: Some(score),
            },
            source,
        )
    }

    pub fn flashcard_rating(
        subject: impl Into<String>,
        rating: FlashcardRating,
        source: impl Into<String>,
    ) -> Self {
        Self::new(
            SignalKind::FlashcardRating {
                subject: Some(subject.into()),
                rating: Some(rating),
            },
            source,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptiveReason {
    ReduceForPrerequisites,
    RoomForMoreChallenge,
    Calibrated,
}

impl AdaptiveReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReduceForPrerequisites => "reduce_for_prerequisites",
            Self::RoomForMoreChallenge => "room_for_more_challenge",
            Self::Calibrated => "calibrated",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ReduceForPrerequisites => {
                "Signs of struggle: lower the difficulty and consolidate prerequisites"
            }
            Self::RoomForMoreChallenge => "Learner is seeking challenge: room for more difficulty",
            Self::Calibrated => "Calibrated: stay challenging but reachable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyConstraints {
    pub min_difficulty: f64,
    pub max_difficulty: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentSignal {
    SevereFrustration,
    Frustration,
    RepeatRequests,
    ChallengeSeeking,
    SlowResponses,
    FastResponses,
}

/// One contribution to the raw (pre-gate) adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentFactor {
    pub signal: AdjustmentSignal,
    /// Observed signal value that triggered the contribution.
    pub value: f64,
    pub contribution: f64,
}

/// Calculator output consumed by the directive builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveContext {
    pub mode: AdaptiveDifficultyMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub baseline_difficulty: f64,
    pub target_difficulty: f64,
    /// False in manual mode: the target is a suggestion only.
    pub apply: bool,
    pub reason: AdaptiveReason,
    pub pragmatic: bool,
    pub constraints: DifficultyConstraints,
    pub mastery: f64,
    /// Net adjustment after the mode gate and pragmatic dampening.
    pub adjustment: f64,
    pub factors: Vec<AdjustmentFactor>,
}

/// Calculator request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextOptions {
    pub mode: AdaptiveDifficultyMode,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub baseline_difficulty: Option<f64>,
    #[serde(default)]
    pub pragmatic: bool,
}

impl ContextOptions {
    pub fn new(mode: AdaptiveDifficultyMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn baseline(mut self, baseline_difficulty: f64) -> Self {
        self.baseline_difficulty = Some(baseline_difficulty);
        self
    }

    pub fn pragmatic(mut self, pragmatic: bool) -> Self {
        self.pragmatic = pragmatic;
        self
    }
}
