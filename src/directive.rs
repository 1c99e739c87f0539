//! Structured directive handed to the tutoring content generator.
//!
//! The directive only restates the calculator output in content terms;
//! wording the actual instructions is left to the consumer.

use serde::{Deserialize, Serialize};

use crate::types::{AdaptiveContext, AdaptiveDifficultyMode, AdaptiveReason, AdjustmentSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyBand {
    Introductory,
    Foundational,
    Intermediate,
    Advanced,
    Expert,
}

impl DifficultyBand {
    /// Band for a difficulty on the 1-5 scale.
    pub fn from_difficulty(difficulty: f64) -> Self {
        if difficulty < 1.75 {
            Self::Introductory
        } else if difficulty < 2.75 {
            Self::Foundational
        } else if difficulty < 3.75 {
            Self::Intermediate
        } else if difficulty < 4.75 {
            Self::Advanced
        } else {
            Self::Expert
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Introductory => "introductory",
            Self::Foundational => "foundational",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Expert => "expert",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveHint {
    ReviewPrerequisites,
    ShorterSteps,
    RephraseExplanations,
    AllowMoreTime,
    OfferExtension,
    KeepPace,
    PrioritizeCompletion,
    SuggestOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveDirective {
    pub mode: AdaptiveDifficultyMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub baseline_difficulty: f64,
    pub target_difficulty: f64,
    pub difficulty_band: DifficultyBand,
    pub apply: bool,
    pub reason: AdaptiveReason,
    pub pragmatic: bool,
    pub hints: Vec<DirectiveHint>,
}

impl AdaptiveDirective {
    pub fn from_context(context: &AdaptiveContext) -> Self {
        Self {
            mode: context.mode,
            subject: context.subject.clone(),
            baseline_difficulty: context.baseline_difficulty,
            target_difficulty: context.target_difficulty,
            difficulty_band: DifficultyBand::from_difficulty(context.target_difficulty),
            apply: context.apply,
            reason: context.reason,
            pragmatic: context.pragmatic,
            hints: hints_for(context),
        }
    }

    /// Difficulty the generator should actually use.
    ///
    /// Manual mode keeps the caller's baseline; the target stays a suggestion.
    pub fn effective_difficulty(&self) -> f64 {
        if self.apply {
            self.target_difficulty
        } else {
            self.baseline_difficulty
        }
    }
}

fn hints_for(context: &AdaptiveContext) -> Vec<DirectiveHint> {
    let mut hints = Vec::new();

    match context.reason {
        AdaptiveReason::ReduceForPrerequisites => {
            hints.push(DirectiveHint::ReviewPrerequisites);
            hints.push(DirectiveHint::ShorterSteps);
        }
        AdaptiveReason::RoomForMoreChallenge => hints.push(DirectiveHint::OfferExtension),
        AdaptiveReason::Calibrated => hints.push(DirectiveHint::KeepPace),
    }

    for factor in &context.factors {
        let hint = match factor.signal {
            AdjustmentSignal::RepeatRequests => DirectiveHint::RephraseExplanations,
            AdjustmentSignal::SlowResponses => DirectiveHint::AllowMoreTime,
            _ => continue,
        };
        if !hints.contains(&hint) {
            hints.push(hint);
        }
    }

    if context.pragmatic {
        hints.push(DirectiveHint::PrioritizeCompletion);
    }
    if !context.apply {
        hints.push(DirectiveHint::SuggestOnly);
    }
    hints
}
