use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::AdaptiveDifficultyMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardDeltas {
    pub again: f64,
    pub hard: f64,
    pub good: f64,
    pub easy: f64,
}

impl Default for FlashcardDeltas {
    fn default() -> Self {
        Self {
            again: -6.0,
            hard: -3.0,
            good: 2.0,
            easy: 4.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalParams {
    pub decay_factor: f64,
    pub frustration_alpha: f64,
    pub repeat_alpha: f64,
    pub question_alpha: f64,
    pub response_time_alpha: f64,
    pub quiz_alpha: f64,
    pub flashcard: FlashcardDeltas,
    pub default_mastery: f64,
    pub default_target_difficulty: f64,
    pub default_average_response_ms: f64,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            decay_factor: 0.9,
            frustration_alpha: 0.3,
            repeat_alpha: 0.3,
            question_alpha: 0.2,
            response_time_alpha: 0.2,
            quiz_alpha: 0.3,
            flashcard: FlashcardDeltas::default(),
            default_mastery: 50.0,
            default_target_difficulty: 3.0,
            default_average_response_ms: 12000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeLimits {
    pub manual: f64,
    pub guided: f64,
    pub balanced: f64,
    pub automatic: f64,
}

impl ModeLimits {
    pub fn limit(&self, mode: AdaptiveDifficultyMode) -> f64 {
        match mode {
            AdaptiveDifficultyMode::Manual => self.manual,
            AdaptiveDifficultyMode::Guided => self.guided,
            AdaptiveDifficultyMode::Balanced => self.balanced,
            AdaptiveDifficultyMode::Automatic => self.automatic,
        }
    }
}

impl Default for ModeLimits {
    fn default() -> Self {
        Self {
            manual: 0.0,
            guided: 0.5,
            balanced: 1.0,
            automatic: 1.5,
        }
    }
}

/// Difficulty bounds that apply while mastery is strictly below `below`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryBand {
    pub below: f64,
    pub min_difficulty: f64,
    pub max_difficulty: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorParams {
    pub default_baseline: f64,
    pub default_mastery: f64,
    pub severe_frustration_threshold: f64,
    pub severe_frustration_penalty: f64,
    pub frustration_weight: f64,
    pub repeat_threshold: f64,
    pub repeat_penalty: f64,
    pub question_threshold: f64,
    pub question_calm_frustration: f64,
    pub question_bonus: f64,
    pub slow_response_ms: f64,
    pub slow_response_penalty: f64,
    pub fast_response_ms: f64,
    pub fast_response_bonus: f64,
    pub pragmatic_floor: f64,
    pub mode_limits: ModeLimits,
    /// Ascending by `below`; the first band whose `below` exceeds mastery wins.
    pub mastery_bands: Vec<MasteryBand>,
    /// Bounds once mastery clears every band.
    pub top_band_min: f64,
    pub top_band_max: f64,
}

impl Default for CalculatorParams {
    fn default() -> Self {
        Self {
            default_baseline: 3.0,
            default_mastery: 50.0,
            severe_frustration_threshold: 0.6,
            severe_frustration_penalty: 1.0,
            frustration_weight: 0.8,
            repeat_threshold: 0.4,
            repeat_penalty: 0.5,
            question_threshold: 0.6,
            question_calm_frustration: 0.4,
            question_bonus: 0.5,
            slow_response_ms: 20000.0,
            slow_response_penalty: 0.5,
            fast_response_ms: 7000.0,
            fast_response_bonus: 0.3,
            pragmatic_floor: -0.5,
            mode_limits: ModeLimits::default(),
            mastery_bands: vec![
                MasteryBand { below: 40.0, min_difficulty: 1.5, max_difficulty: 2.5 },
                MasteryBand { below: 60.0, min_difficulty: 2.0, max_difficulty: 3.5 },
                MasteryBand { below: 80.0, min_difficulty: 2.5, max_difficulty: 4.5 },
            ],
            top_band_min: 2.5,
            top_band_max: 5.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveConfig {
    pub signals: SignalParams,
    pub calculator: CalculatorParams,
}

impl AdaptiveConfig {
    /// Defaults overridden by `ADAPTIVE_*` environment variables.
    ///
    /// Unparseable values are ignored; an override set that fails validation
    /// falls back to the defaults as a whole.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(val) = env_f64("ADAPTIVE_DECAY_FACTOR") {
            config.signals.decay_factor = val;
        }
        if let Some(val) = env_f64("ADAPTIVE_DEFAULT_BASELINE") {
            config.calculator.default_baseline = val;
        }
        if let Some(val) = env_f64("ADAPTIVE_MODE_LIMIT_GUIDED") {
            config.calculator.mode_limits.guided = val;
        }
        if let Some(val) = env_f64("ADAPTIVE_MODE_LIMIT_BALANCED") {
            config.calculator.mode_limits.balanced = val;
        }
        if let Some(val) = env_f64("ADAPTIVE_MODE_LIMIT_AUTOMATIC") {
            config.calculator.mode_limits.automatic = val;
        }
        if let Some(val) = env_f64("ADAPTIVE_PRAGMATIC_FLOOR") {
            config.calculator.pragmatic_floor = val;
        }

        match config.validate() {
            Ok(()) => config,
            Err(err) => {
                tracing::warn!(error = %err, "Invalid adaptive config from env, using defaults");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.signals;
        for (name, value) in [
            ("decayFactor", s.decay_factor),
            ("frustrationAlpha", s.frustration_alpha),
            ("repeatAlpha", s.repeat_alpha),
            ("questionAlpha", s.question_alpha),
            ("responseTimeAlpha", s.response_time_alpha),
            ("quizAlpha", s.quiz_alpha),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if !(0.0..=100.0).contains(&s.default_mastery) {
            return Err(ConfigError::Validation("defaultMastery out of [0, 100]".into()));
        }
        if !(1.0..=5.0).contains(&s.default_target_difficulty) {
            return Err(ConfigError::Validation(
                "defaultTargetDifficulty out of [1, 5]".into(),
            ));
        }
        if !s.default_average_response_ms.is_finite() || s.default_average_response_ms < 0.0 {
            return Err(ConfigError::Validation(
                "defaultAverageResponseMs must be a non-negative number".into(),
            ));
        }

        let f = &s.flashcard;
        for (name, value) in [
            ("flashcard.again", f.again),
            ("flashcard.hard", f.hard),
            ("flashcard.good", f.good),
            ("flashcard.easy", f.easy),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Validation(format!("{name} must be finite, got {value}")));
            }
        }

        let c = &self.calculator;
        if !(1.0..=5.0).contains(&c.default_baseline) {
            return Err(ConfigError::Validation("defaultBaseline out of [1, 5]".into()));
        }
        if !(0.0..=100.0).contains(&c.default_mastery) {
            return Err(ConfigError::Validation(
                "calculator defaultMastery out of [0, 100]".into(),
            ));
        }
        for (name, value) in [
            ("severeFrustrationThreshold", c.severe_frustration_threshold),
            ("repeatThreshold", c.repeat_threshold),
            ("questionThreshold", c.question_threshold),
            ("questionCalmFrustration", c.question_calm_frustration),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        for (name, value) in [
            ("severeFrustrationPenalty", c.severe_frustration_penalty),
            ("frustrationWeight", c.frustration_weight),
            ("repeatPenalty", c.repeat_penalty),
            ("questionBonus", c.question_bonus),
            ("slowResponsePenalty", c.slow_response_penalty),
            ("fastResponseBonus", c.fast_response_bonus),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        let cutoffs_ok = c.fast_response_ms.is_finite()
            && c.slow_response_ms.is_finite()
            && 0.0 < c.fast_response_ms
            && c.fast_response_ms <= c.slow_response_ms;
        if !cutoffs_ok {
            return Err(ConfigError::Validation(format!(
                "response cutoffs must satisfy 0 < fastResponseMs <= slowResponseMs, got {} and {}",
                c.fast_response_ms, c.slow_response_ms
            )));
        }
        if !c.pragmatic_floor.is_finite() || c.pragmatic_floor > 0.0 {
            return Err(ConfigError::Validation("pragmaticFloor must be <= 0".into()));
        }

        // Manual mode never moves the baseline.
        let l = &c.mode_limits;
        if l.manual != 0.0 {
            return Err(ConfigError::Validation(format!(
                "modeLimits.manual must be 0, got {}",
                l.manual
            )));
        }
        let ordered =
            l.manual <= l.guided && l.guided <= l.balanced && l.balanced <= l.automatic;
        if !ordered || !l.automatic.is_finite() {
            return Err(ConfigError::Validation(
                "modeLimits must be non-decreasing from manual to automatic".into(),
            ));
        }

        let mut previous_below = f64::NEG_INFINITY;
        for band in &c.mastery_bands {
            if !(band.below > previous_below) {
                return Err(ConfigError::Validation(
                    "masteryBands must be sorted by ascending `below`".into(),
                ));
            }
            check_bounds(band.min_difficulty, band.max_difficulty)?;
            previous_below = band.below;
        }
        check_bounds(c.top_band_min, c.top_band_max)
    }
}

fn check_bounds(min: f64, max: f64) -> Result<(), ConfigError> {
    if 1.0 <= min && min <= max && max <= 5.0 {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "difficulty bounds must satisfy 1 <= min <= max <= 5, got [{min}, {max}]"
        )))
    }
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AdaptiveConfig::default().validate().is_ok());
    }

    #[test]
    fn test_mode_limits_lookup() {
        let limits = ModeLimits::default();
        assert_eq!(limits.limit(AdaptiveDifficultyMode::Manual), 0.0);
        assert_eq!(limits.limit(AdaptiveDifficultyMode::Guided), 0.5);
        assert_eq!(limits.limit(AdaptiveDifficultyMode::Balanced), 1.0);
        assert_eq!(limits.limit(AdaptiveDifficultyMode::Automatic), 1.5);
    }

    #[test]
    fn test_rejects_alpha_out_of_range() {
        let mut config = AdaptiveConfig::default();
        config.signals.quiz_alpha = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_rejects_non_monotone_mode_limits() {
        let mut config = AdaptiveConfig::default();
        config.calculator.mode_limits.guided = 2.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_zero_manual_limit() {
        let mut config = AdaptiveConfig::default();
        config.calculator.mode_limits.manual = 0.5;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_rejects_non_finite_calculator_weights() {
        let mut config = AdaptiveConfig::default();
        config.calculator.frustration_weight = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = AdaptiveConfig::default();
        config.calculator.slow_response_penalty = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_bonus_or_penalty() {
        let mut config = AdaptiveConfig::default();
        config.calculator.question_bonus = -3.0;
        assert!(config.validate().is_err());

        let mut config = AdaptiveConfig::default();
        config.calculator.repeat_penalty = -0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_thresholds_out_of_unit_range() {
        let mut config = AdaptiveConfig::default();
        config.calculator.severe_frustration_threshold = 1.2;
        assert!(config.validate().is_err());

        let mut config = AdaptiveConfig::default();
        config.calculator.question_calm_frustration = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_response_cutoffs() {
        let mut config = AdaptiveConfig::default();
        config.calculator.fast_response_ms = 25000.0;
        assert!(config.validate().is_err());

        let mut config = AdaptiveConfig::default();
        config.calculator.fast_response_ms = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_finite_flashcard_delta() {
        let mut config = AdaptiveConfig::default();
        config.signals.flashcard.hard = f64::NEG_INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unsorted_bands() {
        let mut config = AdaptiveConfig::default();
        config.calculator.mastery_bands.swap(0, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_positive_pragmatic_floor() {
        let mut config = AdaptiveConfig::default();
        config.calculator.pragmatic_floor = 0.25;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_round_trip_uses_camel_case() {
        let json = serde_json::to_value(AdaptiveConfig::default()).unwrap();
        assert_eq!(json["signals"]["decayFactor"], 0.9);
        assert_eq!(json["calculator"]["modeLimits"]["automatic"], 1.5);
        let back: AdaptiveConfig = serde_json::from_value(json).unwrap();
        assert!(back.validate().is_ok());
    }

    #[test]
    fn test_from_env_overrides_and_falls_back() {
        std::env::set_var("ADAPTIVE_MODE_LIMIT_AUTOMATIC", "2.0");
        let config = AdaptiveConfig::from_env();
        assert_eq!(config.calculator.mode_limits.automatic, 2.0);

        std::env::set_var("ADAPTIVE_MODE_LIMIT_AUTOMATIC", "0.1");
        let config = AdaptiveConfig::from_env();
        assert_eq!(config.calculator.mode_limits.automatic, 1.5);

        std::env::remove_var("ADAPTIVE_MODE_LIMIT_AUTOMATIC");
    }
}
