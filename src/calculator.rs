use crate::config::CalculatorParams;
use crate::numeric::{clamp, round_to_half};
use crate::types::{
    normalize_subject_key, AdaptiveContext, AdaptiveDifficultyMode, AdaptiveProfile,
    AdaptiveReason, AdjustmentFactor, AdjustmentSignal, ContextOptions, DifficultyConstraints,
    GlobalSignals, MAX_DIFFICULTY, MIN_DIFFICULTY,
};

/// Turns a profile snapshot into a bounded target difficulty.
///
/// Pure: the profile is only read, and identical inputs give identical output.
pub struct DifficultyCalculator {
    params: CalculatorParams,
}

impl DifficultyCalculator {
    pub fn new(params: CalculatorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CalculatorParams {
        &self.params
    }

    pub fn calculate(
        &self,
        profile: &AdaptiveProfile,
        options: &ContextOptions,
    ) -> AdaptiveContext {
        let p = &self.params;
        let global = &profile.global;

        let baseline = clamp(
            options.baseline_difficulty.unwrap_or(p.default_baseline),
            MIN_DIFFICULTY,
            MAX_DIFFICULTY,
        );

        let subject = options.subject.as_deref().and_then(normalize_subject_key);
        let mastery = subject
            .as_ref()
            .and_then(|key| profile.subjects.get(key))
            .map(|s| s.mastery)
            .unwrap_or(p.default_mastery);

        let constraints = self.constraints_for(mastery);

        let factors = self.adjustment_factors(global);
        let raw: f64 = factors.iter().map(|f| f.contribution).sum();

        let limit = p.mode_limits.limit(options.mode);
        let mut adjustment = clamp(raw, -limit, limit);
        if options.pragmatic && adjustment < p.pragmatic_floor {
            adjustment = p.pragmatic_floor;
        }

        let target = clamp(
            round_to_half(baseline + adjustment),
            constraints.min_difficulty,
            constraints.max_difficulty,
        );

        let context = AdaptiveContext {
            mode: options.mode,
            subject,
            baseline_difficulty: baseline,
            target_difficulty: target,
            apply: options.mode != AdaptiveDifficultyMode::Manual,
            reason: self.reason(global),
            pragmatic: options.pragmatic,
            constraints,
            mastery,
            adjustment,
            factors,
        };

        tracing::trace!(
            mode = options.mode.as_str(),
            baseline,
            raw_adjustment = raw,
            adjustment,
            target,
            reason = context.reason.as_str(),
            "Calculated adaptive context"
        );

        context
    }

    /// Mastery-banded safety range for the target.
    pub fn constraints_for(&self, mastery: f64) -> DifficultyConstraints {
        let p = &self.params;
        p.mastery_bands
            .iter()
            .find(|band| mastery < band.below)
            .map(|band| DifficultyConstraints {
                min_difficulty: band.min_difficulty,
                max_difficulty: band.max_difficulty,
            })
            .unwrap_or(DifficultyConstraints {
                min_difficulty: p.top_band_min,
                max_difficulty: p.top_band_max,
            })
    }

    /// Every contribution is evaluated independently; the raw adjustment is their sum.
    pub fn adjustment_factors(&self, global: &GlobalSignals) -> Vec<AdjustmentFactor> {
        let p = &self.params;
        let mut factors = Vec::with_capacity(4);

        if global.frustration > p.severe_frustration_threshold {
            factors.push(AdjustmentFactor {
                signal: AdjustmentSignal::SevereFrustration,
                value: global.frustration,
                contribution: -p.severe_frustration_penalty,
            });
        } else if global.frustration > 0.0 {
            factors.push(AdjustmentFactor {
                signal: AdjustmentSignal::Frustration,
                value: global.frustration,
                contribution: -global.frustration * p.frustration_weight,
            });
        }

        if global.repeat_rate > p.repeat_threshold {
            factors.push(AdjustmentFactor {
                signal: AdjustmentSignal::RepeatRequests,
                value: global.repeat_rate,
                contribution: -p.repeat_penalty,
            });
        }

        if global.question_rate > p.question_threshold
            && global.frustration < p.question_calm_frustration
        {
            factors.push(AdjustmentFactor {
                signal: AdjustmentSignal::ChallengeSeeking,
                value: global.question_rate,
                contribution: p.question_bonus,
            });
        }

        let avg_ms = global.average_response_ms;
        if avg_ms > p.slow_response_ms {
            factors.push(AdjustmentFactor {
                signal: AdjustmentSignal::SlowResponses,
                value: avg_ms,
                contribution: -p.slow_response_penalty,
            });
        } else if avg_ms > 0.0 && avg_ms < p.fast_response_ms {
            factors.push(AdjustmentFactor {
                signal: AdjustmentSignal::FastResponses,
                value: avg_ms,
                contribution: p.fast_response_bonus,
            });
        }

        factors
    }

    pub fn reason(&self, global: &GlobalSignals) -> AdaptiveReason {
        let p = &self.params;
        if global.frustration > p.severe_frustration_threshold
            || global.repeat_rate > p.repeat_threshold
        {
            AdaptiveReason::ReduceForPrerequisites
        } else if global.question_rate > p.question_threshold {
            AdaptiveReason::RoomForMoreChallenge
        } else {
            AdaptiveReason::Calibrated
        }
    }
}

impl Default for DifficultyCalculator {
    fn default() -> Self {
        Self::new(CalculatorParams::default())
    }
}

pub fn calculate_adaptive_context(
    profile: &AdaptiveProfile,
    options: &ContextOptions,
) -> AdaptiveContext {
    DifficultyCalculator::default().calculate(profile, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubjectProfile;
    use chrono::{TimeZone, Utc};

    fn profile() -> AdaptiveProfile {
        AdaptiveProfile::new(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap())
    }

    fn with_mastery(mut profile: AdaptiveProfile, subject: &str, mastery: f64) -> AdaptiveProfile {
        let now = profile.updated_at;
        profile
            .subjects
            .insert(subject.to_string(), SubjectProfile::new(mastery, 3.0, now));
        profile
    }

    fn opts(mode: AdaptiveDifficultyMode) -> ContextOptions {
        ContextOptions::new(mode)
    }

    #[test]
    fn test_neutral_profile_keeps_baseline() {
        let ctx = calculate_adaptive_context(&profile(), &opts(AdaptiveDifficultyMode::Balanced));
        assert_eq!(ctx.baseline_difficulty, 3.0);
        assert_eq!(ctx.target_difficulty, 3.0);
        assert_eq!(ctx.mastery, 50.0);
        assert_eq!(ctx.reason, AdaptiveReason::Calibrated);
        assert!(ctx.apply);
        assert!(ctx.factors.is_empty());
    }

    #[test]
    fn test_baseline_is_clamped() {
        let manual = opts(AdaptiveDifficultyMode::Manual);
        let ctx = calculate_adaptive_context(&profile(), &manual.clone().baseline(9.0));
        assert_eq!(ctx.baseline_difficulty, 5.0);
        let ctx = calculate_adaptive_context(&profile(), &manual.baseline(-2.0));
        assert_eq!(ctx.baseline_difficulty, 1.0);
    }

    #[test]
    fn test_mastery_band_boundaries() {
        let calc = DifficultyCalculator::default();
        let c = calc.constraints_for(39.999);
        assert_eq!((c.min_difficulty, c.max_difficulty), (1.5, 2.5));
        let c = calc.constraints_for(40.0);
        assert_eq!((c.min_difficulty, c.max_difficulty), (2.0, 3.5));
        let c = calc.constraints_for(60.0);
        assert_eq!((c.min_difficulty, c.max_difficulty), (2.5, 4.5));
        let c = calc.constraints_for(80.0);
        assert_eq!((c.min_difficulty, c.max_difficulty), (2.5, 5.0));
        let c = calc.constraints_for(100.0);
        assert_eq!((c.min_difficulty, c.max_difficulty), (2.5, 5.0));
        let c = calc.constraints_for(0.0);
        assert_eq!((c.min_difficulty, c.max_difficulty), (1.5, 2.5));
    }

    #[test]
    fn test_frustration_exactly_at_threshold_is_proportional() {
        let mut p = profile();
        p.global.frustration = 0.6;
        let factors = DifficultyCalculator::default().adjustment_factors(&p.global);
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].signal, AdjustmentSignal::Frustration);
        assert!((factors[0].contribution + 0.48).abs() < 1e-9);

        let ctx = calculate_adaptive_context(&p, &opts(AdaptiveDifficultyMode::Automatic));
        assert_eq!(ctx.reason, AdaptiveReason::Calibrated);
        // 3 - 0.48 = 2.52 -> 2.5
        assert_eq!(ctx.target_difficulty, 2.5);
    }

    #[test]
    fn test_severe_frustration_drops_full_point() {
        let mut p = profile();
        p.global.frustration = 0.61;
        let ctx = calculate_adaptive_context(&p, &opts(AdaptiveDifficultyMode::Automatic));
        assert_eq!(ctx.adjustment, -1.0);
        assert_eq!(ctx.target_difficulty, 2.0);
        assert_eq!(ctx.reason, AdaptiveReason::ReduceForPrerequisites);
    }

    #[test]
    fn test_contributions_are_additive() {
        let mut p = profile();
        p.global.frustration = 0.8;
        p.global.repeat_rate = 0.5;
        p.global.average_response_ms = 25000.0;
        let ctx =
            calculate_adaptive_context(&p, &opts(AdaptiveDifficultyMode::Automatic).baseline(5.0));
        assert_eq!(ctx.factors.len(), 3);
        // raw -2.0 gated to -1.5
        assert_eq!(ctx.adjustment, -1.5);
        // 5 - 1.5 = 3.5, mastery 50 caps at 3.5
        assert_eq!(ctx.target_difficulty, 3.5);
    }

    #[test]
    fn test_question_bonus_requires_calm() {
        let mut p = profile();
        p.global.question_rate = 0.8;
        p.global.frustration = 0.4;
        let factors = DifficultyCalculator::default().adjustment_factors(&p.global);
        assert!(factors.iter().all(|f| f.signal != AdjustmentSignal::ChallengeSeeking));

        p.global.frustration = 0.39;
        let factors = DifficultyCalculator::default().adjustment_factors(&p.global);
        assert!(factors.iter().any(|f| f.signal == AdjustmentSignal::ChallengeSeeking));
    }

    #[test]
    fn test_response_time_contributions() {
        let calc = DifficultyCalculator::default();
        let mut p = profile();

        p.global.average_response_ms = 20000.0;
        assert!(calc.adjustment_factors(&p.global).is_empty());

        p.global.average_response_ms = 20000.1;
        assert_eq!(calc.adjustment_factors(&p.global)[0].contribution, -0.5);

        p.global.average_response_ms = 6999.0;
        assert_eq!(calc.adjustment_factors(&p.global)[0].contribution, 0.3);

        p.global.average_response_ms = 7000.0;
        assert!(calc.adjustment_factors(&p.global).is_empty());

        p.global.average_response_ms = 0.0;
        assert!(calc.adjustment_factors(&p.global).is_empty());
    }

    #[test]
    fn test_mode_gate_limits() {
        let mut p = profile();
        p.global.question_rate = 0.9;
        p.global.average_response_ms = 3000.0;
        // raw +0.8
        let expected = [
            (AdaptiveDifficultyMode::Manual, 0.0, 3.0),
            (AdaptiveDifficultyMode::Guided, 0.5, 3.5),
            (AdaptiveDifficultyMode::Balanced, 0.8, 3.5),
            (AdaptiveDifficultyMode::Automatic, 0.8, 3.5),
        ];
        for (mode, adjustment, target) in expected {
            let ctx = calculate_adaptive_context(&p, &opts(mode));
            assert!((ctx.adjustment - adjustment).abs() < 1e-9, "{mode:?}");
            assert_eq!(ctx.target_difficulty, target, "{mode:?}");
        }
    }

    #[test]
    fn test_manual_mode_is_neutral_and_not_applied() {
        let mut p = profile();
        p.global.frustration = 1.0;
        p.global.repeat_rate = 1.0;
        p.global.average_response_ms = 60000.0;
        let ctx =
            calculate_adaptive_context(&p, &opts(AdaptiveDifficultyMode::Manual).baseline(3.2));
        assert!(!ctx.apply);
        assert_eq!(ctx.adjustment, 0.0);
        assert_eq!(ctx.target_difficulty, 3.0);
        assert_eq!(ctx.factors.len(), 3);
        assert_eq!(ctx.reason, AdaptiveReason::ReduceForPrerequisites);
    }

    #[test]
    fn test_pragmatic_dampens_drops() {
        let mut p = profile();
        p.global.frustration = 0.9;
        p.global.repeat_rate = 0.9;
        let strict = calculate_adaptive_context(&p, &opts(AdaptiveDifficultyMode::Automatic));
        let pragmatic = calculate_adaptive_context(
            &p,
            &opts(AdaptiveDifficultyMode::Automatic).pragmatic(true),
        );
        assert_eq!(strict.adjustment, -1.5);
        assert_eq!(pragmatic.adjustment, -0.5);
        assert!(pragmatic.target_difficulty >= strict.target_difficulty);
        assert!(pragmatic.pragmatic);
    }

    #[test]
    fn test_pragmatic_leaves_small_or_positive_adjustments() {
        let mut p = profile();
        p.global.frustration = 0.5;
        let ctx = calculate_adaptive_context(
            &p,
            &opts(AdaptiveDifficultyMode::Automatic).pragmatic(true),
        );
        assert!((ctx.adjustment + 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_target_clamped_to_mastery_band() {
        let mut p = with_mastery(profile(), "math", 30.0);
        p.global.question_rate = 0.9;
        let ctx = calculate_adaptive_context(
            &p,
            &opts(AdaptiveDifficultyMode::Automatic).subject("Math").baseline(5.0),
        );
        assert_eq!(ctx.constraints.max_difficulty, 2.5);
        assert_eq!(ctx.target_difficulty, 2.5);
        assert_eq!(ctx.subject.as_deref(), Some("math"));

        let mut p = with_mastery(profile(), "art", 95.0);
        p.global.frustration = 0.9;
        let ctx = calculate_adaptive_context(
            &p,
            &opts(AdaptiveDifficultyMode::Automatic).subject("art").baseline(1.0),
        );
        assert_eq!(ctx.target_difficulty, 2.5);
    }

    #[test]
    fn test_unknown_subject_uses_default_mastery() {
        let ctx = calculate_adaptive_context(
            &profile(),
            &opts(AdaptiveDifficultyMode::Balanced).subject("astronomy"),
        );
        assert_eq!(ctx.mastery, 50.0);
        assert_eq!(ctx.constraints.max_difficulty, 3.5);
    }

    #[test]
    fn test_reason_priority() {
        let calc = DifficultyCalculator::default();
        let mut p = profile();
        p.global.repeat_rate = 0.5;
        p.global.question_rate = 0.9;
        assert_eq!(calc.reason(&p.global), AdaptiveReason::ReduceForPrerequisites);
        p.global.repeat_rate = 0.4;
        assert_eq!(calc.reason(&p.global), AdaptiveReason::RoomForMoreChallenge);
        p.global.question_rate = 0.6;
        assert_eq!(calc.reason(&p.global), AdaptiveReason::Calibrated);
    }

    #[test]
    fn test_does_not_mutate_profile() {
        let mut p = profile();
        p.global.frustration = 0.7;
        let before = p.clone();
        let options = opts(AdaptiveDifficultyMode::Guided).subject("math");
        let a = calculate_adaptive_context(&p, &options);
        let b = calculate_adaptive_context(&p, &options);
        assert_eq!(a, b);
        assert_eq!(p, before);
    }
}
