//! Facade bundling the processor, calculator and codec under one config.
//!
//! The engine holds no learner state. Callers load a profile, feed it
//! signals, store it, and ask for a context when building the next turn.
//! Updates to one learner's stored profile must be serialized by the caller;
//! see [`crate::processor`].

use chrono::{DateTime, Utc};

use crate::calculator::DifficultyCalculator;
use crate::codec;
use crate::config::AdaptiveConfig;
use crate::directive::AdaptiveDirective;
use crate::error::{ConfigError, ProfileEncodeError};
use crate::processor::SignalProcessor;
use crate::types::{
    AdaptiveContext, AdaptiveProfile, ContextOptions, SignalInput, SubjectProfile,
};

pub struct AdaptiveEngine {
    config: AdaptiveConfig,
    processor: SignalProcessor,
    calculator: DifficultyCalculator,
}

impl AdaptiveEngine {
    pub fn new(config: AdaptiveConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            processor: SignalProcessor::new(config.signals.clone()),
            calculator: DifficultyCalculator::new(config.calculator.clone()),
            config,
        })
    }

    pub fn from_env() -> Self {
        let config = AdaptiveConfig::from_env();
        Self {
            processor: SignalProcessor::new(config.signals.clone()),
            calculator: DifficultyCalculator::new(config.calculator.clone()),
            config,
        }
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    pub fn default_profile(&self) -> AdaptiveProfile {
        self.processor.default_profile(Utc::now())
    }

    pub fn load_profile(&self, raw: Option<&str>) -> AdaptiveProfile {
        self.load_profile_at(raw, Utc::now())
    }

    pub fn load_profile_at(&self, raw: Option<&str>, now: DateTime<Utc>) -> AdaptiveProfile {
        codec::parse_adaptive_profile_or(raw, || self.processor.default_profile(now))
    }

    pub fn store_profile(&self, profile: &AdaptiveProfile) -> Result<String, ProfileEncodeError> {
        codec::serialize_adaptive_profile(profile)
    }

    pub fn apply_signal(&self, profile: &mut AdaptiveProfile, signal: &SignalInput) {
        self.processor.apply_signal(profile, signal, Utc::now());
    }

    pub fn apply_signal_at(
        &self,
        profile: &mut AdaptiveProfile,
        signal: &SignalInput,
        now: DateTime<Utc>,
    ) {
        self.processor.apply_signal(profile, signal, now);
    }

    pub fn apply_signals<'a>(
        &self,
        profile: &mut AdaptiveProfile,
        signals: impl IntoIterator<Item = &'a SignalInput>,
        now: DateTime<Utc>,
    ) {
        for signal in signals {
            self.processor.apply_signal(profile, signal, now);
        }
    }

    pub fn ensure_subject_profile<'a>(
        &self,
        profile: &'a mut AdaptiveProfile,
        subject: &str,
    ) -> Option<&'a mut SubjectProfile> {
        self.ensure_subject_profile_at(profile, subject, Utc::now())
    }

    pub fn ensure_subject_profile_at<'a>(
        &self,
        profile: &'a mut AdaptiveProfile,
        subject: &str,
        now: DateTime<Utc>,
    ) -> Option<&'a mut SubjectProfile> {
        self.processor.ensure_subject_profile(profile, subject, now)
    }

    pub fn calculate_context(
        &self,
        profile: &AdaptiveProfile,
        options: &ContextOptions,
    ) -> AdaptiveContext {
        self.calculator.calculate(profile, options)
    }

    pub fn directive(
        &self,
        profile: &AdaptiveProfile,
        options: &ContextOptions,
    ) -> AdaptiveDirective {
        AdaptiveDirective::from_context(&self.calculate_context(profile, options))
    }

    /// Calculate a context and keep the subject's suggested difficulty in step with it.
    pub fn calculate_and_record(
        &self,
        profile: &mut AdaptiveProfile,
        options: &ContextOptions,
        now: DateTime<Utc>,
    ) -> AdaptiveContext {
        let context = self.calculator.calculate(profile, options);
        self.processor.record_target_difficulty(profile, &context, now);
        context
    }
}

impl Default for AdaptiveEngine {
    fn default() -> Self {
        let config = AdaptiveConfig::default();
        Self {
            processor: SignalProcessor::new(config.signals.clone()),
            calculator: DifficultyCalculator::new(config.calculator.clone()),
            config,
        }
    }
}
