//! Profile transport: JSON text in, validated profile out.
//!
//! Stored adaptive state is advisory. Anything that fails to parse or
//! validate is replaced by the default profile instead of surfacing an error.

use chrono::{DateTime, Utc};

use crate::error::{ProfileDecodeError, ProfileEncodeError};
use crate::types::{
    normalize_subject_key, AdaptiveProfile, MAX_DIFFICULTY, MAX_MASTERY, MIN_DIFFICULTY,
    RESERVED_SUBJECT_KEYS,
};

/// Decode a stored profile, falling back to the default on any problem.
pub fn parse_adaptive_profile(raw: Option<&str>) -> AdaptiveProfile {
    parse_adaptive_profile_at(raw, Utc::now())
}

pub fn parse_adaptive_profile_at(raw: Option<&str>, now: DateTime<Utc>) -> AdaptiveProfile {
    parse_adaptive_profile_or(raw, || AdaptiveProfile::new(now))
}

/// Decode a stored profile, using `fallback` for missing or rejected input.
pub fn parse_adaptive_profile_or(
    raw: Option<&str>,
    fallback: impl FnOnce() -> AdaptiveProfile,
) -> AdaptiveProfile {
    match decode(raw) {
        Ok(Some(profile)) => profile,
        Ok(None) => fallback(),
        Err(err) => {
            tracing::warn!(error = %err, "Discarding stored adaptive profile, using defaults");
            fallback()
        }
    }
}

/// Like [`parse_adaptive_profile`], but reports why a profile was rejected.
///
/// Absent, blank and `{}` input are not errors: they mean "no history yet".
pub fn try_parse_adaptive_profile(
    raw: Option<&str>,
) -> Result<AdaptiveProfile, ProfileDecodeError> {
    try_parse_adaptive_profile_at(raw, Utc::now())
}

pub fn try_parse_adaptive_profile_at(
    raw: Option<&str>,
    now: DateTime<Utc>,
) -> Result<AdaptiveProfile, ProfileDecodeError> {
    Ok(decode(raw)?.unwrap_or_else(|| AdaptiveProfile::new(now)))
}

/// `Ok(None)` when there is no stored history.
fn decode(raw: Option<&str>) -> Result<Option<AdaptiveProfile>, ProfileDecodeError> {
    let Some(text) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    let value: serde_json::Value = serde_json::from_str(text)?;
    if value.as_object().is_some_and(|obj| obj.is_empty()) {
        return Ok(None);
    }

    let profile: AdaptiveProfile = serde_json::from_value(value)?;
    validate_adaptive_profile(&profile)?;
    Ok(Some(profile))
}

/// Encode a profile for storage. Invalid profiles are refused rather than persisted.
pub fn serialize_adaptive_profile(profile: &AdaptiveProfile) -> Result<String, ProfileEncodeError> {
    validate_adaptive_profile(profile)?;
    serde_json::to_string(profile).map_err(ProfileEncodeError::Serialize)
}

/// Check every range invariant of the profile model.
pub fn validate_adaptive_profile(profile: &AdaptiveProfile) -> Result<(), ProfileDecodeError> {
    let g = &profile.global;
    check_range("global.frustration", g.frustration, 0.0, 1.0)?;
    check_range("global.repeatRate", g.repeat_rate, 0.0, 1.0)?;
    check_range("global.questionRate", g.question_rate, 0.0, 1.0)?;
    check_range("global.averageResponseMs", g.average_response_ms, 0.0, f64::MAX)?;

    for (key, subject) in &profile.subjects {
        check_subject_key(key)?;
        check_range(&format!("subjects.{key}.mastery"), subject.mastery, 0.0, MAX_MASTERY)?;
        check_range(
            &format!("subjects.{key}.targetDifficulty"),
            subject.target_difficulty,
            MIN_DIFFICULTY,
            MAX_DIFFICULTY,
        )?;
        if let Some(score) = subject.last_quiz_score {
            check_range(&format!("subjects.{key}.lastQuizScore"), score, 0.0, MAX_MASTERY)?;
        }
    }
    Ok(())
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ProfileDecodeError> {
    if !value.is_finite() {
        return Err(ProfileDecodeError::NonFinite {
            field: field.to_string(),
        });
    }
    if value < min || value > max {
        return Err(ProfileDecodeError::OutOfRange {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

fn check_subject_key(key: &str) -> Result<(), ProfileDecodeError> {
    let lowered = key.trim().to_lowercase();
    if RESERVED_SUBJECT_KEYS.contains(&lowered.as_str()) {
        return Err(ProfileDecodeError::ReservedSubjectKey(key.to_string()));
    }
    match normalize_subject_key(key) {
        Some(normalized) if normalized == key => Ok(()),
        _ => Err(ProfileDecodeError::InvalidSubjectKey(key.to_string())),
    }
}
