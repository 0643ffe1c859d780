//! Shop posting settings: prioritization weights and posting cadence.
//!
//! The weight-sum invariant (`bestsellers + no_reviews + stale == 100`) is
//! enforced at write boundaries only — settings updates and config-file
//! loads. Read paths consume whatever was persisted.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("priority weights must sum to 100, got {sum}")]
    WeightSum { sum: u32 },

    #[error("invalid weekday code: '{0}'")]
    InvalidWeekday(String),

    #[error("invalid time-of-day '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("{0}")]
    Validation(String),
}

/// Relative weights steering which products receive new reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityWeights {
    pub bestsellers: u8,
    pub no_reviews: u8,
    pub stale: u8,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            bestsellers: 60,
            no_reviews: 25,
            stale: 15,
        }
    }
}

impl PriorityWeights {
    /// Rejects any combination whose sum is not exactly 100.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::WeightSum`] with the offending sum.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let sum =
            u32::from(self.bestsellers) + u32::from(self.no_reviews) + u32::from(self.stale);
        if sum == 100 {
            Ok(())
        } else {
            Err(SettingsError::WeightSum { sum })
        }
    }
}

/// Posting cadence: how many reviews per week, on which days, in which
/// daily window, and how far apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cadence {
    pub reviews_per_week: i32,
    pub active_days: Vec<Weekday>,
    pub slot_start: NaiveTime,
    pub slot_end: NaiveTime,
    pub min_hours_between: i64,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            reviews_per_week: 5,
            active_days: vec![Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Sat],
            slot_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            slot_end: NaiveTime::from_hms_opt(21, 0, 0).unwrap_or(NaiveTime::MIN),
            min_hours_between: 4,
        }
    }
}

impl Cadence {
    #[must_use]
    pub fn is_active_day(&self, day: Weekday) -> bool {
        self.active_days.contains(&day)
    }

    /// # Errors
    ///
    /// Returns [`SettingsError::Validation`] on an empty day set, an
    /// inverted time window, a weekly target below 2, or negative spacing.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.reviews_per_week < 2 {
            return Err(SettingsError::Validation(format!(
                "reviews_per_week must be at least 2, got {}",
                self.reviews_per_week
            )));
        }
        if self.active_days.is_empty() {
            return Err(SettingsError::Validation(
                "at least one active day is required".to_string(),
            ));
        }
        if self.slot_start >= self.slot_end {
            return Err(SettingsError::Validation(format!(
                "time window start {} must precede end {}",
                self.slot_start.format("%H:%M"),
                self.slot_end.format("%H:%M")
            )));
        }
        if self.min_hours_between < 0 {
            return Err(SettingsError::Validation(
                "min_hours_between cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Full per-shop selection and scheduling configuration.
#[derive(Debug, Clone)]
pub struct ShopSettings {
    pub weights: PriorityWeights,
    pub stale_days_threshold: i64,
    pub cadence: Cadence,
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            weights: PriorityWeights::default(),
            stale_days_threshold: DEFAULT_STALE_DAYS_THRESHOLD,
            cadence: Cadence::default(),
        }
    }
}

impl ShopSettings {
    /// Validates weights and cadence together; used by every write boundary.
    ///
    /// # Errors
    ///
    /// Returns the first [`SettingsError`] encountered.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.weights.validate()?;
        self.cadence.validate()?;
        if self.stale_days_threshold <= 0 {
            return Err(SettingsError::Validation(format!(
                "stale_days_threshold must be positive, got {}",
                self.stale_days_threshold
            )));
        }
        Ok(())
    }
}

pub const DEFAULT_STALE_DAYS_THRESHOLD: i64 = 30;

/// Parse a lowercase three-letter weekday code (`mon`..`sun`).
///
/// # Errors
///
/// Returns [`SettingsError::InvalidWeekday`] for anything else.
pub fn parse_weekday(code: &str) -> Result<Weekday, SettingsError> {
    match code {
        "mon" => Ok(Weekday::Mon),
        "tue" => Ok(Weekday::Tue),
        "wed" => Ok(Weekday::Wed),
        "thu" => Ok(Weekday::Thu),
        "fri" => Ok(Weekday::Fri),
        "sat" => Ok(Weekday::Sat),
        "sun" => Ok(Weekday::Sun),
        other => Err(SettingsError::InvalidWeekday(other.to_string())),
    }
}

#[must_use]
pub fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

/// Parse an `"HH:MM"` time-of-day string.
///
/// # Errors
///
/// Returns [`SettingsError::InvalidTime`] if the string does not parse.
pub fn parse_slot_time(raw: &str) -> Result<NaiveTime, SettingsError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| SettingsError::InvalidTime(raw.to_string()))
}
