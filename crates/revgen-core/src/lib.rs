use serde::{Deserialize, Serialize};

pub mod app_config;
pub mod config;
pub mod scheduler;
pub mod selector;
pub mod settings;
pub mod shops;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, ConfigError};
pub use scheduler::{
    collision_window_end, find_slot, is_valid_slot, week_start, COLLISION_WINDOW_DAYS,
    JITTER_MINUTES, SEARCH_HORIZON_DAYS, SLOT_STEP_MINUTES,
};
pub use selector::{sample_weighted, score_products, ProductSelection, ProductStats, SelectionReason};
pub use settings::{
    parse_slot_time, parse_weekday, weekday_code, Cadence, PriorityWeights, SettingsError,
    ShopSettings, DEFAULT_STALE_DAYS_THRESHOLD,
};
pub use shops::{load_shops, Platform, ShopConfig, ShopsFile};

/// Lifecycle state of a review.
///
/// `Imported` marks reviews that pre-existed on the storefront and were
/// pulled in by sync; they are never scheduled or posted by this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
    Posted,
    Failed,
    Imported,
}

impl ReviewStatus {
    /// Returns `true` for states that can never be (re)scheduled.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Posted | Self::Failed | Self::Imported)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Posted => "posted",
            Self::Failed => "failed",
            Self::Imported => "imported",
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "posted" => Ok(Self::Posted),
            "failed" => Ok(Self::Failed),
            "imported" => Ok(Self::Imported),
            other => Err(SettingsError::Validation(format!(
                "unknown review status: '{other}'"
            ))),
        }
    }
}
