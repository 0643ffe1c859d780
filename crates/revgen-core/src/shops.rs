use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::settings::PriorityWeights;
use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Lightspeed,
    Woocommerce,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Lightspeed => write!(f, "lightspeed"),
            Platform::Woocommerce => write!(f, "woocommerce"),
        }
    }
}

/// One storefront tenant as declared in `shops.yaml`.
///
/// Cadence and weight fields are optional; absent values fall back to the
/// column defaults when seeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopConfig {
    pub name: String,
    pub platform: Platform,
    pub shop_url: Option<String>,
    pub language: Option<String>,
    pub reviews_per_week: Option<i32>,
    pub priorities: Option<PriorityWeights>,
    #[serde(default)]
    pub auto_approve: bool,
    pub notes: Option<String>,
}

impl ShopConfig {
    /// Generate a URL-safe slug from the shop name.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else if c == ' ' {
                    '-'
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[derive(Debug, Deserialize)]
pub struct ShopsFile {
    pub shops: Vec<ShopConfig>,
}

/// Load and validate the shops configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_shops(path: &Path) -> Result<ShopsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ShopsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let shops_file: ShopsFile =
        serde_yaml::from_str(&content).map_err(ConfigError::ShopsFileParse)?;

    validate_shops(&shops_file)?;

    Ok(shops_file)
}

fn validate_shops(shops_file: &ShopsFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();
    let mut seen_slugs = HashSet::new();

    for shop in &shops_file.shops {
        if shop.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "shop name must be non-empty".to_string(),
            ));
        }

        if let Some(per_week) = shop.reviews_per_week {
            if per_week < 2 {
                return Err(ConfigError::Validation(format!(
                    "shop '{}' has reviews_per_week {per_week}; must be at least 2",
                    shop.name
                )));
            }
        }

        // Weight-sum invariant: this load is a settings-write boundary.
        if let Some(priorities) = &shop.priorities {
            priorities.validate().map_err(|e| {
                ConfigError::Validation(format!("shop '{}': {e}", shop.name))
            })?;
        }

        let lower_name = shop.name.to_lowercase();
        if !seen_names.insert(lower_name) {
            return Err(ConfigError::Validation(format!(
                "duplicate shop name: '{}'",
                shop.name
            )));
        }

        let slug = shop.slug();
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate shop slug: '{slug}' (from shop '{}')",
                shop.name
            )));
        }
    }

    Ok(())
}
