use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

/// Points awarded by the loyalty rules
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointsSettings {
    /// Base points earned per currency unit on an approved receipt
    pub points_per_unit: u32,
    /// Points granted to a referrer for each referred user
    pub referral_bonus: u32,
    /// Points granted once an administrator validates a user
    pub validation_bonus: u32,
    /// How many times a movement is recomputed after a concurrent balance change
    pub max_write_attempts: u32,
}

impl Default for PointsSettings {
    fn default() -> Self {
        Self {
            points_per_unit: 1,
            referral_bonus: 100,
            validation_bonus: 50,
            max_write_attempts: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// JSON tier table; the built-in table is used when unset
    pub tier_table: Option<PathBuf>,
    pub points: PointsSettings,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

impl Settings {
    pub fn load() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the settings from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tier_table = lookup("LOYALTY_TIER_TABLE").map(PathBuf::from);
        match &tier_table {
            Some(path) => info!("Using tier table from {}", path.display()),
            None => info!("LOYALTY_TIER_TABLE not set, using the built-in tier table"),
        }

        let points = PointsSettings {
            points_per_unit: try_load(&lookup, "LOYALTY_POINTS_PER_UNIT", 1)?,
            referral_bonus: try_load(&lookup, "LOYALTY_REFERRAL_BONUS", 100)?,
            validation_bonus: try_load(&lookup, "LOYALTY_VALIDATION_BONUS", 50)?,
            max_write_attempts: try_load(&lookup, "LOYALTY_MAX_WRITE_ATTEMPTS", 3)?,
        };
        if points.max_write_attempts == 0 {
            return Err(Error::InvalidValue {
                key: "LOYALTY_MAX_WRITE_ATTEMPTS",
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self { tier_table, points })
    }
}

fn try_load<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, Error>
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        info!("{key} not set, using default: {default}");
        return Ok(default);
    };

    raw.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        Error::InvalidValue {
            key,
            message: e.to_string(),
        }
    })
}
