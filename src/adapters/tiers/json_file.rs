use crate::{
    domain::{Tier, TierTable},
    ports::tiers::{Error, TierConfigPort},
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Tier table stored as a JSON file
///
/// The file is read again on every call, so edits apply to the next request.
///
/// ```json
/// {
///   "tiers": [
///     { "name": "Bronze", "minimum_points": 0, "order": 0 },
///     { "name": "Silver", "minimum_points": 3000, "order": 1,
///       "multiplier": { "numerator": 5, "denominator": 4 },
///       "benefits": "25% bonus points" }
///   ]
/// }
/// ```
#[derive(Clone, Debug)]
pub struct JsonFileTiers {
    path: PathBuf,
}

#[derive(Deserialize)]
struct TierFile {
    tiers: Vec<Tier>,
}

impl JsonFileTiers {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl TierConfigPort for JsonFileTiers {
    async fn tier_table(&self) -> Result<TierTable, Error> {
        let raw = tokio::fs::read(&self.path).await.map_err(|err| {
            warn!(path = %self.path.display(), "failed to read tier table: {err}");
            Error::Adapter(Box::new(err))
        })?;
        let file: TierFile = serde_json::from_slice(&raw).map_err(|err| {
            warn!(path = %self.path.display(), "failed to parse tier table: {err}");
            Error::Adapter(Box::new(err))
        })?;

        debug!(path = %self.path.display(), tiers = file.tiers.len(), "loaded tier table");
        Ok(TierTable::new(file.tiers)?)
    }
}
