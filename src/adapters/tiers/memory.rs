use crate::{
    domain::TierTable,
    ports::tiers::{Error, TierConfigPort},
};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// Tier table held in memory
///
/// Clones share the same table, so [`MemoryTiers::replace`] on any clone is visible to all of
/// them.
#[derive(Clone, Debug)]
pub struct MemoryTiers {
    table: Arc<RwLock<TierTable>>,
}

impl MemoryTiers {
    pub fn new(table: TierTable) -> Self {
        Self {
            table: Arc::new(RwLock::new(table)),
        }
    }

    /// Swap the tier table used by subsequent requests
    pub fn replace(&self, table: TierTable) -> Result<(), Error> {
        info!(tiers = table.tiers().len(), "replacing tier table");
        *self.table.write()? = table;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TierConfigPort for MemoryTiers {
    async fn tier_table(&self) -> Result<TierTable, Error> {
        Ok(self.table.read()?.clone())
    }
}

impl Default for MemoryTiers {
    fn default() -> Self {
        Self::new(TierTable::standard())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("poison error: {0}")]
pub struct ErasedPoisonError(String);

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Self::Adapter(Box::new(ErasedPoisonError(err.to_string())))
    }
}
