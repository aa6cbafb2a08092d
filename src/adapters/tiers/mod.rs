use crate::{
    config::Settings,
    domain::TierTable,
    ports::tiers::{Error, TierConfigPort},
};

pub mod json_file;
pub mod memory;

use json_file::JsonFileTiers;
use memory::MemoryTiers;

/// Tier source selected by [`Settings`]
#[derive(Clone, Debug)]
pub enum ConfiguredTiers {
    File(JsonFileTiers),
    Memory(MemoryTiers),
}

impl ConfiguredTiers {
    pub fn from_settings(settings: &Settings) -> Self {
        match &settings.tier_table {
            Some(path) => Self::File(JsonFileTiers::new(path)),
            None => Self::Memory(MemoryTiers::default()),
        }
    }
}

#[async_trait::async_trait]
impl TierConfigPort for ConfiguredTiers {
    async fn tier_table(&self) -> Result<TierTable, Error> {
        match self {
            Self::File(tiers) => tiers.tier_table().await,
            Self::Memory(tiers) => tiers.tier_table().await,
        }
    }
}
