pub mod storage;
pub mod tiers;
