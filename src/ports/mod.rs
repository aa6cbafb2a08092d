pub mod storage;
pub mod tiers;
pub mod user;
