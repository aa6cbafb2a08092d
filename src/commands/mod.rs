use std::{borrow::Cow, sync::Arc};

use crate::config::PointsSettings;

pub mod adjust_points;
pub mod ledger_history;
pub mod tier_status;

pub struct DomainLogic<S, T, U> {
    storage: Arc<S>,
    tiers: Arc<T>,
    users: Arc<U>,
    settings: PointsSettings,
}

impl<S, T, U> DomainLogic<S, T, U> {
    pub fn new(storage: Arc<S>, tiers: Arc<T>, users: Arc<U>, settings: PointsSettings) -> Self {
        Self {
            storage,
            tiers,
            users,
            settings,
        }
    }
}

impl<S, T, U> Clone for DomainLogic<S, T, U> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            tiers: self.tiers.clone(),
            users: self.users.clone(),
            settings: self.settings.clone(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("storage port error: {0:?}")]
    Storage(#[from] crate::ports::storage::Error),
    #[error("tier config port error: {0:?}")]
    Tiers(#[from] crate::ports::tiers::Error),
    #[error("user port error: {0:?}")]
    User(#[from] crate::ports::user::Error),
    #[error("{0}")]
    Domain(#[from] crate::domain::Error),

    /// The user is not allowed to perform this action in their current state
    #[error("rejected: {0}")]
    Rejected(Cow<'static, str>),
}
