use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    domain::{verify_consistency, LedgerEntry},
    ports::{
        storage::{AccountHistory, StoragePort},
        tiers::TierConfigPort,
        user::UserPort,
    },
};
use tower::Service;
use tracing::error;
use uuid::Uuid;

use super::{DomainLogic, Error};

pub struct LedgerHistoryRequest {
    pub user_id: Uuid,
}

#[derive(Debug, PartialEq, Eq)]
pub struct LedgerHistoryResponse {
    pub user_id: Uuid,
    /// Stored balance, equal to the sum of `entries`
    pub points: u32,
    /// Oldest first
    pub entries: Vec<LedgerEntry>,
}

impl<S, T, U> Service<LedgerHistoryRequest> for DomainLogic<S, T, U>
where
    S: StoragePort + 'static,
    T: TierConfigPort + 'static,
    U: UserPort + 'static,
{
    type Response = LedgerHistoryResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: LedgerHistoryRequest) -> Self::Future {
        let storage = self.storage.clone();
        let users = self.users.clone();
        Box::pin(async move {
            let user = users.get_user(req.user_id).await?;
            let AccountHistory { account, entries } =
                storage.account_history(user.user_id).await?;

            verify_consistency(account.points(), &entries).map_err(|err| {
                error!(user_id = %user.user_id, "ledger does not match balance: {err}");
                err
            })?;

            Ok(LedgerHistoryResponse {
                user_id: user.user_id,
                points: account.points(),
                entries,
            })
        })
    }
}
