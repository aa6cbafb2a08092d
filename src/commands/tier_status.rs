use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    domain::Tier,
    ports::{storage::StoragePort, tiers::TierConfigPort, user::UserPort},
};
use tower::Service;
use tracing::debug;
use uuid::Uuid;

use super::{DomainLogic, Error};

pub struct TierStatusRequest {
    pub user_id: Uuid,
}

/// Where a user stands in the tier table
#[derive(Debug, PartialEq, Eq)]
pub struct TierStatusResponse {
    pub user_id: Uuid,
    pub points: u32,
    pub tier: Tier,
    /// `None` at the top tier
    pub next_tier: Option<Tier>,
    pub points_remaining: u32,
    pub progress_percent: u8,
}

impl<S, T, U> Service<TierStatusRequest> for DomainLogic<S, T, U>
where
    S: StoragePort + 'static,
    T: TierConfigPort + 'static,
    U: UserPort + 'static,
{
    type Response = TierStatusResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: TierStatusRequest) -> Self::Future {
        let storage = self.storage.clone();
        let tiers = self.tiers.clone();
        let users = self.users.clone();
        Box::pin(async move {
            let user = users.get_user(req.user_id).await?;
            let account = storage.read_balance(user.user_id).await?;
            let table = tiers.tier_table().await?;

            // The stored tier name is only informative; the tier is always derived from points.
            let progress = table.progress(account.points());
            if account.tier().is_some_and(|name| name != progress.current.name) {
                debug!(
                    user_id = %user.user_id,
                    stored = account.tier(),
                    resolved = %progress.current.name,
                    "stored tier differs from the current tier table"
                );
            }

            Ok(TierStatusResponse {
                user_id: user.user_id,
                points: account.points(),
                tier: progress.current,
                next_tier: progress.next,
                points_remaining: progress.points_remaining,
                progress_percent: progress.progress_percent,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapters::tiers::memory::MemoryTiers,
        config::PointsSettings,
        domain::{apply_delta, Account, PointsMovement, Reason, TierTable},
        ports::{storage::MockStoragePort, user::MockUserPort, user::User},
    };
    use chrono::Utc;
    use mockall::predicate::*;
    use rstest::*;
    use speculoos::prelude::*;
    use std::sync::Arc;
    use tower::{BoxError, ServiceExt};

    fn account_with(user_id: Uuid, points: u32) -> Account {
        let mut account = Account::new(user_id);
        if points > 0 {
            let update = apply_delta(
                user_id,
                0,
                PointsMovement::new(points as i32, Reason::ManualAdjustment, Utc::now()),
                &TierTable::standard(),
            )
            .unwrap();
            account.apply(&update);
        }
        account
    }

    #[rstest]
    #[case(0, "Bronze", Some("Silver"), 3000, 0)]
    #[case(4500, "Silver", Some("Gold"), 1500, 50)]
    #[case(12000, "Platinum", None, 0, 100)]
    #[tokio::test]
    async fn test_call(
        #[case] points: u32,
        #[case] tier: &str,
        #[case] next_tier: Option<&str>,
        #[case] remaining: u32,
        #[case] percent: u8,
    ) -> Result<(), BoxError> {
        // GIVEN a user with a stored balance
        let user_id = Uuid::new_v4();
        let mut users = MockUserPort::new();
        users
            .expect_get_user()
            .times(1)
            .with(eq(user_id))
            .returning(move |_| {
                Ok(User {
                    user_id,
                    validated: true,
                    registered_at: Utc::now(),
                })
            });
        let mut storage = MockStoragePort::new();
        storage
            .expect_read_balance()
            .times(1)
            .with(eq(user_id))
            .returning(move |user_id| Ok(account_with(user_id, points)));
        let mut domain = DomainLogic::new(
            Arc::new(storage),
            Arc::new(MemoryTiers::default()),
            Arc::new(users),
            PointsSettings::default(),
        );

        // WHEN calling the service
        let res = ServiceExt::<TierStatusRequest>::ready(&mut domain)
            .await?
            .call(TierStatusRequest { user_id })
            .await?;

        // THEN it reports the tier and the distance to the next one
        assert_that!(res.points).is_equal_to(points);
        assert_that!(res.tier.name.as_str()).is_equal_to(tier);
        assert_that!(res.next_tier.as_ref().map(|tier| tier.name.as_str())).is_equal_to(next_tier);
        assert_that!(res.points_remaining).is_equal_to(remaining);
        assert_that!(res.progress_percent).is_equal_to(percent);

        Ok(())
    }

    #[tokio::test]
    async fn test_call_follows_tier_table_refresh() -> Result<(), BoxError> {
        // GIVEN a Silver user
        let user_id = Uuid::new_v4();
        let mut users = MockUserPort::new();
        users.expect_get_user().returning(move |_| {
            Ok(User {
                user_id,
                validated: true,
                registered_at: Utc::now(),
            })
        });
        let mut storage = MockStoragePort::new();
        storage
            .expect_read_balance()
            .returning(move |user_id| Ok(account_with(user_id, 3500)));
        let tiers = MemoryTiers::default();
        let mut domain = DomainLogic::new(
            Arc::new(storage),
            Arc::new(tiers.clone()),
            Arc::new(users),
            PointsSettings::default(),
        );

        // WHEN the Silver threshold is raised
        tiers.replace(TierTable::new(vec![
            Tier::new("Bronze", 0, 0),
            Tier::new("Silver", 4000, 1),
        ])?)?;
        let res = ServiceExt::<TierStatusRequest>::ready(&mut domain)
            .await?
            .call(TierStatusRequest { user_id })
            .await?;

        // THEN the user is resolved against the new table
        assert_that!(res.tier.name.as_str()).is_equal_to("Bronze");
        assert_that!(res.points_remaining).is_equal_to(500);

        Ok(())
    }
}
