use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    config::PointsSettings,
    domain::{self, apply_delta, LedgerEntry, PointsMovement, Reason, Tier},
    ports::{
        storage::{self, StoragePort},
        tiers::TierConfigPort,
        user::{User, UserPort},
    },
};
use chrono::{DateTime, Utc};
use tower::Service;
use tracing::{info, warn};
use uuid::Uuid;

use super::{DomainLogic, Error};

pub struct AdjustPointsRequest {
    pub user_id: Uuid,
    pub event: PointsEvent,
}

pub enum PointsEvent {
    /// An administrator approved an uploaded purchase receipt
    PurchaseApproved {
        purchase_amount: f64,
        receipt: Option<String>,
    },
    /// Manually adding or removing points, e.g. for support
    ManualAdjustment { delta: i32, note: Option<String> },
    /// A user registered with this user as their referrer
    ReferralBonus { referred_user: Uuid },
    /// The user exchanged points for a reward
    Redemption { points: u32, reward: String },
    /// An administrator validated the user's account
    UserValidated,
}

impl PointsEvent {
    pub fn reason(&self) -> Reason {
        match self {
            PointsEvent::PurchaseApproved { .. } => Reason::PurchaseApproval,
            PointsEvent::ManualAdjustment { .. } => Reason::ManualAdjustment,
            PointsEvent::ReferralBonus { .. } => Reason::ReferralBonus,
            PointsEvent::Redemption { .. } => Reason::Redemption,
            PointsEvent::UserValidated => Reason::ValidationEvent,
        }
    }

    /// Text stored with the ledger entry
    pub fn note(&self) -> Option<String> {
        match self {
            PointsEvent::PurchaseApproved { receipt, .. } => receipt
                .as_ref()
                .map(|receipt| format!("Receipt {receipt}")),
            PointsEvent::ManualAdjustment { note, .. } => note
                .as_ref()
                .cloned()
                .or_else(|| Some("Manual adjustment".to_string())),
            PointsEvent::ReferralBonus { referred_user } => {
                Some(format!("Referred user {referred_user}"))
            }
            PointsEvent::Redemption { reward, .. } => Some(format!("Redeemed {reward}")),
            PointsEvent::UserValidated => Some("Account validated".to_string()),
        }
    }

    /// Whether the user must have been validated by an administrator first
    fn requires_validated_user(&self) -> bool {
        matches!(
            self,
            PointsEvent::PurchaseApproved { .. }
                | PointsEvent::ReferralBonus { .. }
                | PointsEvent::UserValidated
        )
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct AdjustPointsResponse {
    pub user_id: Uuid,
    /// Tier before the movement
    pub old_tier: String,
    /// Tier after the movement
    pub new_tier: String,
    /// Previous number of loyalty points
    pub old_points: u32,
    /// New number of loyalty points
    pub new_points: u32,
    pub entry: LedgerEntry,
}

impl AdjustPointsResponse {
    pub fn tier_changed(&self) -> bool {
        self.old_tier != self.new_tier
    }
}

impl<S, T, U> Service<AdjustPointsRequest> for DomainLogic<S, T, U>
where
    S: StoragePort + 'static,
    T: TierConfigPort + 'static,
    U: UserPort + 'static,
{
    type Response = AdjustPointsResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: AdjustPointsRequest) -> Self::Future {
        let storage = self.storage.clone();
        let tiers = self.tiers.clone();
        let users = self.users.clone();
        let settings = self.settings.clone();
        Box::pin(async move {
            // Fetch necessary data
            let user = users.get_user(req.user_id).await?;
            check_eligibility(&user, &req.event)?;
            if let PointsEvent::ReferralBonus { referred_user } = &req.event {
                users.get_user(*referred_user).await?;
            }
            let table = tiers.tier_table().await?;

            let mut attempt = 1;
            loop {
                let account = storage.read_balance(user.user_id).await?;
                let old_tier = table.resolve(account.points());

                // Create the movement against the balance we just read
                let movement = create_movement(old_tier, &req.event, &settings, Utc::now())?;
                let update = apply_delta(user.user_id, account.points(), movement, &table)
                    .map_err(|err| {
                        warn!(user_id = %user.user_id, "rejected points movement: {err}");
                        err
                    })?;

                match storage
                    .write_balance_and_entry(user.user_id, update.clone())
                    .await
                {
                    Ok(stored) => {
                        info!(
                            user_id = %user.user_id,
                            reason = %update.entry.reason,
                            delta = update.entry.delta,
                            balance = stored.points(),
                            tier = %update.new_tier.name,
                            "stored points movement"
                        );
                        if old_tier.name != update.new_tier.name {
                            info!(
                                user_id = %user.user_id,
                                from = %old_tier.name,
                                to = %update.new_tier.name,
                                "tier changed"
                            );
                        }

                        return Ok(AdjustPointsResponse {
                            user_id: user.user_id,
                            old_tier: old_tier.name.clone(),
                            new_tier: update.new_tier.name,
                            old_points: update.previous_points,
                            new_points: update.new_points,
                            entry: update.entry,
                        });
                    }
                    Err(storage::Error::Conflict { expected, found })
                        if attempt < settings.max_write_attempts =>
                    {
                        warn!(
                            user_id = %user.user_id,
                            attempt,
                            expected,
                            found,
                            "balance changed concurrently, retrying"
                        );
                        attempt += 1;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        })
    }
}

fn check_eligibility(user: &User, event: &PointsEvent) -> Result<(), Error> {
    if event.requires_validated_user() && !user.validated {
        return Err(Error::Rejected(
            format!("user {} has not been validated", user.user_id).into(),
        ));
    }
    if let PointsEvent::ReferralBonus { referred_user } = event {
        if *referred_user == user.user_id {
            return Err(Error::Rejected("users cannot refer themselves".into()));
        }
    }
    Ok(())
}

/// Turn an event into a signed point movement
///
/// `tier` is the tier the user is in before the movement; its multiplier applies to purchases.
fn create_movement(
    tier: &Tier,
    event: &PointsEvent,
    settings: &PointsSettings,
    occurred_at: DateTime<Utc>,
) -> Result<PointsMovement, domain::Error> {
    let delta = match event {
        PointsEvent::PurchaseApproved {
            purchase_amount, ..
        } => {
            if !purchase_amount.is_finite() || *purchase_amount <= 0.0 {
                return Err(domain::Error::InvalidInput(
                    format!("purchase amount must be positive, got {purchase_amount}").into(),
                ));
            }
            let base = (purchase_amount * settings.points_per_unit as f64).floor();
            if base > u32::MAX as f64 {
                return Err(domain::Error::InvalidInput(
                    format!("purchase amount {purchase_amount} is too large").into(),
                ));
            }
            let earned = tier.scale(base as u32)?;
            if earned == 0 {
                return Err(domain::Error::InvalidInput(
                    format!("purchase amount {purchase_amount} earns no points").into(),
                ));
            }
            to_delta(earned)?
        }
        PointsEvent::ManualAdjustment { delta, .. } => *delta,
        PointsEvent::ReferralBonus { .. } => to_delta(settings.referral_bonus)?,
        PointsEvent::Redemption { points, .. } => -to_delta(*points)?,
        PointsEvent::UserValidated => to_delta(settings.validation_bonus)?,
    };

    let mut movement = PointsMovement::new(delta, event.reason(), occurred_at);
    movement.note = event.note();
    Ok(movement)
}

fn to_delta(points: u32) -> Result<i32, domain::Error> {
    i32::try_from(points).map_err(|_| {
        domain::Error::InvalidInput(format!("{points} points exceed a single movement").into())
    })
}
