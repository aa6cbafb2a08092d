use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Error, Tier, TierTable};

/// Points balance of a user
///
/// The balance is a materialized view of the user's ledger. The tier is only ever set together
/// with the points it was resolved from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: Uuid,
    points: u32,
    /// Name of the tier resolved for `points`
    ///
    /// `None` until the first point movement is stored.
    tier: Option<String>,
}

impl Account {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            points: 0,
            tier: None,
        }
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn tier(&self) -> Option<&str> {
        self.tier.as_deref()
    }

    /// Move the account to the state described by an update
    pub fn apply(&mut self, update: &BalanceUpdate) {
        self.points = update.new_points;
        self.tier = Some(update.new_tier.name.clone());
    }
}

/// Why points moved
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    PurchaseApproval,
    ManualAdjustment,
    ReferralBonus,
    Redemption,
    ValidationEvent,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Reason::PurchaseApproval => "purchase-approval",
            Reason::ManualAdjustment => "manual-adjustment",
            Reason::ReferralBonus => "referral-bonus",
            Reason::Redemption => "redemption",
            Reason::ValidationEvent => "validation-event",
        })
    }
}

/// An approved point-affecting action, before it is applied to a balance
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointsMovement {
    /// Difference in points
    ///
    /// A positive number adds points to the current total. A negative number removes from it.
    pub delta: i32,
    pub reason: Reason,
    /// Free-text detail shown in the history, e.g. the redeemed reward
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl PointsMovement {
    pub fn new(delta: i32, reason: Reason, occurred_at: DateTime<Utc>) -> Self {
        Self {
            delta,
            reason,
            note: None,
            occurred_at,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Immutable record of one balance change
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub user_id: Uuid,
    pub delta: i32,
    pub reason: Reason,
    pub note: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub resulting_balance: u32,
}

impl LedgerEntry {
    /// Balance the entry was applied to
    pub fn previous_balance(&self) -> i64 {
        self.resulting_balance as i64 - self.delta as i64
    }
}

/// Result of applying a movement to a balance
///
/// The storage layer must persist `new_points`, `new_tier` and `entry` together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceUpdate {
    pub previous_points: u32,
    pub new_points: u32,
    pub new_tier: Tier,
    pub entry: LedgerEntry,
}

/// Apply a signed delta to a balance
///
/// This performs no I/O. The caller must read `current_points` under whatever serialization the
/// storage layer offers, and persist the returned update atomically.
pub fn apply_delta(
    user_id: Uuid,
    current_points: u32,
    movement: PointsMovement,
    tiers: &TierTable,
) -> Result<BalanceUpdate, Error> {
    let new_points = current_points as i64 + movement.delta as i64;
    if new_points < 0 {
        return Err(Error::InsufficientBalance {
            current_points,
            delta_points: movement.delta,
        });
    }
    let new_points = u32::try_from(new_points).map_err(|_| {
        Error::InvalidInput(
            format!(
                "adding {} to {current_points} exceeds the maximum balance",
                movement.delta
            )
            .into(),
        )
    })?;

    let new_tier = tiers.resolve(new_points).clone();

    Ok(BalanceUpdate {
        previous_points: current_points,
        new_points,
        new_tier,
        entry: LedgerEntry {
            user_id,
            delta: movement.delta,
            reason: movement.reason,
            note: movement.note,
            timestamp: movement.occurred_at,
            resulting_balance: new_points,
        },
    })
}

/// Rebuild a balance from a user's full ledger, oldest entry first
pub fn replay<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Result<u32, Error> {
    entries
        .into_iter()
        .enumerate()
        .try_fold(0u32, |balance, (position, entry)| {
            let next = balance as i64 + entry.delta as i64;
            if next < 0 || next > u32::MAX as i64 {
                return Err(Error::LedgerMismatch(
                    format!("entry {position} moves the balance out of range ({next})").into(),
                ));
            }
            if next != entry.resulting_balance as i64 {
                return Err(Error::LedgerMismatch(
                    format!(
                        "entry {position} records {} points but the ledger sums to {next}",
                        entry.resulting_balance
                    )
                    .into(),
                ));
            }
            Ok(next as u32)
        })
}

/// Check that a stored balance equals the sum of its ledger
pub fn verify_consistency(balance: u32, entries: &[LedgerEntry]) -> Result<(), Error> {
    let replayed = replay(entries)?;
    if replayed != balance {
        return Err(Error::LedgerMismatch(
            format!("stored balance is {balance} but the ledger sums to {replayed}").into(),
        ));
    }
    Ok(())
}
