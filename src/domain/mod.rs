use std::borrow::Cow;

mod ledger;
mod tier;

pub use ledger::{
    apply_delta, replay, verify_consistency, Account, BalanceUpdate, LedgerEntry, PointsMovement,
    Reason,
};
pub use tier::{points_to_next_tier, resolve_tier, Multiplier, Tier, TierProgress, TierTable};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The tier table is missing, empty or malformed
    ///
    /// This is fatal to any tier resolution and must be fixed by an operator.
    #[error("tier configuration error: {0}")]
    Configuration(Cow<'static, str>),

    /// Applying the delta would make the balance negative
    #[error("insufficient balance: cannot apply {delta_points} to {current_points} points")]
    InsufficientBalance {
        current_points: u32,
        delta_points: i32,
    },

    /// Points or delta outside of the supported range
    #[error("invalid input: {0}")]
    InvalidInput(Cow<'static, str>),

    /// Replaying the ledger does not produce the stored balance
    #[error("ledger mismatch: {0}")]
    LedgerMismatch(Cow<'static, str>),
}
