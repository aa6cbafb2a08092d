use uuid::Uuid;

use crate::domain::{Account, BalanceUpdate, LedgerEntry};

#[mockall::automock]
#[async_trait::async_trait]
pub trait StoragePort {
    /// Current balance of a user
    ///
    /// Users without any stored movement read as an empty account.
    async fn read_balance(&self, user_id: Uuid) -> Result<Account, Error>;

    /// Persist a new balance, its tier and the ledger entry that produced it
    ///
    /// Either all three are stored or none is. Implementations must reject the update with
    /// [`Error::Conflict`] when the stored balance no longer equals `update.previous_points`.
    async fn write_balance_and_entry(
        &self,
        user_id: Uuid,
        update: BalanceUpdate,
    ) -> Result<Account, Error>;

    /// All ledger entries of a user, oldest first
    async fn ledger_entries(&self, user_id: Uuid) -> Result<Vec<LedgerEntry>, Error>;

    /// Balance and ledger of a user, read together
    ///
    /// No write may land between reading the account and reading its entries, so the entries
    /// always sum to the returned balance in a consistent store.
    async fn account_history(&self, user_id: Uuid) -> Result<AccountHistory, Error>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountHistory {
    pub account: Account,
    /// Oldest first
    pub entries: Vec<LedgerEntry>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The balance changed since it was read
    ///
    /// Another movement was stored between reading the balance and writing the update. The
    /// caller should read the balance again and recompute.
    #[error("balance changed concurrently: expected {expected} points, found {found}")]
    Conflict { expected: u32, found: u32 },

    /// Trying to remove too many loyalty points
    ///
    /// This would result in a negative number of loyalty points, which is not supported.
    #[error("trying to subtract too many points: {delta_points} from {current_points}")]
    NegativePointsTotal {
        current_points: u32,
        delta_points: i32,
    },

    /// The update does not describe a valid transition
    #[error("malformed update: {0}")]
    MalformedUpdate(String),

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
