use crate::{
    domain::{Account, BalanceUpdate, LedgerEntry},
    ports::storage::{AccountHistory, Error, StoragePort},
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use uuid::Uuid;

/// Account and ledger of a single user
#[derive(Clone, Debug)]
struct Record {
    account: Account,
    entries: Vec<LedgerEntry>,
}

#[derive(Clone, Debug)]
pub struct MemoryStorage {
    records: Arc<Mutex<HashMap<Uuid, Record>>>,
}

#[async_trait::async_trait]
impl StoragePort for MemoryStorage {
    async fn read_balance(&self, user_id: Uuid) -> Result<Account, Error> {
        let account = self
            .records
            .lock()?
            .get(&user_id)
            .map(|record| record.account.clone())
            .unwrap_or_else(|| Account::new(user_id));

        Ok(account)
    }

    async fn write_balance_and_entry(
        &self,
        user_id: Uuid,
        update: BalanceUpdate,
    ) -> Result<Account, Error> {
        if update.entry.user_id != user_id {
            return Err(Error::MalformedUpdate(format!(
                "entry for user {} stored under user {user_id}",
                update.entry.user_id
            )));
        }

        // Checks and mutation happen under the same lock, so the update is all-or-nothing.
        let mut records = self.records.lock()?;
        let record = records.entry(user_id).or_insert_with(|| Record {
            account: Account::new(user_id),
            entries: Vec::new(),
        });

        let current_points = record.account.points();
        // A stale update must be reported as a conflict so the caller can recompute it
        if current_points != update.previous_points {
            return Err(Error::Conflict {
                expected: update.previous_points,
                found: current_points,
            });
        }
        // Return an error if this would make the number of loyalty points negative
        if current_points as i64 + (update.entry.delta as i64) < 0 {
            return Err(Error::NegativePointsTotal {
                current_points,
                delta_points: update.entry.delta,
            });
        }
        if update.entry.previous_balance() != update.previous_points as i64
            || update.entry.resulting_balance != update.new_points
        {
            return Err(Error::MalformedUpdate(format!(
                "entry moves {} points from {} to {}, update expects {} to {}",
                update.entry.delta,
                update.entry.previous_balance(),
                update.entry.resulting_balance,
                update.previous_points,
                update.new_points
            )));
        }

        record.account.apply(&update);
        record.entries.push(update.entry);

        Ok(record.account.clone())
    }

    async fn ledger_entries(&self, user_id: Uuid) -> Result<Vec<LedgerEntry>, Error> {
        let entries = self
            .records
            .lock()?
            .get(&user_id)
            .map(|record| record.entries.clone())
            .unwrap_or_default();

        Ok(entries)
    }

    async fn account_history(&self, user_id: Uuid) -> Result<AccountHistory, Error> {
        let history = self
            .records
            .lock()?
            .get(&user_id)
            .map(|record| AccountHistory {
                account: record.account.clone(),
                entries: record.entries.clone(),
            })
            .unwrap_or_else(|| AccountHistory {
                account: Account::new(user_id),
                entries: Vec::new(),
            });

        Ok(history)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

/// Erased [`PoisonError`]
///
/// `PoisonError` keeps the `MutexGuard` internally, which is not send. Thus we erase the error
/// and only keep the string representation instead.
#[derive(Debug, thiserror::Error)]
#[error("poison error: {0}")]
pub struct ErasedPoisonError(String);

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Self::Adapter(Box::new(ErasedPoisonError(err.to_string())))
    }
}
