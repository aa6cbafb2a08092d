use chrono::{DateTime, Utc};
use uuid::Uuid;

#[mockall::automock]
#[async_trait::async_trait]
pub trait UserPort {
    async fn get_user(&self, user_id: Uuid) -> Result<User, Error>;
}

#[derive(Clone, Debug)]
pub struct User {
    pub user_id: Uuid,
    /// Whether an administrator has validated the account
    pub validated: bool,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Domain-level error when a user does not exist
    #[error("user {0} does not exist")]
    UserDoesNotExist(Uuid),

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
