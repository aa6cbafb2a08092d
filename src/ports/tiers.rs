use crate::domain::TierTable;

/// Source of the tier table
///
/// Implementations may return a different table on every call, so that tier changes made by an
/// administrator apply without restarting the process. Callers should fetch the table once per
/// request and use it for the whole request.
#[mockall::automock]
#[async_trait::async_trait]
pub trait TierConfigPort {
    async fn tier_table(&self) -> Result<TierTable, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The stored table was found but does not form a valid tier table
    #[error("invalid tier table: {0}")]
    Invalid(#[from] crate::domain::Error),

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
