use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no identity found for {0}")]
    NotFound(String),

    /// Transient on the login path: the losing side of a first-login race
    /// recovers by re-running the lookup. Terminal on explicit registration.
    #[error("an identity already exists for {0}")]
    Duplicate(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum OwnershipError {
    #[error("only the owner may modify this resource")]
    Forbidden,
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("no identity found for {0}")]
    UserNotFound(String),

    /// Optimistic-concurrency failure that survived all retries.
    #[error("conflicting concurrent library writes for user {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
