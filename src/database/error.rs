use error_stack::Report;
use thiserror::Error;

/// Database related errors
#[derive(Debug, Error)]
pub enum Error {
    /// The configured connection URL is not a usable SQLite URL.
    #[error("invalid connection url")]
    InvalidUrl,
    /// An error caused by an [`sqlx`] error.
    #[error("received a database error")]
    Internal,
    /// A write was rejected by a `UNIQUE` constraint.
    #[error("unique constraint violated")]
    UniqueViolation,
    /// The pool could not hand out a connection in time.
    #[error("unhealthy database pool")]
    UnhealthyPool,
    #[error("failed to perform database migrations")]
    Migration,
}

/// Converts from a generic [sqlx] result into a [database compatible error](Error).
pub trait ErrorExt<T> {
    fn into_db_error(self) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, sqlx::Error> {
    fn into_db_error(self) -> Result<T> {
        self.map_err(|e| {
            let context = match &e {
                sqlx::Error::Database(err) if err.is_unique_violation() => Error::UniqueViolation,
                sqlx::Error::PoolTimedOut => Error::UnhealthyPool,
                _ => Error::Internal,
            };
            Report::new(e).change_context(context)
        })
    }
}

/// Lazily typed [`std::result::Result`] but the error generic
/// is filled up with [a database error](Error).
pub type Result<T> = error_stack::Result<T, Error>;

/// Inspects a report for a [database error](Error) anywhere in its
/// frames, even after the report changed its context:
///
/// ```rust,ignore
/// let result = InsertAccount { .. }.insert(&mut conn).await;
/// if let Err(e) = result {
///     if e.is_unique_violation() {
///         ...
///     }
/// }
/// ```
pub trait ErrorExt2 {
    fn is_unique_violation(&self) -> bool;
}

impl<C> ErrorExt2 for Report<C> {
    fn is_unique_violation(&self) -> bool {
        self.downcast_ref::<Error>()
            .map(|v| matches!(v, Error::UniqueViolation))
            .unwrap_or_default()
    }
}
