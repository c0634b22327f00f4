use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::AsyncPgConnection;
use scoped_futures::ScopedBoxFuture;
use tracing::{debug, instrument};

use super::LexiconAsyncDatabaseConnectionPool;
use crate::error::{BoxDynError, LexiconError};

impl LexiconAsyncDatabaseConnectionPool {
    /// Execute a serializable database transaction and retry on failure.
    /// Serialisation failures are logged and the transaction is retried (by calling the closure again).
    /// All other failures cause the function to return immediately.
    ///
    /// If `max_retries` serialisation failures have occurred, then [`PermanentTransactionError::too_many_temporary_errors`] is returned.
    #[instrument(err, skip(self, transaction))]
    pub async fn execute_transaction<
        'b,
        ReturnType: 'b + Send,
        PermanentErrorType: PermanentTransactionError + std::fmt::Display,
    >(
        &self,
        transaction: impl for<'r> Fn(
                &'r mut AsyncPgConnection,
            )
                -> ScopedBoxFuture<'b, 'r, Result<ReturnType, TransactionError>>
            + Send
            + Sync,
        max_retries: u64,
    ) -> Result<ReturnType, PermanentErrorType> {
        self.execute_transaction_with_isolation_level(
            transaction,
            IsolationLevel::Serializable,
            max_retries,
        )
        .await
    }

    /// Execute a database transaction in read-committed mode and retry on failure.
    /// This is meant for transactions that touch many rows and should never fail due to serialisation errors.
    #[instrument(err, skip(self, transaction))]
    pub async fn execute_read_committed_transaction<
        'b,
        ReturnType: 'b + Send,
        PermanentErrorType: PermanentTransactionError + std::fmt::Display,
    >(
        &self,
        transaction: impl for<'r> Fn(
                &'r mut AsyncPgConnection,
            )
                -> ScopedBoxFuture<'b, 'r, Result<ReturnType, TransactionError>>
            + Send
            + Sync,
        max_retries: u64,
    ) -> Result<ReturnType, PermanentErrorType> {
        self.execute_transaction_with_isolation_level(
            transaction,
            IsolationLevel::ReadCommitted,
            max_retries,
        )
        .await
    }

    async fn execute_transaction_with_isolation_level<
        'b,
        ReturnType: 'b + Send,
        PermanentErrorType: PermanentTransactionError,
    >(
        &self,
        transaction: impl for<'r> Fn(
                &'r mut AsyncPgConnection,
            )
                -> ScopedBoxFuture<'b, 'r, Result<ReturnType, TransactionError>>
            + Send
            + Sync,
        isolation_level: IsolationLevel,
        max_retries: u64,
    ) -> Result<ReturnType, PermanentErrorType> {
        let mut database_connection = self
            .implementation
            .get()
            .await
            .map_err(|error| PermanentErrorType::permanent_error(Box::new(error)))?;

        for _ in 0..max_retries.saturating_add(1) {
            let transaction_builder = database_connection.build_transaction();
            let mut transaction_builder = match isolation_level {
                IsolationLevel::Serializable => transaction_builder.serializable(),
                IsolationLevel::ReadCommitted => transaction_builder.read_committed(),
            };

            match transaction_builder.run(&transaction).await {
                Ok(result) => return Ok(result),
                Err(TransactionError::Diesel(DieselError::DatabaseError(
                    DatabaseErrorKind::SerializationFailure,
                    _,
                ))) => {
                    debug!("serialisation failure, retrying transaction")
                }
                Err(TransactionError::Permanent(error)) => {
                    return Err(PermanentErrorType::permanent_error(error))
                }
                Err(TransactionError::Diesel(error)) => {
                    return Err(PermanentErrorType::permanent_error(Box::new(error)))
                }
            }
        }

        Err(PermanentTransactionError::too_many_temporary_errors(
            max_retries,
        ))
    }
}

#[derive(Debug, Clone, Copy)]
enum IsolationLevel {
    Serializable,
    ReadCommitted,
}

#[derive(Debug)]
pub enum TransactionError {
    /// The transaction was unable to complete and should not be retried.
    Permanent(BoxDynError),
    /// A database error.
    Diesel(DieselError),
}

impl From<BoxDynError> for TransactionError {
    fn from(value: BoxDynError) -> Self {
        Self::Permanent(value)
    }
}

impl From<DieselError> for TransactionError {
    fn from(value: DieselError) -> Self {
        Self::Diesel(value)
    }
}

impl From<LexiconError> for TransactionError {
    fn from(value: LexiconError) -> Self {
        Self::Permanent(Box::new(value))
    }
}

/// An error type that indicates a permanent transaction failure.
pub trait PermanentTransactionError {
    /// Construct the error instance representing "too many temporary errors".
    /// The `limit` is the error limit that was reached.
    fn too_many_temporary_errors(limit: u64) -> Self;

    /// Construct the error instance representing a general permanent error.
    fn permanent_error(source: BoxDynError) -> Self;
}

impl PermanentTransactionError for LexiconError {
    fn too_many_temporary_errors(limit: u64) -> Self {
        Self::DatabaseTransactionRetryLimitReached { limit }
    }

    fn permanent_error(source: BoxDynError) -> Self {
        Self::PermanentDatabaseTransactionError { source }
    }
}

#[cfg(test)]
mod tests {
    use diesel::result::Error as DieselError;

    use super::{PermanentTransactionError, TransactionError};
    use crate::error::{LexiconError, UserError};

    #[test]
    fn test_application_errors_are_permanent() {
        let error = TransactionError::from(LexiconError::from(UserError::EmptyWord));
        assert!(matches!(error, TransactionError::Permanent(_)));
    }

    #[test]
    fn test_diesel_errors_are_kept_for_classification() {
        let error = TransactionError::from(DieselError::NotFound);
        assert!(matches!(error, TransactionError::Diesel(DieselError::NotFound)));
    }

    #[test]
    fn test_retry_limit_error_names_the_limit() {
        let error = LexiconError::too_many_temporary_errors(3);
        assert!(matches!(
            error,
            LexiconError::DatabaseTransactionRetryLimitReached { limit: 3 }
        ));
    }
}
