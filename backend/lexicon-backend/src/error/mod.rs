use std::{error::Error, ffi::OsString, sync::Arc};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

pub type LexiconResult<T> = Result<T, LexiconError>;

pub type BoxDynError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("environment variable '{key}' has malformed value {value:?}: {source}")]
    MalformedEnvironmentVariable {
        key: String,
        value: OsString,
        source: BoxDynError,
    },

    #[error("error setting up tracing: {source}")]
    SetupTracing { source: BoxDynError },

    #[error("error building the tokio runtime: {source}")]
    TokioRuntime { source: BoxDynError },

    #[error("error connecting to the database: {source}")]
    DatabaseConnection { source: BoxDynError },

    #[error("error creating the database connection pool: {source}")]
    DatabasePool { source: BoxDynError },

    #[error("error running database migrations: {source}")]
    DatabaseMigration { source: BoxDynError },

    #[error("database transaction failed {limit} times with a temporary error")]
    DatabaseTransactionRetryLimitReached { limit: u64 },

    #[error("permanent database transaction error: {source}")]
    PermanentDatabaseTransactionError { source: BoxDynError },

    #[error("found {count} words '{word}' with language '{language}', expected at most one")]
    AmbiguousWord {
        word: String,
        language: String,
        count: usize,
    },

    #[error("cannot store word '{word}' without a concrete language")]
    WildcardLanguageNotStorable { word: String },

    #[error("fetching or storing an unknown word failed: {source}")]
    SharedFetch { source: Arc<LexiconError> },

    #[error("error joining a tokio task: {source}")]
    TokioTaskJoin { source: BoxDynError },

    #[error("api server error: {source}")]
    ApiServerError { source: BoxDynError },

    #[error("error serialising output: {source}")]
    SerialiseOutput { source: BoxDynError },

    #[error("internal integration test failed: {message}")]
    IntegrationTest { message: String },

    #[error(transparent)]
    UserError(#[from] UserError),
}

/// Errors caused by invalid input from a caller.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("invalid language code {code:?}")]
    InvalidLanguage { code: String },

    #[error("the wildcard language 'auto' is not allowed here")]
    WildcardLanguageNotAllowed,

    #[error("word must not be empty")]
    EmptyWord,

    #[error("word is too long, at most {maximum} characters are allowed")]
    WordTooLong { maximum: usize },

    #[error("page must be at least 1, but was {page}")]
    InvalidPage { page: i64 },

    #[error("page size must be at least 1, but was {page_size}")]
    InvalidPageSize { page_size: i64 },
}

impl From<diesel::result::Error> for LexiconError {
    fn from(error: diesel::result::Error) -> Self {
        Self::PermanentDatabaseTransactionError {
            source: Box::new(error),
        }
    }
}

impl IntoResponse for LexiconError {
    fn into_response(self) -> Response {
        match self {
            LexiconError::UserError(user_error) => {
                (StatusCode::BAD_REQUEST, user_error.to_string()).into_response()
            }
            error => {
                error!("Error while handling request: {error}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{http::StatusCode, response::IntoResponse};

    use super::{LexiconError, UserError};

    #[test]
    fn test_user_errors_are_bad_requests() {
        let response = LexiconError::from(UserError::EmptyWord).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_ambiguous_word_is_internal_error() {
        let response = LexiconError::AmbiguousWord {
            word: "apple".to_owned(),
            language: "en".to_owned(),
            count: 2,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_shared_fetch_errors_are_internal_errors() {
        let response = LexiconError::SharedFetch {
            source: Arc::new(LexiconError::PermanentDatabaseTransactionError {
                source: "database unavailable".into(),
            }),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
