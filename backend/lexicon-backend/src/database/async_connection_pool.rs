use diesel_async::{
    pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager},
    AsyncPgConnection,
};
use tracing::instrument;

use crate::{
    configuration::Configuration,
    error::{LexiconError, LexiconResult},
};

#[derive(Clone)]
pub struct LexiconAsyncDatabaseConnectionPool {
    pub(super) implementation: Pool<AsyncPgConnection>,
}

impl LexiconAsyncDatabaseConnectionPool {
    #[instrument(err, skip(configuration))]
    pub(super) fn new(configuration: &Configuration) -> LexiconResult<Self> {
        let connection_manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(
            configuration.postgres_url.unsecure(),
        );
        let pool = Pool::builder(connection_manager)
            .max_size(configuration.database_pool_size)
            .build()
            .map_err(|error| LexiconError::DatabasePool {
                source: Box::new(error),
            })?;

        Ok(Self {
            implementation: pool,
        })
    }
}
