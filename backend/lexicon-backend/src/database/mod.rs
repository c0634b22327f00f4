use tracing::instrument;

use crate::{configuration::Configuration, error::LexiconResult};

mod async_connection_pool;
pub mod migrations;
pub mod model;
pub mod schema;
mod sync_connection;
pub mod transactions;

pub use async_connection_pool::LexiconAsyncDatabaseConnectionPool;

#[instrument(err, skip(configuration))]
pub async fn create_async_database_connection_pool(
    configuration: &Configuration,
) -> LexiconResult<LexiconAsyncDatabaseConnectionPool> {
    LexiconAsyncDatabaseConnectionPool::new(configuration)
}
