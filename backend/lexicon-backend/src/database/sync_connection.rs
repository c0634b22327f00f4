use diesel::PgConnection;
use tracing::instrument;

use crate::{
    configuration::Configuration,
    error::{LexiconError, LexiconResult},
};

/// Synchronous connection, only used where `diesel_async` has no support, like migrations.
pub struct LexiconSyncDatabaseConnection {
    pub(super) implementation: PgConnection,
}

impl LexiconSyncDatabaseConnection {
    #[instrument(err, skip(configuration))]
    pub(super) fn new(configuration: &Configuration) -> LexiconResult<Self> {
        use diesel::Connection;

        // create a new connection with the default config
        let connection =
            PgConnection::establish(configuration.postgres_url.unsecure()).map_err(|error| {
                LexiconError::DatabaseConnection {
                    source: Box::new(error),
                }
            })?;
        Ok(Self {
            implementation: connection,
        })
    }

    pub(super) fn get_mut(&mut self) -> &mut PgConnection {
        &mut self.implementation
    }
}
