use std::sync::Arc;

use api_commands::WordRecord;
use clap::Parser;
use tracing::{debug, info, instrument};

use crate::{
    configuration::Configuration,
    database::{
        create_async_database_connection_pool,
        migrations::{has_missing_migrations, run_migrations},
    },
    error::{LexiconError, LexiconResult},
    external_source::GoogleTranslateSource,
    integration_tests::run_internal_integration_tests,
    lexical_store::PostgresLexicalStore,
    model::{LanguageCode, LanguageSelector},
    resolver::WordResolver,
    web::run_web_api,
};

/// CLI of the lexicon service.
#[derive(Parser, Debug, Default)]
enum Cli {
    /// Run the web API (default).
    /// Pending database migrations are applied before the API starts.
    #[default]
    Web,

    /// Apply pending database migrations.
    ApplyMigrations,

    /// Look up a word like the web API does, and print the result as JSON.
    /// Words that are not stored yet are fetched from the external source and stored.
    Lookup {
        /// The word to look up.
        #[arg(short, long)]
        word: String,
        /// The language of the word, or `auto` to match any stored language.
        #[arg(short, long, default_value = "auto")]
        source_language: LanguageSelector,
        /// The language of the annotations.
        #[arg(short, long)]
        target_language: LanguageCode,
    },

    /// Delete a word and all its annotations.
    Delete {
        /// The word to delete.
        #[arg(short, long)]
        word: String,
        /// The language of the word, or `auto` to match any stored language.
        #[arg(short, long, default_value = "auto")]
        source_language: LanguageSelector,
    },

    /// Run integration tests that require a database, but use APIs that are not exposed through the web interface.
    ///
    /// **WARNING:** This creates and deletes words whose text starts with `__lexicon_integration_test`.
    RunInternalIntegrationTests,
}

#[instrument(skip(configuration))]
pub async fn run_cli_command(configuration: &Configuration) -> LexiconResult<()> {
    let cli_command = Cli::parse();
    debug!("Cli arguments: {cli_command:#?}");

    match cli_command {
        Cli::Web => run_lexicon_backend(configuration).await?,
        Cli::ApplyMigrations => apply_pending_database_migrations(configuration).await?,
        Cli::Lookup {
            word,
            source_language,
            target_language,
        } => lookup(word, source_language, target_language, configuration).await?,
        Cli::Delete {
            word,
            source_language,
        } => delete(word, source_language, configuration).await?,
        Cli::RunInternalIntegrationTests => run_internal_integration_tests(configuration).await?,
    }

    Ok(())
}

#[instrument(err, skip(configuration))]
async fn run_lexicon_backend(configuration: &Configuration) -> LexiconResult<()> {
    debug!("Running lexicon backend with configuration: {configuration:#?}");

    apply_pending_database_migrations(configuration).await?;
    let resolver = create_word_resolver(configuration).await?;

    run_web_api(resolver, configuration).await?;

    info!("Shutting down...");
    Ok(())
}

#[instrument(err, skip(configuration))]
async fn apply_pending_database_migrations(configuration: &Configuration) -> LexiconResult<()> {
    if has_missing_migrations(configuration)? {
        info!("Executing missing database migrations");
        run_migrations(configuration)?;
        info!("Success!");
    } else {
        info!("No missing migrations");
    }

    Ok(())
}

#[instrument(err, skip(configuration))]
async fn lookup(
    word: String,
    source_language: LanguageSelector,
    target_language: LanguageCode,
    configuration: &Configuration,
) -> LexiconResult<()> {
    configuration.verify_word_length(&word)?;
    let resolver = create_word_resolver(configuration).await?;

    match resolver
        .get(&word, &source_language, &target_language)
        .await?
    {
        Some(record) => {
            let output = serde_json::to_string_pretty(&WordRecord::from(record)).map_err(
                |error| LexiconError::SerialiseOutput {
                    source: Box::new(error),
                },
            )?;
            println!("{output}");
        }
        None => info!("'{word}' was not found"),
    }

    Ok(())
}

#[instrument(err, skip(configuration))]
async fn delete(
    word: String,
    source_language: LanguageSelector,
    configuration: &Configuration,
) -> LexiconResult<()> {
    configuration.verify_word_length(&word)?;
    create_word_resolver(configuration)
        .await?
        .delete(&word, &source_language)
        .await
}

/// Wire the resolver to the configured database and external source.
pub async fn create_word_resolver(configuration: &Configuration) -> LexiconResult<WordResolver> {
    let database_connection_pool = create_async_database_connection_pool(configuration).await?;

    Ok(WordResolver::new(
        Arc::new(PostgresLexicalStore::new(
            database_connection_pool,
            configuration,
        )),
        Arc::new(GoogleTranslateSource::new(configuration)),
    ))
}
