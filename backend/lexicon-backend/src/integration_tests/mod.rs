//! Checks against a real database, run with the `run-internal-integration-tests` command.
//!
//! All test words start with [`TEST_WORD_PREFIX`] and are removed before and after the run.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use scoped_futures::ScopedFutureExt;
use tokio::time::sleep;
use tracing::{info, instrument};

use crate::{
    configuration::Configuration,
    database::{
        create_async_database_connection_pool,
        schema::{definitions, synonyms, words},
        LexiconAsyncDatabaseConnectionPool,
    },
    error::{LexiconError, LexiconResult},
    external_source::ExternalLexicalSource,
    lexical_store::{LexicalStore, PostgresLexicalStore},
    model::{
        Annotation, LanguageCode, LanguageSelector, LexicalRecord, PageRequest, RelationSelection,
    },
    resolver::WordResolver,
};

const TEST_WORD_PREFIX: &str = "__lexicon_integration_test_";

#[instrument(err, skip(configuration))]
pub async fn run_internal_integration_tests(configuration: &Configuration) -> LexiconResult<()> {
    let database_connection_pool = create_async_database_connection_pool(configuration).await?;
    let store = Arc::new(PostgresLexicalStore::new(
        database_connection_pool.clone(),
        configuration,
    ));

    remove_test_words(&database_connection_pool).await?;

    let result = async {
        test_idempotent_delete(&store).await?;
        test_cache_aside(&store).await?;
        test_no_duplicate_insert(&store, &database_connection_pool).await?;
        test_definition_implies_translation(&store).await?;
        test_pagination(&store, configuration).await?;
        test_ambiguity(&store).await?;
        test_aborted_transaction(&database_connection_pool).await
    }
    .await;

    remove_test_words(&database_connection_pool).await?;
    result?;

    info!("All internal integration tests passed");
    Ok(())
}

/// Answers every lookup with the same record and counts the lookups.
struct FixedSource {
    record: Option<LexicalRecord>,
    calls: AtomicUsize,
}

#[async_trait]
impl ExternalLexicalSource for FixedSource {
    async fn get(
        &self,
        _word: &str,
        _source_language: &LanguageSelector,
        _target_language: &LanguageCode,
    ) -> Option<LexicalRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.record.clone()
    }
}

fn ensure(condition: bool, message: impl Into<String>) -> LexiconResult<()> {
    if condition {
        Ok(())
    } else {
        Err(LexiconError::IntegrationTest {
            message: message.into(),
        })
    }
}

fn test_word(suffix: &str) -> String {
    format!("{TEST_WORD_PREFIX}{suffix}")
}

fn language(code: &str) -> LexiconResult<LanguageCode> {
    Ok(LanguageCode::new(code)?)
}

#[instrument(err, skip(database_connection_pool))]
async fn remove_test_words(
    database_connection_pool: &LexiconAsyncDatabaseConnectionPool,
) -> LexiconResult<()> {
    let pattern = format!("{}%", TEST_WORD_PREFIX.replace('_', "\\_"));
    let pattern = pattern.as_str();

    database_connection_pool
        .execute_transaction::<_, LexiconError>(
            |database_connection| {
                async move {
                    Ok(diesel::delete(words::table.filter(words::word.like(pattern)))
                        .execute(database_connection)
                        .await?)
                }
                .scope_boxed()
            },
            0,
        )
        .await?;

    Ok(())
}

#[instrument(err, skip(store))]
async fn test_idempotent_delete(store: &Arc<PostgresLexicalStore>) -> LexiconResult<()> {
    let resolver = WordResolver::new(
        store.clone(),
        Arc::new(FixedSource {
            record: None,
            calls: AtomicUsize::new(0),
        }),
    );
    let word = test_word("never_stored");

    resolver.delete(&word, &LanguageSelector::Any).await?;
    resolver.delete(&word, &"en".parse()?).await?;
    ensure(
        store.get_id(&word, &LanguageSelector::Any).await?.is_none(),
        "deleting an unknown word created it",
    )?;

    let mut record = LexicalRecord::new(test_word("deleted"), language("en")?);
    record.add_definition(Annotation::new(language("es")?, "borrado"));
    record.add_example(Annotation::new(language("es")?, "fue borrado"));
    store.save(&record).await?;
    resolver.delete(&record.word, &"en".parse()?).await?;
    resolver.delete(&record.word, &"en".parse()?).await?;
    ensure(
        store.get_id(&record.word, &LanguageSelector::Any).await?.is_none(),
        "deleted word still exists",
    )?;

    info!("Success! Deleting is idempotent");
    Ok(())
}

/// The scenario of looking up "apple" twice, where only the first lookup consults the external source.
#[instrument(err, skip(store))]
async fn test_cache_aside(store: &Arc<PostgresLexicalStore>) -> LexiconResult<()> {
    let english: LanguageSelector = "en".parse()?;
    let spanish = language("es")?;
    let word = test_word("apple");

    let mut apple = LexicalRecord::new(word.as_str(), english.clone());
    apple.add_definition(Annotation::new(spanish.clone(), "a fruit"));
    apple.add_translation(Annotation::new(spanish.clone(), "manzana"));

    let source = Arc::new(FixedSource {
        record: Some(apple.clone()),
        calls: AtomicUsize::new(0),
    });
    let resolver = WordResolver::new(store.clone(), source.clone());

    let fetched = resolver.get(&word, &english, &spanish).await?;
    ensure(
        fetched.as_ref() == Some(&apple),
        format!("first lookup returned {fetched:?}"),
    )?;
    let stored = store.get(&word, &english, &spanish).await?;
    ensure(
        stored.as_ref() == Some(&apple),
        format!("store holds {stored:?} after the first lookup"),
    )?;

    let cached = resolver.get(&word, &english, &spanish).await?;
    ensure(
        cached.as_ref() == Some(&apple),
        format!("second lookup returned {cached:?}"),
    )?;
    ensure(
        AtomicUsize::load(&source.calls, Ordering::SeqCst) == 1,
        "second lookup consulted the external source",
    )?;

    let wildcard = resolver
        .get(&word, &LanguageSelector::Any, &spanish)
        .await?;
    ensure(
        wildcard.as_ref() == Some(&apple),
        format!("wildcard lookup returned {wildcard:?}"),
    )?;

    let wildcard_record = LexicalRecord::new(word.as_str(), LanguageSelector::Any);
    ensure(
        matches!(
            store.save(&wildcard_record).await,
            Err(LexiconError::WildcardLanguageNotStorable { .. })
        ),
        "a record without a concrete language was stored",
    )?;

    info!("Success! Fetched records are stored and served from the store");
    Ok(())
}

#[instrument(err, skip(store, database_connection_pool))]
async fn test_no_duplicate_insert(
    store: &Arc<PostgresLexicalStore>,
    database_connection_pool: &LexiconAsyncDatabaseConnectionPool,
) -> LexiconResult<()> {
    let spanish = language("es")?;
    let mut record = LexicalRecord::new(test_word("pear"), language("en")?);
    record.add_definition(Annotation::new(spanish.clone(), "pera"));
    record.add_synonym(Annotation::new(spanish.clone(), "perilla"));
    record.add_synonym(Annotation::new(language("de")?, "Birne"));

    store.save(&record).await?;
    store.save(&record).await?;

    let word = record.word.as_str();
    let (definition_count, synonym_count) = database_connection_pool
        .execute_transaction::<_, LexiconError>(
            |database_connection| {
                async move {
                    let definition_count: i64 = definitions::table
                        .inner_join(words::table)
                        .filter(words::word.eq(word))
                        .count()
                        .get_result(database_connection)
                        .await?;
                    let synonym_count: i64 = synonyms::table
                        .inner_join(words::table)
                        .filter(words::word.eq(word))
                        .count()
                        .get_result(database_connection)
                        .await?;
                    Ok((definition_count, synonym_count))
                }
                .scope_boxed()
            },
            0,
        )
        .await?;

    ensure(
        definition_count == 1 && synonym_count == 2,
        format!(
            "found {definition_count} definitions and {synonym_count} synonyms \
             after saving twice"
        ),
    )?;

    info!("Success! Saving twice does not duplicate annotations");
    Ok(())
}

#[instrument(err, skip(store))]
async fn test_definition_implies_translation(
    store: &Arc<PostgresLexicalStore>,
) -> LexiconResult<()> {
    let english: LanguageSelector = "en".parse()?;
    let spanish = language("es")?;
    let german = language("de")?;

    let mut record = LexicalRecord::new(test_word("plum"), english.clone());
    record.add_definition(Annotation::new(german.clone(), "Pflaume"));
    record.add_synonym(Annotation::new(spanish.clone(), "ciruela"));
    record.add_translation(Annotation::new(spanish.clone(), "ciruela"));
    record.add_example(Annotation::new(spanish.clone(), "una ciruela"));
    store.save(&record).await?;

    let spanish_lookup = store.get(&record.word, &english, &spanish).await?;
    ensure(
        spanish_lookup.is_none(),
        format!("word without spanish definition was found: {spanish_lookup:?}"),
    )?;

    let german_lookup = store.get(&record.word, &english, &german).await?;
    let german_definitions = german_lookup.and_then(|record| record.definitions);
    ensure(
        german_definitions == Some(vec![Annotation::new(german, "Pflaume")]),
        format!("german lookup found {german_definitions:?}"),
    )?;

    info!("Success! Words are only found with a definition in the target language");
    Ok(())
}

#[instrument(err, skip(store, configuration))]
async fn test_pagination(
    store: &Arc<PostgresLexicalStore>,
    configuration: &Configuration,
) -> LexiconResult<()> {
    let spanish = language("es")?;
    // Saved in reverse, so insertion order differs from word order.
    for index in (0..25).rev() {
        let word = test_word(&format!("page_{index:02}"));
        let mut record = LexicalRecord::new(word, language("en")?);
        record.add_definition(Annotation::new(spanish.clone(), format!("página {index}")));
        store.save(&record).await?;
    }

    // The filter is case-insensitive and matches `_` literally.
    let filter = test_word("PAGE_");
    let second_page = store
        .list_page(
            PageRequest::new(Some(2), Some(10), configuration)?,
            Some(&filter),
            RelationSelection::none(),
        )
        .await?;
    let words: Vec<_> = second_page.iter().map(|record| record.word.clone()).collect();
    let expected: Vec<_> = (10..20)
        .map(|index| test_word(&format!("page_{index:02}")))
        .collect();
    ensure(words == expected, format!("second page was {words:?}"))?;
    ensure(
        second_page.iter().all(|record| record.definitions.is_none()),
        "unrequested definitions were loaded",
    )?;

    let first_page = store
        .list_page(
            PageRequest::new(Some(1), Some(10), configuration)?,
            Some(&filter),
            RelationSelection {
                definitions: true,
                ..RelationSelection::none()
            },
        )
        .await?;
    ensure(
        first_page.iter().next().and_then(|record| record.definitions.clone())
            == Some(vec![Annotation::new(spanish, "página 0")]),
        format!("first page started with {:?}", first_page.iter().next()),
    )?;
    ensure(
        first_page.iter().all(|record| record.synonyms.is_none()),
        "unrequested synonyms were loaded",
    )?;

    let last_page = store
        .list_page(
            PageRequest::new(Some(3), Some(10), configuration)?,
            Some(&filter),
            RelationSelection::none(),
        )
        .await?;
    ensure(
        last_page.len() == 5,
        format!("last page has {} words", last_page.len()),
    )?;

    info!("Success! Pagination returns the expected words");
    Ok(())
}

#[instrument(err, skip(store))]
async fn test_ambiguity(store: &Arc<PostgresLexicalStore>) -> LexiconResult<()> {
    let word = test_word("gift");
    store
        .save(&LexicalRecord::new(word.as_str(), language("en")?))
        .await?;
    store
        .save(&LexicalRecord::new(word.as_str(), language("de")?))
        .await?;

    ensure(
        store.get_id(&word, &"en".parse()?).await?.is_some(),
        "english word not found",
    )?;
    let wildcard_id = store.get_id(&word, &LanguageSelector::Any).await;
    ensure(
        matches!(wildcard_id, Err(LexiconError::AmbiguousWord { count: 2, .. })),
        format!("ambiguous lookup returned {wildcard_id:?}"),
    )?;

    info!("Success! Ambiguous words are detected");
    Ok(())
}

/// Two transactions that each read the word the other one updates cannot both commit.
#[instrument(err, skip(database_connection_pool))]
async fn test_aborted_transaction(
    database_connection_pool: &LexiconAsyncDatabaseConnectionPool,
) -> LexiconResult<()> {
    let first_word = test_word("serialisation_first");
    let second_word = test_word("serialisation_second");
    let (first_word, second_word) = (first_word.as_str(), second_word.as_str());

    database_connection_pool
        .execute_transaction::<_, LexiconError>(
            |database_connection| {
                async move {
                    diesel::insert_into(words::table)
                        .values(vec![
                            (words::word.eq(first_word), words::language.eq("en")),
                            (words::word.eq(second_word), words::language.eq("en")),
                        ])
                        .execute(database_connection)
                        .await?;
                    Ok(())
                }
                .scope_boxed()
            },
            0,
        )
        .await?;

    info!("Test words set up successfully");

    let (first, second) = tokio::join!(
        touch_after_reading(database_connection_pool, first_word, second_word),
        touch_after_reading(database_connection_pool, second_word, first_word),
    );

    info!("Serialisation failure should have triggered");
    info!("First result:  {first:?}");
    info!("Second result: {second:?}");
    ensure(
        matches!(
            first,
            Err(LexiconError::DatabaseTransactionRetryLimitReached { .. })
        ) || matches!(
            second,
            Err(LexiconError::DatabaseTransactionRetryLimitReached { .. })
        ),
        "no transaction failed with a serialisation failure",
    )?;

    // Ensure that we can still do transactions on the same data
    touch_after_reading(database_connection_pool, first_word, second_word).await?;

    info!("Success! Transactions still work after serialisation failure");
    Ok(())
}

/// Read the language of one word, then refresh the timestamp of another, without retrying.
#[instrument(err, skip(database_connection_pool))]
async fn touch_after_reading(
    database_connection_pool: &LexiconAsyncDatabaseConnectionPool,
    read_word: &str,
    updated_word: &str,
) -> LexiconResult<()> {
    database_connection_pool
        .execute_transaction::<_, LexiconError>(
            |database_connection| {
                async move {
                    let read_language: String = words::table
                        .select(words::language)
                        .filter(words::word.eq(read_word))
                        .first(database_connection)
                        .await?;

                    sleep(Duration::from_secs(2)).await;

                    diesel::update(words::table)
                        .filter(words::word.eq(updated_word))
                        .filter(words::language.eq(read_language))
                        .set(words::last_updated.eq(chrono::Utc::now()))
                        .execute(database_connection)
                        .await?;

                    Ok(())
                }
                .scope_boxed()
            },
            0,
        )
        .await
}
