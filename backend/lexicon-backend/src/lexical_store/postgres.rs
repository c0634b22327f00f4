use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use scoped_futures::ScopedFutureExt;
use tracing::{debug, instrument};

use super::{single_word_id, LexicalStore, WordId};
use crate::{
    configuration::Configuration,
    database::{
        model::{DefinitionRow, ExampleRow, SynonymRow, TranslationRow, WordRow},
        schema::{definitions, examples, synonyms, translations, words},
        LexiconAsyncDatabaseConnectionPool,
    },
    error::{LexiconError, LexiconResult},
    model::{
        Annotation, LanguageCode, LanguageSelector, LexicalRecord, PageRequest, RelationSelection,
    },
};

/// Load the annotations of a single word that are written in the given language.
macro_rules! load_annotations {
    ($database_connection:expr, $row:ident, $table:ident, $word_row:expr, $language:expr) => {
        $row::belonging_to($word_row)
            .filter($table::language.eq($language.as_str()))
            .select($row::as_select())
            .order_by($table::id.asc())
            .load::<$row>($database_connection)
            .await?
            .into_iter()
            .map(Annotation::from)
            .collect::<Vec<_>>()
    };
}

/// Load the annotations of all given words in one query, grouped in the order of the words.
macro_rules! load_grouped_annotations {
    ($database_connection:expr, $row:ident, $table:ident, $word_rows:expr) => {
        $row::belonging_to($word_rows)
            .select($row::as_select())
            .order_by($table::id.asc())
            .load::<$row>($database_connection)
            .await?
            .grouped_by($word_rows)
            .into_iter()
            .map(|rows| rows.into_iter().map(Annotation::from).collect::<Vec<_>>())
            .collect::<Vec<_>>()
    };
}

/// Insert annotations of a word, skipping those that exist already.
macro_rules! insert_annotations {
    ($database_connection:expr, $table:ident, $text:ident, $word_id:expr, $annotations:expr) => {{
        let rows = $annotations
            .iter()
            .flatten()
            .map(|annotation: &Annotation| {
                (
                    $table::word_id.eq($word_id),
                    $table::language.eq(annotation.language.as_str()),
                    $table::$text.eq(annotation.text.as_str()),
                )
            })
            .collect::<Vec<_>>();

        if !rows.is_empty() {
            diesel::insert_into($table::table)
                .values(rows)
                .on_conflict_do_nothing()
                .execute($database_connection)
                .await?;
        }
    }};
}

/// A [`LexicalStore`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PostgresLexicalStore {
    database_connection_pool: LexiconAsyncDatabaseConnectionPool,
    maximum_transaction_retry_count: u64,
}

impl PostgresLexicalStore {
    pub fn new(
        database_connection_pool: LexiconAsyncDatabaseConnectionPool,
        configuration: &Configuration,
    ) -> Self {
        Self {
            database_connection_pool,
            maximum_transaction_retry_count: configuration.maximum_transaction_retry_count,
        }
    }
}

#[async_trait]
impl LexicalStore for PostgresLexicalStore {
    #[instrument(err, skip(self))]
    async fn get(
        &self,
        word: &str,
        source_language: &LanguageSelector,
        target_language: &LanguageCode,
    ) -> LexiconResult<Option<LexicalRecord>> {
        self.database_connection_pool
            .execute_transaction::<_, LexiconError>(
                |database_connection| {
                    async move {
                        // Without a definition in the target language, the word counts as untranslated.
                        let mut query = words::table
                            .inner_join(
                                definitions::table.on(definitions::word_id
                                    .eq(words::id)
                                    .and(definitions::language.eq(target_language.as_str()))),
                            )
                            .filter(words::word.eq(word))
                            .select(WordRow::as_select())
                            .into_boxed();

                        if let Some(source_language) = source_language.exact() {
                            query = query.filter(words::language.eq(source_language.as_str()));
                        }

                        let Some(word_row) = query
                            .order_by(words::id.asc())
                            .first::<WordRow>(database_connection)
                            .await
                            .optional()?
                        else {
                            return Ok(None);
                        };

                        let definitions = load_annotations!(
                            database_connection,
                            DefinitionRow,
                            definitions,
                            &word_row,
                            target_language
                        );
                        let synonyms = load_annotations!(
                            database_connection,
                            SynonymRow,
                            synonyms,
                            &word_row,
                            target_language
                        );
                        let translations = load_annotations!(
                            database_connection,
                            TranslationRow,
                            translations,
                            &word_row,
                            target_language
                        );
                        let examples = load_annotations!(
                            database_connection,
                            ExampleRow,
                            examples,
                            &word_row,
                            target_language
                        );

                        Ok(Some(LexicalRecord {
                            definitions: Some(definitions),
                            synonyms: Some(synonyms),
                            translations: Some(translations),
                            examples: Some(examples),
                            ..record_without_relations(word_row)
                        }))
                    }
                    .scope_boxed()
                },
                self.maximum_transaction_retry_count,
            )
            .await
    }

    #[instrument(err, skip(self))]
    async fn get_id(
        &self,
        word: &str,
        source_language: &LanguageSelector,
    ) -> LexiconResult<Option<WordId>> {
        let ids = self
            .database_connection_pool
            .execute_transaction::<_, LexiconError>(
                |database_connection| {
                    async move {
                        let mut query = words::table
                            .select(words::id)
                            .filter(words::word.eq(word))
                            .into_boxed();

                        if let Some(source_language) = source_language.exact() {
                            query = query.filter(words::language.eq(source_language.as_str()));
                        }

                        Ok(query
                            .order_by(words::id.asc())
                            .load::<i32>(database_connection)
                            .await?)
                    }
                    .scope_boxed()
                },
                self.maximum_transaction_retry_count,
            )
            .await?;

        single_word_id(ids, word, source_language)
    }

    #[instrument(err, skip(self))]
    async fn delete(&self, id: WordId) -> LexiconResult<()> {
        let deleted_words = self
            .database_connection_pool
            .execute_transaction::<_, LexiconError>(
                |database_connection| {
                    async move {
                        let WordId(id) = id;

                        diesel::delete(definitions::table.filter(definitions::word_id.eq(id)))
                            .execute(database_connection)
                            .await?;
                        diesel::delete(synonyms::table.filter(synonyms::word_id.eq(id)))
                            .execute(database_connection)
                            .await?;
                        diesel::delete(translations::table.filter(translations::word_id.eq(id)))
                            .execute(database_connection)
                            .await?;
                        diesel::delete(examples::table.filter(examples::word_id.eq(id)))
                            .execute(database_connection)
                            .await?;

                        Ok(diesel::delete(words::table.filter(words::id.eq(id)))
                            .execute(database_connection)
                            .await?)
                    }
                    .scope_boxed()
                },
                self.maximum_transaction_retry_count,
            )
            .await?;

        debug!("Deleted {deleted_words} words with id {id:?}");
        Ok(())
    }

    #[instrument(err, skip(self))]
    async fn list_page(
        &self,
        page: PageRequest,
        word_filter: Option<&str>,
        relations: RelationSelection,
    ) -> LexiconResult<Vec<LexicalRecord>> {
        let pattern = word_filter.map(like_pattern);
        let pattern = pattern.as_deref();

        // Read committed, since a page with all relations can touch a lot of rows.
        self.database_connection_pool
            .execute_read_committed_transaction::<_, LexiconError>(
                |database_connection| {
                    async move {
                        let mut query = words::table.select(WordRow::as_select()).into_boxed();

                        if let Some(pattern) = pattern {
                            query = query.filter(words::word.ilike(pattern));
                        }

                        let word_rows = query
                            .order_by((words::word.asc(), words::id.asc()))
                            .offset(page.offset())
                            .limit(page.limit())
                            .load::<WordRow>(database_connection)
                            .await?;

                        let grouped_definitions = if relations.definitions {
                            Some(load_grouped_annotations!(
                                database_connection,
                                DefinitionRow,
                                definitions,
                                &word_rows
                            ))
                        } else {
                            None
                        };
                        let grouped_synonyms = if relations.synonyms {
                            Some(load_grouped_annotations!(
                                database_connection,
                                SynonymRow,
                                synonyms,
                                &word_rows
                            ))
                        } else {
                            None
                        };
                        let grouped_translations = if relations.translations {
                            Some(load_grouped_annotations!(
                                database_connection,
                                TranslationRow,
                                translations,
                                &word_rows
                            ))
                        } else {
                            None
                        };
                        let grouped_examples = if relations.examples {
                            Some(load_grouped_annotations!(
                                database_connection,
                                ExampleRow,
                                examples,
                                &word_rows
                            ))
                        } else {
                            None
                        };

                        let word_count = word_rows.len();
                        Ok(word_rows
                            .into_iter()
                            .zip(per_word(grouped_definitions, word_count))
                            .zip(per_word(grouped_synonyms, word_count))
                            .zip(per_word(grouped_translations, word_count))
                            .zip(per_word(grouped_examples, word_count))
                            .map(
                                |((((word_row, definitions), synonyms), translations), examples)| {
                                    LexicalRecord {
                                        definitions,
                                        synonyms,
                                        translations,
                                        examples,
                                        ..record_without_relations(word_row)
                                    }
                                },
                            )
                            .collect())
                    }
                    .scope_boxed()
                },
                self.maximum_transaction_retry_count,
            )
            .await
    }

    #[instrument(err, skip(self, record), fields(word = %record.word, language = %record.language))]
    async fn save(&self, record: &LexicalRecord) -> LexiconResult<()> {
        let language =
            record
                .language
                .exact()
                .ok_or_else(|| LexiconError::WildcardLanguageNotStorable {
                    word: record.word.clone(),
                })?;
        let last_updated = Utc::now();

        // The word and its annotations are written in one transaction,
        // so no word without annotations becomes visible.
        self.database_connection_pool
            .execute_transaction::<_, LexiconError>(
                |database_connection| {
                    async move {
                        let word_id: i32 = diesel::insert_into(words::table)
                            .values((
                                words::word.eq(record.word.as_str()),
                                words::language.eq(language.as_str()),
                                words::last_updated.eq(last_updated),
                            ))
                            .on_conflict((words::word, words::language))
                            .do_update()
                            .set(words::last_updated.eq(last_updated))
                            .returning(words::id)
                            .get_result(database_connection)
                            .await?;

                        insert_annotations!(
                            database_connection,
                            definitions,
                            definition,
                            word_id,
                            record.definitions
                        );
                        insert_annotations!(
                            database_connection,
                            synonyms,
                            synonym,
                            word_id,
                            record.synonyms
                        );
                        insert_annotations!(
                            database_connection,
                            translations,
                            translation,
                            word_id,
                            record.translations
                        );
                        insert_annotations!(
                            database_connection,
                            examples,
                            example,
                            word_id,
                            record.examples
                        );

                        Ok(())
                    }
                    .scope_boxed()
                },
                self.maximum_transaction_retry_count,
            )
            .await
    }
}

fn record_without_relations(word_row: WordRow) -> LexicalRecord {
    LexicalRecord::with_relations(
        word_row.word,
        LanguageCode::from_database(word_row.language),
        RelationSelection::none(),
    )
}

/// Spread the annotation groups of a page over its words, or mark them as not fetched.
fn per_word(
    groups: Option<Vec<Vec<Annotation>>>,
    word_count: usize,
) -> Vec<Option<Vec<Annotation>>> {
    match groups {
        Some(groups) => groups.into_iter().map(Some).collect(),
        None => vec![None; word_count],
    }
}

/// Build an `ILIKE` pattern matching all words that contain `filter`.
fn like_pattern(filter: &str) -> String {
    let mut pattern = String::with_capacity(filter.len() + 2);
    pattern.push('%');
    for character in filter.chars() {
        if matches!(character, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(character);
    }
    pattern.push('%');
    pattern
}
