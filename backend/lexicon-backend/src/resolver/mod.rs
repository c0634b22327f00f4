//! Resolves lookups through the store first and the external source on a miss.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, instrument, warn, Instrument, Span};

use crate::{
    error::{LexiconError, LexiconResult},
    external_source::ExternalLexicalSource,
    lexical_store::LexicalStore,
    model::{LanguageCode, LanguageSelector, LexicalRecord, PageRequest, RelationSelection},
};

type FetchResult = Result<Option<LexicalRecord>, Arc<LexiconError>>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FetchKey {
    word: String,
    source_language: LanguageSelector,
    target_language: LanguageCode,
}

/// The cache-aside orchestration in front of a [`LexicalStore`].
///
/// Concurrent lookups of the same key that miss the store share one external fetch.
#[derive(Clone)]
pub struct WordResolver {
    store: Arc<dyn LexicalStore>,
    external_source: Arc<dyn ExternalLexicalSource>,
    in_flight_fetches: Arc<Mutex<HashMap<FetchKey, SharedFetch>>>,
}

impl WordResolver {
    pub fn new(
        store: Arc<dyn LexicalStore>,
        external_source: Arc<dyn ExternalLexicalSource>,
    ) -> Self {
        Self {
            store,
            external_source,
            in_flight_fetches: Default::default(),
        }
    }

    /// Look up a word, fetching and storing it if it is not stored yet.
    ///
    /// Returns `None` if neither the store nor the external source know the word.
    /// A fetched record is returned as fetched, not as re-read from the store.
    ///
    /// The fetch and the following save run in their own task, so they complete even if the
    /// caller goes away. All callers sharing a fetch receive its result, including a failed save.
    #[instrument(err, skip(self))]
    pub async fn get(
        &self,
        word: &str,
        source_language: &LanguageSelector,
        target_language: &LanguageCode,
    ) -> LexiconResult<Option<LexicalRecord>> {
        if let Some(record) = self
            .store
            .get(word, source_language, target_language)
            .await?
        {
            debug!("Found '{word}' in the store");
            return Ok(Some(record));
        }

        debug!("'{word}' is not stored, consulting the external source");
        let record = self
            .join_fetch(FetchKey {
                word: word.to_owned(),
                source_language: source_language.clone(),
                target_language: target_language.clone(),
            })
            .await
            .map_err(|source| LexiconError::SharedFetch { source })?;

        if record.is_none() {
            info!("'{word}' was not found");
        }
        Ok(record)
    }

    /// Delete a word and all its annotations. Deleting an unknown word does nothing.
    #[instrument(err, skip(self))]
    pub async fn delete(
        &self,
        word: &str,
        source_language: &LanguageSelector,
    ) -> LexiconResult<()> {
        match self.store.get_id(word, source_language).await? {
            Some(id) => {
                self.store.delete(id).await?;
                info!("Deleted '{word}' with id {}", id.0);
            }
            None => debug!("'{word}' is not stored, nothing to delete"),
        }

        Ok(())
    }

    #[instrument(err, skip(self))]
    pub async fn list_page(
        &self,
        page: PageRequest,
        word_filter: Option<&str>,
        relations: RelationSelection,
    ) -> LexiconResult<Vec<LexicalRecord>> {
        self.store.list_page(page, word_filter, relations).await
    }

    /// Join the in-flight fetch for the key, or spawn one.
    ///
    /// The spawned task removes its registry entry once the fetched record was saved or the save
    /// failed.
    fn join_fetch(&self, key: FetchKey) -> SharedFetch {
        let mut in_flight_fetches = self
            .in_flight_fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(fetch) = in_flight_fetches.get(&key) {
            debug!("Joining a concurrent fetch of '{}'", key.word);
            return fetch.clone();
        }

        let store = Arc::clone(&self.store);
        let external_source = Arc::clone(&self.external_source);
        let registry = Arc::clone(&self.in_flight_fetches);
        let fetch_key = key.clone();
        let task = tokio::spawn(
            async move {
                let result =
                    fetch_and_persist(store.as_ref(), external_source.as_ref(), &fetch_key).await;
                registry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&fetch_key);
                result.map_err(Arc::new)
            }
            .instrument(Span::current()),
        );

        let fetch = async move {
            task.await.unwrap_or_else(|error| {
                Err(Arc::new(LexiconError::TokioTaskJoin {
                    source: Box::new(error),
                }))
            })
        }
        .boxed()
        .shared();

        in_flight_fetches.insert(key, fetch.clone());
        fetch
    }
}

/// Fetch a record and store it, unless its language is unknown.
async fn fetch_and_persist(
    store: &dyn LexicalStore,
    external_source: &dyn ExternalLexicalSource,
    key: &FetchKey,
) -> LexiconResult<Option<LexicalRecord>> {
    let Some(record) = external_source
        .get(&key.word, &key.source_language, &key.target_language)
        .await
    else {
        return Ok(None);
    };

    if record.language == LanguageSelector::Any {
        warn!(
            "Not storing '{}' since its language is unknown",
            record.word
        );
    } else {
        store.save(&record).await?;
    }

    Ok(Some(record))
}
