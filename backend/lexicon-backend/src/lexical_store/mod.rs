//! Relational access to stored words and their annotations.
//!
//! The store acts as a permanent cache in front of the external lexical source:
//! nothing expires, and words only disappear through [`LexicalStore::delete`].

use async_trait::async_trait;

use crate::{
    error::{LexiconError, LexiconResult},
    model::{LanguageCode, LanguageSelector, LexicalRecord, PageRequest, RelationSelection},
};

mod postgres;

pub use postgres::PostgresLexicalStore;

/// The surrogate id of a stored word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WordId(pub i32);

#[async_trait]
pub trait LexicalStore: Send + Sync {
    /// Load a word with its annotations in `target_language`.
    ///
    /// A word only counts as translated into `target_language` if it has at least one definition in it,
    /// the other annotation collections may be empty.
    /// [`LanguageSelector::Any`] matches the word in any stored language.
    async fn get(
        &self,
        word: &str,
        source_language: &LanguageSelector,
        target_language: &LanguageCode,
    ) -> LexiconResult<Option<LexicalRecord>>;

    /// Resolve a word to its id.
    ///
    /// Fails with [`LexiconError::AmbiguousWord`] if more than one word matches.
    async fn get_id(
        &self,
        word: &str,
        source_language: &LanguageSelector,
    ) -> LexiconResult<Option<WordId>>;

    /// Delete a word and all its annotations atomically.
    /// Deleting a word that does not exist is not an error.
    async fn delete(&self, id: WordId) -> LexiconResult<()>;

    /// List words ordered by their text, loading only the selected annotation collections.
    async fn list_page(
        &self,
        page: PageRequest,
        word_filter: Option<&str>,
        relations: RelationSelection,
    ) -> LexiconResult<Vec<LexicalRecord>>;

    /// Store a record, creating the word if it does not exist.
    ///
    /// Annotations that are stored already are skipped silently, so saving the same record twice is a no-op.
    async fn save(&self, record: &LexicalRecord) -> LexiconResult<()>;
}

/// Interpret the ids of all words matching a lookup.
pub(crate) fn single_word_id(
    ids: Vec<i32>,
    word: &str,
    source_language: &LanguageSelector,
) -> LexiconResult<Option<WordId>> {
    match ids.as_slice() {
        [] => Ok(None),
        [id] => Ok(Some(WordId(*id))),
        _ => Err(LexiconError::AmbiguousWord {
            word: word.to_owned(),
            language: source_language.to_string(),
            count: ids.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{single_word_id, WordId};
    use crate::{error::LexiconError, model::LanguageSelector};

    #[test]
    fn test_single_word_id() {
        let language: LanguageSelector = "en".parse().unwrap();

        assert_eq!(single_word_id(Vec::new(), "apple", &language).unwrap(), None);
        assert_eq!(
            single_word_id(vec![7], "apple", &language).unwrap(),
            Some(WordId(7))
        );
        assert!(matches!(
            single_word_id(vec![1, 2], "apple", &language),
            Err(LexiconError::AmbiguousWord { count: 2, .. })
        ));
    }

    #[test]
    fn test_ambiguous_wildcard_lookup() {
        assert!(matches!(
            single_word_id(vec![1, 2, 3], "gift", &LanguageSelector::Any),
            Err(LexiconError::AmbiguousWord { count: 3, ref language, .. }) if language == "auto"
        ));
    }
}
