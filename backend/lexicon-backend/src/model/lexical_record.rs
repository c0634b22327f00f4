use api_commands::{ListWordsQuery, WordRecord};

use super::language::{LanguageCode, LanguageSelector};

/// A text attached to a word, like a definition or an example.
///
/// The language is the one the text is written in, which may differ from the language of the word.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Annotation {
    pub language: LanguageCode,
    pub text: String,
}

impl Annotation {
    pub fn new(language: LanguageCode, text: impl Into<String>) -> Self {
        Self {
            language,
            text: text.into(),
        }
    }
}

/// A word together with its four annotation collections.
///
/// A collection is `None` if it was not fetched, and `Some` (possibly empty) if it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalRecord {
    pub word: String,
    /// Only records fetched for a wildcard lookup carry [`LanguageSelector::Any`].
    pub language: LanguageSelector,
    pub definitions: Option<Vec<Annotation>>,
    pub synonyms: Option<Vec<Annotation>>,
    pub translations: Option<Vec<Annotation>>,
    pub examples: Option<Vec<Annotation>>,
}

impl LexicalRecord {
    /// A record with all four collections fetched and empty.
    pub fn new(word: impl Into<String>, language: impl Into<LanguageSelector>) -> Self {
        Self::with_relations(word, language, RelationSelection::all())
    }

    /// A record where exactly the selected collections are fetched and empty.
    pub fn with_relations(
        word: impl Into<String>,
        language: impl Into<LanguageSelector>,
        relations: RelationSelection,
    ) -> Self {
        let fetched = |selected: bool| selected.then(Vec::new);

        Self {
            word: word.into(),
            language: language.into(),
            definitions: fetched(relations.definitions),
            synonyms: fetched(relations.synonyms),
            translations: fetched(relations.translations),
            examples: fetched(relations.examples),
        }
    }

    pub fn add_definition(&mut self, definition: Annotation) {
        self.definitions.get_or_insert_with(Vec::new).push(definition);
    }

    pub fn add_synonym(&mut self, synonym: Annotation) {
        self.synonyms.get_or_insert_with(Vec::new).push(synonym);
    }

    pub fn add_translation(&mut self, translation: Annotation) {
        self.translations.get_or_insert_with(Vec::new).push(translation);
    }

    pub fn add_example(&mut self, example: Annotation) {
        self.examples.get_or_insert_with(Vec::new).push(example);
    }

    /// True if the record carries no definitions, which means that no translation is known.
    pub fn has_no_definitions(&self) -> bool {
        self.definitions
            .as_ref()
            .map_or(true, |definitions| definitions.is_empty())
    }
}

impl From<LexicalRecord> for WordRecord {
    fn from(record: LexicalRecord) -> Self {
        let texts = |annotations: Option<Vec<Annotation>>| {
            annotations.map(|annotations| {
                annotations
                    .into_iter()
                    .map(|annotation| annotation.text)
                    .collect()
            })
        };

        Self {
            word: record.word,
            language: record.language.to_string(),
            definitions: texts(record.definitions),
            synonyms: texts(record.synonyms),
            translations: texts(record.translations),
            examples: texts(record.examples),
        }
    }
}

/// The annotation collections to load when listing words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationSelection {
    pub definitions: bool,
    pub synonyms: bool,
    pub translations: bool,
    pub examples: bool,
}

impl RelationSelection {
    pub fn all() -> Self {
        Self {
            definitions: true,
            synonyms: true,
            translations: true,
            examples: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

impl From<&ListWordsQuery> for RelationSelection {
    fn from(query: &ListWordsQuery) -> Self {
        Self {
            definitions: query.include_definitions,
            synonyms: query.include_synonyms,
            translations: query.include_translations,
            examples: query.include_examples,
        }
    }
}

#[cfg(test)]
mod tests {
    use api_commands::WordRecord;

    use super::{Annotation, LexicalRecord, RelationSelection};
    use crate::model::{LanguageCode, LanguageSelector};

    fn language(code: &str) -> LanguageCode {
        LanguageCode::new(code).unwrap()
    }

    #[test]
    fn test_map_record_to_wire() {
        let mut record = LexicalRecord::new("apple", language("en"));
        record.add_definition(Annotation::new(language("es"), "manzana"));
        record.add_example(Annotation::new(language("es"), "una manzana roja"));

        let wire = WordRecord::from(record);
        assert_eq!(wire.word, "apple");
        assert_eq!(wire.language, "en");
        assert_eq!(wire.definitions, Some(vec!["manzana".to_owned()]));
        assert_eq!(wire.synonyms, Some(Vec::new()));
        assert_eq!(wire.examples, Some(vec!["una manzana roja".to_owned()]));
    }

    #[test]
    fn test_unfetched_relations_stay_absent() {
        let record = LexicalRecord::with_relations(
            "apple",
            language("en"),
            RelationSelection {
                synonyms: true,
                ..RelationSelection::none()
            },
        );

        let wire = WordRecord::from(record);
        assert_eq!(wire.definitions, None);
        assert_eq!(wire.synonyms, Some(Vec::new()));
        assert_eq!(wire.translations, None);
        assert_eq!(wire.examples, None);
    }

    #[test]
    fn test_wildcard_language_is_written_as_auto() {
        let record = LexicalRecord::new("apple", LanguageSelector::Any);
        assert_eq!(WordRecord::from(record).language, "auto");
    }

    #[test]
    fn test_has_no_definitions() {
        let mut record =
            LexicalRecord::with_relations("apple", language("en"), RelationSelection::none());
        assert!(record.has_no_definitions());
        record.add_definition(Annotation::new(language("es"), "manzana"));
        assert!(!record.has_no_definitions());
    }
}
