use serde::{Deserialize, Serialize};

/// A word together with its annotations, as sent over the wire.
///
/// Annotation lists that were not requested are omitted entirely,
/// while requested but empty lists are sent as `[]`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WordRecord {
    pub word: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definitions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synonyms: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,
}

/// Query parameters of a single word lookup.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WordQuery {
    /// The source language, or `auto` to match any stored language.
    #[serde(default = "auto_language")]
    pub sl: String,
    /// The target language.
    pub tl: String,
}

/// Query parameters of a word deletion.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeleteWordQuery {
    #[serde(default = "auto_language")]
    pub sl: String,
}

/// Query parameters of the paginated word listing.
///
/// Multi-word parameters are also accepted in camel case, e.g. `pageSize`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ListWordsQuery {
    /// One-based page number, defaults to the first page.
    pub page: Option<i64>,
    #[serde(alias = "pageSize")]
    pub page_size: Option<i64>,
    /// Case-insensitive substring the word must contain.
    #[serde(alias = "wordFilter")]
    pub word_filter: Option<String>,
    #[serde(default, alias = "includeDefinitions")]
    pub include_definitions: bool,
    #[serde(default, alias = "includeSynonyms")]
    pub include_synonyms: bool,
    #[serde(default, alias = "includeTranslations")]
    pub include_translations: bool,
    #[serde(default, alias = "includeExamples")]
    pub include_examples: bool,
}

pub const AUTO_LANGUAGE: &str = "auto";

fn auto_language() -> String {
    AUTO_LANGUAGE.to_owned()
}

#[cfg(test)]
mod tests {
    use super::{ListWordsQuery, WordQuery, WordRecord};

    #[test]
    fn test_serde_word_record_omits_unrequested_relations() {
        let record = WordRecord {
            word: "apple".to_owned(),
            language: "en".to_owned(),
            definitions: Some(vec!["a fruit".to_owned()]),
            synonyms: Some(Vec::new()),
            translations: None,
            examples: None,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "word": "apple",
                "language": "en",
                "definitions": ["a fruit"],
                "synonyms": [],
            })
        );
        assert_eq!(serde_json::from_value::<WordRecord>(json).unwrap(), record);
    }

    #[test]
    fn test_serde_word_query_defaults_to_auto() {
        let query: WordQuery = serde_json::from_str(r#"{"tl": "es"}"#).unwrap();
        assert_eq!(query.sl, "auto");
        assert_eq!(query.tl, "es");
    }

    #[test]
    fn test_serde_list_words_query_defaults() {
        let query: ListWordsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query, ListWordsQuery::default());
        assert!(!query.include_definitions);
    }

    #[test]
    fn test_serde_list_words_query_accepts_camel_case() {
        let query: ListWordsQuery = serde_json::from_str(
            r#"{"page": 2, "pageSize": 5, "wordFilter": "app", "includeExamples": true}"#,
        )
        .unwrap();
        assert_eq!(
            query,
            ListWordsQuery {
                page: Some(2),
                page_size: Some(5),
                word_filter: Some("app".to_owned()),
                include_examples: true,
                ..ListWordsQuery::default()
            }
        );
    }
}
