//! The source consulted when a word is not stored yet.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::model::{Annotation, LanguageCode, LanguageSelector, LexicalRecord};

mod google_translate;
mod webdriver;

pub use google_translate::GoogleTranslateSource;

/// A best-effort source of lexical records.
///
/// Failing to fetch a record is not an error: timeouts, navigation failures and pages without data
/// all result in `None`.
#[async_trait]
pub trait ExternalLexicalSource: Send + Sync {
    async fn get(
        &self,
        word: &str,
        source_language: &LanguageSelector,
        target_language: &LanguageCode,
    ) -> Option<LexicalRecord>;
}

/// The texts of the elements found on a translation page, per element class, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageTexts {
    pub translations: Vec<String>,
    pub synonyms: Vec<String>,
    pub examples: Vec<String>,
}

/// Turn the texts found on a translation page into a record.
///
/// The first translation becomes the only definition, the remaining distinct translations become translations.
/// Returns `None` if the page holds no translation at all.
pub fn extract_record(
    word: &str,
    source_language: &LanguageSelector,
    target_language: &LanguageCode,
    page_texts: PageTexts,
) -> Option<LexicalRecord> {
    let mut translations = distinct_texts(page_texts.translations).into_iter();
    let definition = translations.next()?;

    let annotations = |texts: Vec<String>| {
        texts
            .into_iter()
            .map(|text| Annotation::new(target_language.clone(), text))
            .collect::<Vec<_>>()
    };

    let mut record = LexicalRecord::new(word, source_language.clone());
    record.definitions = Some(annotations(vec![definition]));
    record.translations = Some(annotations(translations.collect()));
    record.synonyms = Some(annotations(distinct_texts(page_texts.synonyms)));
    record.examples = Some(annotations(distinct_texts(page_texts.examples)));
    Some(record)
}

/// Trim the texts and drop empty texts and repetitions, keeping the first occurrence of each text.
fn distinct_texts(texts: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    texts
        .into_iter()
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty() && seen.insert(text.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{distinct_texts, extract_record, PageTexts};
    use crate::model::{Annotation, LanguageCode, LanguageSelector};

    fn texts(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|text| text.to_string()).collect()
    }

    fn spanish(texts: &[&str]) -> Option<Vec<Annotation>> {
        let language = LanguageCode::new("es").unwrap();
        Some(
            texts
                .iter()
                .map(|text| Annotation::new(language.clone(), *text))
                .collect(),
        )
    }

    #[test]
    fn test_distinct_texts() {
        assert_eq!(
            distinct_texts(texts(&["b", "a", " b ", "", "  ", "c", "a"])),
            texts(&["b", "a", "c"])
        );
    }

    #[test]
    fn test_extract_record() {
        let source_language: LanguageSelector = "en".parse().unwrap();
        let target_language = LanguageCode::new("es").unwrap();

        let record = extract_record(
            "apple",
            &source_language,
            &target_language,
            PageTexts {
                translations: texts(&["manzana", "manzana", "poma", "manzana", "pero"]),
                synonyms: texts(&["fruta", "fruta"]),
                examples: texts(&["una manzana roja"]),
            },
        )
        .unwrap();

        assert_eq!(record.word, "apple");
        assert_eq!(record.language, source_language);
        assert_eq!(record.definitions, spanish(&["manzana"]));
        assert_eq!(record.translations, spanish(&["poma", "pero"]));
        assert_eq!(record.synonyms, spanish(&["fruta"]));
        assert_eq!(record.examples, spanish(&["una manzana roja"]));
    }

    #[test]
    fn test_missing_categories_are_empty() {
        let record = extract_record(
            "apple",
            &LanguageSelector::Any,
            &LanguageCode::new("es").unwrap(),
            PageTexts {
                translations: texts(&["manzana"]),
                ..PageTexts::default()
            },
        )
        .unwrap();

        assert_eq!(record.definitions, spanish(&["manzana"]));
        assert_eq!(record.translations, spanish(&[]));
        assert_eq!(record.synonyms, spanish(&[]));
        assert_eq!(record.examples, spanish(&[]));
    }

    #[test]
    fn test_no_translation_means_no_record() {
        let record = extract_record(
            "qwxz",
            &LanguageSelector::Any,
            &LanguageCode::new("es").unwrap(),
            PageTexts {
                translations: texts(&["", " "]),
                synonyms: texts(&["something"]),
                examples: Vec::new(),
            },
        );

        assert_eq!(record, None);
    }
}
