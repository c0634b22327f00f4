use std::{fmt::Display, str::FromStr};

use crate::error::UserError;

/// The wildcard source language that matches any stored language.
pub const WILDCARD_LANGUAGE: &str = "auto";

/// Matches the width of the language columns in the database.
const MAXIMUM_LANGUAGE_CODE_LENGTH: usize = 50;

/// A concrete language code like `en` or `zh-CN`.
///
/// The wildcard `auto` is never a valid language code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LanguageCode {
    code: String,
}

impl LanguageCode {
    pub fn new(code: impl Into<String>) -> Result<Self, UserError> {
        let code = code.into();

        if code == WILDCARD_LANGUAGE {
            return Err(UserError::WildcardLanguageNotAllowed);
        }

        let is_valid = !code.is_empty()
            && code.len() <= MAXIMUM_LANGUAGE_CODE_LENGTH
            && code.starts_with(|character: char| character.is_ascii_alphabetic())
            && code
                .chars()
                .all(|character| character.is_ascii_alphanumeric() || character == '-');

        if is_valid {
            Ok(Self { code })
        } else {
            Err(UserError::InvalidLanguage { code })
        }
    }

    /// Wrap a code read back from the database, which only ever stores validated codes.
    pub(crate) fn from_database(code: String) -> Self {
        Self { code }
    }

    pub fn as_str(&self) -> &str {
        &self.code
    }
}

impl FromStr for LanguageCode {
    type Err = UserError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        Self::new(code)
    }
}

impl AsRef<str> for LanguageCode {
    fn as_ref(&self) -> &str {
        &self.code
    }
}

impl Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code)
    }
}

impl From<LanguageCode> for String {
    fn from(value: LanguageCode) -> Self {
        value.code
    }
}

/// The source language of a lookup.
///
/// [`LanguageSelector::Any`] is written as `auto` and skips the language filter at lookup time.
/// It does not detect the language of a word.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LanguageSelector {
    Any,
    Exact(LanguageCode),
}

impl LanguageSelector {
    /// The concrete language, if this is not the wildcard.
    pub fn exact(&self) -> Option<&LanguageCode> {
        match self {
            LanguageSelector::Any => None,
            LanguageSelector::Exact(language) => Some(language),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LanguageSelector::Any => WILDCARD_LANGUAGE,
            LanguageSelector::Exact(language) => language.as_str(),
        }
    }
}

impl FromStr for LanguageSelector {
    type Err = UserError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        if code == WILDCARD_LANGUAGE {
            Ok(Self::Any)
        } else {
            LanguageCode::new(code).map(Self::Exact)
        }
    }
}

impl From<LanguageCode> for LanguageSelector {
    fn from(language: LanguageCode) -> Self {
        Self::Exact(language)
    }
}

impl Display for LanguageSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{LanguageCode, LanguageSelector};
    use crate::error::UserError;

    #[rstest]
    #[case("en")]
    #[case("es")]
    #[case("zh-CN")]
    #[case("haw")]
    fn test_valid_language_codes(#[case] code: &str) {
        assert_eq!(LanguageCode::new(code).unwrap().as_str(), code);
    }

    #[rstest]
    #[case("")]
    #[case("-en")]
    #[case("en us")]
    #[case("en_US")]
    #[case("1a")]
    fn test_invalid_language_codes(#[case] code: &str) {
        assert!(matches!(
            LanguageCode::new(code),
            Err(UserError::InvalidLanguage { .. })
        ));
    }

    #[test]
    fn test_overlong_language_code() {
        assert!(LanguageCode::new("a".repeat(51)).is_err());
        assert!(LanguageCode::new("a".repeat(50)).is_ok());
    }

    #[test]
    fn test_wildcard_is_not_a_language_code() {
        assert!(matches!(
            LanguageCode::new("auto"),
            Err(UserError::WildcardLanguageNotAllowed)
        ));
    }

    #[test]
    fn test_language_selector_parsing() {
        assert_eq!(
            "auto".parse::<LanguageSelector>().unwrap(),
            LanguageSelector::Any
        );
        let selector: LanguageSelector = "en".parse().unwrap();
        assert_eq!(selector.exact().unwrap().as_str(), "en");
        assert_eq!(selector.to_string(), "en");
        assert_eq!(LanguageSelector::Any.to_string(), "auto");
        assert!("e n".parse::<LanguageSelector>().is_err());
    }
}
