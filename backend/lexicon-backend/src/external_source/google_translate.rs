use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{
    extract_record,
    webdriver::{WebDriverClient, WebDriverError},
    ExternalLexicalSource, PageTexts,
};
use crate::{
    configuration::Configuration,
    model::{LanguageCode, LanguageSelector, LexicalRecord},
};

const TRANSLATION_CLASS: &str = "HwtZe";
const SYNONYM_CLASS: &str = "FpAlrf";
const EXAMPLE_CLASS: &str = "me82ge";

/// Scrapes the Google Translate web page through a WebDriver controlled browser.
#[derive(Debug, Clone)]
pub struct GoogleTranslateSource {
    webdriver_url: String,
    headless: bool,
    translate_base_url: String,
    page_load_wait: Duration,
    fetch_timeout: Duration,
}

impl GoogleTranslateSource {
    pub fn new(configuration: &Configuration) -> Self {
        Self {
            webdriver_url: configuration.webdriver_url.clone(),
            headless: configuration.webdriver_headless,
            translate_base_url: configuration.translate_base_url.clone(),
            page_load_wait: configuration.external_page_load_wait,
            fetch_timeout: configuration.external_fetch_timeout,
        }
    }

    fn page_url(
        &self,
        word: &str,
        source_language: &LanguageSelector,
        target_language: &LanguageCode,
    ) -> Result<Url, url::ParseError> {
        Url::parse_with_params(
            &self.translate_base_url,
            &[
                ("sl", source_language.as_str()),
                ("tl", target_language.as_str()),
                ("text", word),
                ("op", "translate"),
            ],
        )
    }

    /// Blocks the current thread for the whole browser interaction.
    fn scrape(&self, url: &Url) -> Result<PageTexts, WebDriverError> {
        let client = WebDriverClient::new(&self.webdriver_url, self.fetch_timeout)?;
        let session = client.new_session(self.headless)?;
        session.set_page_load_timeout(self.fetch_timeout)?;
        session.navigate(url)?;

        // The results are rendered by scripts after the page has loaded.
        std::thread::sleep(self.page_load_wait);

        Ok(PageTexts {
            translations: session.texts_by_class(TRANSLATION_CLASS)?,
            synonyms: session.texts_by_class(SYNONYM_CLASS)?,
            examples: session.texts_by_class(EXAMPLE_CLASS)?,
        })
    }
}

#[async_trait]
impl ExternalLexicalSource for GoogleTranslateSource {
    #[instrument(skip(self))]
    async fn get(
        &self,
        word: &str,
        source_language: &LanguageSelector,
        target_language: &LanguageCode,
    ) -> Option<LexicalRecord> {
        let url = match self.page_url(word, source_language, target_language) {
            Ok(url) => url,
            Err(error) => {
                warn!("Could not build translation page url: {error}");
                return None;
            }
        };
        debug!("Fetching {url}");

        let source = self.clone();
        let scrape = tokio::task::spawn_blocking(move || source.scrape(&url));

        // The timeout leaves the blocking thread running, but its webdriver requests time out on their own.
        let page_texts = match tokio::time::timeout(self.fetch_timeout, scrape).await {
            Ok(Ok(Ok(page_texts))) => page_texts,
            Ok(Ok(Err(error))) => {
                warn!("Fetching the translation page failed: {error}");
                return None;
            }
            Ok(Err(error)) => {
                warn!("Fetching the translation page panicked or was cancelled: {error}");
                return None;
            }
            Err(_) => {
                warn!(
                    "Fetching the translation page timed out after {:?}",
                    self.fetch_timeout
                );
                return None;
            }
        };

        let record = extract_record(word, source_language, target_language, page_texts);
        if record.is_none() {
            info!("No definition found for '{word}'");
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::GoogleTranslateSource;
    use crate::{
        configuration::Configuration,
        model::{LanguageCode, LanguageSelector},
    };

    #[test]
    fn test_page_url() {
        let source = GoogleTranslateSource::new(&Configuration::test_configuration());
        let url = source
            .page_url(
                "apple",
                &"en".parse().unwrap(),
                &LanguageCode::new("es").unwrap(),
            )
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://translate.google.com/?sl=en&tl=es&text=apple&op=translate"
        );
    }

    #[test]
    fn test_page_url_escapes_word() {
        let source = GoogleTranslateSource::new(&Configuration::test_configuration());
        let url = source
            .page_url(
                "ice cream & cake",
                &LanguageSelector::Any,
                &LanguageCode::new("de").unwrap(),
            )
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://translate.google.com/?sl=auto&tl=de&text=ice+cream+%26+cake&op=translate"
        );
        let text = url
            .query_pairs()
            .find(|(key, _)| key == "text")
            .map(|(_, value)| value.into_owned());
        assert_eq!(text.as_deref(), Some("ice cream & cake"));
    }
}
