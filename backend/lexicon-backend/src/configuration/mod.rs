use std::{env::VarError, error::Error, net::SocketAddr, str::FromStr, time::Duration};

use secure_string::SecureString;

use crate::error::{LexiconError, LexiconResult, UserError};

/// The configuration of the application.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// The url to access postgres.
    pub postgres_url: SecureString,

    /// The url to send opentelemetry to.
    pub opentelemetry_url: Option<String>,

    /// The amount of time to wait for processes to shutdown gracefully.
    pub shutdown_timeout: Duration,

    /// The maximum number of retries for a failed transaction.
    pub maximum_transaction_retry_count: u64,

    /// The maximum number of pooled database connections.
    pub database_pool_size: usize,

    /// The address to listen for API requests.
    pub api_listen_address: SocketAddr,

    /// The url of the webdriver that drives the browser of the external lexical source.
    pub webdriver_url: String,

    /// If true, the browser is started without a window.
    pub webdriver_headless: bool,

    /// The base url of the translation page that is scraped on cache misses.
    pub translate_base_url: String,

    /// The time given to the translation page to render its content after navigation.
    pub external_page_load_wait: Duration,

    /// The maximum time a single external fetch may take, including navigation.
    pub external_fetch_timeout: Duration,

    /// The maximum length of a looked-up word in characters.
    pub maximum_word_length: usize,

    /// The page size of word listings if the request specifies none.
    pub default_page_size: i64,

    /// Larger requested page sizes are reduced to this value.
    pub maximum_page_size: i64,
}

impl Configuration {
    /// Read the configuration values from environment variables.
    pub fn from_environment() -> LexiconResult<Self> {
        Ok(Self {
            postgres_url: read_env_var_with_default(
                "POSTGRES_LEXICON_URL",
                "postgres://lexicon@localhost/lexicon",
            )?
            .into(),
            opentelemetry_url: read_optional_env_var("OPENTELEMETRY_URL")?,
            shutdown_timeout: Duration::from_secs(read_env_var_with_default_as_type(
                "LEXICON_SHUTDOWN_TIMEOUT",
                30u64,
            )?),
            maximum_transaction_retry_count: read_env_var_with_default_as_type(
                "MAXIMUM_TRANSACTION_RETRY_COUNT",
                10u64,
            )?,
            database_pool_size: read_env_var_with_default_as_type("DATABASE_POOL_SIZE", 16usize)?,
            api_listen_address: read_env_var_with_default_as_type(
                "API_LISTEN_ADDRESS",
                SocketAddr::from(([0, 0, 0, 0], 8093)),
            )?,
            webdriver_url: read_env_var_with_default("WEBDRIVER_URL", "http://localhost:9515")?,
            webdriver_headless: read_env_var_with_default_as_type("WEBDRIVER_HEADLESS", true)?,
            translate_base_url: read_env_var_with_default(
                "TRANSLATE_BASE_URL",
                "https://translate.google.com",
            )?,
            external_page_load_wait: Duration::from_secs(read_env_var_with_default_as_type(
                "EXTERNAL_PAGE_LOAD_WAIT_SECONDS",
                3u64,
            )?),
            external_fetch_timeout: Duration::from_secs(read_env_var_with_default_as_type(
                "EXTERNAL_FETCH_TIMEOUT_SECONDS",
                30u64,
            )?),
            maximum_word_length: read_env_var_with_default_as_type(
                "MAXIMUM_WORD_LENGTH",
                256usize,
            )?,
            default_page_size: read_env_var_with_default_as_type("DEFAULT_PAGE_SIZE", 10i64)?,
            maximum_page_size: read_env_var_with_default_as_type("MAXIMUM_PAGE_SIZE", 100i64)?,
        })
    }

    /// Configuration for tests, equal to the defaults without reading the environment.
    #[cfg(test)]
    pub fn test_configuration() -> Self {
        Self {
            postgres_url: "postgres://lexicon@localhost/lexicon".to_owned().into(),
            opentelemetry_url: None,
            shutdown_timeout: Duration::from_secs(30),
            maximum_transaction_retry_count: 10,
            database_pool_size: 16,
            api_listen_address: SocketAddr::from(([127, 0, 0, 1], 8093)),
            webdriver_url: "http://localhost:9515".to_owned(),
            webdriver_headless: true,
            translate_base_url: "https://translate.google.com".to_owned(),
            external_page_load_wait: Duration::from_secs(3),
            external_fetch_timeout: Duration::from_secs(30),
            maximum_word_length: 256,
            default_page_size: 10,
            maximum_page_size: 100,
        }
    }

    pub fn verify_word_length(&self, word: &str) -> LexiconResult<()> {
        if word.trim().is_empty() {
            Err(UserError::EmptyWord.into())
        } else if word.chars().count() > self.maximum_word_length {
            Err(UserError::WordTooLong {
                maximum: self.maximum_word_length,
            }
            .into())
        } else {
            Ok(())
        }
    }
}

impl AsRef<Configuration> for Configuration {
    fn as_ref(&self) -> &Configuration {
        self
    }
}

fn read_optional_env_var(key: &str) -> LexiconResult<Option<String>> {
    match std::env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(value)) => Err(LexiconError::MalformedEnvironmentVariable {
            key: key.to_string(),
            value: value.clone(),
            source: Box::new(VarError::NotUnicode(value)),
        }),
    }
}

fn read_env_var_with_default(key: &str, default: impl Into<String>) -> LexiconResult<String> {
    Ok(read_optional_env_var(key)?.unwrap_or_else(|| default.into()))
}

fn read_env_var_with_default_as_type<T: FromStr>(
    key: &str,
    default: impl Into<T>,
) -> LexiconResult<T>
where
    <T as FromStr>::Err: 'static + Error + Send + Sync,
{
    match read_optional_env_var(key)? {
        Some(value) => value
            .parse()
            .map_err(|error| LexiconError::MalformedEnvironmentVariable {
                key: key.to_string(),
                value: value.into(),
                source: Box::new(error),
            }),
        None => Ok(default.into()),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{read_env_var_with_default_as_type, Configuration};
    use crate::error::{LexiconError, UserError};

    #[rstest]
    #[case("apple", true)]
    #[case("ice cream", true)]
    #[case("", false)]
    #[case("   ", false)]
    fn test_verify_word_length(#[case] word: &str, #[case] valid: bool) {
        let configuration = Configuration::test_configuration();
        assert_eq!(configuration.verify_word_length(word).is_ok(), valid);
    }

    #[test]
    fn test_verify_word_length_counts_characters() {
        let configuration = Configuration {
            maximum_word_length: 3,
            ..Configuration::test_configuration()
        };
        assert!(configuration.verify_word_length("äöü").is_ok());
        assert!(matches!(
            configuration.verify_word_length("äöüß"),
            Err(LexiconError::UserError(UserError::WordTooLong { maximum: 3 }))
        ));
    }

    #[test]
    fn test_typed_env_var_falls_back_to_default() {
        let timeout: u64 =
            read_env_var_with_default_as_type("LEXICON_TEST_UNSET_SHUTDOWN_TIMEOUT", 30u64)
                .unwrap();
        assert_eq!(timeout, 30);
    }

    #[test]
    fn test_typed_env_var_is_parsed() {
        std::env::set_var("LEXICON_TEST_SHUTDOWN_TIMEOUT", "5");
        let timeout: u64 =
            read_env_var_with_default_as_type("LEXICON_TEST_SHUTDOWN_TIMEOUT", 30u64).unwrap();
        assert_eq!(timeout, 5);

        std::env::set_var("LEXICON_TEST_MALFORMED_SHUTDOWN_TIMEOUT", "soon");
        assert!(matches!(
            read_env_var_with_default_as_type::<u64>(
                "LEXICON_TEST_MALFORMED_SHUTDOWN_TIMEOUT",
                30u64
            ),
            Err(LexiconError::MalformedEnvironmentVariable { .. })
        ));
    }
}
