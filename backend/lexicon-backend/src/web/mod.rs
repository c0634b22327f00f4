use std::sync::Arc;

use axum::{routing::get, Router};
use tracing::{debug, error, info, instrument};

use crate::{
    configuration::Configuration,
    error::{LexiconError, LexiconResult},
    resolver::WordResolver,
};

mod word;

#[derive(Clone)]
pub struct WebState {
    pub resolver: WordResolver,
    pub configuration: Arc<Configuration>,
}

#[instrument(err, skip(resolver, configuration))]
pub async fn run_web_api(
    resolver: WordResolver,
    configuration: &Configuration,
) -> LexiconResult<()> {
    info!("Starting web API");

    let router = create_router(WebState {
        resolver,
        configuration: Arc::new(configuration.clone()),
    });

    debug!(
        "Listening for API requests on {}",
        configuration.api_listen_address
    );
    axum::Server::bind(&configuration.api_listen_address)
        .serve(router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|error| LexiconError::ApiServerError {
            source: Box::new(error),
        })?;

    info!("Web API terminated normally");
    Ok(())
}

fn create_router(state: WebState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/word/:word",
            get(word::get_word).delete(word::delete_word),
        )
        .route("/words", get(word::list_words))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    let sigint = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!("Error receiving SIGINT: {error}");
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut handler) => {
                if handler.recv().await.is_none() {
                    error!("Received None from SIGTERM handler. This is unexpected.");
                }
            }
            Err(error) => error!("Error installing SIGTERM handler: {error}"),
        }
    };

    // This future never completes, hence we offer no other means of shutdown on non-unix platforms.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = sigint => info!("Received SIGINT, shutting down"),
        _ = sigterm => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::{create_router, WebState};
    use crate::{
        configuration::Configuration,
        error::LexiconResult,
        external_source::ExternalLexicalSource,
        lexical_store::{LexicalStore, WordId},
        model::{
            Annotation, LanguageCode, LanguageSelector, LexicalRecord, PageRequest,
            RelationSelection,
        },
        resolver::WordResolver,
    };

    /// Knows the single word "apple" in English, with Spanish annotations.
    struct AppleStore;

    fn apple() -> LexicalRecord {
        let spanish = LanguageCode::new("es").unwrap();
        let mut record = LexicalRecord::new("apple", LanguageCode::new("en").unwrap());
        record.add_definition(Annotation::new(spanish.clone(), "manzana"));
        record.add_example(Annotation::new(spanish, "una manzana roja"));
        record
    }

    #[async_trait]
    impl LexicalStore for AppleStore {
        async fn get(
            &self,
            word: &str,
            _source_language: &LanguageSelector,
            target_language: &LanguageCode,
        ) -> LexiconResult<Option<LexicalRecord>> {
            Ok((word == "apple" && target_language.as_str() == "es").then(apple))
        }

        async fn get_id(
            &self,
            word: &str,
            _source_language: &LanguageSelector,
        ) -> LexiconResult<Option<WordId>> {
            Ok((word == "apple").then_some(WordId(1)))
        }

        async fn delete(&self, _id: WordId) -> LexiconResult<()> {
            Ok(())
        }

        async fn list_page(
            &self,
            _page: PageRequest,
            _word_filter: Option<&str>,
            relations: RelationSelection,
        ) -> LexiconResult<Vec<LexicalRecord>> {
            let mut record = LexicalRecord::with_relations("apple", apple().language, relations);
            if relations.definitions {
                record.definitions = apple().definitions;
            }
            Ok(vec![record])
        }

        async fn save(&self, _record: &LexicalRecord) -> LexiconResult<()> {
            Ok(())
        }
    }

    struct NoSource;

    #[async_trait]
    impl ExternalLexicalSource for NoSource {
        async fn get(
            &self,
            _word: &str,
            _source_language: &LanguageSelector,
            _target_language: &LanguageCode,
        ) -> Option<LexicalRecord> {
            None
        }
    }

    async fn request(method: Method, uri: &str) -> (StatusCode, String) {
        let router = create_router(WebState {
            resolver: WordResolver::new(Arc::new(AppleStore), Arc::new(NoSource)),
            configuration: Arc::new(Configuration::test_configuration()),
        });

        let response = router
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(
            request(Method::GET, "/health").await,
            (StatusCode::OK, "ok".to_owned())
        );
    }

    #[tokio::test]
    async fn test_get_word() {
        let (status, body) = request(Method::GET, "/word/apple?sl=en&tl=es").await;
        assert_eq!(status, StatusCode::OK);
        let record: api_commands::WordRecord = serde_json::from_str(&body).unwrap();
        assert_eq!(record.word, "apple");
        assert_eq!(record.definitions, Some(vec!["manzana".to_owned()]));
        assert_eq!(record.synonyms, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_unknown_word_is_not_found() {
        let (status, _) = request(Method::GET, "/word/pear?tl=es").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_languages_are_bad_requests() {
        for uri in [
            "/word/apple?sl=e%20n&tl=es",
            "/word/apple?sl=en&tl=auto",
            "/word/apple?sl=en",
        ] {
            let (status, _) = request(Method::GET, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_delete_word() {
        for uri in ["/word/apple?sl=en", "/word/pear", "/word/pear?sl=auto"] {
            let (status, _) = request(Method::DELETE, uri).await;
            assert_eq!(status, StatusCode::NO_CONTENT, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_list_words() {
        let (status, body) =
            request(Method::GET, "/words?page=1&page_size=5&include_definitions=true").await;
        assert_eq!(status, StatusCode::OK);
        let records: Vec<api_commands::WordRecord> = serde_json::from_str(&body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].definitions, Some(vec!["manzana".to_owned()]));
        assert_eq!(records[0].examples, None);

        let (status, body) =
            request(Method::GET, "/words?page=1&pageSize=5&includeDefinitions=true").await;
        assert_eq!(status, StatusCode::OK);
        let camel_case: Vec<api_commands::WordRecord> = serde_json::from_str(&body).unwrap();
        assert_eq!(camel_case, records);

        let (status, _) = request(Method::GET, "/words?page=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
