use anyhow::ensure;
use api_commands::WordRecord;
use log::info;
use reqwest::StatusCode;
use simplelog::TermLogger;

use crate::util::{assert_response_status, parse_response, HttpClient};

mod util;

/// No external source knows this word, and it is never stored.
const UNKNOWN_WORD: &str = "__lexicon_http_test_unknown";

fn initialise_logging() {
    if let Err(error) = TermLogger::init(
        log::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    ) {
        eprintln!("Could not initialise logging: {error}");
    }

    info!("Logging initialised");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    initialise_logging();
    let client = HttpClient::new().await?;

    test_health(&client).await?;
    test_invalid_lookups(&client).await?;
    test_unknown_word(&client).await?;
    test_idempotent_delete(&client).await?;
    test_list_words(&client).await?;

    info!("Finished");
    Ok(())
}

async fn test_health(client: &HttpClient) -> anyhow::Result<()> {
    let response = client.get("/health").await?;
    assert_response_status(response, StatusCode::OK).await?;
    info!("Health check passed");
    Ok(())
}

async fn test_invalid_lookups(client: &HttpClient) -> anyhow::Result<()> {
    for path in [
        "/word/apple?sl=en&tl=auto",
        "/word/apple?sl=e%20n&tl=es",
        "/word/apple?sl=en",
        "/word/%20?sl=en&tl=es",
        "/words?page=0",
        "/words?page_size=-1",
    ] {
        let response = client.get(path).await?;
        assert_response_status(response, StatusCode::BAD_REQUEST).await?;
    }

    info!("Invalid lookups are rejected");
    Ok(())
}

/// Requires that the service cannot reach its external source, or that the source does not know the word.
async fn test_unknown_word(client: &HttpClient) -> anyhow::Result<()> {
    let response = client
        .get(&format!("/word/{UNKNOWN_WORD}?sl=en&tl=es"))
        .await?;
    assert_response_status(response, StatusCode::NOT_FOUND).await?;

    info!("Unknown words are not found");
    Ok(())
}

async fn test_idempotent_delete(client: &HttpClient) -> anyhow::Result<()> {
    for path in [
        format!("/word/{UNKNOWN_WORD}?sl=en"),
        format!("/word/{UNKNOWN_WORD}?sl=en"),
        format!("/word/{UNKNOWN_WORD}"),
    ] {
        let response = client.delete(&path).await?;
        assert_response_status(response, StatusCode::NO_CONTENT).await?;
    }

    info!("Deleting is idempotent");
    Ok(())
}

async fn test_list_words(client: &HttpClient) -> anyhow::Result<()> {
    let records: Vec<WordRecord> = parse_response(
        client
            .get("/words?page=1&page_size=5&include_definitions=true&include_examples=true")
            .await?,
    )
    .await?;
    ensure!(records.len() <= 5, "page has {} words", records.len());
    for record in &records {
        ensure!(
            record.definitions.is_some() && record.examples.is_some(),
            "requested relations missing from {record:?}"
        );
        ensure!(
            record.synonyms.is_none() && record.translations.is_none(),
            "unrequested relations present in {record:?}"
        );
    }

    let filtered: Vec<WordRecord> =
        parse_response(client.get(&format!("/words?word_filter={UNKNOWN_WORD}")).await?).await?;
    ensure!(
        filtered.is_empty(),
        "filter matched words that were never stored: {filtered:?}"
    );

    info!("Listing words works");
    Ok(())
}
