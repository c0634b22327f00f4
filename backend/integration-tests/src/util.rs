use std::time::Duration;

use anyhow::{bail, Context};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

static DEFAULT_BASE_URL: &str = "http://localhost:8093";

pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a client and wait until the service answers health checks.
    pub async fn new() -> anyhow::Result<Self> {
        let base_url =
            std::env::var("LEXICON_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("building http client")?;

        for _ in 0..10 {
            match client.get(format!("{base_url}/health")).send().await {
                Ok(_) => return Ok(Self { client, base_url }),
                Err(error) if error.is_connect() => {}
                Err(error) => return Err(error).context("waiting for the service"),
            }

            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        bail!("service at {base_url} did not come up")
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<Response> {
        self.client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .with_context(|| format!("GET {path}"))
    }

    pub async fn delete(&self, path: &str) -> anyhow::Result<Response> {
        self.client
            .delete(format!("{}{path}", self.base_url))
            .send()
            .await
            .with_context(|| format!("DELETE {path}"))
    }
}

pub async fn assert_response_status(response: Response, status: StatusCode) -> anyhow::Result<()> {
    if response.status() != status {
        let actual = response.status();
        let body = response.text().await.unwrap_or_default();
        bail!("expected status {status}, got {actual} with body {body:?}");
    }
    Ok(())
}

pub async fn parse_response<T: DeserializeOwned>(response: Response) -> anyhow::Result<T> {
    let status = response.status();
    if status != StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        bail!("expected status 200 OK, got {status} with body {body:?}");
    }
    response.json().await.context("parsing response body")
}
