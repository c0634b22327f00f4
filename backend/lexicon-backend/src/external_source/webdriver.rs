//! A minimal blocking client for the W3C WebDriver protocol.
//!
//! Only the commands needed to render a page and read the texts of its elements are supported.
//! All calls block, so this must only be used on a blocking thread.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// The key under which WebDriver returns element references.
const ELEMENT_IDENTIFIER: &str = "element-6066-11e4-a52e-4f735466cecf";

#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("webdriver request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("webdriver returned error '{error}': {message}")]
    Command { error: String, message: String },

    #[error("webdriver returned a malformed response: {0}")]
    MalformedResponse(String),
}

pub struct WebDriverClient {
    http_client: Client,
    base_url: Url,
}

impl WebDriverClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, WebDriverError> {
        // Without a trailing slash, joining would replace the last path segment.
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };

        Ok(Self {
            http_client: Client::builder().timeout(request_timeout).build()?,
            base_url,
        })
    }

    /// Start a new browser session. The session is closed when it is dropped.
    pub fn new_session(&self, headless: bool) -> Result<WebDriverSession<'_>, WebDriverError> {
        let arguments = if headless {
            vec!["--headless=new", "--disable-gpu"]
        } else {
            Vec::new()
        };

        let value = self.send(self.http_client.post(self.base_url.join("session")?).json(
            &json!({
                "capabilities": {
                    "alwaysMatch": {
                        "browserName": "chrome",
                        "goog:chromeOptions": { "args": arguments },
                    },
                },
            }),
        ))?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                WebDriverError::MalformedResponse(format!("missing session id in {value}"))
            })?
            .to_owned();
        debug!("Started webdriver session {session_id}");

        Ok(WebDriverSession {
            client: self,
            session_id,
        })
    }

    fn send(&self, request: RequestBuilder) -> Result<Value, WebDriverError> {
        let response = request.send()?;
        let status = response.status();
        let response: WebDriverResponse = response.json()?;

        if status.is_success() {
            Ok(response.value)
        } else {
            let error = serde_json::from_value::<WebDriverErrorValue>(response.value.clone())
                .map_err(|_| {
                    WebDriverError::MalformedResponse(format!(
                        "status {status} with body {}",
                        response.value
                    ))
                })?;
            Err(WebDriverError::Command {
                error: error.error,
                message: error.message,
            })
        }
    }
}

pub struct WebDriverSession<'client> {
    client: &'client WebDriverClient,
    session_id: String,
}

impl WebDriverSession<'_> {
    pub fn set_page_load_timeout(&self, timeout: Duration) -> Result<(), WebDriverError> {
        let timeout_millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.client.send(
            self.client
                .http_client
                .post(self.command_url("timeouts")?)
                .json(&json!({ "pageLoad": timeout_millis })),
        )?;
        Ok(())
    }

    /// Navigate to the url and wait until the browser reports the page as loaded.
    pub fn navigate(&self, url: &Url) -> Result<(), WebDriverError> {
        self.client.send(
            self.client
                .http_client
                .post(self.command_url("url")?)
                .json(&json!({ "url": url.as_str() })),
        )?;
        Ok(())
    }

    /// The texts of all elements with the given css class, in document order.
    /// If no element has the class, the result is empty.
    pub fn texts_by_class(&self, class: &str) -> Result<Vec<String>, WebDriverError> {
        let value = self.client.send(
            self.client
                .http_client
                .post(self.command_url("elements")?)
                .json(&json!({ "using": "css selector", "value": format!(".{class}") })),
        )?;

        element_ids(&value)?
            .into_iter()
            .map(|element_id| self.element_text(&element_id))
            .collect()
    }

    fn element_text(&self, element_id: &str) -> Result<String, WebDriverError> {
        let value = self.client.send(
            self.client
                .http_client
                .get(self.command_url(&format!("element/{element_id}/text"))?),
        )?;

        match value {
            Value::String(text) => Ok(text),
            value => Err(WebDriverError::MalformedResponse(format!(
                "expected element text, got {value}"
            ))),
        }
    }

    fn command_url(&self, command: &str) -> Result<Url, WebDriverError> {
        Ok(self
            .client
            .base_url
            .join(&format!("session/{}/{command}", self.session_id))?)
    }
}

impl Drop for WebDriverSession<'_> {
    fn drop(&mut self) {
        let result = self
            .client
            .base_url
            .join(&format!("session/{}", self.session_id))
            .map_err(WebDriverError::from)
            .and_then(|url| self.client.send(self.client.http_client.delete(url)));

        match result {
            Ok(_) => debug!("Closed webdriver session {}", self.session_id),
            Err(error) => warn!(
                "Could not close webdriver session {}: {error}",
                self.session_id
            ),
        }
    }
}

#[derive(Deserialize)]
struct WebDriverResponse {
    value: Value,
}

#[derive(Deserialize)]
struct WebDriverErrorValue {
    error: String,
    #[serde(default)]
    message: String,
}

fn element_ids(value: &Value) -> Result<Vec<String>, WebDriverError> {
    let elements = value.as_array().ok_or_else(|| {
        WebDriverError::MalformedResponse(format!("expected a list of elements, got {value}"))
    })?;

    elements
        .iter()
        .map(|element| {
            element
                .get(ELEMENT_IDENTIFIER)
                .and_then(Value::as_str)
                .map(ToOwned::to_owned)
                .ok_or_else(|| {
                    WebDriverError::MalformedResponse(format!("malformed element {element}"))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{element_ids, WebDriverError};

    #[test]
    fn test_element_ids() {
        let value = json!([
            { "element-6066-11e4-a52e-4f735466cecf": "a1" },
            { "element-6066-11e4-a52e-4f735466cecf": "b2" },
        ]);
        assert_eq!(element_ids(&value).unwrap(), vec!["a1", "b2"]);
        assert!(element_ids(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_element_ids() {
        assert!(matches!(
            element_ids(&json!({ "error": "no such window" })),
            Err(WebDriverError::MalformedResponse(_))
        ));
        assert!(matches!(
            element_ids(&json!([{ "ELEMENT": "legacy" }])),
            Err(WebDriverError::MalformedResponse(_))
        ));
    }
}
