//! Client for the countries API
//!
//! The API answers `GET /all` with `{ "data": [ { "name", "abbr", "flag" }, ... ] }`.
//! Every way that can go wrong is collapsed into one user-facing message;
//! the variants of [`FetchError`] only exist for the log.

use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::country::Country;

pub const DEFAULT_API_URL: &str = "https://xcountriesapi.onrender.com/all";

/// The only error text the user ever sees
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch country data. Please try again later.";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP error! Status: {0}")]
    Status(StatusCode),

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid API response format: `data` is not an array")]
    InvalidFormat,

    #[error("fetch task ended without a result")]
    Interrupted,
}

impl FetchError {
    pub fn user_message(&self) -> &'static str {
        FETCH_FAILED_MESSAGE
    }
}

#[derive(Debug, Clone)]
pub struct CountryClient {
    http: Client,
    url: String,
}

impl CountryClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the full country list. No retries, no timeout.
    pub async fn fetch_all(&self) -> Result<Vec<Country>, FetchError> {
        tracing::info!("Fetching countries from {}", self.url);

        let response = self.http.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await?;
        let countries = parse_body(&body)?;

        tracing::debug!("Received {} countries", countries.len());
        Ok(countries)
    }
}

/// Validate and decode a response body.
///
/// The body must be a JSON object whose `data` field is an array of country
/// objects. A missing or non-array `data` is [`FetchError::InvalidFormat`].
pub fn parse_body(body: &[u8]) -> Result<Vec<Country>, FetchError> {
    let mut body: Value = serde_json::from_slice(body)?;

    let data = body
        .get_mut("data")
        .map(Value::take)
        .unwrap_or(Value::Null);

    if !data.is_array() {
        return Err(FetchError::InvalidFormat);
    }

    Ok(serde_json::from_value(data)?)
}

/// Serve a fixed status and body on `/all`, return the endpoint URL
#[cfg(test)]
pub(crate) async fn spawn_api(status: u16, body: &'static str) -> String {
    use axum::{http::StatusCode as HttpStatus, routing::get, Router};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    let status = HttpStatus::from_u16(status).expect("valid status");

    let app = Router::new().route("/all", get(move || async move { (status, body) }));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{addr}/all")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    const TWO_COUNTRIES: &str = r#"{"data":[
        {"name":"France","abbr":"FR","flag":"url1"},
        {"name":"Germany","abbr":"DE","flag":"url2"}
    ]}"#;

    #[test]
    fn test_parse_valid_body() {
        let countries = parse_body(TWO_COUNTRIES.as_bytes()).unwrap();

        assert_eq!(countries.len(), 2);
        assert_eq!(countries[0].name, "France");
        assert_eq!(countries[0].abbr, "FR");
        assert_eq!(countries[0].flag, "url1");
        assert_eq!(countries[1].name, "Germany");
    }

    #[test]
    fn test_parse_empty_array_is_success() {
        let countries = parse_body(br#"{"data":[]}"#).unwrap();
        assert!(countries.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_array_data() {
        assert!(matches!(
            parse_body(br#"{"data":"not-an-array"}"#),
            Err(FetchError::InvalidFormat)
        ));
        assert!(matches!(
            parse_body(br#"{"data":{"name":"France"}}"#),
            Err(FetchError::InvalidFormat)
        ));
        assert!(matches!(
            parse_body(br#"{"countries":[]}"#),
            Err(FetchError::InvalidFormat)
        ));
        // A top-level array has no `data` field
        assert!(matches!(
            parse_body(br#"[[{"name":"France"}]]"#),
            Err(FetchError::InvalidFormat)
        ));
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(matches!(parse_body(b"<html>oops</html>"), Err(FetchError::Decode(_))));
        assert!(matches!(parse_body(br#"{"data":[1,2]}"#), Err(FetchError::Decode(_))));
    }

    #[test]
    fn test_every_failure_has_the_same_user_message() {
        let errors = [
            FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR),
            FetchError::InvalidFormat,
            parse_body(b"nope").unwrap_err(),
        ];

        for err in &errors {
            assert_eq!(err.user_message(), FETCH_FAILED_MESSAGE);
        }
    }

    #[tokio::test]
    async fn test_fetch_all_success() {
        let url = spawn_api(200, TWO_COUNTRIES).await;
        let countries = CountryClient::new(url).fetch_all().await.unwrap();

        let names: Vec<_> = countries.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["France", "Germany"]);
    }

    #[tokio::test]
    async fn test_fetch_all_server_error() {
        let url = spawn_api(500, "internal error").await;
        let err = CountryClient::new(url).fetch_all().await.unwrap_err();

        assert!(matches!(err, FetchError::Status(s) if s == StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_fetch_all_connection_refused() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = CountryClient::new(format!("http://{addr}/all"))
            .fetch_all()
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
