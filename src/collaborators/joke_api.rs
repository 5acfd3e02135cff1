//! HTTP joke supplier.
//!
//! `chuck` jokes come from chucknorris.io, everything else from JokeAPI
//! (single-part jokes only, safe mode for the default category).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::JokeProvider;
use crate::error::{AppError, Result};

const JOKE_API: &str = "https://v2.jokeapi.dev";
const CHUCK_API: &str = "https://api.chucknorris.io/jokes/random";
const NAME: &str = "joke-api";

#[derive(Deserialize)]
struct JokeApiResponse {
    #[serde(default)]
    error: bool,
    joke: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ChuckResponse {
    value: String,
}

pub struct JokeApiClient {
    client: Client,
}

impl JokeApiClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(1500))
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    async fn fetch_chuck(&self) -> Result<String> {
        let resp = self
            .client
            .get(CHUCK_API)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::collaborator(NAME, e))?;
        let body: ChuckResponse = resp
            .json()
            .await
            .map_err(|e| AppError::collaborator(NAME, e))?;
        Ok(body.value)
    }

    async fn fetch_joke_api(&self, category: Option<&str>) -> Result<String> {
        let url = joke_api_url(category);
        debug!("Requesting joke from {url}");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::collaborator(NAME, e))?;
        let body: JokeApiResponse = resp
            .json()
            .await
            .map_err(|e| AppError::collaborator(NAME, e))?;

        if body.error {
            let message = body.message.unwrap_or_else(|| "unspecified error".into());
            return Err(AppError::collaborator(NAME, message));
        }
        body.joke
            .map(|j| j.trim().to_string())
            .filter(|j| !j.is_empty())
            .ok_or_else(|| AppError::collaborator(NAME, "response carried no joke text"))
    }
}

impl Default for JokeApiClient {
    fn default() -> Self {
        Self::new()
    }
}

fn joke_api_url(category: Option<&str>) -> String {
    match category {
        Some("all") => format!("{JOKE_API}/joke/Any?type=single"),
        _ => format!("{JOKE_API}/joke/Programming,Pun?type=single&safe-mode"),
    }
}

#[async_trait]
impl JokeProvider for JokeApiClient {
    fn name(&self) -> &str {
        NAME
    }

    async fn probe(&self) -> bool {
        self.client
            .get(format!("{JOKE_API}/ping"))
            .timeout(Duration::from_secs(3))
            .send()
            .await
            .is_ok()
    }

    async fn fetch(&self, category: Option<&str>) -> Result<String> {
        match category {
            Some("chuck") => self.fetch_chuck().await,
            other => self.fetch_joke_api(other).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_map_to_endpoints() {
        assert!(joke_api_url(Some("all")).ends_with("/joke/Any?type=single"));
        assert!(joke_api_url(Some("neutral")).contains("safe-mode"));
        assert_eq!(joke_api_url(None), joke_api_url(Some("neutral")));
    }

    #[test]
    fn error_payload_parses() {
        let body: JokeApiResponse =
            serde_json::from_str(r#"{"error": true, "message": "No matching joke found"}"#).unwrap();
        assert!(body.error);
        assert!(body.joke.is_none());
        assert_eq!(body.message.as_deref(), Some("No matching joke found"));
    }

    #[test]
    fn single_joke_payload_parses() {
        let body: JokeApiResponse = serde_json::from_str(
            r#"{"error": false, "category": "Programming", "type": "single", "joke": "A SQL query walks into a bar."}"#,
        )
        .unwrap();
        assert_eq!(body.joke.as_deref(), Some("A SQL query walks into a bar."));
    }
}
