//! Google Translate speech endpoint.
//!
//! The endpoint accepts at most 100 characters per request, so text is split
//! into chunks on sentence boundaries first, then on whitespace. Each chunk
//! comes back as an MP3 segment; segments are concatenated into one file.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::SpeechSynthesizer;
use crate::error::{AppError, Result};

const TTS_ENDPOINT: &str = "https://translate.google.com/translate_tts";
const MAX_CHUNK_CHARS: usize = 100;
const NAME: &str = "google-tts";

pub struct GoogleTts {
    client: Client,
}

impl GoogleTts {
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(1500))
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    async fn fetch_chunk(&self, chunk: &str, language: &str, idx: usize, total: usize) -> Result<Vec<u8>> {
        let total = total.to_string();
        let idx = idx.to_string();
        let textlen = chunk.chars().count().to_string();
        let resp = self
            .client
            .get(TTS_ENDPOINT)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", language),
                ("q", chunk),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::collaborator(NAME, e))?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AppError::collaborator(NAME, e))?;
        Ok(bytes.to_vec())
    }
}

impl Default for GoogleTts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    fn name(&self) -> &str {
        NAME
    }

    async fn probe(&self) -> bool {
        self.client
            .head(TTS_ENDPOINT)
            .timeout(Duration::from_secs(3))
            .send()
            .await
            .is_ok()
    }

    async fn synthesize(&self, text: &str, language: &str, target: &Path) -> Result<()> {
        let chunks = split_chunks(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(AppError::collaborator(NAME, "nothing to speak"));
        }

        let mut audio = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let segment = self.fetch_chunk(chunk, language, i, chunks.len()).await?;
            debug!("Chunk {}/{}: {} bytes", i + 1, chunks.len(), segment.len());
            audio.extend_from_slice(&segment);
        }

        tokio::fs::write(target, audio)
            .await
            .map_err(|e| AppError::collaborator(NAME, format!("writing {}: {e}", target.display())))
    }
}

/// Pack words into chunks of at most `max_chars` characters. A word ending
/// in `.`, `!` or `?` closes its chunk so sentences never share one; words
/// longer than the limit are cut on character boundaries.
fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut len = 0;

    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        for part in chars.chunks(max_chars) {
            if len > 0 && len + 1 + part.len() > max_chars {
                chunks.push(std::mem::take(&mut current));
                len = 0;
            }
            if len > 0 {
                current.push(' ');
                len += 1;
            }
            current.extend(part);
            len += part.len();
        }
        if len > 0 && word.ends_with(['.', '!', '?']) {
            chunks.push(std::mem::take(&mut current));
            len = 0;
        }
    }
    if len > 0 {
        chunks.push(current);
    }

    chunks
}
