//! External collaborators: joke supplier, speech synthesizer, audio player.
//!
//! Each one is probed once at startup; callers branch on the probe result
//! instead of failing when a collaborator is missing.
//! - `joke_api`: HTTP joke supplier (JokeAPI + chucknorris.io)
//! - `google_tts`: Google Translate speech endpoint, MP3 output
//! - `player`: per-OS command-line audio player

pub mod google_tts;
pub mod joke_api;
pub mod player;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait JokeProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the supplier can be reached at all.
    async fn probe(&self) -> bool;

    /// One joke. `None` asks for the supplier's default category.
    async fn fetch(&self, category: Option<&str>) -> Result<String>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    async fn probe(&self) -> bool;

    /// Render `text` in `language` into an audio file at `target`.
    async fn synthesize(&self, text: &str, language: &str, target: &Path) -> Result<()>;
}

#[async_trait]
pub trait AudioPlayer: Send + Sync {
    fn family(&self) -> player::OsFamily;

    /// Whether `play` returns only once playback has finished. Files handed
    /// to a player that returns early must not be deleted afterwards.
    fn waits_for_completion(&self) -> bool {
        true
    }

    async fn probe(&self) -> bool;

    /// Play the file, to completion when `waits_for_completion` holds.
    async fn play(&self, path: &Path) -> Result<()>;
}

/// The full set of collaborators handed to the supervisor.
#[derive(Clone)]
pub struct Collaborators {
    pub jokes: Arc<dyn JokeProvider>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub player: Arc<dyn AudioPlayer>,
}

impl Collaborators {
    /// Production collaborators for the current machine.
    pub fn system() -> Self {
        Self {
            jokes: Arc::new(joke_api::JokeApiClient::new()),
            speech: Arc::new(google_tts::GoogleTts::new()),
            player: Arc::new(player::SystemPlayer::new(player::OsFamily::current())),
        }
    }
}
