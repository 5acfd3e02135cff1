//! Audio pipeline: text → audio file → playback.
//!
//! Playback runs either inline (`play`) or on a single background worker fed
//! by an unbounded queue of file paths. The worker only ever reads from the
//! queue and never touches settings or history.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::collaborators::{AudioPlayer, SpeechSynthesizer};
use crate::error::AppError;
use crate::settings::{AudioFormat, Settings};

/// How long the worker blocks on an empty queue before re-checking the stop flag.
const POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Audio-related slice of the settings, copied at construction.
#[derive(Debug, Clone)]
pub struct AudioOptions {
    pub output_dir: PathBuf,
    pub language: String,
    pub format: AudioFormat,
    pub persist_audio: bool,
}

impl From<&Settings> for AudioOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            output_dir: settings.output_dir.clone(),
            language: settings.language.clone(),
            format: settings.audio_format,
            persist_audio: settings.persist_audio,
        }
    }
}

/// Text waiting to be rendered. A relative `target_path` is resolved under
/// the output directory, an absolute one is used as is; `None` gets a
/// timestamped name.
#[derive(Debug, Clone)]
pub struct AudioJob {
    pub record_text: String,
    pub target_path: Option<PathBuf>,
}

impl AudioJob {
    pub fn new(record_text: impl Into<String>) -> Self {
        Self {
            record_text: record_text.into(),
            target_path: None,
        }
    }
}

/// Counters for queue traffic.
#[derive(Debug, Default)]
pub struct PlaybackStats {
    enqueued: AtomicUsize,
    played: AtomicUsize,
    pending: AtomicUsize,
}

impl PlaybackStats {
    pub fn enqueued(&self) -> usize {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Items the worker finished, successful or not.
    pub fn played(&self) -> usize {
        self.played.load(Ordering::Relaxed)
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStop {
    NotRunning,
    Stopped,
    /// Join timeout elapsed; the worker was left to finish on its own.
    Abandoned,
}

pub struct AudioPipeline {
    options: AudioOptions,
    speech: Arc<dyn SpeechSynthesizer>,
    speech_available: bool,
    player: Arc<dyn AudioPlayer>,

    queue_tx: UnboundedSender<PathBuf>,
    queue_rx: Option<UnboundedReceiver<PathBuf>>,
    worker: Option<JoinHandle<()>>,
    stop: CancellationToken,
    stats: Arc<PlaybackStats>,
}

impl AudioPipeline {
    /// Probe the synthesizer and player once and build the pipeline.
    pub async fn probe(
        options: AudioOptions,
        speech: Arc<dyn SpeechSynthesizer>,
        player: Arc<dyn AudioPlayer>,
    ) -> Self {
        let speech_available = speech.probe().await;
        if !speech_available {
            warn!("Speech synthesizer '{}' not available, audio generation disabled", speech.name());
        }
        if !player.probe().await {
            warn!("No audio player found for {}, playback will fail", player.family());
        }
        Self::new(options, speech, speech_available, player)
    }

    pub fn new(
        options: AudioOptions,
        speech: Arc<dyn SpeechSynthesizer>,
        speech_available: bool,
        player: Arc<dyn AudioPlayer>,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Self {
            options,
            speech,
            speech_available,
            player,
            queue_tx,
            queue_rx: Some(queue_rx),
            worker: None,
            stop: CancellationToken::new(),
            stats: Arc::new(PlaybackStats::default()),
        }
    }

    pub fn stats(&self) -> &PlaybackStats {
        &self.stats
    }

    pub fn worker_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Render `text` to an audio file. `None` means "skip playback": the
    /// synthesizer is absent or failed (already logged).
    pub async fn synthesize(&self, text: &str, filename: Option<&str>) -> Option<PathBuf> {
        let name = filename
            .map(String::from)
            .unwrap_or_else(|| default_filename(self.options.format));
        self.synthesize_to(text, self.options.output_dir.join(name)).await
    }

    /// Synthesize a job, honouring its explicit target if any.
    pub async fn render(&self, job: &AudioJob) -> Option<PathBuf> {
        match &job.target_path {
            Some(target) => {
                let path = self.options.output_dir.join(target);
                self.synthesize_to(&job.record_text, path).await
            }
            None => self.synthesize(&job.record_text, None).await,
        }
    }

    async fn synthesize_to(&self, text: &str, path: PathBuf) -> Option<PathBuf> {
        if !self.speech_available {
            warn!(
                "{}, skipping audio generation",
                AppError::CollaboratorUnavailable(self.speech.name().to_string())
            );
            return None;
        }

        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                error!("Error generating audio: cannot create {}: {e}", parent.display());
                return None;
            }
        }

        match self
            .speech
            .synthesize(text, &self.options.language, &path)
            .await
        {
            Ok(()) => {
                info!("Audio saved: {}", path.display());
                Some(path)
            }
            Err(e) => {
                error!("Error generating audio: {e}");
                None
            }
        }
    }

    /// Play a file inline. Returns false (logged) on any failure.
    pub async fn play(&self, path: &Path) -> bool {
        play_file(self.player.as_ref(), path, self.options.persist_audio).await
    }

    /// Spawn the playback worker. Returns false if a worker was already
    /// started; a stopped worker is not restarted.
    pub fn start_worker(&mut self) -> bool {
        let Some(mut rx) = self.queue_rx.take() else {
            debug!("Playback worker already started");
            return false;
        };

        let player = self.player.clone();
        let stop = self.stop.clone();
        let stats = self.stats.clone();
        let persist = self.options.persist_audio;

        self.worker = Some(tokio::spawn(async move {
            info!("Playback worker started");
            loop {
                let next = tokio::select! {
                    biased;
                    _ = stop.cancelled() => break,
                    next = tokio::time::timeout(POLL_INTERVAL, rx.recv()) => next,
                };
                match next {
                    Ok(Some(path)) => {
                        play_file(player.as_ref(), &path, persist).await;
                        stats.pending.fetch_sub(1, Ordering::Relaxed);
                        stats.played.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(None) => break,
                    Err(_) => continue,
                }
            }
            let left = stats.pending.load(Ordering::Relaxed);
            if left > 0 {
                info!("Playback worker stopped with {left} files still queued");
            } else {
                info!("Playback worker stopped");
            }
        }));
        true
    }

    /// Hand a file to the worker. Returns false if the queue is closed.
    pub fn enqueue(&self, path: PathBuf) -> bool {
        if self.worker.is_none() {
            debug!("Queueing {} before the worker has started", path.display());
        }
        self.stats.pending.fetch_add(1, Ordering::Relaxed);
        match self.queue_tx.send(path) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                self.stats.pending.fetch_sub(1, Ordering::Relaxed);
                warn!("Playback queue closed, dropping {}", e.0.display());
                false
            }
        }
    }

    /// Signal the worker to stop without waiting for it.
    pub fn signal_stop(&self) {
        self.stop.cancel();
    }

    /// Signal the worker and wait up to `timeout` for it to exit. A worker
    /// still busy after the timeout is abandoned, not killed.
    pub async fn stop_worker(&mut self, timeout: Duration) -> WorkerStop {
        self.stop.cancel();
        let Some(handle) = self.worker.take() else {
            return WorkerStop::NotRunning;
        };

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => WorkerStop::Stopped,
            Ok(Err(e)) => {
                error!("Playback worker ended abnormally: {e}");
                WorkerStop::Stopped
            }
            Err(_) => {
                warn!("Playback worker did not stop within {timeout:?}, abandoning it");
                WorkerStop::Abandoned
            }
        }
    }
}

fn default_filename(format: AudioFormat) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S_%3f");
    format!("joke_{timestamp}.{}", format.extension())
}

async fn play_file(player: &dyn AudioPlayer, path: &Path, persist: bool) -> bool {
    if !path.exists() {
        error!("{}", AppError::playback(path, "audio file not found"));
        return false;
    }

    let played = match player.play(path).await {
        Ok(()) => true,
        Err(e) => {
            error!("Error playing audio: {e}");
            false
        }
    };

    if played && !persist {
        if !player.waits_for_completion() {
            debug!("Keeping {}: player may still be reading it", path.display());
        } else if let Err(e) = tokio::fs::remove_file(path).await {
            debug!("Could not remove {}: {e}", path.display());
        }
    }
    played
}
