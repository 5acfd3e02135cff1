//! Top-level controller with a lifecycle state machine.
//!
//! IDLE → LOADING_CONFIG → READY → RUNNING(mode) → SHUTTING_DOWN → STOPPED
//!
//! The supervisor owns settings, history, the joke source and the audio
//! pipeline. Run-mode loops observe a cancellation token between iterations;
//! the token is cancelled by OS signals or by the supervisor itself.

use std::path::PathBuf;

use clap::ValueEnum;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::audio::{AudioJob, AudioOptions, AudioPipeline, WorkerStop, DEFAULT_JOIN_TIMEOUT};
use crate::collaborators::Collaborators;
use crate::content::ContentSource;
use crate::history::HistoryStore;
use crate::settings::{Overrides, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    Interactive,
    Batch,
    Daemon,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interactive => write!(f, "INTERACTIVE"),
            Self::Batch => write!(f, "BATCH"),
            Self::Daemon => write!(f, "DAEMON"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    LoadingConfig,
    Ready,
    Running(RunMode),
    ShuttingDown,
    Stopped,
}

impl std::fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::LoadingConfig => write!(f, "LOADING_CONFIG"),
            Self::Ready => write!(f, "READY"),
            Self::Running(mode) => write!(f, "RUNNING({mode})"),
            Self::ShuttingDown => write!(f, "SHUTTING_DOWN"),
            Self::Stopped => write!(f, "STOPPED"),
        }
    }
}

const USAGE: &str = "Invalid command. Try j, s, h, c, or q.";

/// Parsed interactive input line.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Joke(Option<String>),
    SaveHistory,
    ShowHistory,
    ShowSettings,
    Quit,
    Unknown,
}

impl Command {
    fn parse(line: &str) -> Self {
        let line = line.to_lowercase();
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["j"] => Self::Joke(None),
            ["j", category] => Self::Joke(Some(category.to_string())),
            ["s"] => Self::SaveHistory,
            ["h"] => Self::ShowHistory,
            ["c"] => Self::ShowSettings,
            ["q"] => Self::Quit,
            _ => Self::Unknown,
        }
    }
}

pub struct Supervisor {
    /// Settings as loaded from file, before command-line overrides.
    file_settings: Settings,
    settings: Settings,
    overrides: Overrides,
    history: HistoryStore,
    source: ContentSource,
    audio: AudioPipeline,
    state: SupervisorState,
    cancel: CancellationToken,
}

impl Supervisor {
    /// Load settings and history and probe collaborators. Always reaches READY:
    /// any load failure falls back to defaults.
    pub async fn start(settings_path: PathBuf, overrides: Overrides, collaborators: Collaborators) -> Self {
        let mut state = SupervisorState::Idle;
        transition(&mut state, SupervisorState::LoadingConfig);

        let file_settings = Settings::load(&settings_path);
        let mut settings = file_settings.clone();
        settings.apply_overrides(&overrides);

        let history = HistoryStore::load(&settings.history_path());
        let source = ContentSource::probe(collaborators.jokes, settings.categories.clone()).await;
        let audio = AudioPipeline::probe(
            AudioOptions::from(&settings),
            collaborators.speech,
            collaborators.player,
        )
        .await;

        transition(&mut state, SupervisorState::Ready);
        Self {
            file_settings,
            settings,
            overrides,
            history,
            source,
            audio,
            state,
            cancel: CancellationToken::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn audio(&self) -> &AudioPipeline {
        &self.audio
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Token observed by every run-mode loop.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the run on SIGINT/SIGTERM.
    pub fn install_signal_handlers(&self) {
        let cancel = self.cancellation_token();
        tokio::spawn(async move {
            wait_for_signal().await;
            info!("Received shutdown signal, shutting down...");
            cancel.cancel();
        });
    }

    /// Run one mode to completion and shut down, reading interactive input
    /// from stdin.
    pub async fn run(&mut self, mode: RunMode) {
        let input = match mode {
            RunMode::Interactive => spawn_stdin_reader(),
            _ => mpsc::unbounded_channel().1,
        };
        self.run_with_input(mode, input).await;
    }

    /// Run one mode to completion and shut down. Every exit path goes
    /// through `shutdown`.
    pub async fn run_with_input(&mut self, mode: RunMode, input: mpsc::UnboundedReceiver<String>) {
        if self.state != SupervisorState::Ready {
            warn!("Cannot start {mode} from state {}", self.state);
            return;
        }
        self.set_state(SupervisorState::Running(mode));

        match mode {
            RunMode::Interactive => self.run_interactive(input).await,
            RunMode::Batch => self.run_batch(self.overrides.count).await,
            RunMode::Daemon => self.run_daemon().await,
        }

        self.shutdown().await;
    }

    async fn run_interactive(&mut self, mut input: mpsc::UnboundedReceiver<String>) {
        info!("Starting interactive mode");
        print_banner();

        while !self.cancel.is_cancelled() {
            prompt();
            let line = tokio::select! {
                _ = self.cancel.cancelled() => break,
                line = input.recv() => line,
            };
            let Some(line) = line else {
                debug!("Input closed");
                break;
            };

            match Command::parse(&line) {
                Command::Joke(category) => {
                    let record = self.source.next(&mut self.history, category.as_deref()).await;
                    println!("\n🎭 {}\n", record.text);
                    if self.settings.audio_enabled {
                        self.speak_now(&record.text).await;
                    }
                }
                Command::SaveHistory => {
                    self.history.save(&self.settings.history_path());
                    println!("History saved!\n");
                }
                Command::ShowHistory => {
                    if self.history.is_empty() {
                        println!("No jokes in history yet.\n");
                    } else {
                        println!("\n📜 Joke History:");
                        for record in self.history.recent(5) {
                            println!("  {}: {}", record.sequence_id, record.preview(50));
                        }
                        println!();
                    }
                }
                Command::ShowSettings => {
                    println!("\n⚙️  Current Config:");
                    for line in self.settings.describe() {
                        println!("  {line}");
                    }
                    println!();
                }
                Command::Quit => break,
                Command::Unknown => println!("{USAGE}\n"),
            }
        }
    }

    async fn run_batch(&mut self, count: Option<usize>) {
        let count = count.unwrap_or(self.settings.item_count);
        info!("Starting batch mode with {count} jokes");

        for i in 0..count {
            if self.cancel.is_cancelled() {
                info!("Batch interrupted after {i} of {count} jokes");
                break;
            }

            let record = self.source.next(&mut self.history, None).await;
            println!("\n{}/{count}: {}", i + 1, record.text);

            if self.settings.audio_enabled && self.speak_now(&record.text).await {
                self.pause().await;
            }
        }
    }

    async fn run_daemon(&mut self) {
        info!("Starting daemon mode");
        self.audio.start_worker();

        while !self.cancel.is_cancelled() {
            let record = self.source.next(&mut self.history, None).await;
            info!("Generated joke #{}: {}", record.sequence_id, record.text);

            if self.settings.audio_enabled {
                if let Some(path) = self.audio.render(&AudioJob::new(record.text)).await {
                    self.audio.enqueue(path);
                }
            }

            self.pause().await;
        }
    }

    /// Synthesize and play inline. Returns true if playback was requested.
    async fn speak_now(&self, text: &str) -> bool {
        match self.audio.synthesize(text, None).await {
            Some(path) => {
                self.audio.play(&path).await;
                true
            }
            None => false,
        }
    }

    /// Sleep `delay_seconds`, waking early on cancellation.
    async fn pause(&self) {
        let delay = self.settings.delay();
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.cancel.cancelled() => {}
        }
    }

    /// Stop the worker and persist history. Runs once; later calls are no-ops
    /// and return false.
    pub async fn shutdown(&mut self) -> bool {
        if matches!(self.state, SupervisorState::ShuttingDown | SupervisorState::Stopped) {
            debug!("Shutdown already performed");
            return false;
        }
        self.set_state(SupervisorState::ShuttingDown);
        info!("Cleaning up resources...");
        self.cancel.cancel();

        if self.audio.worker_running() {
            debug!("Waiting up to {DEFAULT_JOIN_TIMEOUT:?} for the playback worker");
        }
        match self.audio.stop_worker(DEFAULT_JOIN_TIMEOUT).await {
            WorkerStop::NotRunning => {}
            WorkerStop::Stopped => {
                debug!("Playback worker joined after {} files", self.audio.stats().played())
            }
            WorkerStop::Abandoned => warn!("Playback worker abandoned during shutdown"),
        }

        self.persist();
        self.set_state(SupervisorState::Stopped);
        true
    }

    fn persist(&self) {
        if !self.history.save(&self.settings.history_path()) {
            error!("History could not be persisted");
        }
        if self.overrides.save_on_exit {
            self.file_settings.save(&self.file_settings.settings_path);
        }
    }

    fn set_state(&mut self, next: SupervisorState) {
        transition(&mut self.state, next);
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if matches!(self.state, SupervisorState::ShuttingDown | SupervisorState::Stopped) {
            return;
        }
        warn!("Supervisor dropped in state {} without shutdown, persisting", self.state);
        self.cancel.cancel();
        self.audio.signal_stop();
        self.persist();
        self.state = SupervisorState::Stopped;
    }
}

fn transition(state: &mut SupervisorState, next: SupervisorState) {
    info!("State: {state} → {next}");
    *state = next;
}

fn print_banner() {
    let rule = "=".repeat(50);
    println!("\n{rule}");
    println!("🎭 Joke Teller");
    println!("{rule}");
    println!("Commands:");
    println!("  j [category] - Get a joke");
    println!("  s - Save history");
    println!("  h - Show history");
    println!("  c - Show config");
    println!("  q - Quit");
    println!("{rule}\n");
}

fn prompt() {
    use std::io::Write;
    print!("Enter command: ");
    let _ = std::io::stdout().flush();
}

/// Forward stdin lines over a channel from a plain OS thread, so a pending
/// read never holds the runtime open at exit.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tests::{FakeSpeech, RecordingPlayer};
    use crate::collaborators::JokeProvider;
    use crate::content::tests::ScriptedJokes;
    use crate::content::ERROR_CATEGORY;
    use crate::error::{AppError, Result};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, OnceLock};
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    /// Supplier that cancels the run on its `stop_after`-th call. With
    /// `paced_by` set, each call first waits until the player has caught up
    /// with the jokes already handed out.
    struct CancellingJokes {
        calls: AtomicUsize,
        stop_after: usize,
        fail: bool,
        token: OnceLock<CancellationToken>,
        paced_by: Option<Arc<RecordingPlayer>>,
    }

    impl CancellingJokes {
        fn new(stop_after: usize, fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                stop_after,
                fail,
                token: OnceLock::new(),
                paced_by: None,
            }
        }
    }

    #[async_trait]
    impl JokeProvider for CancellingJokes {
        fn name(&self) -> &str {
            "cancelling"
        }

        async fn probe(&self) -> bool {
            true
        }

        async fn fetch(&self, _category: Option<&str>) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(player) = &self.paced_by {
                for _ in 0..200 {
                    if player.count() + 1 >= n {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
            if n >= self.stop_after {
                if let Some(token) = self.token.get() {
                    token.cancel();
                }
            }
            if self.fail {
                return Err(AppError::collaborator("cancelling", "service down"));
            }
            Ok(format!("joke {n}"))
        }
    }

    fn write_settings(dir: &Path, audio_enabled: bool, item_count: usize) -> PathBuf {
        let path = dir.join("joke_config.json");
        let json = serde_json::json!({
            "item_count": item_count,
            "delay_seconds": 0,
            "audio_enabled": audio_enabled,
            "output_dir": dir.join("out"),
        });
        std::fs::write(&path, json.to_string()).unwrap();
        path
    }

    fn collaborators(jokes: Arc<dyn JokeProvider>, speech_available: bool, player: Arc<RecordingPlayer>) -> Collaborators {
        Collaborators {
            jokes,
            speech: Arc::new(FakeSpeech {
                available: speech_available,
                fail: false,
            }),
            player,
        }
    }

    async fn supervisor(dir: &TempDir, audio: bool, count: usize, player: Arc<RecordingPlayer>) -> Supervisor {
        Supervisor::start(
            write_settings(dir.path(), audio, count),
            Overrides::default(),
            collaborators(Arc::new(ScriptedJokes::working()), true, player),
        )
        .await
    }

    #[test]
    fn commands_parse() {
        assert_eq!(Command::parse("j"), Command::Joke(None));
        assert_eq!(Command::parse(" J chuck "), Command::Joke(Some("chuck".into())));
        assert_eq!(Command::parse("q"), Command::Quit);
        assert_eq!(Command::parse("s"), Command::SaveHistory);
        assert_eq!(Command::parse("h"), Command::ShowHistory);
        assert_eq!(Command::parse("c"), Command::ShowSettings);
        assert_eq!(Command::parse("quit now"), Command::Unknown);
        assert_eq!(Command::parse("j chuck extra"), Command::Unknown);
        assert_eq!(Command::parse("q now"), Command::Unknown);
        assert_eq!(Command::parse(""), Command::Unknown);
    }

    #[tokio::test]
    async fn start_reaches_ready_with_file_settings() {
        let dir = tempdir().expect("temp dir");
        let sup = supervisor(&dir, false, 4, Arc::new(RecordingPlayer::new())).await;

        assert_eq!(sup.state(), SupervisorState::Ready);
        assert_eq!(sup.settings().item_count, 4);
        assert!(!sup.settings().audio_enabled);
        assert!(sup.history().is_empty());
    }

    #[tokio::test]
    async fn oversized_delay_in_file_keeps_default_pause() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("joke_config.json");
        let json = serde_json::json!({
            "item_count": 1,
            "delay_seconds": 1e20,
            "audio_enabled": false,
            "output_dir": dir.path().join("out"),
        });
        std::fs::write(&path, json.to_string()).unwrap();

        let mut sup = Supervisor::start(
            path,
            Overrides::default(),
            collaborators(Arc::new(ScriptedJokes::working()), true, Arc::new(RecordingPlayer::new())),
        )
        .await;
        assert_eq!(sup.settings().delay(), Duration::from_secs(3));

        sup.run_with_input(RunMode::Batch, mpsc::unbounded_channel().1).await;
        assert_eq!(sup.history().len(), 1);
    }

    #[tokio::test]
    async fn batch_without_audio_appends_count_records() {
        let dir = tempdir().expect("temp dir");
        let player = Arc::new(RecordingPlayer::new());
        let mut sup = supervisor(&dir, false, 3, player.clone()).await;

        sup.run_with_input(RunMode::Batch, mpsc::unbounded_channel().1).await;

        assert_eq!(sup.history().len(), 3);
        assert_eq!(player.count(), 0);
        assert_eq!(sup.state(), SupervisorState::Stopped);
        assert_eq!(HistoryStore::load(&sup.settings().history_path()).len(), 3);
    }

    #[tokio::test]
    async fn batch_count_override_wins() {
        let dir = tempdir().expect("temp dir");
        let player = Arc::new(RecordingPlayer::new());
        let mut sup = Supervisor::start(
            write_settings(dir.path(), true, 5),
            Overrides {
                count: Some(2),
                ..Overrides::default()
            },
            collaborators(Arc::new(ScriptedJokes::working()), true, player.clone()),
        )
        .await;

        sup.run_with_input(RunMode::Batch, mpsc::unbounded_channel().1).await;

        assert_eq!(sup.history().len(), 2);
        assert_eq!(player.count(), 2);
    }

    #[tokio::test]
    async fn daemon_with_failing_supplier_records_errors_and_enqueues_nothing() {
        let dir = tempdir().expect("temp dir");
        let jokes = Arc::new(CancellingJokes::new(3, true));
        let player = Arc::new(RecordingPlayer::new());
        let mut sup = Supervisor::start(
            write_settings(dir.path(), true, 10),
            Overrides::default(),
            collaborators(jokes.clone(), false, player.clone()),
        )
        .await;
        jokes.token.set(sup.cancellation_token()).unwrap();

        sup.run_with_input(RunMode::Daemon, mpsc::unbounded_channel().1).await;

        assert_eq!(sup.history().len(), 3);
        assert!(sup
            .history()
            .records()
            .iter()
            .all(|r| r.category == ERROR_CATEGORY));
        assert_eq!(sup.audio().stats().enqueued(), 0);
        assert_eq!(player.count(), 0);
        assert!(!sup.audio().worker_running());
    }

    #[tokio::test]
    async fn daemon_hands_every_joke_to_the_worker() {
        let dir = tempdir().expect("temp dir");
        let player = Arc::new(RecordingPlayer::new());
        let jokes = Arc::new(CancellingJokes {
            paced_by: Some(player.clone()),
            ..CancellingJokes::new(3, false)
        });
        let mut sup = Supervisor::start(
            write_settings(dir.path(), true, 10),
            Overrides::default(),
            collaborators(jokes.clone(), true, player.clone()),
        )
        .await;
        jokes.token.set(sup.cancellation_token()).unwrap();

        sup.run_with_input(RunMode::Daemon, mpsc::unbounded_channel().1).await;

        let stats = sup.audio().stats();
        assert_eq!(sup.history().len(), 3);
        assert_eq!(stats.enqueued(), 3);
        assert!(player.count() >= 2, "worker played {}", player.count());
        // Every play went through the worker, none inline.
        assert_eq!(player.count(), stats.played());
        assert_eq!(stats.pending(), stats.enqueued() - stats.played());
        assert!(!sup.audio().worker_running());
        assert_eq!(sup.state(), SupervisorState::Stopped);
    }

    #[tokio::test]
    async fn cancelled_batch_stops_early_and_persists() {
        let dir = tempdir().expect("temp dir");
        let jokes = Arc::new(CancellingJokes::new(2, false));
        let mut sup = Supervisor::start(
            write_settings(dir.path(), false, 10),
            Overrides::default(),
            collaborators(jokes.clone(), true, Arc::new(RecordingPlayer::new())),
        )
        .await;
        jokes.token.set(sup.cancellation_token()).unwrap();

        sup.run_with_input(RunMode::Batch, mpsc::unbounded_channel().1).await;

        assert_eq!(sup.history().len(), 2);
        assert_eq!(sup.state(), SupervisorState::Stopped);
        assert_eq!(HistoryStore::load(&sup.settings().history_path()).len(), 2);
    }

    #[tokio::test]
    async fn cancelled_interactive_stops_early_and_persists() {
        let dir = tempdir().expect("temp dir");
        let jokes = Arc::new(CancellingJokes::new(2, false));
        let mut sup = Supervisor::start(
            write_settings(dir.path(), false, 10),
            Overrides::default(),
            collaborators(jokes.clone(), true, Arc::new(RecordingPlayer::new())),
        )
        .await;
        jokes.token.set(sup.cancellation_token()).unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        for _ in 0..5 {
            tx.send("j".to_string()).unwrap();
        }
        sup.run_with_input(RunMode::Interactive, rx).await;

        assert_eq!(sup.history().len(), 2);
        assert_eq!(sup.state(), SupervisorState::Stopped);
        assert_eq!(HistoryStore::load(&sup.settings().history_path()).len(), 2);
    }

    #[tokio::test]
    async fn interactive_commands_drive_history() {
        let dir = tempdir().expect("temp dir");
        let player = Arc::new(RecordingPlayer::new());
        let mut sup = supervisor(&dir, false, 10, player).await;

        let (tx, rx) = mpsc::unbounded_channel();
        for line in ["j", "j chuck", "nonsense", "h", "c", "s", "q", "j"] {
            tx.send(line.to_string()).unwrap();
        }
        sup.run_with_input(RunMode::Interactive, rx).await;

        assert_eq!(sup.history().len(), 2);
        assert_eq!(sup.history().records()[1].category, "chuck");
        assert_eq!(sup.state(), SupervisorState::Stopped);
    }

    #[tokio::test]
    async fn interactive_ends_when_input_closes() {
        let dir = tempdir().expect("temp dir");
        let mut sup = supervisor(&dir, false, 10, Arc::new(RecordingPlayer::new())).await;

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send("j".to_string()).unwrap();
        drop(tx);
        sup.run_with_input(RunMode::Interactive, rx).await;

        assert_eq!(sup.history().len(), 1);
        assert_eq!(sup.state(), SupervisorState::Stopped);
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let dir = tempdir().expect("temp dir");
        let mut sup = supervisor(&dir, true, 10, Arc::new(RecordingPlayer::new())).await;
        let history_path = sup.settings().history_path();
        assert!(sup.audio.start_worker());
        assert!(sup.audio().worker_running());

        assert!(sup.shutdown().await);
        assert!(history_path.exists());
        assert!(!sup.audio().worker_running());
        // The worker's receiver is gone once it has been stopped.
        assert!(!sup.audio.enqueue(PathBuf::from("late.mp3")));
        std::fs::remove_file(&history_path).unwrap();

        assert!(!sup.shutdown().await);
        assert!(!history_path.exists());
        assert_eq!(sup.state(), SupervisorState::Stopped);
    }

    #[tokio::test]
    async fn history_is_restored_on_start_and_ids_continue() {
        let dir = tempdir().expect("temp dir");
        let player = Arc::new(RecordingPlayer::new());

        let mut first = supervisor(&dir, false, 2, player.clone()).await;
        first.run_with_input(RunMode::Batch, mpsc::unbounded_channel().1).await;
        drop(first);

        let mut second = supervisor(&dir, false, 2, player).await;
        assert_eq!(second.history().len(), 2);
        second.run_with_input(RunMode::Batch, mpsc::unbounded_channel().1).await;

        let ids: Vec<u64> = second.history().records().iter().map(|r| r.sequence_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn no_audio_override_is_not_persisted() {
        let dir = tempdir().expect("temp dir");
        let settings_path = write_settings(dir.path(), true, 1);
        let mut sup = Supervisor::start(
            settings_path.clone(),
            Overrides {
                no_audio: true,
                save_on_exit: true,
                ..Overrides::default()
            },
            collaborators(Arc::new(ScriptedJokes::working()), true, Arc::new(RecordingPlayer::new())),
        )
        .await;
        assert!(!sup.settings().audio_enabled);

        sup.shutdown().await;
        assert!(Settings::load(&settings_path).audio_enabled);
    }

    #[tokio::test]
    async fn drop_without_shutdown_persists_history() {
        let dir = tempdir().expect("temp dir");
        let mut sup = supervisor(&dir, false, 10, Arc::new(RecordingPlayer::new())).await;
        let history_path = sup.settings().history_path();

        let record = sup.source.next(&mut sup.history, None).await;
        assert_eq!(record.sequence_id, 1);
        drop(sup);

        assert_eq!(HistoryStore::load(&history_path).len(), 1);
    }
}
