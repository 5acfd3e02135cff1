//! `--install`: prepare directories and settings, report collaborator status.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::collaborators::player::OsFamily;
use crate::collaborators::Collaborators;
use crate::settings::Settings;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub settings_written: bool,
    pub jokes_available: bool,
    pub speech_available: bool,
    pub player_available: bool,
}

pub async fn provision(settings: &Settings, log_dir: &Path, collaborators: &Collaborators) -> ProvisionReport {
    let mut report = ProvisionReport::default();

    for dir in [settings.output_dir.as_path(), log_dir] {
        match fs::create_dir_all(dir) {
            Ok(()) => info!("Directory ready: {}", dir.display()),
            Err(e) => warn!("Failed to create {}: {e}", dir.display()),
        }
    }

    if settings.settings_path.exists() {
        info!("Settings file already present: {}", settings.settings_path.display());
    } else {
        report.settings_written = settings.save(&settings.settings_path);
    }

    report.jokes_available = collaborators.jokes.probe().await;
    if report.jokes_available {
        info!("{} reachable", collaborators.jokes.name());
    } else {
        warn!(
            "{} unreachable: check network access, fallback jokes will be used",
            collaborators.jokes.name()
        );
    }

    report.speech_available = collaborators.speech.probe().await;
    if report.speech_available {
        info!("{} reachable", collaborators.speech.name());
    } else {
        warn!(
            "{} unreachable: check network access, audio will be skipped",
            collaborators.speech.name()
        );
    }

    let family = collaborators.player.family();
    report.player_available = collaborators.player.probe().await;
    if report.player_available {
        info!("Audio player for {family} found");
    } else {
        warn!("{}", player_hint(family));
    }

    report
}

fn player_hint(family: OsFamily) -> String {
    match family {
        OsFamily::Linux => "mpg123 not found: install it with your package manager (e.g. apt install mpg123)".into(),
        OsFamily::MacOs => "afplay not found: it ships with macOS, check your PATH".into(),
        OsFamily::Windows => "No default audio handler found".into(),
        OsFamily::Other => format!("Audio playback is not supported on {family}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tests::{FakeSpeech, RecordingPlayer};
    use crate::content::tests::ScriptedJokes;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn collaborators(available: bool) -> Collaborators {
        Collaborators {
            jokes: Arc::new(ScriptedJokes {
                available,
                ..ScriptedJokes::working()
            }),
            speech: Arc::new(FakeSpeech { available, fail: false }),
            player: Arc::new(RecordingPlayer::new()),
        }
    }

    #[tokio::test]
    async fn creates_directories_and_settings_file() {
        let dir = tempdir().expect("temp dir");
        let settings = Settings {
            output_dir: dir.path().join("out"),
            settings_path: dir.path().join("joke_config.json"),
            ..Settings::default()
        };
        let log_dir = dir.path().join("logs");

        let report = provision(&settings, &log_dir, &collaborators(true)).await;

        assert!(report.settings_written);
        assert!(report.jokes_available && report.speech_available && report.player_available);
        assert!(settings.output_dir.is_dir());
        assert!(log_dir.is_dir());
        assert_eq!(Settings::load(&settings.settings_path), settings);
    }

    #[tokio::test]
    async fn existing_settings_are_left_alone() {
        let dir = tempdir().expect("temp dir");
        let settings_path = dir.path().join("joke_config.json");
        fs::write(&settings_path, r#"{"item_count": 2}"#).unwrap();
        let settings = Settings {
            output_dir: dir.path().join("out"),
            settings_path: settings_path.clone(),
            ..Settings::default()
        };

        let report = provision(&settings, &dir.path().join("logs"), &collaborators(false)).await;

        assert!(!report.settings_written);
        assert!(!report.jokes_available);
        assert!(!report.speech_available);
        assert_eq!(fs::read_to_string(&settings_path).unwrap(), r#"{"item_count": 2}"#);
    }

    #[test]
    fn hints_name_the_player() {
        assert!(player_hint(OsFamily::Linux).contains("mpg123"));
        assert!(player_hint(OsFamily::MacOs).contains("afplay"));
    }
}
