//! Command-line audio playback, chosen per OS family.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::AudioPlayer;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    MacOs,
    Linux,
    Other,
}

impl OsFamily {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => Self::Windows,
            "macos" => Self::MacOs,
            "linux" => Self::Linux,
            _ => Self::Other,
        }
    }

    /// Program used to play a file, if the family is supported.
    pub fn player_program(self) -> Option<&'static str> {
        match self {
            Self::Windows => Some("cmd"),
            Self::MacOs => Some("afplay"),
            Self::Linux => Some("mpg123"),
            Self::Other => None,
        }
    }
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Windows => write!(f, "Windows"),
            Self::MacOs => write!(f, "macOS"),
            Self::Linux => write!(f, "Linux"),
            Self::Other => write!(f, "{}", std::env::consts::OS),
        }
    }
}

pub struct SystemPlayer {
    family: OsFamily,
}

impl SystemPlayer {
    pub fn new(family: OsFamily) -> Self {
        Self { family }
    }

    fn command(&self, path: &Path) -> Option<Command> {
        let mut cmd = match self.family {
            // Hands the file to the default handler and returns immediately.
            OsFamily::Windows => {
                let mut cmd = Command::new("cmd");
                cmd.args(["/C", "start", ""]);
                cmd
            }
            OsFamily::MacOs => Command::new("afplay"),
            OsFamily::Linux => {
                let mut cmd = Command::new("mpg123");
                cmd.arg("-q");
                cmd
            }
            OsFamily::Other => return None,
        };
        cmd.arg(path);
        Some(cmd)
    }
}

#[async_trait]
impl AudioPlayer for SystemPlayer {
    fn family(&self) -> OsFamily {
        self.family
    }

    /// `start` hands the file off and exits before the handler opens it.
    fn waits_for_completion(&self) -> bool {
        self.family != OsFamily::Windows
    }

    async fn probe(&self) -> bool {
        match self.family {
            OsFamily::Windows => true,
            OsFamily::Other => false,
            family => family.player_program().is_some_and(on_path),
        }
    }

    async fn play(&self, path: &Path) -> Result<()> {
        let Some(mut cmd) = self.command(path) else {
            return Err(AppError::playback(
                path,
                format!("unsupported platform: {}", self.family),
            ));
        };

        debug!("Playing {} via {:?}", path.display(), self.family.player_program());
        let status = cmd
            .status()
            .await
            .map_err(|e| AppError::playback(path, e))?;

        if !status.success() {
            return Err(AppError::playback(path, format!("player exited with {status}")));
        }
        Ok(())
    }
}

/// Whether `program` resolves to an executable on `PATH`.
fn on_path(program: &str) -> bool {
    which::which(program).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_family_builds_a_command() {
        let path = Path::new("joke.mp3");
        for family in [OsFamily::Windows, OsFamily::MacOs, OsFamily::Linux] {
            assert!(SystemPlayer::new(family).command(path).is_some(), "{family:?}");
        }
        assert!(SystemPlayer::new(OsFamily::Other).command(path).is_none());
    }

    #[test]
    fn only_windows_returns_before_playback_ends() {
        assert!(!SystemPlayer::new(OsFamily::Windows).waits_for_completion());
        for family in [OsFamily::MacOs, OsFamily::Linux, OsFamily::Other] {
            assert!(SystemPlayer::new(family).waits_for_completion(), "{family:?}");
        }
    }

    #[tokio::test]
    async fn other_family_refuses_without_spawning() {
        let player = SystemPlayer::new(OsFamily::Other);
        assert!(!player.probe().await);
        assert!(matches!(
            player.play(Path::new("joke.mp3")).await,
            Err(AppError::PlaybackFailed { .. })
        ));
    }

    #[test]
    fn missing_program_is_not_on_path() {
        assert!(!on_path("definitely-not-a-real-player-binary"));
    }
}
