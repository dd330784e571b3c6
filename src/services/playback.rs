use std::io::Cursor;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("audio payload is empty")]
    Empty,
    #[error("undecodable audio: {0}")]
    Decode(#[from] hound::Error),
    #[error("no player command configured")]
    NoPlayer,
    #[error("player I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("player exited with {0}")]
    Player(ExitStatus),
    #[error("playback did not finish within {0:?}")]
    TimedOut(Duration),
}

/// A validated WAV payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_ms: u64,
}

impl AudioClip {
    pub fn from_wav(bytes: Vec<u8>) -> Result<Self, PlaybackError> {
        if bytes.is_empty() {
            return Err(PlaybackError::Empty);
        }
        let (spec, frames) = {
            let reader = hound::WavReader::new(Cursor::new(bytes.as_slice()))?;
            (reader.spec(), u64::from(reader.duration()))
        };
        let duration_ms = if spec.sample_rate > 0 {
            frames * 1000 / u64::from(spec.sample_rate)
        } else {
            0
        };

        Ok(Self {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            duration_ms,
            bytes,
        })
    }
}

/// Audio output. `play` resolves when playback has finished.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, clip: AudioClip) -> Result<(), PlaybackError>;
}

/// Pipes the WAV payload into an external player process.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(command: &[String]) -> Result<Self, PlaybackError> {
        let (program, args) = command.split_first().ok_or(PlaybackError::NoPlayer)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl AudioPlayer for CommandPlayer {
    async fn play(&self, clip: AudioClip) -> Result<(), PlaybackError> {
        debug!(
            "Playing {}ms clip ({}Hz, {}ch) via '{}'",
            clip.duration_ms, clip.sample_rate, clip.channels, self.program
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&clip.bytes).await?;
            stdin.shutdown().await?;
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(PlaybackError::Player(status));
        }
        Ok(())
    }
}
