//! Terminal session: stdin stands in for the microphone and the control panel.
//!
//! ```text
//! some words        final recognized speech
//! ~some words       interim recognized speech
//! /end              recognition session ended
//! /type <text>      typed message
//! /look <path>      image capture from a file
//! /wait             toggle waiting mode
//! /face <name>      set the avatar expression
//! /bg               background changed
//! /quit             shut down
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::driver::DriverHandle;
use crate::kernel::avatar::Expression;
use crate::kernel::event::{Event, RecognitionEvent, SettingsUpdate};
use crate::kernel::recognition::{RecognitionError, RecognitionFeed};
use crate::services::vision::read_capture;

/// Recognition feed whose "microphone" is the console. Speech typed while the feed is
/// not listening is discarded.
#[derive(Debug, Clone, Default)]
pub struct ConsoleFeed {
    listening: Arc<AtomicBool>,
}

impl ConsoleFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listening(&self) -> Arc<AtomicBool> {
        self.listening.clone()
    }
}

impl RecognitionFeed for ConsoleFeed {
    fn start(&mut self) -> Result<(), RecognitionError> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return Err(RecognitionError::AlreadyActive);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecognitionError> {
        self.listening.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Heard(RecognitionEvent),
    Type(String),
    Look(PathBuf),
    ToggleWait,
    Face(Expression),
    Background,
    Quit,
    Nothing,
    Unknown(String),
}

pub fn parse_line(line: &str) -> ConsoleCommand {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleCommand::Nothing;
    }

    if let Some(rest) = line.strip_prefix('/') {
        let (command, arg) = match rest.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (rest, ""),
        };
        return match command {
            "end" => ConsoleCommand::Heard(RecognitionEvent::Ended),
            "type" if !arg.is_empty() => ConsoleCommand::Type(arg.to_string()),
            "look" if !arg.is_empty() => ConsoleCommand::Look(PathBuf::from(arg)),
            "wait" => ConsoleCommand::ToggleWait,
            "face" => match arg.parse::<Expression>() {
                Ok(expression) => ConsoleCommand::Face(expression),
                Err(e) => ConsoleCommand::Unknown(e.to_string()),
            },
            "bg" => ConsoleCommand::Background,
            "quit" | "exit" => ConsoleCommand::Quit,
            _ => ConsoleCommand::Unknown(line.to_string()),
        };
    }

    match line.strip_prefix('~') {
        Some(partial) => ConsoleCommand::Heard(RecognitionEvent::Interim(partial.trim().to_string())),
        None => ConsoleCommand::Heard(RecognitionEvent::Final(line.to_string())),
    }
}

/// Reads stdin until EOF, `/quit` or shutdown, forwarding commands to the driver.
pub async fn pump_stdin(handle: DriverHandle, listening: Arc<AtomicBool>, shutdown: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("Console ready. Speak by typing; /type, /look <path>, /wait, /face <name>, /bg, /end, /quit.");

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("stdin read failed: {}", e);
                break;
            }
        };

        let event = match parse_line(&line) {
            ConsoleCommand::Nothing => continue,
            ConsoleCommand::Unknown(raw) => {
                warn!("Unknown command: {}", raw);
                continue;
            }
            ConsoleCommand::Quit => break,
            ConsoleCommand::Heard(RecognitionEvent::Ended) => {
                listening.store(false, Ordering::SeqCst);
                Event::Recognition(RecognitionEvent::Ended)
            }
            ConsoleCommand::Heard(heard) => {
                if !listening.load(Ordering::SeqCst) {
                    info!("(not listening)");
                    continue;
                }
                Event::Recognition(heard)
            }
            ConsoleCommand::Type(text) => Event::UserText(text),
            ConsoleCommand::Look(path) => match read_capture(&path) {
                Ok(bytes) => Event::ImageCaptured(bytes),
                Err(e) => {
                    warn!("Capture from {} failed: {}", path.display(), e);
                    continue;
                }
            },
            ConsoleCommand::ToggleWait => Event::Settings(SettingsUpdate::ToggleWaitingMode),
            ConsoleCommand::Face(expression) => Event::Settings(SettingsUpdate::Expression(expression)),
            ConsoleCommand::Background => Event::Settings(SettingsUpdate::BackgroundChanged),
        };

        if handle.send(event).await.is_err() {
            break;
        }
    }

    shutdown.cancel();
}
