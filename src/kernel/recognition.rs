use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("recognition session already active")]
    AlreadyActive,
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),
    #[error("recognition engine failure: {0}")]
    Engine(String),
}

/// A continuous speech recognition engine. Results travel separately, as events.
pub trait RecognitionFeed: Send {
    fn start(&mut self) -> Result<(), RecognitionError>;
    fn stop(&mut self) -> Result<(), RecognitionError>;
}

/// Keeps one listening session alive.
///
/// Restarts after every session end while `auto_restart` is set. A feed that reports
/// the session is already active counts as listening. Without a feed (engine absent)
/// every call is a silent no-op.
pub struct RecognitionSupervisor {
    feed: Option<Box<dyn RecognitionFeed>>,
    auto_restart: bool,
    listening: bool,
    restarts: u64,
}

impl RecognitionSupervisor {
    pub fn new(feed: Box<dyn RecognitionFeed>) -> Self {
        Self {
            feed: Some(feed),
            auto_restart: true,
            listening: false,
            restarts: 0,
        }
    }

    /// No recognition capability on this host. Typed and vision turns still work.
    pub fn unavailable() -> Self {
        Self {
            feed: None,
            auto_restart: false,
            listening: false,
            restarts: 0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.feed.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn auto_restart(&self) -> bool {
        self.auto_restart
    }

    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    pub fn set_auto_restart(&mut self, on: bool) {
        self.auto_restart = on;
    }

    pub fn start(&mut self) -> Result<(), RecognitionError> {
        let Some(feed) = self.feed.as_mut() else {
            return Ok(());
        };
        if self.listening {
            return Ok(());
        }
        match feed.start() {
            Ok(()) => {
                info!("Listening started");
                self.listening = true;
                Ok(())
            }
            Err(RecognitionError::AlreadyActive) => {
                debug!("Listening already active");
                self.listening = true;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn stop(&mut self) -> Result<(), RecognitionError> {
        let Some(feed) = self.feed.as_mut() else {
            return Ok(());
        };
        if !self.listening {
            return Ok(());
        }
        self.listening = false;
        feed.stop()
    }

    /// The feed reported the end of its session. Returns whether listening resumed.
    pub fn on_session_end(&mut self) -> Result<bool, RecognitionError> {
        self.listening = false;
        if self.feed.is_none() || !self.auto_restart {
            debug!("Session ended, not restarting");
            return Ok(false);
        }
        self.start()?;
        self.restarts += 1;
        Ok(true)
    }
}
