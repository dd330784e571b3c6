//! Async driver around the orchestrator.
//!
//! Owns the only event queue. Backend and playback work runs in spawned tasks that
//! report back through the same queue, so every decision is taken on one task.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::kernel::avatar::AvatarSink;
use crate::kernel::event::{Event, FailureStage, RecognitionEvent, TurnId};
use crate::kernel::log::LogEntry;
use crate::kernel::orchestrator::Orchestrator;
use crate::kernel::recognition::{RecognitionError, RecognitionSupervisor};
use crate::kernel::scheduler::SideEffect;
use crate::kernel::status::Status;
use crate::kernel::time::{Clock, POLL_MS};
use crate::services::backend::{BackendError, ConversationBackend};
use crate::services::playback::{AudioClip, AudioPlayer, PlaybackError};
use crate::services::vision::normalize_capture;

const QUEUE_DEPTH: usize = 100;

/// Grace period past a clip's own length before playback is abandoned.
pub const PLAYBACK_SLACK: Duration = Duration::from_secs(5);

/// The I/O edges the driver executes side effects against.
pub struct Collaborators {
    pub backend: Arc<dyn ConversationBackend>,
    pub player: Arc<dyn AudioPlayer>,
    pub avatar: Box<dyn AvatarSink>,
    pub recognition: RecognitionSupervisor,
}

/// User-facing notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Blocking problem the user must act on.
    Alert(String),
    Logged(LogEntry),
    Interim(Option<String>),
}

/// Producer side of the event queue.
#[derive(Clone)]
pub struct DriverHandle {
    tx: mpsc::Sender<Event>,
}

impl DriverHandle {
    pub async fn send(&self, event: Event) -> Result<(), mpsc::error::SendError<Event>> {
        self.tx.send(event).await
    }
}

pub struct Driver {
    orchestrator: Orchestrator,
    receiver: mpsc::Receiver<Event>,
    tx: mpsc::Sender<Event>,
    collaborators: Collaborators,
    clock: Box<dyn Clock>,
    status_tx: watch::Sender<Status>,
    notices: broadcast::Sender<Notice>,
    poll: Duration,
    playback_slack: Duration,
}

impl Driver {
    pub fn new(
        orchestrator: Orchestrator,
        collaborators: Collaborators,
        clock: Box<dyn Clock>,
    ) -> (Self, DriverHandle) {
        let (tx, receiver) = mpsc::channel(QUEUE_DEPTH);
        let (status_tx, _) = watch::channel(orchestrator.status());
        let (notices, _) = broadcast::channel(QUEUE_DEPTH);

        let driver = Self {
            orchestrator,
            receiver,
            tx: tx.clone(),
            collaborators,
            clock,
            status_tx,
            notices,
            poll: Duration::from_millis(POLL_MS),
            playback_slack: PLAYBACK_SLACK,
        };
        (driver, DriverHandle { tx })
    }

    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_playback_slack(mut self, slack: Duration) -> Self {
        self.playback_slack = slack;
        self
    }

    pub fn status(&self) -> watch::Receiver<Status> {
        self.status_tx.subscribe()
    }

    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Runs until shutdown. Hands the orchestrator back for inspection.
    pub async fn run(mut self, shutdown: CancellationToken) -> Orchestrator {
        info!("Driver started. Idle poll: {}ms", self.poll.as_millis());

        let mut cadence = interval(self.poll);
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        cadence.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = cadence.tick() => self.step(Event::IdleTick),
                event = self.receiver.recv() => match event {
                    Some(event) => self.step(event),
                    None => break,
                },
            }
        }

        if let Err(e) = self.collaborators.recognition.stop() {
            warn!("Failed to stop recognition: {}", e);
        }
        info!("Driver stopped");
        self.orchestrator
    }

    fn step(&mut self, event: Event) {
        let session_ended = matches!(event, Event::Recognition(RecognitionEvent::Ended));
        let at = self.clock.now();

        let effects = self.orchestrator.handle(event, at);
        for effect in effects {
            self.execute(effect);
        }

        if session_ended {
            match self.collaborators.recognition.on_session_end() {
                Ok(true) => info!("Listening resumed"),
                Ok(false) => {}
                Err(e) => warn!("Failed to resume listening: {}", e),
            }
        }
    }

    fn execute(&mut self, effect: SideEffect) {
        match effect {
            SideEffect::Status(status) => {
                info!("[STATUS] {}", status);
                self.status_tx.send_replace(status);
            }
            SideEffect::DispatchChat {
                turn,
                message,
                system_prompt,
            } => {
                let backend = self.collaborators.backend.clone();
                spawn_turn_work(self.tx.clone(), turn, FailureStage::Dispatch, async move {
                    dispatch_outcome(turn, backend.chat(&message, &system_prompt).await)
                });
            }
            SideEffect::DispatchVision { turn, image } => {
                let backend = self.collaborators.backend.clone();
                spawn_turn_work(self.tx.clone(), turn, FailureStage::Dispatch, async move {
                    let result = match normalize_capture(&image) {
                        Ok(jpeg) => backend.vision(jpeg).await,
                        Err(e) => Err(BackendError::from(e)),
                    };
                    dispatch_outcome(turn, result)
                });
            }
            SideEffect::Speak { turn, text } => {
                let backend = self.collaborators.backend.clone();
                let player = self.collaborators.player.clone();
                let slack = self.playback_slack;
                spawn_turn_work(self.tx.clone(), turn, FailureStage::Playback, async move {
                    match speak(backend.as_ref(), player.as_ref(), &text, slack).await {
                        Ok(()) => Event::PlaybackFinished { turn },
                        Err(reason) => Event::Failed {
                            turn,
                            stage: FailureStage::Playback,
                            reason,
                        },
                    }
                });
            }
            SideEffect::Avatar(command) => self.collaborators.avatar.apply(command),
            SideEffect::StartListening => match self.collaborators.recognition.start() {
                Ok(()) => {}
                Err(RecognitionError::PermissionDenied(reason)) => {
                    error!("Microphone unavailable: {}", reason);
                    self.notify(Notice::Alert(
                        "Check microphone/camera permissions.".to_string(),
                    ));
                }
                Err(e) => warn!("Failed to start listening: {}", e),
            },
            SideEffect::AutoRestart(on) => self.collaborators.recognition.set_auto_restart(on),
            SideEffect::Interim(text) => self.notify(Notice::Interim(text)),
            SideEffect::Logged(entry) => {
                debug!("[LOG] {}", entry);
                self.notify(Notice::Logged(entry));
            }
        }
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }
}

/// Runs turn work on its own task and always reports back. A panic in the work becomes
/// a failure of the given stage so the turn cannot stay in flight.
fn spawn_turn_work<F>(tx: mpsc::Sender<Event>, turn: TurnId, stage: FailureStage, work: F)
where
    F: Future<Output = Event> + Send + 'static,
{
    tokio::spawn(async move {
        let event = match tokio::spawn(work).await {
            Ok(event) => event,
            Err(e) => {
                error!("Turn {} {:?} task aborted: {}", turn, stage, e);
                Event::Failed {
                    turn,
                    stage,
                    reason: e.to_string(),
                }
            }
        };
        let _ = tx.send(event).await;
    });
}

fn dispatch_outcome(turn: TurnId, result: Result<String, BackendError>) -> Event {
    match result {
        Ok(text) => Event::Replied { turn, text },
        Err(e) => Event::Failed {
            turn,
            stage: FailureStage::Dispatch,
            reason: e.to_string(),
        },
    }
}

async fn speak(
    backend: &dyn ConversationBackend,
    player: &dyn AudioPlayer,
    text: &str,
    slack: Duration,
) -> Result<(), String> {
    let wav = backend.synthesize(text).await.map_err(|e| e.to_string())?;
    let clip = AudioClip::from_wav(wav).map_err(|e| e.to_string())?;
    let limit = Duration::from_millis(clip.duration_ms) + slack;
    match tokio::time::timeout(limit, player.play(clip)).await {
        Ok(played) => played.map_err(|e| e.to_string()),
        Err(_) => {
            warn!("Playback exceeded {}ms, abandoning", limit.as_millis());
            Err(PlaybackError::TimedOut(limit).to_string())
        }
    }
}
