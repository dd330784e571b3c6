use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use companion::config::Configuration;
use companion::driver::{Collaborators, Driver, Notice};
use companion::kernel::avatar::{AvatarCommand, AvatarSink};
use companion::kernel::event::{Event, RecognitionEvent};
use companion::kernel::log::Role;
use companion::kernel::quiet::QuietHours;
use companion::kernel::recognition::{RecognitionError, RecognitionFeed, RecognitionSupervisor};
use companion::kernel::status::Status;
use companion::kernel::time::{Clock, Stamp};
use companion::services::backend::{BackendError, ConversationBackend};
use companion::services::playback::{AudioClip, AudioPlayer, PlaybackError};
use companion::Orchestrator;
use reqwest::StatusCode;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

struct NoonClock(Instant);

impl Clock for NoonClock {
    fn now(&self) -> Stamp {
        Stamp::new(self.0.elapsed().as_millis() as u64, 12)
    }
}

#[derive(Default)]
struct ScriptedBackend {
    fail_chat: bool,
    panic_chat: bool,
    messages: Mutex<Vec<String>>,
    chats: AtomicUsize,
}

fn wav() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..80 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

#[async_trait]
impl ConversationBackend for ScriptedBackend {
    async fn chat(&self, message: &str, _system_prompt: &str) -> Result<String, BackendError> {
        self.messages.lock().unwrap().push(message.to_string());
        self.chats.fetch_add(1, Ordering::SeqCst);
        if self.panic_chat {
            panic!("backend blew up");
        }
        if self.fail_chat {
            return Err(BackendError::Status(StatusCode::INTERNAL_SERVER_ERROR));
        }
        Ok("Hello yourself.".to_string())
    }

    async fn vision(&self, _image: Vec<u8>) -> Result<String, BackendError> {
        Ok("I see you.".to_string())
    }

    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, BackendError> {
        Ok(wav())
    }
}

#[derive(Default)]
struct CountingPlayer {
    played: AtomicUsize,
    hang: bool,
}

#[async_trait]
impl AudioPlayer for CountingPlayer {
    async fn play(&self, _clip: AudioClip) -> Result<(), PlaybackError> {
        self.played.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

struct NullAvatar;

impl AvatarSink for NullAvatar {
    fn apply(&mut self, _command: AvatarCommand) {}
}

struct CountingFeed {
    starts: Arc<AtomicUsize>,
    deny: bool,
}

impl RecognitionFeed for CountingFeed {
    fn start(&mut self) -> Result<(), RecognitionError> {
        if self.deny {
            return Err(RecognitionError::PermissionDenied("blocked".into()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecognitionError> {
        Ok(())
    }
}

fn config() -> Configuration {
    Configuration {
        trigger_phrases: "A,B".to_string(),
        quiet_hours: QuietHours::disabled(),
        auto_speak_enabled: false,
        auto_expression: false,
        ..Configuration::default()
    }
}

struct Harness {
    driver: Driver,
    handle: companion::driver::DriverHandle,
    player: Arc<CountingPlayer>,
    backend: Arc<ScriptedBackend>,
    starts: Arc<AtomicUsize>,
}

fn harness(backend: ScriptedBackend, deny_microphone: bool) -> Harness {
    harness_with_player(backend, CountingPlayer::default(), deny_microphone)
}

fn harness_with_player(backend: ScriptedBackend, player: CountingPlayer, deny_microphone: bool) -> Harness {
    let clock = NoonClock(Instant::now());
    let orchestrator = Orchestrator::new(config(), clock.now());
    let backend = Arc::new(backend);
    let player = Arc::new(player);
    let starts = Arc::new(AtomicUsize::new(0));

    let collaborators = Collaborators {
        backend: backend.clone(),
        player: player.clone(),
        avatar: Box::new(NullAvatar),
        recognition: RecognitionSupervisor::new(Box::new(CountingFeed {
            starts: starts.clone(),
            deny: deny_microphone,
        })),
    };
    let (driver, handle) = Driver::new(orchestrator, collaborators, Box::new(clock));
    let driver = driver.with_poll_interval(Duration::from_secs(3_600));

    Harness {
        driver,
        handle,
        player,
        backend,
        starts,
    }
}

async fn settle(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn current(status: &watch::Receiver<Status>) -> Status {
    *status.borrow()
}

#[tokio::test]
async fn test_triggered_turn_end_to_end() {
    let h = harness(ScriptedBackend::default(), false);
    let status = h.driver.status();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(h.driver.run(shutdown.clone()));

    h.handle.send(Event::heard("hello C there")).await.unwrap();
    h.handle.send(Event::heard("hello A there")).await.unwrap();

    let player = h.player.clone();
    settle(|| player.played.load(Ordering::SeqCst) == 1 && current(&status) == Status::Idle).await;

    shutdown.cancel();
    let orch = task.await.unwrap();

    assert_eq!(*h.backend.messages.lock().unwrap(), vec!["hello A there".to_string()]);
    assert_eq!(
        orch.telemetry.status_trail(),
        vec![Status::Idle, Status::Thinking, Status::Speaking, Status::Idle]
    );
    let roles: Vec<Role> = orch.log().entries().map(|e| e.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Ai]);
}

#[tokio::test]
async fn test_backend_failure_recovers() {
    let backend = ScriptedBackend {
        fail_chat: true,
        ..ScriptedBackend::default()
    };
    let h = harness(backend, false);
    let status = h.driver.status();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(h.driver.run(shutdown.clone()));

    h.handle.send(Event::UserText("hello".into())).await.unwrap();

    let backend = h.backend.clone();
    settle(|| backend.chats.load(Ordering::SeqCst) == 1 && current(&status) == Status::Idle).await;

    shutdown.cancel();
    let orch = task.await.unwrap();

    assert_eq!(
        orch.telemetry.status_trail(),
        vec![Status::Idle, Status::Thinking, Status::Error, Status::Idle]
    );
    assert_eq!(h.player.played.load(Ordering::SeqCst), 0);
    assert_eq!(orch.log().len(), 1);
}

#[tokio::test]
async fn test_listening_restarts_after_session_end() {
    let h = harness(ScriptedBackend::default(), false);
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(h.driver.run(shutdown.clone()));

    h.handle.send(Event::Start).await.unwrap();
    h.handle.send(Event::Recognition(RecognitionEvent::Ended)).await.unwrap();

    let starts = h.starts.clone();
    settle(|| starts.load(Ordering::SeqCst) == 2).await;

    shutdown.cancel();
    let orch = task.await.unwrap();
    assert_eq!(orch.log().last().map(|e| e.content.as_str()), Some("Started."));
}

#[tokio::test]
async fn test_permission_denial_raises_alert() {
    let h = harness(ScriptedBackend::default(), true);
    let mut notices = h.driver.notices();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(h.driver.run(shutdown.clone()));

    h.handle.send(Event::Start).await.unwrap();

    let alert = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(Notice::Alert(message)) = notices.recv().await {
                return message;
            }
        }
    })
    .await
    .unwrap();
    assert!(alert.contains("permission"));

    // Typed turns still work.
    h.handle.send(Event::UserText("hello".into())).await.unwrap();
    let player = h.player.clone();
    settle(|| player.played.load(Ordering::SeqCst) == 1).await;

    shutdown.cancel();
    task.await.unwrap();
    assert_eq!(h.starts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_panicking_backend_fails_the_turn() {
    let backend = ScriptedBackend {
        panic_chat: true,
        ..ScriptedBackend::default()
    };
    let h = harness(backend, false);
    let status = h.driver.status();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(h.driver.run(shutdown.clone()));

    // 1. First turn dies inside the backend task
    h.handle.send(Event::UserText("hello".into())).await.unwrap();
    let backend = h.backend.clone();
    settle(|| backend.chats.load(Ordering::SeqCst) == 1 && current(&status) == Status::Idle).await;

    // 2. The turn was released, so the next one is admitted
    h.handle.send(Event::UserText("hello again".into())).await.unwrap();
    settle(|| backend.chats.load(Ordering::SeqCst) == 2 && current(&status) == Status::Idle).await;

    shutdown.cancel();
    let orch = task.await.unwrap();

    let snapshot = orch.telemetry.snapshot();
    assert_eq!(snapshot.turn_stats.dispatch_failures, 2);
    assert_eq!(snapshot.drop_stats.busy, 0);
    assert!(orch.telemetry.status_trail().contains(&Status::Error));
    assert_eq!(h.player.played.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_hanging_player_is_abandoned() {
    let player = CountingPlayer {
        hang: true,
        ..CountingPlayer::default()
    };
    let h = harness_with_player(ScriptedBackend::default(), player, false);
    let driver = h.driver.with_playback_slack(Duration::from_millis(50));
    let status = driver.status();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(driver.run(shutdown.clone()));

    h.handle.send(Event::UserText("hello".into())).await.unwrap();

    // 1. Playback starts and never returns on its own
    let player = h.player.clone();
    settle(|| player.played.load(Ordering::SeqCst) == 1 && current(&status) == Status::Idle).await;

    shutdown.cancel();
    let orch = task.await.unwrap();

    // 2. The turn ended as a playback failure
    assert_eq!(
        orch.telemetry.status_trail(),
        vec![Status::Idle, Status::Thinking, Status::Speaking, Status::Error, Status::Idle]
    );
    assert_eq!(orch.telemetry.snapshot().turn_stats.playback_failures, 1);
    assert!(orch.in_flight().is_none());
}
