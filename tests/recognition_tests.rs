use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use companion::kernel::recognition::{RecognitionError, RecognitionFeed, RecognitionSupervisor};

#[derive(Clone, Copy)]
enum Behaviour {
    Ok,
    AlreadyActive,
    Denied,
}

struct ScriptedFeed {
    behaviour: Behaviour,
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl ScriptedFeed {
    fn new(behaviour: Behaviour) -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));
        let feed = ScriptedFeed {
            behaviour,
            starts: starts.clone(),
            stops: stops.clone(),
        };
        (feed, starts, stops)
    }
}

impl RecognitionFeed for ScriptedFeed {
    fn start(&mut self) -> Result<(), RecognitionError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Ok => Ok(()),
            Behaviour::AlreadyActive => Err(RecognitionError::AlreadyActive),
            Behaviour::Denied => Err(RecognitionError::PermissionDenied("no microphone".into())),
        }
    }

    fn stop(&mut self) -> Result<(), RecognitionError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_never_started_twice() {
    let (feed, starts, _) = ScriptedFeed::new(Behaviour::Ok);
    let mut supervisor = RecognitionSupervisor::new(Box::new(feed));

    supervisor.start().unwrap();
    supervisor.start().unwrap();

    assert!(supervisor.is_listening());
    assert_eq!(starts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_restarts_after_session_end() {
    let (feed, starts, _) = ScriptedFeed::new(Behaviour::Ok);
    let mut supervisor = RecognitionSupervisor::new(Box::new(feed));
    supervisor.start().unwrap();

    assert!(supervisor.on_session_end().unwrap());
    assert!(supervisor.is_listening());
    assert_eq!(supervisor.restarts(), 1);
    assert_eq!(starts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_no_restart_while_waiting() {
    let (feed, starts, _) = ScriptedFeed::new(Behaviour::Ok);
    let mut supervisor = RecognitionSupervisor::new(Box::new(feed));
    supervisor.start().unwrap();
    supervisor.set_auto_restart(false);

    assert!(!supervisor.on_session_end().unwrap());
    assert!(!supervisor.is_listening());
    assert_eq!(starts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_already_active_is_swallowed() {
    let (feed, _, _) = ScriptedFeed::new(Behaviour::AlreadyActive);
    let mut supervisor = RecognitionSupervisor::new(Box::new(feed));

    assert!(supervisor.start().is_ok());
    assert!(supervisor.is_listening());
    assert!(supervisor.on_session_end().unwrap());
}

#[test]
fn test_permission_denial_is_reported() {
    let (feed, _, _) = ScriptedFeed::new(Behaviour::Denied);
    let mut supervisor = RecognitionSupervisor::new(Box::new(feed));

    assert!(matches!(supervisor.start(), Err(RecognitionError::PermissionDenied(_))));
    assert!(!supervisor.is_listening());
}

#[test]
fn test_stop_only_when_listening() {
    let (feed, _, stops) = ScriptedFeed::new(Behaviour::Ok);
    let mut supervisor = RecognitionSupervisor::new(Box::new(feed));

    supervisor.stop().unwrap();
    assert_eq!(stops.load(Ordering::SeqCst), 0);

    supervisor.start().unwrap();
    supervisor.stop().unwrap();
    assert_eq!(stops.load(Ordering::SeqCst), 1);
    assert!(!supervisor.is_listening());
}

#[test]
fn test_unavailable_engine_is_inert() {
    let mut supervisor = RecognitionSupervisor::unavailable();

    assert!(!supervisor.is_available());
    assert!(supervisor.start().is_ok());
    assert!(!supervisor.is_listening());
    assert!(!supervisor.on_session_end().unwrap());
}
