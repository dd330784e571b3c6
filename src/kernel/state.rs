use super::event::{TurnId, TurnOrigin};
use super::status::{Status, StatusGraph, StatusRequest};
use super::time::ActivityClock;

/// The single turn currently between acceptance and completion or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlightTurn {
    pub id: TurnId,
    pub origin: TurnOrigin,
    pub accepted_at_ms: u64,
}

/// A status change produced by a reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Status,
    pub to: Status,
}

/// Strict state delta. This is the ONLY way turn state mutates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StateDelta {
    Accepted(InFlightTurn),
    Replied,
    Failed,
    Recovered,
    PlaybackEnded,
    QuietBegan,
    QuietEnded,
    InterimHeard,
    InterimCleared,
    Activity(u64),
}

#[derive(Debug, Clone)]
pub struct TurnState {
    status: Status,
    activity: ActivityClock,
    in_flight: Option<InFlightTurn>,
}

impl TurnState {
    pub fn new(now_ms: u64) -> Self {
        Self {
            status: Status::Idle,
            activity: ActivityClock::starting_at(now_ms),
            in_flight: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn activity(&self) -> &ActivityClock {
        &self.activity
    }

    pub fn in_flight(&self) -> Option<&InFlightTurn> {
        self.in_flight.as_ref()
    }

    /// Applies a delta. Returns the status transition it caused, if any.
    pub(crate) fn reduce(&mut self, delta: StateDelta) -> Option<Transition> {
        let request = match delta {
            StateDelta::Activity(ms) => {
                self.activity.touch(ms);
                return None;
            }
            StateDelta::Accepted(turn) => {
                if self.in_flight.is_some() {
                    return None;
                }
                let transition = self.request(StatusRequest::TurnAccepted)?;
                self.in_flight = Some(turn);
                return Some(transition);
            }
            StateDelta::Replied => StatusRequest::ReplyReceived,
            StateDelta::Failed => {
                let transition = self.request(StatusRequest::TurnFailed)?;
                self.in_flight = None;
                return Some(transition);
            }
            StateDelta::PlaybackEnded => {
                let transition = self.request(StatusRequest::PlaybackEnded)?;
                self.in_flight = None;
                return Some(transition);
            }
            StateDelta::Recovered => StatusRequest::Recovered,
            StateDelta::QuietBegan => StatusRequest::QuietBegan,
            StateDelta::QuietEnded => StatusRequest::QuietEnded,
            StateDelta::InterimHeard => StatusRequest::InterimHeard,
            StateDelta::InterimCleared => StatusRequest::InterimCleared,
        };

        self.request(request)
    }

    fn request(&mut self, request: StatusRequest) -> Option<Transition> {
        let to = StatusGraph::transition(self.status, request)?;
        let from = self.status;
        self.status = to;
        Some(Transition { from, to })
    }
}
