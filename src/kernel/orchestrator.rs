use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::avatar::{AvatarCommand, Expression};
use super::event::{
    DropReason, Event, FailureStage, RecognitionEvent, SettingsUpdate, TurnId, TurnOrigin,
    TurnRequest, IDLE_PROMPT_PLACEHOLDER,
};
use super::idle::{AutoSpeakCheck, Dormancy, ExpressionCheck, QuietCheck};
use super::log::{ConversationLog, LogEntry, Role};
use super::scheduler::{Scheduler, SideEffect};
use super::state::{InFlightTurn, StateDelta, TurnState};
use super::status::Status;
use super::telemetry::event::TelemetryEvent;
use super::telemetry::recorder::TelemetryRecorder;
use super::time::{ActivityClock, Stamp};
use super::trigger::TriggerMatcher;
use crate::config::Configuration;

/// The single authority over turn state.
///
/// Every producer delivers into `handle`. It never awaits: it advances state and returns
/// the side effects the driver must execute, in order.
pub struct Orchestrator {
    config: Configuration,
    triggers: TriggerMatcher,
    state: TurnState,
    log: ConversationLog,
    scheduler: Scheduler,
    pub telemetry: TelemetryRecorder,
    expression: Expression,
    rng: StdRng,
}

impl Orchestrator {
    pub fn new(config: Configuration, now: Stamp) -> Self {
        Self::with_rng(config, now, StdRng::from_entropy())
    }

    pub fn with_rng(config: Configuration, now: Stamp, rng: StdRng) -> Self {
        let triggers = TriggerMatcher::parse(&config.trigger_phrases);
        Self {
            config,
            triggers,
            state: TurnState::new(now.ms),
            log: ConversationLog::new(),
            scheduler: Scheduler,
            telemetry: TelemetryRecorder::new(),
            expression: Expression::Neutral,
            rng,
        }
    }

    pub fn status(&self) -> Status {
        self.state.status()
    }

    pub fn in_flight(&self) -> Option<&InFlightTurn> {
        self.state.in_flight()
    }

    pub fn activity(&self) -> &ActivityClock {
        self.state.activity()
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn expression(&self) -> Expression {
        self.expression
    }

    pub fn handle(&mut self, event: Event, at: Stamp) -> Vec<SideEffect> {
        let mut effects = Vec::new();

        match event {
            Event::Start => self.start(at, &mut effects),
            Event::Recognition(recognition) => self.on_recognition(recognition, at, &mut effects),
            Event::UserText(text) => {
                self.submit(TurnRequest::typed(text), at, &mut effects);
            }
            Event::ImageCaptured(image) => {
                self.submit(TurnRequest::vision(image), at, &mut effects);
            }
            Event::IdleTick => self.on_idle_tick(at, &mut effects),
            Event::Replied { turn, text } => self.on_reply(turn, text, at, &mut effects),
            Event::Failed { turn, stage, reason } => {
                self.on_failure(turn, stage, &reason, at, &mut effects)
            }
            Event::PlaybackFinished { turn } => self.on_playback_finished(turn, at, &mut effects),
            Event::Settings(update) => self.apply_settings(update, at, &mut effects),
        }

        effects
    }

    fn start(&mut self, at: Stamp, effects: &mut Vec<SideEffect>) {
        info!("Session starting");
        self.append_log(LogEntry::new(Role::System, "Started."), effects);
        self.touch(at);

        effects.push(SideEffect::Avatar(AvatarCommand::Position(self.config.position)));
        effects.push(SideEffect::Avatar(AvatarCommand::Expression(self.expression)));
        effects.push(SideEffect::AutoRestart(!self.config.waiting_mode));
        if !self.config.waiting_mode {
            effects.push(SideEffect::StartListening);
        }
    }

    // === Acceptance ===

    fn admission(&self, request: &TurnRequest, at: Stamp) -> Option<DropReason> {
        let status = self.state.status();
        if request.is_empty() {
            Some(DropReason::Empty)
        } else if status.is_busy() || self.state.in_flight().is_some() {
            Some(DropReason::Busy)
        } else if self.config.waiting_mode {
            Some(DropReason::Paused)
        } else if self.config.is_quiet(at.hour) {
            Some(DropReason::QuietHours)
        } else if !status.accepts_turns() {
            Some(DropReason::NotIdle)
        } else {
            None
        }
    }

    /// Accept or drop. Dropped requests leave no trace but telemetry.
    fn submit(&mut self, request: TurnRequest, at: Stamp, effects: &mut Vec<SideEffect>) -> bool {
        let origin = request.origin;

        if let Some(reason) = self.admission(&request, at) {
            debug!("Dropped {:?} request: {:?}", origin, reason);
            self.telemetry.record(TelemetryEvent::TurnDropped { origin, reason });
            return false;
        }

        let turn = Uuid::new_v4();
        self.apply(
            StateDelta::Accepted(InFlightTurn {
                id: turn,
                origin,
                accepted_at_ms: at.ms,
            }),
            at,
            effects,
        );
        self.telemetry.record(TelemetryEvent::TurnAccepted { origin });

        let entry = if request.suppress_from_log {
            let placeholder = match origin {
                TurnOrigin::IdlePrompt => IDLE_PROMPT_PLACEHOLDER,
                _ => request.text.as_str(),
            };
            LogEntry::new(Role::Auto, placeholder)
        } else {
            LogEntry::new(Role::User, request.text.trim())
        };
        self.append_log(entry, effects);

        self.touch(at);

        if self.config.auto_expression {
            self.set_expression(Expression::Happy, effects);
        }

        info!("Turn {} accepted ({:?})", turn, origin);
        effects.push(self.scheduler.schedule(request, turn, &self.config.system_prompt));
        true
    }

    // === Turn lifecycle ===

    /// The in-flight turn, if `turn` is it.
    fn current(&mut self, turn: TurnId) -> Option<InFlightTurn> {
        match self.state.in_flight() {
            Some(current) if current.id == turn => Some(*current),
            _ => {
                debug!("Discarded stale result for turn {}", turn);
                self.telemetry.record(TelemetryEvent::StaleResultDiscarded);
                None
            }
        }
    }

    fn on_reply(&mut self, turn: TurnId, text: String, at: Stamp, effects: &mut Vec<SideEffect>) {
        let Some(current) = self.current(turn) else {
            return;
        };
        if self.state.status() != Status::Thinking {
            self.telemetry.record(TelemetryEvent::StaleResultDiscarded);
            return;
        }

        let role = match current.origin {
            TurnOrigin::VisionCapture => Role::AiVision,
            _ => Role::Ai,
        };
        self.append_log(LogEntry::new(role, text.trim()), effects);

        self.apply(StateDelta::Replied, at, effects);
        effects.push(SideEffect::Avatar(AvatarCommand::Speaking(true)));
        effects.push(SideEffect::Speak { turn, text });
    }

    fn on_failure(
        &mut self,
        turn: TurnId,
        stage: FailureStage,
        reason: &str,
        at: Stamp,
        effects: &mut Vec<SideEffect>,
    ) {
        let Some(current) = self.current(turn) else {
            return;
        };
        warn!("Turn {} failed during {:?}: {}", turn, stage, reason);

        let was_speaking = self.state.status() == Status::Speaking;
        self.apply(StateDelta::Failed, at, effects);
        self.apply(StateDelta::Recovered, at, effects);
        self.touch(at);
        self.telemetry.record(TelemetryEvent::TurnFailed {
            origin: current.origin,
            stage,
        });

        if was_speaking {
            effects.push(SideEffect::Avatar(AvatarCommand::Speaking(false)));
        }
        if self.config.auto_expression {
            self.set_expression(Expression::Neutral, effects);
        }
    }

    fn on_playback_finished(&mut self, turn: TurnId, at: Stamp, effects: &mut Vec<SideEffect>) {
        let Some(current) = self.current(turn) else {
            return;
        };
        if self.state.status() != Status::Speaking {
            self.telemetry.record(TelemetryEvent::StaleResultDiscarded);
            return;
        }

        self.apply(StateDelta::PlaybackEnded, at, effects);
        effects.push(SideEffect::Avatar(AvatarCommand::Speaking(false)));
        self.touch(at);
        self.telemetry.record(TelemetryEvent::TurnCompleted {
            origin: current.origin,
            duration_ms: at.ms.saturating_sub(current.accepted_at_ms),
        });

        if self.config.auto_expression {
            self.set_expression(Expression::Neutral, effects);
        }
        info!("Turn {} completed", turn);
    }

    // === Recognition ===

    fn on_recognition(&mut self, event: RecognitionEvent, at: Stamp, effects: &mut Vec<SideEffect>) {
        match event {
            RecognitionEvent::Interim(text) => {
                if self.state.status().is_busy() {
                    trace!("Interim discarded while busy");
                    return;
                }
                effects.push(SideEffect::Interim(Some(text)));
                self.apply(StateDelta::InterimHeard, at, effects);
            }
            RecognitionEvent::Final(text) => {
                if self.state.status().is_busy() {
                    debug!("Final segment ignored while {}", self.state.status());
                    return;
                }
                self.clear_interim(at, effects);

                let text = text.trim();
                if text.is_empty() {
                    return;
                }
                debug!("Heard: \"{}\"", text);

                // Any speech counts as activity, addressed or not.
                self.touch(at);

                if self.triggers.matches(text) {
                    debug!("Trigger matched");
                    self.submit(TurnRequest::voice(text), at, effects);
                } else {
                    debug!("No trigger phrase");
                }
            }
            RecognitionEvent::Ended => {
                if self.state.status() == Status::Recognizing {
                    self.clear_interim(at, effects);
                }
            }
        }
    }

    fn clear_interim(&mut self, at: Stamp, effects: &mut Vec<SideEffect>) {
        effects.push(SideEffect::Interim(None));
        self.apply(StateDelta::InterimCleared, at, effects);
    }

    // === Idle timer ===

    fn on_idle_tick(&mut self, at: Stamp, effects: &mut Vec<SideEffect>) {
        if self.evaluate_gate(at, effects) == Dormancy::Asleep {
            return;
        }

        if self.config.auto_expression && self.state.status().accepts_turns() {
            let expression = ExpressionCheck::pick(&mut self.rng);
            self.set_expression(expression, effects);
        }

        if AutoSpeakCheck::due(&self.config, self.state.status(), self.state.activity(), at.ms) {
            let quiet_ms = self.state.activity().quiet_for(at.ms);
            info!("Idle for {}s, prompting", quiet_ms / 1000);
            // A stale interim that never finalized must not hold the character silent.
            if self.state.status() == Status::Recognizing {
                self.clear_interim(at, effects);
            }
            // Reset before dispatch so the next tick cannot fire again.
            self.touch(at);
            self.telemetry.record(TelemetryEvent::IdlePromptFired { quiet_ms });
            self.submit(TurnRequest::idle_prompt(), at, effects);
        }
    }

    /// Quiet-hours check. Sleeps or wakes; never preempts a turn in flight.
    fn evaluate_gate(&mut self, at: Stamp, effects: &mut Vec<SideEffect>) -> Dormancy {
        let dormancy = QuietCheck::evaluate(&self.config, at.hour);
        match dormancy {
            Dormancy::Asleep => {
                if self.state.status().accepts_turns() {
                    effects.push(SideEffect::Interim(None));
                    if self.apply(StateDelta::QuietBegan, at, effects) {
                        info!("Quiet hours, going to sleep");
                        self.set_expression(Expression::Relaxed, effects);
                    }
                }
            }
            Dormancy::Awake => {
                if self.apply(StateDelta::QuietEnded, at, effects) {
                    info!("Quiet hours over, waking up");
                    self.set_expression(Expression::Neutral, effects);
                }
            }
        }
        dormancy
    }

    // === Settings ===

    fn apply_settings(&mut self, update: SettingsUpdate, at: Stamp, effects: &mut Vec<SideEffect>) {
        match update {
            SettingsUpdate::TriggerPhrases(raw) => {
                self.triggers = TriggerMatcher::parse(&raw);
                info!("Trigger phrases: {:?}", self.triggers.phrases());
                self.config.trigger_phrases = raw;
            }
            SettingsUpdate::SystemPrompt(prompt) => {
                self.config.system_prompt = prompt;
            }
            SettingsUpdate::QuietHours { start, end } => {
                if start > 23 || end > 23 {
                    warn!("Rejected quiet hours {}..{}", start, end);
                    return;
                }
                self.config.quiet_hours.start = start;
                self.config.quiet_hours.end = end;
                self.evaluate_gate(at, effects);
            }
            SettingsUpdate::AutoSpeak {
                enabled,
                interval_minutes,
            } => {
                if interval_minutes < 1 {
                    warn!("Rejected auto-speak interval {}", interval_minutes);
                    return;
                }
                self.config.auto_speak_enabled = enabled;
                self.config.auto_speak_interval_minutes = interval_minutes;
            }
            SettingsUpdate::WaitingMode(on) => self.set_waiting_mode(on, effects),
            SettingsUpdate::ToggleWaitingMode => {
                let on = !self.config.waiting_mode;
                self.set_waiting_mode(on, effects);
            }
            SettingsUpdate::AutoExpression(on) => {
                self.config.auto_expression = on;
            }
            SettingsUpdate::Expression(expression) => {
                if self.config.auto_expression {
                    debug!("Manual expression ignored while auto expression is on");
                    return;
                }
                self.set_expression(expression, effects);
            }
            SettingsUpdate::Position(position) => {
                self.config.position = position;
                effects.push(SideEffect::Avatar(AvatarCommand::Position(position)));
            }
            SettingsUpdate::BackgroundChanged => {
                self.touch(at);
            }
        }
    }

    /// Does not abort the turn in flight.
    fn set_waiting_mode(&mut self, on: bool, effects: &mut Vec<SideEffect>) {
        if self.config.waiting_mode == on {
            return;
        }
        self.config.waiting_mode = on;
        info!("Waiting mode {}", if on { "on" } else { "off" });

        effects.push(SideEffect::AutoRestart(!on));
        if !on {
            effects.push(SideEffect::StartListening);
        }
    }

    // === Plumbing ===

    /// Reduces and reports. Returns whether the status changed.
    fn apply(&mut self, delta: StateDelta, at: Stamp, effects: &mut Vec<SideEffect>) -> bool {
        match self.state.reduce(delta) {
            Some(transition) => {
                self.telemetry.record(TelemetryEvent::StatusTransition {
                    from: transition.from,
                    to: transition.to,
                    at_ms: at.ms,
                });
                effects.push(SideEffect::Status(transition.to));
                true
            }
            None => false,
        }
    }

    fn touch(&mut self, at: Stamp) {
        self.state.reduce(StateDelta::Activity(at.ms));
    }

    fn append_log(&mut self, entry: LogEntry, effects: &mut Vec<SideEffect>) {
        self.log.push(entry.clone());
        effects.push(SideEffect::Logged(entry));
    }

    fn set_expression(&mut self, expression: Expression, effects: &mut Vec<SideEffect>) {
        if self.expression == expression {
            return;
        }
        self.expression = expression;
        effects.push(SideEffect::Avatar(AvatarCommand::Expression(expression)));
    }
}
