//! Single owner of an `ExamSessionController`. Timer intents and console
//! commands are applied one at a time, and every change is reported to the
//! console as a `SessionEvent`.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::time::Duration;

use crate::core::config::Settings;
use crate::core::metrics;
use crate::services::exam_session::{
    Direction, ExamSessionController, NavigatorEntry, SessionError, SessionSnapshot, SubmitMode,
    SubmitOutcome, TickOutcome, ValidationFailure,
};
use crate::tasks::scheduler::{self, Intent};

const TICK_PERIOD: Duration = Duration::from_secs(1);
const INTENT_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    /// Zero-based option of the displayed question.
    Select(usize),
    Flag,
    Next,
    Prev,
    /// Zero-based question index.
    Jump(usize),
    Submit,
    Confirm(bool),
    Status,
    Quit,
}

#[derive(Debug, Clone)]
pub(crate) enum SessionEvent {
    Question { snapshot: SessionSnapshot, navigator: Vec<NavigatorEntry> },
    Clock { time_remaining: u32, low_time: bool },
    ConfirmationRequired { unanswered: usize },
    Rejected(String),
    SubmitFailed(String),
    LoadFailed(String),
    Submitted(SubmitOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SessionExit {
    Submitted(SubmitOutcome),
    LoadFailed(String),
    Quit,
    Interrupted,
}

impl SessionExit {
    fn reason(&self) -> &'static str {
        match self {
            SessionExit::Submitted(outcome) => outcome.mode.as_str(),
            SessionExit::LoadFailed(_) => "load_failed",
            SessionExit::Quit => "quit",
            SessionExit::Interrupted => "interrupted",
        }
    }
}

pub(crate) struct SessionRunner {
    controller: ExamSessionController,
    events: mpsc::UnboundedSender<SessionEvent>,
    autosave_period: Duration,
    settle_timeout: Duration,
    low_time_threshold: u32,
    awaiting_confirmation: bool,
}

impl SessionRunner {
    pub(crate) fn new(
        controller: ExamSessionController,
        settings: &Settings,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            controller,
            events,
            autosave_period: settings.session().auto_save_interval(),
            settle_timeout: settings.session().save_settle_timeout(),
            low_time_threshold: settings.session().low_time_warning_seconds,
            awaiting_confirmation: false,
        }
    }

    /// Runs the attempt until it is submitted, the student quits, the
    /// command stream closes or `shutdown` resolves.
    pub(crate) async fn run<F>(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        shutdown: F,
    ) -> SessionExit
    where
        F: Future<Output = ()>,
    {
        if let Err(err) = self.controller.start_or_resume().await {
            let message = err.to_string();
            self.emit(SessionEvent::LoadFailed(message.clone()));
            return self.finish(SessionExit::LoadFailed(message)).await;
        }
        self.emit_question();

        let (intent_tx, mut intents) = mpsc::channel(INTENT_BUFFER);
        let timers = scheduler::spawn(intent_tx, TICK_PERIOD, self.autosave_period);
        tokio::pin!(shutdown);

        let exit = loop {
            let step = tokio::select! {
                _ = &mut shutdown => Some(SessionExit::Interrupted),
                Some(intent) = intents.recv() => self.apply_intent(intent).await,
                command = commands.recv() => match command {
                    Some(command) => self.apply_command(command).await,
                    None => Some(SessionExit::Quit),
                },
            };
            if let Some(exit) = step {
                break exit;
            }
        };

        timers.stop().await;
        self.finish(exit).await
    }

    async fn apply_intent(&mut self, intent: Intent) -> Option<SessionExit> {
        match intent {
            Intent::Decrement => match self.controller.tick().await {
                Ok(TickOutcome::Counting(time_remaining)) => {
                    let low_time = time_remaining <= self.low_time_threshold;
                    self.emit(SessionEvent::Clock { time_remaining, low_time });
                    None
                }
                Ok(TickOutcome::Submitted(outcome)) => self.submitted(outcome),
                Ok(TickOutcome::Idle) => None,
                Err(SessionError::Submit(message)) => {
                    self.emit(SessionEvent::SubmitFailed(message));
                    None
                }
                Err(err) => {
                    tracing::debug!(error = %err, "Countdown tick ignored");
                    None
                }
            },
            Intent::Flush => {
                self.controller.autosave();
                None
            }
        }
    }

    async fn apply_command(&mut self, command: Command) -> Option<SessionExit> {
        let confirming = std::mem::take(&mut self.awaiting_confirmation);

        let result = match command {
            Command::Select(option) => self.controller.select_current(option).map(drop),
            Command::Flag => self.controller.toggle_current_flag().map(drop),
            Command::Next => self.controller.navigate(Direction::Next).map(drop),
            Command::Prev => self.controller.navigate(Direction::Prev).map(drop),
            Command::Jump(index) => self.controller.jump_to(index).map(drop),
            Command::Status => Ok(()),
            Command::Quit => return Some(SessionExit::Quit),
            Command::Submit => {
                self.awaiting_confirmation = true;
                let unanswered = self.controller.unanswered_count();
                self.emit(SessionEvent::ConfirmationRequired { unanswered });
                return None;
            }
            Command::Confirm(true) if confirming => {
                return self.submit_confirmed().await;
            }
            Command::Confirm(_) => Ok(()),
        };

        match result {
            Ok(()) => self.emit_question(),
            Err(err) => self.emit(SessionEvent::Rejected(err.to_string())),
        }
        None
    }

    async fn submit_confirmed(&mut self) -> Option<SessionExit> {
        match self.controller.submit(SubmitMode::Manual).await {
            Ok(outcome) => self.submitted(outcome),
            Err(SessionError::Submit(message)) => {
                self.emit(SessionEvent::SubmitFailed(message));
                None
            }
            Err(SessionError::Validation(ValidationFailure::SubmitInProgress)) => None,
            Err(err) => {
                self.emit(SessionEvent::Rejected(err.to_string()));
                None
            }
        }
    }

    fn submitted(&mut self, outcome: SubmitOutcome) -> Option<SessionExit> {
        self.emit(SessionEvent::Submitted(outcome.clone()));
        Some(SessionExit::Submitted(outcome))
    }

    async fn finish(mut self, exit: SessionExit) -> SessionExit {
        if !matches!(exit, SessionExit::Submitted(_)) {
            self.controller.autosave();
        }
        self.controller.settle_saves(self.settle_timeout).await;
        self.controller.teardown();

        metrics::record_session_exit(exit.reason());
        tracing::info!(
            exam_id = %self.controller.exam_id(),
            exit = exit.reason(),
            phase = self.controller.phase().name(),
            "Exam session closed"
        );
        exit
    }

    fn emit_question(&self) {
        if let Some(snapshot) = self.controller.snapshot() {
            let navigator = self.controller.navigator();
            self.emit(SessionEvent::Question { snapshot, navigator });
        }
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Console detached; dropping session event");
        }
    }
}
