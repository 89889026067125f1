//! Lifecycle of one exam attempt: start or resume, answer capture, flags,
//! navigation, the local countdown, autosave and the final submission.
//!
//! The controller is owned by exactly one task. Network calls that must not
//! hold the student up (autosave, the save before moving to another question)
//! run as spawned tasks tracked in a `JoinSet`; start and submit are awaited.

mod errors;
mod state;


use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::JoinSet;
use validator::Validate;

use crate::core::metrics;
use crate::schemas::exam::{
    SaveAnswerRequest, StartExamResponse, SubmitExamRequest, SubmitExamResponse,
};
use crate::services::exam_api::{ExamService, ServiceError};

pub(crate) use errors::{SessionError, ValidationFailure};
pub(crate) use state::{
    AttemptState, Direction, NavigatorEntry, Phase, QuestionStatus, SessionSnapshot, SubmitMode,
    SubmitOutcome, Terminal,
};

use state::LoadedAttempt;

const LOAD_FAILURE_MESSAGE: &str = "Failed to start exam";
const SAVE_FAILURE_MESSAGE: &str = "Failed to save answer";
const SUBMIT_FAILURE_MESSAGE: &str = "Failed to submit exam";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TickOutcome {
    /// Nothing to count: the session is not active or the clock already ran out.
    Idle,
    Counting(u32),
    /// The clock reached zero and the attempt was submitted.
    Submitted(SubmitOutcome),
}

pub(crate) struct ExamSessionController {
    service: Arc<dyn ExamService>,
    exam_id: String,
    phase: Phase,
    loaded: Option<LoadedAttempt>,
    auto_submit_issued: bool,
    last_error: Option<String>,
    saves: JoinSet<()>,
    closed: bool,
}

impl ExamSessionController {
    pub(crate) fn new(service: Arc<dyn ExamService>, exam_id: impl Into<String>) -> Self {
        Self {
            service,
            exam_id: exam_id.into(),
            phase: Phase::Loading,
            loaded: None,
            auto_submit_issued: false,
            last_error: None,
            saves: JoinSet::new(),
            closed: false,
        }
    }

    pub(crate) fn exam_id(&self) -> &str {
        &self.exam_id
    }

    pub(crate) fn phase(&self) -> &Phase {
        &self.phase
    }

    pub(crate) fn attempt(&self) -> Option<&AttemptState> {
        self.loaded.as_ref().map(|loaded| &loaded.state)
    }

    /// Message of the last failed submission, cleared by the next attempt.
    pub(crate) fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn snapshot(&self) -> Option<SessionSnapshot> {
        self.loaded.as_ref().map(LoadedAttempt::snapshot)
    }

    pub(crate) fn navigator(&self) -> Vec<NavigatorEntry> {
        self.loaded.as_ref().map(LoadedAttempt::navigator).unwrap_or_default()
    }

    pub(crate) fn answered_count(&self) -> usize {
        self.attempt().map(|state| state.answers().len()).unwrap_or(0)
    }

    pub(crate) fn flagged_count(&self) -> usize {
        self.attempt().map(|state| state.flagged().len()).unwrap_or(0)
    }

    pub(crate) fn unanswered_count(&self) -> usize {
        let total = self.loaded.as_ref().map(LoadedAttempt::question_count).unwrap_or(0);
        total - self.answered_count()
    }

    pub(crate) async fn start_or_resume(&mut self) -> Result<(), SessionError> {
        if self.closed || self.phase != Phase::Loading {
            return Err(self.forbidden("start"));
        }

        let result = self.service.start_or_resume(&self.exam_id).await;
        match result {
            Ok(response) => self.load(response),
            Err(err) => {
                tracing::warn!(exam_id = %self.exam_id, error = %err, "Failed to start exam");
                Err(self.fail_load(err.detail_or(LOAD_FAILURE_MESSAGE)))
            }
        }
    }

    fn load(&mut self, response: StartExamResponse) -> Result<(), SessionError> {
        let StartExamResponse { message, exam, attempt } = response;

        if let Err(err) = exam.validate() {
            tracing::error!(exam_id = %self.exam_id, error = %err, "Exam payload failed validation");
            return Err(self.fail_load(LOAD_FAILURE_MESSAGE.to_string()));
        }

        let state = match AttemptState::rehydrate(&exam, attempt) {
            Ok(state) => state,
            Err(reason) => {
                tracing::error!(exam_id = %self.exam_id, reason, "Attempt payload unusable");
                return Err(self.fail_load(LOAD_FAILURE_MESSAGE.to_string()));
            }
        };

        tracing::info!(
            exam_id = %self.exam_id,
            attempt_id = %state.attempt_id,
            grade = ?exam.grade,
            questions = exam.questions.len(),
            answered = state.answers().len(),
            time_remaining = state.time_remaining(),
            server_message = message.as_deref().unwrap_or(""),
            "Exam session active"
        );

        self.loaded = Some(LoadedAttempt { exam, state });
        self.phase = Phase::Active;
        Ok(())
    }

    fn fail_load(&mut self, message: String) -> SessionError {
        self.phase = Phase::Terminal(Terminal::Error(message.clone()));
        SessionError::Load(message)
    }

    pub(crate) fn select_answer(
        &mut self,
        question_id: &str,
        option: &str,
    ) -> Result<(), SessionError> {
        let loaded = self.active_mut("select an answer")?;
        let question = loaded
            .exam
            .question(question_id)
            .ok_or_else(|| ValidationFailure::UnknownQuestion(question_id.to_string()))?;
        if !question.offers(option) {
            return Err(ValidationFailure::UnknownOption {
                question_id: question_id.to_string(),
                option: option.to_string(),
            }
            .into());
        }

        loaded.state.record_answer(question_id, option);
        Ok(())
    }

    /// Answers the displayed question with the option at `option_index`.
    pub(crate) fn select_current(&mut self, option_index: usize) -> Result<String, SessionError> {
        let loaded = self.active_mut("select an answer")?;
        let question = loaded.current_question();
        let option = question.options.get(option_index).cloned().ok_or_else(|| {
            ValidationFailure::UnknownOption {
                question_id: question.id.clone(),
                option: format!("#{}", option_index + 1),
            }
        })?;
        let question_id = question.id.clone();

        self.select_answer(&question_id, &option)?;
        Ok(option)
    }

    /// Returns whether the question is flagged afterwards.
    pub(crate) fn toggle_flag(&mut self, question_id: &str) -> Result<bool, SessionError> {
        let loaded = self.active_mut("flag a question")?;
        if loaded.exam.question(question_id).is_none() {
            return Err(ValidationFailure::UnknownQuestion(question_id.to_string()).into());
        }

        Ok(loaded.state.toggle_flag(question_id))
    }

    pub(crate) fn toggle_current_flag(&mut self) -> Result<bool, SessionError> {
        let question_id = self.active_mut("flag a question")?.current_question().id.clone();
        self.toggle_flag(&question_id)
    }

    /// Moves one question back or forward, saving the displayed answer first.
    /// Stays put at either end.
    pub(crate) fn navigate(&mut self, direction: Direction) -> Result<usize, SessionError> {
        self.active_mut("navigate")?;
        self.dispatch_save("navigate");

        let loaded = self.active_mut("navigate")?;
        let count = loaded.question_count();
        Ok(loaded.state.step(direction, count))
    }

    pub(crate) fn jump_to(&mut self, index: usize) -> Result<usize, SessionError> {
        let count = self.active_mut("navigate")?.question_count();
        if index >= count {
            return Err(ValidationFailure::IndexOutOfRange { index, count }.into());
        }
        self.dispatch_save("jump");

        self.active_mut("navigate")?.state.jump(index);
        Ok(index)
    }

    /// One second of the countdown. The decrement happens before the zero
    /// check; reaching zero submits with whatever answers are held now.
    pub(crate) async fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        let Ok(loaded) = self.active_mut("count down") else {
            return Ok(TickOutcome::Idle);
        };

        let remaining = loaded.state.decrement();
        if remaining > 0 {
            return Ok(TickOutcome::Counting(remaining));
        }
        if self.auto_submit_issued {
            return Ok(TickOutcome::Idle);
        }

        tracing::info!(exam_id = %self.exam_id, "Time is up; submitting automatically");
        let outcome = self.submit(SubmitMode::Auto).await?;
        Ok(TickOutcome::Submitted(outcome))
    }

    /// Persists the displayed question's answer, if any, without waiting for
    /// the result. Returns whether a save was sent.
    pub(crate) fn autosave(&mut self) -> bool {
        if self.active_mut("autosave").is_err() {
            return false;
        }
        self.dispatch_save("autosave")
    }

    fn dispatch_save(&mut self, trigger: &'static str) -> bool {
        let Some(request) = self.loaded.as_ref().and_then(LoadedAttempt::pending_save) else {
            return false;
        };

        while self.saves.try_join_next().is_some() {}

        let service = Arc::clone(&self.service);
        let exam_id = self.exam_id.clone();
        self.saves.spawn(deliver_save(service, exam_id, request, trigger));
        true
    }

    /// First half of a submission: checks and flips the phase, then returns
    /// the payload. Nothing is awaited before the flip, so a second caller
    /// always observes `Submitting`.
    pub(crate) fn begin_submit(
        &mut self,
        mode: SubmitMode,
    ) -> Result<SubmitExamRequest, SessionError> {
        if self.phase == Phase::Submitting {
            return Err(ValidationFailure::SubmitInProgress.into());
        }
        let request = self.active_mut("submit")?.submission();

        if mode == SubmitMode::Auto {
            self.auto_submit_issued = true;
        }
        self.phase = Phase::Submitting;
        self.last_error = None;
        Ok(request)
    }

    pub(crate) fn finish_submit(
        &mut self,
        mode: SubmitMode,
        result: Result<SubmitExamResponse, ServiceError>,
    ) -> Result<SubmitOutcome, SessionError> {
        if self.phase != Phase::Submitting {
            return Err(self.forbidden("finish a submission"));
        }

        match result {
            Ok(response) => {
                let outcome =
                    SubmitOutcome::from_response(response, mode, OffsetDateTime::now_utc());
                tracing::info!(
                    exam_id = %self.exam_id,
                    mode = mode.as_str(),
                    score = outcome.score,
                    total = outcome.total,
                    "Exam submitted"
                );
                metrics::record_submit(mode.as_str(), "success");
                self.phase = Phase::Terminal(Terminal::Success(outcome.clone()));
                Ok(outcome)
            }
            Err(err) => {
                let message = err.detail_or(SUBMIT_FAILURE_MESSAGE);
                tracing::warn!(
                    exam_id = %self.exam_id,
                    mode = mode.as_str(),
                    error = %err,
                    "Exam submission failed"
                );
                metrics::record_submit(mode.as_str(), "failed");
                self.phase = Phase::Active;
                self.last_error = Some(message.clone());
                Err(SessionError::Submit(message))
            }
        }
    }

    /// Manual submits must be confirmed by the student before calling this
    /// (see `unanswered_count`).
    pub(crate) async fn submit(&mut self, mode: SubmitMode) -> Result<SubmitOutcome, SessionError> {
        let request = self.begin_submit(mode)?;
        let result = self.service.submit(&self.exam_id, &request).await;
        self.finish_submit(mode, result)
    }

    /// Waits up to `timeout` for in-flight saves, then aborts the rest.
    pub(crate) async fn settle_saves(&mut self, timeout: Duration) {
        let drained = tokio::time::timeout(timeout, async {
            while self.saves.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                exam_id = %self.exam_id,
                pending = self.saves.len(),
                "Abandoning answer saves still in flight"
            );
            self.saves.abort_all();
        }
    }

    /// Closes the session. Any later call is rejected without side effects.
    pub(crate) fn teardown(&mut self) {
        self.closed = true;
        self.saves.abort_all();
    }

    fn active_mut(&mut self, operation: &'static str) -> Result<&mut LoadedAttempt, SessionError> {
        if self.closed {
            return Err(ValidationFailure::Closed.into());
        }
        if self.phase != Phase::Active {
            return Err(self.forbidden(operation));
        }
        self.loaded.as_mut().ok_or(SessionError::Validation(ValidationFailure::PhaseForbids {
            operation,
            phase: "loading",
        }))
    }

    fn forbidden(&self, operation: &'static str) -> SessionError {
        if self.closed {
            return ValidationFailure::Closed.into();
        }
        ValidationFailure::PhaseForbids { operation, phase: self.phase.name() }.into()
    }
}

impl Drop for ExamSessionController {
    fn drop(&mut self) {
        self.saves.abort_all();
    }
}

async fn deliver_save(
    service: Arc<dyn ExamService>,
    exam_id: String,
    request: SaveAnswerRequest,
    trigger: &'static str,
) {
    match service.save_answer(&exam_id, &request).await {
        Ok(()) => {
            metrics::record_autosave("saved");
            tracing::debug!(
                exam_id = %exam_id,
                question_id = %request.question_id,
                time_remaining = request.time_remaining,
                trigger,
                "Answer saved"
            );
        }
        Err(err) => {
            let failure = SessionError::Save(err.detail_or(SAVE_FAILURE_MESSAGE));
            metrics::record_autosave("failed");
            tracing::warn!(
                exam_id = %exam_id,
                question_id = %request.question_id,
                trigger,
                error = %err,
                "{failure}; retrying on the next cycle"
            );
        }
    }
}
