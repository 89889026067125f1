use std::collections::{BTreeMap, BTreeSet};

use time::OffsetDateTime;

use crate::schemas::exam::{
    AttemptPayload, Exam, Question, SaveAnswerRequest, SkillScore, SubmitExamRequest,
    SubmitExamResponse,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Prev,
    Next,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SubmitMode {
    /// Student asked to submit and confirmed.
    Manual,
    /// The clock ran out.
    Auto,
}

impl SubmitMode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            SubmitMode::Manual => "manual",
            SubmitMode::Auto => "auto",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SubmitOutcome {
    pub(crate) score: u32,
    pub(crate) total: u32,
    pub(crate) percentage: f64,
    pub(crate) skill_breakdown: BTreeMap<String, SkillScore>,
    pub(crate) mode: SubmitMode,
    pub(crate) submitted_at: OffsetDateTime,
}

impl SubmitOutcome {
    pub(super) fn from_response(
        response: SubmitExamResponse,
        mode: SubmitMode,
        submitted_at: OffsetDateTime,
    ) -> Self {
        Self {
            score: response.score,
            total: response.total,
            percentage: response.percentage,
            skill_breakdown: response.skill_breakdown,
            mode,
            submitted_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Terminal {
    Success(SubmitOutcome),
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Phase {
    Loading,
    Active,
    Submitting,
    Terminal(Terminal),
}

impl Phase {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Phase::Loading => "loading",
            Phase::Active => "active",
            Phase::Submitting => "submitting",
            Phase::Terminal(Terminal::Success(_)) => "submitted",
            Phase::Terminal(Terminal::Error(_)) => "failed",
        }
    }

    pub(crate) fn is_terminal(&self) -> bool {
        matches!(self, Phase::Terminal(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QuestionStatus {
    Flagged,
    Answered,
    Unanswered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NavigatorEntry {
    pub(crate) number: usize,
    pub(crate) current: bool,
    pub(crate) status: QuestionStatus,
}

#[derive(Debug, Clone)]
pub(crate) struct SessionSnapshot {
    pub(crate) exam_title: String,
    pub(crate) position: usize,
    pub(crate) question_count: usize,
    pub(crate) question: Question,
    pub(crate) selected: Option<String>,
    pub(crate) flagged: bool,
    pub(crate) time_remaining: u32,
    pub(crate) answered: usize,
    pub(crate) flagged_total: usize,
}

impl SessionSnapshot {
    pub(crate) fn unanswered(&self) -> usize {
        self.question_count - self.answered
    }
}

/// Mutable progress of one attempt.
#[derive(Debug, Clone)]
pub(crate) struct AttemptState {
    pub(crate) attempt_id: String,
    answers: BTreeMap<String, String>,
    flagged: BTreeSet<String>,
    time_remaining: u32,
    current_index: usize,
}

impl AttemptState {
    /// Builds the state from a start-or-resume payload. Stored answers and
    /// flags that do not belong to the exam are dropped.
    pub(super) fn rehydrate(exam: &Exam, payload: AttemptPayload) -> Result<Self, &'static str> {
        let seconds = payload
            .time_remaining
            .or_else(|| exam.duration_minutes.map(|minutes| i64::from(minutes) * 60))
            .ok_or("Exam attempt has no remaining time")?;
        let time_remaining = u32::try_from(seconds.max(0)).unwrap_or(u32::MAX);

        let mut answers = BTreeMap::new();
        for (question_id, option) in payload.answers {
            match exam.question(&question_id) {
                Some(question) if question.offers(&option) => {
                    answers.insert(question_id, option);
                }
                Some(_) => tracing::warn!(
                    attempt_id = %payload.id,
                    question_id = %question_id,
                    "Dropping stored answer the question does not offer"
                ),
                None => tracing::warn!(
                    attempt_id = %payload.id,
                    question_id = %question_id,
                    "Dropping stored answer for unknown question"
                ),
            }
        }

        let mut flagged = BTreeSet::new();
        for question_id in payload.flagged_questions {
            if exam.question(&question_id).is_some() {
                flagged.insert(question_id);
            } else {
                tracing::warn!(
                    attempt_id = %payload.id,
                    question_id = %question_id,
                    "Dropping flag for unknown question"
                );
            }
        }

        Ok(Self { attempt_id: payload.id, answers, flagged, time_remaining, current_index: 0 })
    }

    pub(crate) fn answers(&self) -> &BTreeMap<String, String> {
        &self.answers
    }

    pub(crate) fn flagged(&self) -> &BTreeSet<String> {
        &self.flagged
    }

    pub(crate) fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub(crate) fn current_index(&self) -> usize {
        self.current_index
    }

    pub(super) fn record_answer(&mut self, question_id: &str, option: &str) {
        self.answers.insert(question_id.to_string(), option.to_string());
    }

    /// Returns whether the question is flagged afterwards.
    pub(super) fn toggle_flag(&mut self, question_id: &str) -> bool {
        if self.flagged.remove(question_id) {
            false
        } else {
            self.flagged.insert(question_id.to_string());
            true
        }
    }

    pub(super) fn step(&mut self, direction: Direction, question_count: usize) -> usize {
        match direction {
            Direction::Prev => self.current_index = self.current_index.saturating_sub(1),
            Direction::Next if self.current_index + 1 < question_count => self.current_index += 1,
            Direction::Next => {}
        }
        self.current_index
    }

    pub(super) fn jump(&mut self, index: usize) {
        self.current_index = index;
    }

    /// Saturates at zero.
    pub(super) fn decrement(&mut self) -> u32 {
        self.time_remaining = self.time_remaining.saturating_sub(1);
        self.time_remaining
    }
}

#[derive(Debug, Clone)]
pub(super) struct LoadedAttempt {
    pub(super) exam: Exam,
    pub(super) state: AttemptState,
}

impl LoadedAttempt {
    pub(super) fn question_count(&self) -> usize {
        self.exam.questions.len()
    }

    pub(super) fn current_question(&self) -> &Question {
        &self.exam.questions[self.state.current_index]
    }

    /// Save payload for the displayed question, if it has an answer.
    pub(super) fn pending_save(&self) -> Option<SaveAnswerRequest> {
        let question = self.current_question();
        let selected = self.state.answers.get(&question.id)?;

        Some(SaveAnswerRequest {
            question_id: question.id.clone(),
            selected_option: selected.clone(),
            time_remaining: self.state.time_remaining,
            flagged: self.state.flagged.contains(&question.id),
        })
    }

    pub(super) fn submission(&self) -> SubmitExamRequest {
        SubmitExamRequest {
            time_remaining: self.state.time_remaining,
            answers: self.state.answers.clone(),
            flagged_questions: self.state.flagged.iter().cloned().collect(),
        }
    }

    pub(super) fn snapshot(&self) -> SessionSnapshot {
        let question = self.current_question();

        SessionSnapshot {
            exam_title: self.exam.title.clone(),
            position: self.state.current_index,
            question_count: self.question_count(),
            question: question.clone(),
            selected: self.state.answers.get(&question.id).cloned(),
            flagged: self.state.flagged.contains(&question.id),
            time_remaining: self.state.time_remaining,
            answered: self.state.answers.len(),
            flagged_total: self.state.flagged.len(),
        }
    }

    pub(super) fn navigator(&self) -> Vec<NavigatorEntry> {
        self.exam
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let status = if self.state.flagged.contains(&question.id) {
                    QuestionStatus::Flagged
                } else if self.state.answers.contains_key(&question.id) {
                    QuestionStatus::Answered
                } else {
                    QuestionStatus::Unanswered
                };
                NavigatorEntry {
                    number: index + 1,
                    current: index == self.state.current_index,
                    status,
                }
            })
            .collect()
    }
}
