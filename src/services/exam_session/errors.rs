use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub(crate) enum SessionError {
    /// The attempt could not be started or resumed. Ends the session.
    #[error("{0}")]
    Load(String),
    /// An autosave or pre-navigation save failed. Never shown to the student.
    #[error("failed to save answer: {0}")]
    Save(String),
    /// Submission failed; the session is active again and may retry.
    #[error("{0}")]
    Submit(String),
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ValidationFailure {
    #[error("cannot {operation} while the session is {phase}")]
    PhaseForbids { operation: &'static str, phase: &'static str },
    #[error("question {0} is not part of this exam")]
    UnknownQuestion(String),
    #[error("option {option:?} is not offered by question {question_id}")]
    UnknownOption { question_id: String, option: String },
    #[error("question index {index} is outside 0..{count}")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("a submission is already in progress")]
    SubmitInProgress,
    #[error("the session has been closed")]
    Closed,
}
