use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub(crate) struct Question {
    #[validate(length(min = 1, message = "question id must not be empty"))]
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) text: String,
    #[validate(length(min = 1, message = "question must offer at least one option"))]
    pub(crate) options: Vec<String>,
    #[serde(default)]
    pub(crate) skill: String,
}

impl Question {
    pub(crate) fn offers(&self, option: &str) -> bool {
        self.options.iter().any(|candidate| candidate == option)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub(crate) struct Exam {
    #[validate(length(min = 1, message = "exam id must not be empty"))]
    pub(crate) id: String,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) grade: Option<u32>,
    #[serde(default)]
    pub(crate) duration_minutes: Option<u32>,
    #[validate(length(min = 1, message = "exam must contain questions"), nested)]
    pub(crate) questions: Vec<Question>,
}

impl Exam {
    pub(crate) fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == question_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AttemptPayload {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) answers: BTreeMap<String, String>,
    #[serde(default)]
    pub(crate) flagged_questions: Vec<String>,
    #[serde(default)]
    pub(crate) time_remaining: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StartExamResponse {
    #[serde(default)]
    pub(crate) message: Option<String>,
    pub(crate) exam: Exam,
    pub(crate) attempt: AttemptPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SaveAnswerRequest {
    pub(crate) question_id: String,
    pub(crate) selected_option: String,
    pub(crate) time_remaining: u32,
    pub(crate) flagged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SubmitExamRequest {
    pub(crate) time_remaining: u32,
    pub(crate) answers: BTreeMap<String, String>,
    pub(crate) flagged_questions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct SkillScore {
    pub(crate) correct: u32,
    pub(crate) total: u32,
    pub(crate) percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct SubmitExamResponse {
    pub(crate) score: u32,
    pub(crate) total: u32,
    pub(crate) percentage: f64,
    #[serde(default)]
    pub(crate) skill_breakdown: BTreeMap<String, SkillScore>,
}

/// Entry of the exam catalogue. Question bodies are not needed here, only
/// their count.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ExamListing {
    pub(crate) id: String,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) grade: Option<u32>,
    #[serde(default)]
    pub(crate) duration_minutes: Option<u32>,
    #[serde(default)]
    pub(crate) questions: Vec<serde::de::IgnoredAny>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AttemptSummary {
    pub(crate) exam_id: String,
    #[serde(default)]
    pub(crate) status: AttemptStatus,
    #[serde(default)]
    pub(crate) score: Option<u32>,
    #[serde(default)]
    pub(crate) total_questions: Option<u32>,
    #[serde(default)]
    pub(crate) percentage: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum AttemptStatus {
    InProgress,
    Submitted,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StudentProgressResponse {
    #[serde(default)]
    pub(crate) attempts: Vec<AttemptSummary>,
}
