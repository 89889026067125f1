use std::collections::HashMap;
use std::fmt::Write;

use crate::console::input::option_label;
use crate::core::time::{format_clock, format_duration_minutes, format_offset};
use crate::schemas::exam::{AttemptStatus, AttemptSummary, ExamListing};
use crate::services::exam_session::{
    NavigatorEntry, QuestionStatus, SessionSnapshot, SubmitMode, SubmitOutcome,
};

pub(crate) fn question(snapshot: &SessionSnapshot, navigator: &[NavigatorEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", snapshot.exam_title);
    let _ = writeln!(
        out,
        "Question {} of {}    Time remaining {}",
        snapshot.position + 1,
        snapshot.question_count,
        format_clock(snapshot.time_remaining)
    );
    let _ = writeln!(
        out,
        "{}{}",
        snapshot.question.skill,
        if snapshot.flagged { "    [flagged for review]" } else { "" }
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", snapshot.question.text);

    for (index, option) in snapshot.question.options.iter().enumerate() {
        let marker = if snapshot.selected.as_deref() == Some(option.as_str()) { '*' } else { ' ' };
        let _ = writeln!(out, " {marker} {}. {option}", option_label(index));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", navigator_line(navigator));
    let _ = write!(
        out,
        "Answered {}    Flagged {}    Remaining {}",
        snapshot.answered,
        snapshot.flagged_total,
        snapshot.unanswered()
    );
    out
}

/// One cell per question: `*` answered, `!` flagged, brackets mark the
/// displayed question.
pub(crate) fn navigator_line(navigator: &[NavigatorEntry]) -> String {
    navigator
        .iter()
        .map(|entry| {
            let mark = match entry.status {
                QuestionStatus::Flagged => "!",
                QuestionStatus::Answered => "*",
                QuestionStatus::Unanswered => "",
            };
            if entry.current {
                format!("[{}{mark}]", entry.number)
            } else {
                format!("{}{mark}", entry.number)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn clock(time_remaining: u32, low_time: bool) -> String {
    if low_time {
        format!("Time remaining {} - less than five minutes left!", format_clock(time_remaining))
    } else {
        format!("Time remaining {}", format_clock(time_remaining))
    }
}

pub(crate) fn confirmation_prompt(unanswered: usize) -> String {
    if unanswered > 0 {
        format!(
            "You have {unanswered} unanswered questions. Are you sure you want to submit? [y/n]"
        )
    } else {
        "Are you sure you want to submit your exam? [y/n]".to_string()
    }
}

pub(crate) fn outcome(outcome: &SubmitOutcome) -> String {
    let mut out = String::new();
    if outcome.mode == SubmitMode::Auto {
        let _ = writeln!(out, "Time is up. Your exam was submitted automatically.");
    } else {
        let _ = writeln!(out, "Exam submitted.");
    }
    let _ = writeln!(
        out,
        "Score: {}/{} ({:.1}%)",
        outcome.score, outcome.total, outcome.percentage
    );

    if !outcome.skill_breakdown.is_empty() {
        let _ = writeln!(out, "Skills:");
        for (skill, score) in &outcome.skill_breakdown {
            let _ = writeln!(
                out,
                "  {skill}: {}/{} ({:.1}%)",
                score.correct, score.total, score.percentage
            );
        }
    }
    let _ = write!(out, "Submitted at {}", format_offset(outcome.submitted_at));
    out
}

/// Exam catalogue with the student's progress on each exam.
pub(crate) fn listing(exams: &[ExamListing], attempts: &[AttemptSummary]) -> String {
    if exams.is_empty() {
        return "No exams available at the moment.".to_string();
    }

    let by_exam: HashMap<&str, &AttemptSummary> =
        attempts.iter().map(|attempt| (attempt.exam_id.as_str(), attempt)).collect();
    let completed =
        attempts.iter().filter(|attempt| attempt.status == AttemptStatus::Submitted).count();

    let mut out = String::new();
    let _ = writeln!(out, "Available exams: {}    Completed: {completed}", exams.len());
    for exam in exams {
        let grade = exam.grade.map(|grade| format!("Grade {grade}")).unwrap_or_default();
        let duration = exam.duration_minutes.map(format_duration_minutes).unwrap_or_default();
        let status = match by_exam.get(exam.id.as_str()) {
            Some(attempt) => attempt_status(attempt),
            None => "available".to_string(),
        };
        let _ = writeln!(
            out,
            "{}  {}  [{grade}, {duration}, {} questions]  {status}",
            exam.id,
            exam.title,
            exam.questions.len()
        );
    }
    out.trim_end().to_string()
}

fn attempt_status(attempt: &AttemptSummary) -> String {
    match attempt.status {
        AttemptStatus::Submitted => {
            let score = attempt.score.unwrap_or(0);
            let total = attempt.total_questions.unwrap_or(0);
            let percentage = attempt.percentage.unwrap_or(0.0);
            format!("completed {score}/{total} ({percentage:.1}%)")
        }
        AttemptStatus::InProgress => "in progress (resume)".to_string(),
        AttemptStatus::Unknown => "available".to_string(),
    }
}
