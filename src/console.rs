//! Terminal front end: argument parsing, line commands and rendering.
//! Logs go to stderr, so everything printed here owns stdout.

mod args;
mod input;
mod render;

use std::io::BufRead;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::core::shutdown::shutdown_signal;
use crate::core::state::ClientState;
use crate::services::exam_session::ExamSessionController;
use crate::tasks::runner::{Command, SessionEvent, SessionExit, SessionRunner};

pub(crate) use args::{parse_args, CliCommand};
use input::{parse_line, Input, HELP};

const COMMAND_BUFFER: usize = 16;

pub(crate) async fn list_exams(state: &ClientState) -> Result<()> {
    let service = state.service();
    let exams = service.list_exams().await.context("Failed to load exams")?;
    let attempts =
        service.student_attempts(&state.user().id).await.context("Failed to load progress")?;

    println!("{}", render::listing(&exams, &attempts));
    Ok(())
}

/// Runs one attempt in the terminal until it ends.
pub(crate) async fn take_exam(state: &ClientState, exam_id: String) -> Result<SessionExit> {
    tracing::info!(exam_id = %exam_id, student_id = %state.user().id, "Opening exam session");

    let controller = ExamSessionController::new(state.service(), exam_id);
    let (event_tx, mut events) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let runner = SessionRunner::new(controller, state.settings(), event_tx);
    let session = tokio::spawn(runner.run(command_rx, shutdown_signal()));

    let mut lines = spawn_stdin_reader();
    let mut commands = Some(command_tx);
    let mut awaiting_confirmation = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => show(&event, &mut awaiting_confirmation),
                None => break,
            },
            line = lines.recv(), if commands.is_some() => match line {
                Some(line) => match parse_line(&line, awaiting_confirmation) {
                    Input::Command(command) => {
                        if matches!(command, Command::Confirm(_)) {
                            awaiting_confirmation = false;
                        }
                        if let Some(sender) = &commands {
                            if sender.send(command).await.is_err() {
                                commands = None;
                            }
                        }
                    }
                    Input::Help => println!("{HELP}"),
                    Input::Empty => {}
                    Input::Unknown(text) => println!("Unknown command {text:?}; type h for help"),
                },
                None => commands = None,
            },
        }
    }

    let exit = session.await.context("Exam session task failed")?;
    if exit == SessionExit::Quit {
        println!("Left the exam. Your answers are saved; run take again to resume.");
    }
    Ok(exit)
}

fn show(event: &SessionEvent, awaiting_confirmation: &mut bool) {
    match event {
        SessionEvent::Question { snapshot, navigator } => {
            *awaiting_confirmation = false;
            println!("\n{}", render::question(snapshot, navigator));
        }
        SessionEvent::Clock { time_remaining, low_time } => {
            let cadence = if *low_time { 30 } else { 300 };
            if time_remaining % cadence == 0 || *time_remaining <= 10 {
                println!("{}", render::clock(*time_remaining, *low_time));
            }
        }
        SessionEvent::ConfirmationRequired { unanswered } => {
            *awaiting_confirmation = true;
            println!("{}", render::confirmation_prompt(*unanswered));
        }
        SessionEvent::Rejected(message) => println!("{message}"),
        SessionEvent::SubmitFailed(message) => {
            *awaiting_confirmation = false;
            println!("Submission failed: {message}. Type s to try again.");
        }
        SessionEvent::LoadFailed(message) => println!("Could not open the exam: {message}"),
        SessionEvent::Submitted(outcome) => println!("\n{}", render::outcome(outcome)),
    }
}

/// Reads stdin on a dedicated thread; a blocking read must not hold the
/// runtime open once the session is over.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}
