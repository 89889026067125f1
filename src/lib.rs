pub(crate) mod console;
pub(crate) mod core;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::{bail, Context};
use time::OffsetDateTime;

use crate::console::CliCommand;
use crate::core::{config::Settings, security, state::ClientState, telemetry};
use crate::schemas::user::UserRole;
use crate::services::exam_api::{ExamService, HttpExamService};
use crate::tasks::runner::SessionExit;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let command = console::parse_args(std::env::args().skip(1), std::env::var("EXAM_ID").ok())?;

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let claims = security::inspect_access_token(&settings.api().access_token)?;
    security::ensure_not_expired(&claims, OffsetDateTime::now_utc())?;

    let service = Arc::new(HttpExamService::from_settings(&settings)?);
    let user = service.current_user().await.context("Failed to resolve the logged-in user")?;
    tracing::info!(
        user_id = %user.id,
        name = %user.name,
        grade = ?user.grade,
        token_subject = %claims.sub,
        role = user.role.as_str(),
        environment = settings.runtime().environment.as_str(),
        base_url = settings.api().base_url(),
        "Exam client ready"
    );

    let state = ClientState::new(settings, service, user);

    match command {
        CliCommand::List => console::list_exams(&state).await,
        CliCommand::Take { exam_id } => {
            if state.user().role != UserRole::Student {
                bail!("Only students can take exams (logged in as {})", state.user().role.as_str());
            }
            match console::take_exam(&state, exam_id.clone()).await? {
                SessionExit::LoadFailed(_) => bail!("exam {exam_id} could not be opened"),
                SessionExit::Submitted(_) | SessionExit::Quit | SessionExit::Interrupted => Ok(()),
            }
        }
    }
}
