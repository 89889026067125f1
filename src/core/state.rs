use std::sync::Arc;

use crate::core::config::Settings;
use crate::schemas::user::CurrentUser;
use crate::services::exam_api::ExamService;

/// What every console command needs: settings, the service handle and the
/// identity the service resolved for the access token.
#[derive(Clone)]
pub(crate) struct ClientState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    service: Arc<dyn ExamService>,
    user: CurrentUser,
}

impl ClientState {
    pub(crate) fn new(settings: Settings, service: Arc<dyn ExamService>, user: CurrentUser) -> Self {
        Self { inner: Arc::new(InnerState { settings, service, user }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn service(&self) -> Arc<dyn ExamService> {
        Arc::clone(&self.inner.service)
    }

    pub(crate) fn user(&self) -> &CurrentUser {
        &self.inner.user
    }
}
