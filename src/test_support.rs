use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex as StdMutex, OnceLock};

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::schemas::exam::{
    AttemptSummary, ExamListing, SaveAnswerRequest, StartExamResponse, SubmitExamRequest,
    SubmitExamResponse,
};
use crate::schemas::user::CurrentUser;
use crate::services::exam_api::{ExamService, ServiceError};

pub(crate) const EXAM_ID: &str = "exam-1";

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

/// Three-question exam as the Exam Service returns it, answer keys included.
pub(crate) fn start_payload(time_remaining: Option<i64>) -> Value {
    json!({
        "message": "Exam started",
        "exam": {
            "id": EXAM_ID,
            "title": "Grade 4 - February 2026 Scholarship Exam",
            "description": "Monthly scholarship examination for Grade 4 students",
            "grade": 4,
            "paper": 1,
            "duration_minutes": 60,
            "questions": [
                {
                    "id": "q1",
                    "text": "What is 2 + 2?",
                    "options": ["3", "4", "5", "22"],
                    "correct_answer": "4",
                    "skill": "Mathematical Reasoning"
                },
                {
                    "id": "q2",
                    "text": "What colour is a clear daytime sky?",
                    "options": ["Blue", "Green", "Red", "Black"],
                    "correct_answer": "Blue",
                    "skill": "General Knowledge"
                },
                {
                    "id": "q3",
                    "text": "Which number comes next: 2, 4, 6, ...?",
                    "options": ["7", "8", "10", "12"],
                    "correct_answer": "8",
                    "skill": "Logical Thinking"
                }
            ]
        },
        "attempt": {
            "id": "attempt-1",
            "exam_id": EXAM_ID,
            "student_id": "student-1",
            "answers": {},
            "flagged_questions": [],
            "time_remaining": time_remaining,
            "status": "in_progress"
        }
    })
}

pub(crate) fn start_response(time_remaining: i64) -> StartExamResponse {
    serde_json::from_value(start_payload(Some(time_remaining))).expect("start payload")
}

fn submit_payload() -> Value {
    json!({
        "message": "Exam submitted successfully",
        "score": 1,
        "total": 3,
        "percentage": 33.3,
        "skill_breakdown": {
            "Mathematical Reasoning": {"correct": 1, "total": 1, "percentage": 100.0},
            "General Knowledge": {"correct": 0, "total": 1, "percentage": 0.0},
            "Logical Thinking": {"correct": 0, "total": 1, "percentage": 0.0}
        }
    })
}

// In-memory service

#[derive(Debug, Default, Clone)]
pub(crate) struct ServiceCalls {
    pub(crate) starts: usize,
    pub(crate) saves: Vec<SaveAnswerRequest>,
    pub(crate) submits: Vec<SubmitExamRequest>,
}

/// `ExamService` whose answers are scripted per test. Failures are consumed
/// front to back; once a queue is empty every call succeeds.
pub(crate) struct ScriptedExamService {
    start: StdMutex<Option<StartExamResponse>>,
    start_failure: Option<(u16, Option<String>)>,
    save_failures: StdMutex<VecDeque<Option<String>>>,
    submit_failures: StdMutex<VecDeque<Option<String>>>,
    submit_gate: Option<Arc<tokio::sync::Semaphore>>,
    calls: StdMutex<ServiceCalls>,
}

impl ScriptedExamService {
    pub(crate) fn new(time_remaining: i64) -> Self {
        Self::with_start(start_response(time_remaining))
    }

    pub(crate) fn with_start(start: StartExamResponse) -> Self {
        Self {
            start: StdMutex::new(Some(start)),
            start_failure: None,
            save_failures: StdMutex::new(VecDeque::new()),
            submit_failures: StdMutex::new(VecDeque::new()),
            submit_gate: None,
            calls: StdMutex::new(ServiceCalls::default()),
        }
    }

    pub(crate) fn failing_start(mut self, status: u16, detail: Option<&str>) -> Self {
        self.start_failure = Some((status, detail.map(str::to_string)));
        self
    }

    pub(crate) fn failing_saves(self, count: usize) -> Self {
        self.save_failures
            .lock()
            .expect("save failures")
            .extend((0..count).map(|_| Some("Exam attempt not found".to_string())));
        self
    }

    pub(crate) fn failing_submits(self, details: &[Option<&str>]) -> Self {
        self.submit_failures
            .lock()
            .expect("submit failures")
            .extend(details.iter().map(|detail| detail.map(str::to_string)));
        self
    }

    /// Submits block until the returned semaphore receives a permit.
    pub(crate) fn gated_submits(mut self) -> (Self, Arc<tokio::sync::Semaphore>) {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        self.submit_gate = Some(gate.clone());
        (self, gate)
    }

    pub(crate) fn calls(&self) -> ServiceCalls {
        self.calls.lock().expect("calls").clone()
    }
}

#[async_trait]
impl ExamService for ScriptedExamService {
    async fn current_user(&self) -> Result<CurrentUser, ServiceError> {
        serde_json::from_value(json!({"id": "student-1", "name": "Asha", "role": "student", "grade": 4}))
            .map_err(|err| ServiceError::Decode(err.to_string()))
    }

    async fn list_exams(&self) -> Result<Vec<ExamListing>, ServiceError> {
        Ok(Vec::new())
    }

    async fn student_attempts(
        &self,
        _student_id: &str,
    ) -> Result<Vec<AttemptSummary>, ServiceError> {
        Ok(Vec::new())
    }

    async fn start_or_resume(&self, _exam_id: &str) -> Result<StartExamResponse, ServiceError> {
        self.calls.lock().expect("calls").starts += 1;
        if let Some((status, detail)) = &self.start_failure {
            return Err(ServiceError::Rejected { status: *status, detail: detail.clone() });
        }
        self.start
            .lock()
            .expect("start")
            .clone()
            .ok_or_else(|| ServiceError::Transport("no start response scripted".to_string()))
    }

    async fn save_answer(
        &self,
        _exam_id: &str,
        request: &SaveAnswerRequest,
    ) -> Result<(), ServiceError> {
        self.calls.lock().expect("calls").saves.push(request.clone());
        match self.save_failures.lock().expect("save failures").pop_front() {
            Some(detail) => Err(ServiceError::Rejected { status: 404, detail }),
            None => Ok(()),
        }
    }

    async fn submit(
        &self,
        _exam_id: &str,
        request: &SubmitExamRequest,
    ) -> Result<SubmitExamResponse, ServiceError> {
        self.calls.lock().expect("calls").submits.push(request.clone());
        if let Some(gate) = &self.submit_gate {
            gate.acquire().await.expect("gate open").forget();
        }
        let failure = self.submit_failures.lock().expect("submit failures").pop_front();
        match failure {
            Some(detail) => Err(ServiceError::Rejected { status: 500, detail }),
            None => serde_json::from_value(submit_payload())
                .map_err(|err| ServiceError::Decode(err.to_string())),
        }
    }
}

// HTTP fake

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeApiBehaviour {
    pub(crate) start_error: Option<(u16, String)>,
    pub(crate) submit_validation_error: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RecordedRequests {
    pub(crate) authorization: Option<String>,
    pub(crate) request_ids: Vec<String>,
    pub(crate) saves: Vec<Value>,
    pub(crate) submits: Vec<Value>,
}

#[derive(Clone)]
struct FakeApiState {
    behaviour: FakeApiBehaviour,
    recorded: Arc<StdMutex<RecordedRequests>>,
}

pub(crate) struct FakeExamApi {
    pub(crate) base_url: String,
    recorded: Arc<StdMutex<RecordedRequests>>,
}

impl FakeExamApi {
    pub(crate) fn recorded(&self) -> RecordedRequests {
        self.recorded.lock().expect("recorded").clone()
    }
}

/// Serves the Exam Service routes on an ephemeral local port.
pub(crate) async fn spawn_fake_exam_api(behaviour: FakeApiBehaviour) -> FakeExamApi {
    let recorded = Arc::new(StdMutex::new(RecordedRequests::default()));
    let state = FakeApiState { behaviour, recorded: recorded.clone() };

    let app = Router::new()
        .route("/api/me", get(fake_me))
        .route("/api/exams", get(fake_list_exams))
        .route("/api/students/:student_id/progress", get(fake_progress))
        .route("/api/exams/:exam_id/start", post(fake_start))
        .route("/api/exams/:exam_id/save-answer", post(fake_save_answer))
        .route("/api/exams/:exam_id/submit", post(fake_submit))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind fake api");
    let addr = listener.local_addr().expect("fake api addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake api serve");
    });

    FakeExamApi { base_url: format!("http://{addr}"), recorded }
}

fn record_headers(state: &FakeApiState, headers: &HeaderMap) {
    let mut recorded = state.recorded.lock().expect("recorded");
    if let Some(value) = headers.get("authorization").and_then(|value| value.to_str().ok()) {
        recorded.authorization = Some(value.to_string());
    }
    if let Some(value) = headers.get("x-request-id").and_then(|value| value.to_str().ok()) {
        recorded.request_ids.push(value.to_string());
    }
}

fn detail_response(status: u16, detail: Value) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "detail": detail }))).into_response()
}

async fn fake_me(State(state): State<FakeApiState>, headers: HeaderMap) -> Response {
    record_headers(&state, &headers);
    Json(json!({"id": "student-1", "name": "Asha", "email": "asha@example.org", "role": "student", "grade": 4}))
        .into_response()
}

async fn fake_list_exams(State(state): State<FakeApiState>, headers: HeaderMap) -> Response {
    record_headers(&state, &headers);
    let first = start_payload(Some(3600))["exam"].clone();
    let mut second = first.clone();
    second["id"] = json!("exam-2");
    second["title"] = json!("Grade 4 - January 2026 Scholarship Exam");
    Json(json!([first, second])).into_response()
}

async fn fake_progress(
    State(state): State<FakeApiState>,
    Path(student_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    record_headers(&state, &headers);
    Json(json!({
        "student_id": student_id,
        "total_exams": 1,
        "average_score": 66.7,
        "attempts": [
            {"id": "attempt-0", "exam_id": "exam-2", "status": "submitted", "score": 2, "total_questions": 3, "percentage": 66.7}
        ]
    }))
    .into_response()
}

async fn fake_start(
    State(state): State<FakeApiState>,
    Path(exam_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    record_headers(&state, &headers);
    if let Some((status, detail)) = &state.behaviour.start_error {
        return detail_response(*status, json!(detail));
    }
    if exam_id != EXAM_ID {
        return detail_response(404, json!("Exam not found"));
    }
    Json(start_payload(Some(120))).into_response()
}

async fn fake_save_answer(
    State(state): State<FakeApiState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record_headers(&state, &headers);
    state.recorded.lock().expect("recorded").saves.push(body);
    Json(json!({"message": "Answer saved", "success": true})).into_response()
}

async fn fake_submit(
    State(state): State<FakeApiState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record_headers(&state, &headers);
    state.recorded.lock().expect("recorded").submits.push(body);
    if state.behaviour.submit_validation_error {
        return detail_response(
            422,
            json!([{"loc": ["body", "time_remaining"], "msg": "field required"}]),
        );
    }
    Json(submit_payload()).into_response()
}

pub(crate) fn answers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(question, option)| (question.to_string(), option.to_string())).collect()
}
