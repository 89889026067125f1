use serde::Deserialize;

pub(crate) mod exam;
pub(crate) mod user;

/// Error body of the Exam Service. `detail` is a string for business errors
/// and a list for request-validation errors; only the string form is shown.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub(crate) detail: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub(crate) fn message(&self) -> Option<String> {
        self.detail
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }
}
