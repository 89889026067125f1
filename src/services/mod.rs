pub(crate) mod exam_api;
pub(crate) mod exam_session;
