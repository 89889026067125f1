use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum UserRole {
    Student,
    Parent,
    Teacher,
    Admin,
}

impl UserRole {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Parent => "parent",
            UserRole::Teacher => "teacher",
            UserRole::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CurrentUser {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) name: String,
    pub(crate) role: UserRole,
    #[serde(default)]
    pub(crate) grade: Option<u32>,
}
