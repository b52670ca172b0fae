use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        SubjectId(value.to_string())
    }
}

/// The caller attached to a request once its access token has been verified.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Identity {
    pub subject_id: SubjectId,
    pub username: String,
}
