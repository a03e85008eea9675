use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Dense per-generation document number. Assigned in ascending message-id
/// order, so comparing two `DocId`s compares their message ids.
pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(rename = "user_name")]
    pub author: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(rename = "message")]
    pub text: String,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        author: impl Into<String>,
        text: impl Into<String>,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: String::new(),
            author: author.into(),
            timestamp,
            text: text.into(),
        }
    }
}
