use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque note identifier. Misskey ids sort by creation time, which is what
/// makes `untilId` pagination work, but we never inspect them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub String);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A note as returned by the API. Only `id` is typed; every other field is
/// carried through untouched so the persisted file mirrors the server output.
///
/// Key order survives a round trip (workspace `serde_json` has
/// `preserve_order`). `id` is always written first, which is where Misskey
/// puts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Note {
    /// Note body, if present and not null.
    pub fn text(&self) -> Option<&str> {
        self.fields.get("text").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Body of `users/search-by-username-and-host`. The token is injected by the
/// HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct SearchByUsernameAndHost<'a> {
    pub username: &'a str,
    pub host: Option<&'a str>,
    pub detail: bool,
}

/// Body of `users/notes`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNotesRequest<'a> {
    pub user_id: &'a UserId,
    pub limit: u32,
    pub local: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until_id: Option<&'a NoteId>,
}
