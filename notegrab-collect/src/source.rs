use async_trait::async_trait;
use notegrab_common::Result;
use notegrab_social::misskey::types::UserNotesRequest;
use notegrab_social::misskey::{MisskeyApi, Note, NoteId, UserId};

/// Parameters for one page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub user_id: UserId,
    pub limit: u32,
    pub local_only: bool,
    /// Only notes strictly older than this one. `None` on the first request.
    pub until_id: Option<NoteId>,
}

/// Where notes come from. Implemented for [`MisskeyApi`]; tests plug in
/// in-memory sources.
#[async_trait]
pub trait NoteSource: Send + Sync {
    /// Map a username to the id the notes endpoint expects.
    async fn resolve_user(&self, username: &str) -> Result<UserId>;

    /// Fetch one page, newest first. An empty page means there is nothing older.
    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<Note>>;
}

#[async_trait]
impl NoteSource for MisskeyApi {
    async fn resolve_user(&self, username: &str) -> Result<UserId> {
        Ok(MisskeyApi::resolve_user(self, username).await?.id)
    }

    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<Note>> {
        self.user_notes(&UserNotesRequest {
            user_id: &query.user_id,
            limit: query.limit,
            local: query.local_only,
            until_id: query.until_id.as_ref(),
        })
        .await
    }
}
