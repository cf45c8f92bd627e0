//! Thin wrapper around the Misskey REST API.
//!
//! Every Misskey endpoint is a `POST` under `/api/` with a JSON body; the
//! access token rides along as the `i` body field (or as a bearer header when
//! configured). Responses are decoded as-is; callers own pagination.
use crate::misskey::types::{Note, SearchByUsernameAndHost, UserNotesRequest, UserSummary};
use notegrab_common::{NotegrabError, Result};
use notegrab_http::{Auth, HttpClient, HttpError, RequestOpts};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::time::Duration;
use url::Url;

const SEARCH_BY_USERNAME_AND_HOST: &str = "users/search-by-username-and-host";
const USER_NOTES: &str = "users/notes";

/// Where the access token is placed on each request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TokenPlacement {
    #[default]
    Body,
    Bearer,
}

#[derive(Clone)]
pub struct MisskeyApi {
    http: HttpClient,
    host: String,
    token: String,
    placement: TokenPlacement,
}

impl MisskeyApi {
    /// Client for `https://<host>/api/`.
    pub fn new(host: &str, token: String) -> Result<Self> {
        Self::with_origin(&format!("https://{host}"), host, token)
    }

    /// Client for an explicit origin (scheme + authority), e.g. a local mock
    /// server. `host` is still what gets sent in user lookups.
    pub fn with_origin(origin: &str, host: &str, token: String) -> Result<Self> {
        let api_base = Url::parse(origin)
            .and_then(|u| u.join("api/"))
            .map_err(|e| NotegrabError::Config(format!("invalid Misskey origin {origin}: {e}")))?;
        let http = HttpClient::new(api_base.as_str()).map_err(http_to_notegrab)?;
        Ok(Self {
            http,
            host: host.to_string(),
            token,
            placement: TokenPlacement::default(),
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.http = self.http.with_timeout(dur);
        self
    }

    pub fn with_token_placement(mut self, placement: TokenPlacement) -> Self {
        self.placement = placement;
        self
    }

    /// Raw `users/search-by-username-and-host` call.
    pub async fn search_by_username_and_host(
        &self,
        username: &str,
        host: Option<&str>,
    ) -> Result<Vec<UserSummary>> {
        let body = SearchByUsernameAndHost {
            username,
            host,
            detail: false,
        };
        self.call(SEARCH_BY_USERNAME_AND_HOST, &body).await
    }

    /// Look `username` up on this instance and return the first match.
    pub async fn resolve_user(&self, username: &str) -> Result<UserSummary> {
        let users = self
            .search_by_username_and_host(username, Some(self.host.as_str()))
            .await?;
        tracing::debug!(
            target: "social.misskey",
            username,
            host = %self.host,
            candidates = users.len(),
            "misskey.resolve_user"
        );
        users
            .into_iter()
            .next()
            .ok_or_else(|| NotegrabError::UserNotFound {
                username: username.to_string(),
                host: self.host.clone(),
            })
    }

    /// One page of `users/notes`, newest first.
    pub async fn user_notes(&self, req: &UserNotesRequest<'_>) -> Result<Vec<Note>> {
        let notes: Vec<Note> = self.call(USER_NOTES, req).await?;
        tracing::debug!(
            target: "social.misskey",
            user_id = %req.user_id,
            until_id = ?req.until_id.map(|id| id.0.as_str()),
            count = notes.len(),
            "misskey.user_notes"
        );
        Ok(notes)
    }

    async fn call<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let auth = match self.placement {
            TokenPlacement::Body => Auth::BodyField {
                name: "i",
                value: Cow::Borrowed(self.token.as_str()),
            },
            TokenPlacement::Bearer => Auth::Bearer(self.token.as_str()),
        };
        self.http
            .post_json(
                endpoint,
                body,
                RequestOpts {
                    auth: Some(auth),
                    ..Default::default()
                },
            )
            .await
            .map_err(http_to_notegrab)
    }
}

fn http_to_notegrab(e: HttpError) -> NotegrabError {
    NotegrabError::Api(format!("{e}"))
}
