use crate::source::{NoteSource, PageQuery};
use futures::{Stream, TryStreamExt};
use notegrab_common::Result;
use notegrab_social::misskey::{Note, NoteId, UserId};
use std::time::Duration;
use tokio::time::sleep;

/// Knobs for the fetch loop.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Notes requested per page.
    pub page_size: u32,
    /// Pause after every non-empty page, before the next request.
    pub page_delay: Duration,
    /// Restrict to notes authored on the instance itself.
    pub local_only: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            page_size: 100,
            page_delay: Duration::from_secs(1),
            local_only: true,
        }
    }
}

pub struct Collector<S> {
    source: S,
    options: CollectOptions,
}

impl<S: NoteSource> Collector<S> {
    pub fn new(source: S, options: CollectOptions) -> Self {
        Self { source, options }
    }

    /// Pages of notes for `user_id`, newest first, ending after the first
    /// empty page. Each request after the first carries the id of the last
    /// note of the previous page as its `until_id`.
    pub fn pages(&self, user_id: UserId) -> impl Stream<Item = Result<Vec<Note>>> + '_ {
        async_stream::try_stream! {
            let mut until: Option<NoteId> = None;
            loop {
                let query = PageQuery {
                    user_id: user_id.clone(),
                    limit: self.options.page_size,
                    local_only: self.options.local_only,
                    until_id: until.clone(),
                };
                tracing::info!(
                    target: "collect",
                    until_id = ?until.as_ref().map(|id| id.0.as_str()),
                    "collect.page.request"
                );
                let page = self.source.fetch_page(&query).await?;
                let Some(last) = page.last() else {
                    break;
                };
                until = Some(last.id.clone());
                yield page;

                if !self.options.page_delay.is_zero() {
                    sleep(self.options.page_delay).await;
                }
            }
        }
    }

    /// Resolve `username` and drain [`Self::pages`] into one list in fetch order.
    ///
    /// Any failure aborts the whole run; nothing partial is returned.
    pub async fn collect_all(&self, username: &str) -> Result<Vec<Note>> {
        tracing::info!(target: "collect", username, "collecting user data");
        let user_id = self.source.resolve_user(username).await?;
        tracing::info!(target: "collect", user_id = %user_id, "collect.user.resolved");

        let mut all: Vec<Note> = Vec::new();
        let mut page_count = 0usize;
        let mut pages = std::pin::pin!(self.pages(user_id));
        while let Some(page) = pages.try_next().await? {
            page_count += 1;
            tracing::debug!(
                target: "collect",
                page = page_count,
                page_len = page.len(),
                total = all.len() + page.len(),
                "collect.page.received"
            );
            all.extend(page);
        }

        tracing::info!(
            target: "collect",
            pages = page_count,
            notes = all.len(),
            "collect.done"
        );
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use notegrab_common::NotegrabError;
    use serde_json::{Map, Value};
    use std::sync::Mutex;

    /// Serves `total` notes newest-first, honouring `until_id` and `limit`.
    struct FakeSource {
        notes: Vec<Note>,
        user: Option<UserId>,
        queries: Mutex<Vec<PageQuery>>,
    }

    impl FakeSource {
        fn with_notes(total: usize) -> Self {
            let notes = (0..total)
                .rev()
                .map(|i| note(&format!("n{i:05}")))
                .collect();
            Self {
                notes,
                user: Some(UserId("u1".into())),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn without_user() -> Self {
            Self {
                user: None,
                ..Self::with_notes(10)
            }
        }

        fn queries(&self) -> Vec<PageQuery> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NoteSource for FakeSource {
        async fn resolve_user(&self, username: &str) -> Result<UserId> {
            self.user.clone().ok_or_else(|| NotegrabError::UserNotFound {
                username: username.into(),
                host: "fake".into(),
            })
        }

        async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<Note>> {
            self.queries.lock().unwrap().push(query.clone());
            let start = match &query.until_id {
                None => 0,
                Some(until) => self
                    .notes
                    .iter()
                    .position(|n| &n.id == until)
                    .map(|p| p + 1)
                    .unwrap_or(self.notes.len()),
            };
            Ok(self
                .notes
                .iter()
                .skip(start)
                .take(query.limit as usize)
                .cloned()
                .collect())
        }
    }

    fn note(id: &str) -> Note {
        let mut fields = Map::new();
        fields.insert("text".into(), Value::String(format!("text of {id}")));
        Note {
            id: NoteId(id.into()),
            fields,
        }
    }

    fn opts(page_size: u32) -> CollectOptions {
        CollectOptions {
            page_size,
            page_delay: Duration::ZERO,
            local_only: true,
        }
    }

    #[tokio::test]
    async fn request_count_is_pages_plus_terminating_empty_page() {
        let cases = [
            (0, 100),
            (1, 100),
            (99, 100),
            (100, 100),
            (101, 100),
            (250, 100),
            (20, 7),
        ];
        for (total, page_size) in cases {
            let collector = Collector::new(FakeSource::with_notes(total), opts(page_size));
            let notes = collector.collect_all("alice").await.unwrap();

            let expected_requests = total.div_ceil(page_size as usize) + 1;
            assert_eq!(
                collector.source.queries().len(),
                expected_requests,
                "total={total} page_size={page_size}"
            );
            assert_eq!(notes.len(), total);
        }
    }

    #[tokio::test]
    async fn output_preserves_fetch_order_without_duplicates() {
        let source = FakeSource::with_notes(137);
        let expected: Vec<NoteId> = source.notes.iter().map(|n| n.id.clone()).collect();

        let collector = Collector::new(source, opts(100));
        let notes = collector.collect_all("alice").await.unwrap();

        let got: Vec<NoteId> = notes.into_iter().map(|n| n.id).collect();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn cursor_is_last_id_of_previous_page() {
        let collector = Collector::new(FakeSource::with_notes(137), opts(100));
        collector.collect_all("alice").await.unwrap();

        let queries = collector.source.queries();
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0].until_id, None);
        // newest-first: page 1 ends at n00037, page 2 at n00000
        assert_eq!(queries[1].until_id, Some(NoteId("n00037".into())));
        assert_eq!(queries[2].until_id, Some(NoteId("n00000".into())));
        assert!(queries.iter().all(|q| q.limit == 100 && q.local_only));
        assert!(queries.iter().all(|q| q.user_id == UserId("u1".into())));
    }

    #[tokio::test]
    async fn empty_first_page_yields_empty_result() {
        let collector = Collector::new(FakeSource::with_notes(0), opts(100));
        let notes = collector.collect_all("alice").await.unwrap();
        assert!(notes.is_empty());
        assert_eq!(collector.source.queries().len(), 1);
    }

    #[tokio::test]
    async fn unresolved_user_fails_before_any_page_request() {
        let collector = Collector::new(FakeSource::without_user(), opts(100));
        let err = collector.collect_all("ghost").await.unwrap_err();
        assert!(matches!(err, NotegrabError::UserNotFound { .. }));
        assert!(collector.source.queries().is_empty());
    }

    #[tokio::test]
    async fn pages_stream_can_be_consumed_directly() {
        let collector = Collector::new(FakeSource::with_notes(15), opts(10));
        let pages: Vec<Vec<Note>> = collector
            .pages(UserId("u1".into()))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(pages.iter().map(Vec::len).collect::<Vec<_>>(), vec![10, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_pages() {
        let options = CollectOptions {
            page_delay: Duration::from_secs(1),
            ..opts(10)
        };
        let collector = Collector::new(FakeSource::with_notes(25), options);

        let started = tokio::time::Instant::now();
        collector.collect_all("alice").await.unwrap();
        // three non-empty pages, each followed by one pause
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }
}
