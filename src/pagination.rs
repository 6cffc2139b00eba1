//! Listing pagination: follows the backend's `next_page` cursor on request and
//! accumulates normalized posts for one listing session.

use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use crate::document::PageResponse;
use crate::error::{Error, Result, redacted_cursor};
use crate::normalize::{NormalizedPost, normalize_listing};
use crate::prismic::PrismicClient;

/// Posts accumulated so far and the cursor for the next page.
///
/// `posts` only ever grows; pages are appended in fetch order and no uid
/// dedup is performed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaginationState {
    pub posts: Vec<NormalizedPost>,
    pub next_page_url: Option<String>,
}

impl PaginationState {
    /// Builds the initial state from the first page of a query.
    pub fn from_first_page(page: &PageResponse) -> Result<Self> {
        let posts = page
            .results
            .iter()
            .map(normalize_listing)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            posts,
            next_page_url: page.next_cursor().map(str::to_string),
        })
    }

    pub fn has_more(&self) -> bool {
        self.next_page_url
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkerStatus {
    Idle,
    Loading,
    /// The last load failed; the reader-safe message is shown. Loading again is allowed.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and this many posts were appended.
    Appended(usize),
    /// There was no cursor to follow. Not an error.
    Exhausted,
    /// The load was cancelled before its response was applied.
    Cancelled,
}

struct Inner {
    state: PaginationState,
    status: WalkerStatus,
    /// Sequence number and cancel handle of the outstanding load.
    in_flight: Option<(u64, CancellationToken)>,
    loads: u64,
}

/// Puts the walker back to idle if a load future is dropped before it finishes.
struct InFlight<'a> {
    session: &'a ListingSession,
    seq: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut inner = self.session.lock();
        if inner.in_flight.as_ref().is_some_and(|(seq, _)| *seq == self.seq) {
            inner.in_flight = None;
            inner.status = WalkerStatus::Idle;
        }
    }
}

/// One reader's walk through the listing.
///
/// Loads are serialized: a second `load_next_page` while one is outstanding
/// fails with [`Error::LoadInFlight`]. The mutex is never held across a fetch.
pub struct ListingSession {
    inner: Mutex<Inner>,
}

impl ListingSession {
    pub fn new(state: PaginationState) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state,
                status: WalkerStatus::Idle,
                in_flight: None,
                loads: 0,
            }),
        }
    }

    pub fn snapshot(&self) -> PaginationState {
        self.lock().state.clone()
    }

    pub fn status(&self) -> WalkerStatus {
        self.lock().status.clone()
    }

    /// Follows the current cursor once and appends the normalized results.
    ///
    /// On failure the posts and cursor are left untouched and the status
    /// becomes `Failed`.
    pub async fn load_next_page(&self, client: &PrismicClient) -> Result<LoadOutcome> {
        let (cursor, token, seq) = {
            let mut inner = self.lock();
            if inner.status == WalkerStatus::Loading {
                return Err(Error::LoadInFlight);
            }
            let Some(cursor) = inner.state.next_page_url.clone().filter(|c| !c.trim().is_empty())
            else {
                return Ok(LoadOutcome::Exhausted);
            };
            let token = CancellationToken::new();
            inner.loads += 1;
            let seq = inner.loads;
            inner.status = WalkerStatus::Loading;
            inner.in_flight = Some((seq, token.clone()));
            (cursor, token, seq)
        };
        let _guard = InFlight { session: self, seq };
        let shown = redacted_cursor(&cursor);

        tracing::debug!(cursor = %shown, "loading next page");

        let fetched = tokio::select! {
            _ = token.cancelled() => None,
            res = client.fetch_page(&cursor) => Some(res),
        };

        let mut inner = self.lock();
        let fetched = match fetched {
            Some(res) if !token.is_cancelled() => res,
            _ => {
                // `cancel` already put the walker back to idle.
                tracing::debug!(cursor = %shown, "page load cancelled; discarding response");
                return Ok(LoadOutcome::Cancelled);
            }
        };
        inner.in_flight = None;

        let normalized = fetched.and_then(|page| {
            let posts = page
                .results
                .iter()
                .map(normalize_listing)
                .collect::<Result<Vec<_>>>()?;
            Ok((posts, page.next_cursor().map(str::to_string)))
        });

        match normalized {
            Ok((posts, next)) => {
                let appended = posts.len();
                inner.state.posts.extend(posts);
                inner.state.next_page_url = next;
                inner.status = WalkerStatus::Idle;
                tracing::info!(
                    appended,
                    total = inner.state.posts.len(),
                    has_more = inner.state.has_more(),
                    "appended listing page"
                );
                Ok(LoadOutcome::Appended(appended))
            }
            Err(e) => {
                tracing::warn!(cursor = %shown, error = %e, "loading next page failed");
                inner.status = WalkerStatus::Failed(e.reader_message().to_string());
                Err(e)
            }
        }
    }

    /// Aborts an outstanding load. Its response, if it still arrives, is dropped.
    pub fn cancel(&self) {
        let mut inner = self.lock();
        if let Some((_, token)) = inner.in_flight.take() {
            token.cancel();
            inner.status = WalkerStatus::Idle;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Nothing panics while holding the lock; recover the data if it ever did.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(json: &str) -> PageResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn first_page_is_normalized_with_cursor() {
        let state = PaginationState::from_first_page(&page(
            r#"{
              "next_page": "https://blog.cdn.prismic.io/api/v2/documents/search?page=2",
              "results": [
                {"uid": "a", "first_publication_date": "2021-03-15T19:25:28+0000",
                 "data": {"title": "A", "subtitle": "sa", "author": "x"}}
              ]
            }"#,
        ))
        .unwrap();
        assert_eq!(state.posts.len(), 1);
        assert_eq!(
            state.posts[0].first_publication_date.as_deref(),
            Some("15 março 2021")
        );
        assert!(state.has_more());
    }

    #[test]
    fn empty_cursor_means_no_more() {
        let state = PaginationState {
            posts: Vec::new(),
            next_page_url: Some(String::new()),
        };
        assert!(!state.has_more());
        assert!(!PaginationState::default().has_more());
    }

    #[test]
    fn cancel_when_idle_is_a_no_op() {
        let session = ListingSession::new(PaginationState::default());
        session.cancel();
        assert_eq!(session.status(), WalkerStatus::Idle);
    }
}
