//! Listing sessions held by the server, one per reader visiting the listing.

use std::collections::hash_map::RandomState;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::BuildHasher as _;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::pagination::{ListingSession, PaginationState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s, 16).map(SessionId)
    }
}

struct StoreInner {
    counter: u64,
    sessions: HashMap<SessionId, Arc<ListingSession>>,
    order: VecDeque<SessionId>,
}

/// Bounded set of live sessions. Closing or evicting a session cancels any
/// page load it has in flight.
pub struct SessionStore {
    inner: Mutex<StoreInner>,
    max_sessions: usize,
    ids: RandomState,
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                counter: 0,
                sessions: HashMap::new(),
                order: VecDeque::new(),
            }),
            max_sessions: max_sessions.max(1),
            ids: RandomState::new(),
        }
    }

    pub fn open(&self, state: PaginationState) -> (SessionId, Arc<ListingSession>) {
        let session = Arc::new(ListingSession::new(state));
        let mut inner = self.lock();

        let id = loop {
            inner.counter += 1;
            let candidate = SessionId(self.ids.hash_one(inner.counter));
            if !inner.sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        while inner.sessions.len() >= self.max_sessions {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            if let Some(evicted) = inner.sessions.remove(&oldest) {
                tracing::debug!(session = %oldest, "evicting listing session");
                evicted.cancel();
            }
        }

        inner.sessions.insert(id, session.clone());
        inner.order.push_back(id);
        (id, session)
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<ListingSession>> {
        self.lock().sessions.get(&id).cloned()
    }

    /// Tears a session down. Returns false if it was already gone.
    pub fn close(&self, id: SessionId) -> bool {
        let mut inner = self.lock();
        inner.order.retain(|s| *s != id);
        match inner.sessions.remove(&id) {
            Some(session) => {
                session.cancel();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
