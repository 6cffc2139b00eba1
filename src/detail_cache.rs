//! Generated post pages, regenerated in the background once they are older
//! than the revalidate interval. Readers get the stale page meanwhile, or the
//! loading page when a post has never been generated.
//!
//! At most `max_cached_posts` entries are kept; the oldest goes first.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::config::SiteConfig;
use crate::error::{Error, Result};
use crate::html;
use crate::normalize::normalize_detail;
use crate::prismic::{POSTS_TYPE, PrismicClient};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Ready(Arc<str>),
    /// First generation is still running.
    Loading,
    NotFound,
    /// Generation failed; the next lookup tries again.
    Failed(String),
}

enum Slot {
    Generating,
    Ready {
        html: Arc<str>,
        generated_at: Instant,
        regenerating: bool,
    },
    NotFound {
        checked_at: Instant,
    },
    /// First generation failed; reported once, then retried.
    Failed {
        message: String,
    },
}

/// Slots in insertion order, capped.
struct Slots {
    map: HashMap<String, Slot>,
    order: VecDeque<String>,
    capacity: usize,
}

impl Slots {
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn get_mut(&mut self, uid: &str) -> Option<&mut Slot> {
        self.map.get_mut(uid)
    }

    fn insert(&mut self, uid: &str, slot: Slot) {
        if self.map.insert(uid.to_string(), slot).is_none() {
            self.order.push_back(uid.to_string());
        }
        while self.map.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.map.remove(&oldest);
            tracing::debug!(uid = %oldest, "evicted post page");
        }
    }

    fn remove(&mut self, uid: &str) {
        if self.map.remove(uid).is_some() {
            self.order.retain(|u| u != uid);
        }
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

struct CacheInner {
    client: PrismicClient,
    config: Arc<SiteConfig>,
    slots: Mutex<Slots>,
}

#[derive(Clone)]
pub struct DetailCache {
    inner: Arc<CacheInner>,
}

impl DetailCache {
    pub fn new(client: PrismicClient, config: Arc<SiteConfig>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                client,
                slots: Mutex::new(Slots::new(config.max_cached_posts)),
                config,
            }),
        }
    }

    /// Returns what can be shown for `uid` right now, starting a background
    /// generation when the page is missing or stale.
    pub fn lookup(&self, uid: &str) -> Lookup {
        let revalidate = self.inner.config.revalidate;
        let mut slots = self.lock();

        let (lookup, spawn) = match slots.get_mut(uid) {
            None => (Lookup::Loading, true),
            Some(Slot::Generating) => (Lookup::Loading, false),
            Some(Slot::Ready {
                html,
                generated_at,
                regenerating,
            }) => {
                let spawn = generated_at.elapsed() >= revalidate && !*regenerating;
                if spawn {
                    *regenerating = true;
                }
                (Lookup::Ready(html.clone()), spawn)
            }
            Some(Slot::NotFound { checked_at }) if checked_at.elapsed() >= revalidate => {
                (Lookup::Loading, true)
            }
            Some(Slot::NotFound { .. }) => (Lookup::NotFound, false),
            Some(Slot::Failed { message }) => (Lookup::Failed(message.clone()), false),
        };
        if matches!(lookup, Lookup::Failed(_)) {
            slots.remove(uid);
        } else if spawn && lookup == Lookup::Loading {
            slots.insert(uid, Slot::Generating);
        }
        drop(slots);

        if spawn {
            let cache = self.clone();
            let uid = uid.to_string();
            tokio::spawn(async move {
                cache.generate(&uid).await;
            });
        }
        lookup
    }

    /// Generates `uid` now and stores the outcome.
    pub async fn generate(&self, uid: &str) -> Lookup {
        let started = Instant::now();
        let result = generate_detail(&self.inner.client, &self.inner.config, uid).await;
        let mut slots = self.lock();

        match result {
            Ok(page) => {
                tracing::info!(
                    uid,
                    elapsed_ms = started.elapsed().as_millis(),
                    "generated post page"
                );
                let page: Arc<str> = page.into();
                slots.insert(
                    uid,
                    Slot::Ready {
                        html: page.clone(),
                        generated_at: Instant::now(),
                        regenerating: false,
                    },
                );
                Lookup::Ready(page)
            }
            Err(Error::NotFound { .. }) => {
                tracing::info!(uid, "post not found");
                slots.insert(
                    uid,
                    Slot::NotFound {
                        checked_at: Instant::now(),
                    },
                );
                Lookup::NotFound
            }
            Err(e) => {
                tracing::warn!(uid, error = %e, "generating post page failed");
                let message = e.reader_message().to_string();
                if let Some(Slot::Ready { regenerating, .. }) = slots.get_mut(uid) {
                    // Keep serving the previous page.
                    *regenerating = false;
                } else {
                    slots.insert(
                        uid,
                        Slot::Failed {
                            message: message.clone(),
                        },
                    );
                }
                Lookup::Failed(message)
            }
        }
    }

    /// Generates every page up front, like a build step.
    pub async fn prewarm(&self, uids: &[String]) {
        for uid in uids {
            self.lock().insert(uid, Slot::Generating);
            self.generate(uid).await;
        }
    }

    /// Entries currently held, including not-found answers.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slots> {
        self.inner.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Fetches, validates and renders one post page.
pub async fn generate_detail(
    client: &PrismicClient,
    config: &SiteConfig,
    uid: &str,
) -> Result<String> {
    let raw = client.get_by_uid(POSTS_TYPE, uid).await?;
    let post = normalize_detail(&raw)?;
    Ok(html::render_detail(config, &post, "/"))
}
