use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use bytes::Bytes;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use url::Url;

use crate::error::{Error, Result};
use crate::progress::{DownloadKind, Progress};

const MAX_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    semaphore: Arc<Semaphore>,
    progress: Option<Arc<Progress>>,
}

impl Fetcher {
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        max_concurrency: usize,
        progress: Option<Arc<Progress>>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            progress,
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: Url, kind: DownloadKind) -> Result<T> {
        let (bytes, _headers) = self.get_bytes(url.clone(), kind).await?;
        serde_json::from_slice(&bytes).map_err(|source| Error::Decode { url, source })
    }

    /// GET with backoff on 429/503 only. Every other failure is returned as is.
    pub async fn get_bytes(&self, url: Url, kind: DownloadKind) -> Result<(Bytes, HeaderMap)> {
        // The semaphore is never closed.
        let _permit = self.semaphore.acquire().await.ok();

        let mut backoff = Duration::from_millis(250);

        for attempt in 1..=MAX_ATTEMPTS {
            self.report(|p| p.http_start(kind, &url));
            let resp = match self.client.get(url.clone()).send().await {
                Ok(resp) => resp,
                Err(source) => {
                    self.report(|p| p.http_err(kind, &url));
                    return Err(Error::Request { url, source });
                }
            };

            let status = resp.status();
            let headers = resp.headers().clone();

            if status.is_success() {
                return match resp.bytes().await {
                    Ok(bytes) => {
                        self.report(|p| p.http_ok(kind, &url, bytes.len()));
                        Ok((bytes, headers))
                    }
                    Err(source) => {
                        self.report(|p| p.http_err(kind, &url));
                        Err(Error::Request { url, source })
                    }
                };
            }

            self.report(|p| p.http_err(kind, &url));

            if status.as_u16() == 429 || status.as_u16() == 503 {
                let Some(wait) = throttle_wait(attempt, &headers, backoff) else {
                    break;
                };
                tracing::warn!(
                    %status,
                    attempt,
                    wait_ms = wait.as_millis(),
                    "throttled; backing off"
                );
                self.report(|p| p.http_throttled(kind, &url, status.as_u16(), wait));
                tokio::time::sleep(wait).await;
                backoff = (backoff * 2).min(Duration::from_secs(10));
                continue;
            }

            return Err(Error::Status { url, status });
        }

        Err(Error::Throttled {
            url,
            attempts: MAX_ATTEMPTS,
        })
    }

    fn report(&self, f: impl FnOnce(&Progress)) {
        if let Some(p) = &self.progress {
            f(p);
        }
    }
}

/// How long to wait before retrying a throttled attempt; `None` once the
/// attempts are used up.
fn throttle_wait(attempt: usize, headers: &HeaderMap, backoff: Duration) -> Option<Duration> {
    if attempt >= MAX_ATTEMPTS {
        return None;
    }
    Some(retry_after_duration(headers).unwrap_or(backoff))
}

fn retry_after_duration(headers: &HeaderMap) -> Option<Duration> {
    let v = headers.get(RETRY_AFTER)?;
    let s = v.to_str().ok()?.trim();
    let seconds: u64 = s.parse().ok()?;
    Some(Duration::from_secs(seconds))
}
