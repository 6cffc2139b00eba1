use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use indicatif::{
    HumanBytes, HumanDuration, MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle,
};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadKind {
    /// API root, fetched to resolve the master ref.
    Api,
    /// A page of listing results.
    Page,
    /// A single document by uid.
    Document,
}

impl DownloadKind {
    fn label(self) -> &'static str {
        match self {
            DownloadKind::Api => "api",
            DownloadKind::Page => "page",
            DownloadKind::Document => "document",
        }
    }
}

#[derive(Debug, Default)]
struct DownloadCounters {
    api: AtomicU64,
    page: AtomicU64,
    document: AtomicU64,
}

impl DownloadCounters {
    fn inc(&self, kind: DownloadKind) {
        let counter = match kind {
            DownloadKind::Api => &self.api,
            DownloadKind::Page => &self.page,
            DownloadKind::Document => &self.document,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.api.load(Ordering::Relaxed),
            self.page.load(Ordering::Relaxed),
            self.document.load(Ordering::Relaxed),
        )
    }
}

/// Terminal progress for static export. A disabled instance only keeps counters.
pub struct Progress {
    enabled: bool,
    start: Instant,

    mp: Option<MultiProgress>,
    stage: ProgressBar,
    posts: ProgressBar,
    downloads: ProgressBar,

    pages_loaded: AtomicU64,
    posts_total: AtomicU64,
    posts_done: AtomicU64,

    http_in_flight: AtomicU64,
    http_done: AtomicU64,
    http_bytes: AtomicU64,

    done_by_kind: DownloadCounters,
    last_http_label: Mutex<String>,
}

impl Progress {
    pub fn new(enabled: bool) -> Arc<Self> {
        let start = Instant::now();

        let (mp, stage, posts, downloads) = if enabled {
            let mp = MultiProgress::with_draw_target(ProgressDrawTarget::stderr());

            let stage = mp.add(ProgressBar::new_spinner());
            stage.set_style(spinner_style());
            stage.enable_steady_tick(Duration::from_millis(80));
            stage.set_message("starting");

            let posts = mp.add(ProgressBar::new(0));
            let template = "{bar:40.cyan/blue} {pos}/{len} {msg}";
            if let Ok(style) = ProgressStyle::with_template(template) {
                posts.set_style(style.progress_chars("##-"));
            }
            posts.set_message("posts");

            let downloads = mp.add(ProgressBar::new_spinner());
            downloads.set_style(spinner_style());
            downloads.enable_steady_tick(Duration::from_millis(120));

            (Some(mp), stage, posts, downloads)
        } else {
            (
                None,
                ProgressBar::hidden(),
                ProgressBar::hidden(),
                ProgressBar::hidden(),
            )
        };

        Arc::new(Self {
            enabled,
            start,
            mp,
            stage,
            posts,
            downloads,
            pages_loaded: AtomicU64::new(0),
            posts_total: AtomicU64::new(0),
            posts_done: AtomicU64::new(0),
            http_in_flight: AtomicU64::new(0),
            http_done: AtomicU64::new(0),
            http_bytes: AtomicU64::new(0),
            done_by_kind: DownloadCounters::default(),
            last_http_label: Mutex::new(String::new()),
        })
    }

    pub fn set_stage(&self, msg: impl Into<String>) {
        if !self.enabled {
            return;
        }
        self.stage.set_message(msg.into());
    }

    /// A listing page was fetched; `posts` more posts are now known.
    pub fn page_loaded(&self, posts: usize) {
        self.pages_loaded.fetch_add(1, Ordering::Relaxed);
        let total = self.posts_total.fetch_add(posts as u64, Ordering::Relaxed) + posts as u64;
        if self.enabled {
            self.posts.set_length(total);
            self.refresh_downloads();
        }
    }

    pub fn post_done(&self, uid: &str) {
        self.posts_done.fetch_add(1, Ordering::Relaxed);
        if self.enabled {
            self.posts.inc(1);
            self.posts.set_message(uid.to_string());
        }
    }

    pub fn http_start(&self, kind: DownloadKind, url: &Url) {
        self.http_in_flight.fetch_add(1, Ordering::Relaxed);
        if self.enabled {
            self.set_last(format!("GET {} ({})", url.path(), kind.label()));
            self.refresh_downloads();
        }
    }

    pub fn http_throttled(&self, kind: DownloadKind, url: &Url, status: u16, wait: Duration) {
        if !self.enabled {
            return;
        }
        self.set_last(format!(
            "GET {} ({}) throttled {} wait {}ms",
            url.path(),
            kind.label(),
            status,
            wait.as_millis()
        ));
        self.refresh_downloads();
    }

    pub fn http_ok(&self, kind: DownloadKind, url: &Url, bytes: usize) {
        self.http_in_flight.fetch_sub(1, Ordering::Relaxed);
        self.http_done.fetch_add(1, Ordering::Relaxed);
        self.http_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
        self.done_by_kind.inc(kind);

        if self.enabled {
            self.set_last(format!("GET {} ({}) ok {}B", url.path(), kind.label(), bytes));
            self.refresh_downloads();
        }
    }

    pub fn http_err(&self, kind: DownloadKind, url: &Url) {
        self.http_in_flight.fetch_sub(1, Ordering::Relaxed);
        if self.enabled {
            self.set_last(format!("GET {} ({}) failed", url.path(), kind.label()));
            self.refresh_downloads();
        }
    }

    pub fn pages_loaded(&self) -> u64 {
        self.pages_loaded.load(Ordering::Relaxed)
    }

    pub fn posts_done(&self) -> u64 {
        self.posts_done.load(Ordering::Relaxed)
    }

    pub fn finish(&self) {
        if !self.enabled {
            return;
        }
        self.refresh_downloads();
        self.stage.finish_with_message("done");
        self.posts.finish_and_clear();
        self.downloads.finish_and_clear();
        if let Some(mp) = &self.mp {
            let _ = mp.println(format!("Done in {}", HumanDuration(self.start.elapsed())));
        }
    }

    fn set_last(&self, label: String) {
        if let Ok(mut last) = self.last_http_label.lock() {
            *last = label;
        }
    }

    fn refresh_downloads(&self) {
        if !self.enabled {
            return;
        }

        let in_flight = self.http_in_flight.load(Ordering::Relaxed);
        let done = self.http_done.load(Ordering::Relaxed);
        let bytes = self.http_bytes.load(Ordering::Relaxed);
        let pages = self.pages_loaded.load(Ordering::Relaxed);
        let (api, page, document) = self.done_by_kind.snapshot();

        let elapsed = self.start.elapsed().as_secs_f64().max(0.001);
        let rate = (bytes as f64 / elapsed) as u64;

        let last = self
            .last_http_label
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default();
        self.downloads.set_message(format!(
            "HTTP: done {done} | in-flight {in_flight} | bytes {bytes} ({rate}/s) | pages {pages} | api {api} page {page} doc {document} | {last}",
            bytes = HumanBytes(bytes),
            rate = HumanBytes(rate),
        ));
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner} {msg}  [{elapsed_precise}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}
