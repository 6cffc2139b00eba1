use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use tokio::task::JoinSet;

use crate::config::SiteConfig;
use crate::html::{self, ListingView, LoadMore, PostLinks};
use crate::normalize::normalize_detail;
use crate::pagination::{ListingSession, LoadOutcome, PaginationState};
use crate::prismic::{LISTING_FIELDS, POSTS_TYPE, PrismicClient, Query};
use crate::progress::Progress;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub listing_pages: usize,
    pub posts: usize,
}

/// Writes the listing as `index.html`, `page-2.html`, ... and each post as
/// `post/{uid}.html` under `out_dir`.
///
/// Listing file N holds every post loaded after N-1 walks of the cursor; its
/// "load more" link points at file N+1.
pub async fn export_site(
    client: &PrismicClient,
    config: &SiteConfig,
    out_dir: &Path,
    progress: Arc<Progress>,
) -> anyhow::Result<ExportSummary> {
    std::fs::create_dir_all(out_dir).with_context(|| format!("create {}", out_dir.display()))?;

    progress.set_stage("querying first page");
    let query = Query::documents_of_type(POSTS_TYPE)
        .fetch(&LISTING_FIELDS)
        .page_size(config.page_size);
    let first = client.query(&query).await.context("query first page")?;
    let state = PaginationState::from_first_page(&first).context("normalize first page")?;
    progress.page_loaded(state.posts.len());

    let session = ListingSession::new(state);
    let mut page_number = 1usize;
    write_listing(config, out_dir, page_number, &session.snapshot())?;

    progress.set_stage("following next_page");
    loop {
        let before = session.snapshot().posts.len();
        let outcome = session
            .load_next_page(client)
            .await
            .with_context(|| format!("load listing page {}", page_number + 1))?;
        match outcome {
            LoadOutcome::Appended(n) => {
                page_number += 1;
                progress.page_loaded(n);
                tracing::debug!(page = page_number, before, appended = n, "listing page loaded");
                write_listing(config, out_dir, page_number, &session.snapshot())?;
            }
            LoadOutcome::Exhausted | LoadOutcome::Cancelled => break,
        }
    }

    let final_state = session.snapshot();
    let post_dir = out_dir.join("post");
    std::fs::create_dir_all(&post_dir).with_context(|| format!("create {}", post_dir.display()))?;

    progress.set_stage("rendering posts");
    let mut seen = HashSet::new();
    let mut tasks = JoinSet::new();
    for post in &final_state.posts {
        if !seen.insert(post.uid.clone()) {
            tracing::warn!(uid = %post.uid, "uid listed more than once; rendering it once");
            continue;
        }
        let client = client.clone();
        let config = config.clone();
        let uid = post.uid.clone();
        tasks.spawn(async move {
            let raw = client.get_by_uid(POSTS_TYPE, &uid).await?;
            let post = normalize_detail(&raw)?;
            let page = html::render_detail(&config, &post, "../index.html");
            Ok::<_, crate::error::Error>((uid, page))
        });
    }

    let mut written = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let (uid, page) = joined.context("post render task panicked")?.context("render post")?;
        let path = post_dir.join(format!("{uid}.html"));
        std::fs::write(&path, page).with_context(|| format!("write {}", path.display()))?;
        progress.post_done(&uid);
        written += 1;
    }

    tracing::info!(
        listing_pages = page_number,
        posts = written,
        out = %out_dir.display(),
        "static export finished"
    );
    Ok(ExportSummary {
        listing_pages: page_number,
        posts: written,
    })
}

pub fn listing_file_name(page_number: usize) -> String {
    if page_number <= 1 {
        "index.html".to_string()
    } else {
        format!("page-{page_number}.html")
    }
}

fn write_listing(
    config: &SiteConfig,
    out_dir: &Path,
    page_number: usize,
    state: &PaginationState,
) -> anyhow::Result<PathBuf> {
    let view = ListingView {
        state,
        load_more: LoadMore::Link {
            href: listing_file_name(page_number + 1),
        },
        links: PostLinks::Exported,
        notice: None,
    };
    let path = out_dir.join(listing_file_name(page_number));
    std::fs::write(&path, html::render_listing(config, &view))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
