use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::SiteConfig;
use crate::detail_cache::{DetailCache, Lookup};
use crate::error::{Error, Result};
use crate::html::{self, ListingView, LoadMore, Notice, PostLinks};
use crate::normalize::is_path_safe;
use crate::pagination::{ListingSession, PaginationState, WalkerStatus};
use crate::prismic::{LISTING_FIELDS, POSTS_TYPE, PrismicClient, Query};
use crate::sessions::{SessionId, SessionStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub client: PrismicClient,
    pub config: Arc<SiteConfig>,
    pub sessions: Arc<SessionStore>,
    pub details: DetailCache,
}

impl AppState {
    pub fn new(client: PrismicClient, config: SiteConfig) -> Self {
        let config = Arc::new(config);
        Self {
            sessions: Arc::new(SessionStore::new(config.max_sessions)),
            details: DetailCache::new(client.clone(), config.clone()),
            client,
            config,
        }
    }

    /// First page of the listing, normalized.
    pub async fn first_page(&self) -> Result<PaginationState> {
        let query = Query::documents_of_type(POSTS_TYPE)
            .fetch(&LISTING_FIELDS)
            .page_size(self.config.page_size);
        let page = self.client.query(&query).await?;
        PaginationState::from_first_page(&page)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/sessions/:id", get(show_session))
        .route("/sessions/:id/more", post(load_more))
        .route("/sessions/:id/close", post(close_session))
        .route("/post/:uid", get(post_detail))
        .route("/healthz", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Pre-generates the first page's posts, then serves until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    match state.first_page().await {
        Ok(first) => {
            let uids: Vec<String> = first.posts.iter().map(|p| p.uid.clone()).collect();
            info!(count = uids.len(), "pre-generating post pages");
            state.details.prewarm(&uids).await;
        }
        Err(e) => warn!(error = %e, "could not pre-generate post pages; continuing"),
    }

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("web server error")?;
    Ok(())
}

async fn home(State(state): State<AppState>) -> Response {
    let first = match state.first_page().await {
        Ok(first) => first,
        Err(e) => return error_page(&state.config, &e),
    };
    let (id, session) = state.sessions.open(first);
    info!(session = %id, "opened listing session");
    listing_response(&state.config, id, &session.snapshot(), None, StatusCode::OK)
}

async fn show_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some((id, session)) = find_session(&state, &id) else {
        return Redirect::to("/").into_response();
    };
    let notice = match session.status() {
        WalkerStatus::Idle => None,
        WalkerStatus::Loading => Some(Notice::Busy),
        WalkerStatus::Failed(message) => Some(Notice::Failed(message)),
    };
    listing_response(&state.config, id, &session.snapshot(), notice, StatusCode::OK)
}

async fn load_more(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some((id, session)) = find_session(&state, &id) else {
        return Redirect::to("/").into_response();
    };

    match session.load_next_page(&state.client).await {
        Ok(outcome) => {
            tracing::debug!(session = %id, ?outcome, "load more finished");
            Redirect::to(&format!("/sessions/{id}")).into_response()
        }
        Err(Error::LoadInFlight) => listing_response(
            &state.config,
            id,
            &session.snapshot(),
            Some(Notice::Busy),
            StatusCode::CONFLICT,
        ),
        Err(e) => {
            warn!(session = %id, error = %e, "load more failed");
            listing_response(
                &state.config,
                id,
                &session.snapshot(),
                Some(Notice::Failed(e.reader_message().to_string())),
                StatusCode::BAD_GATEWAY,
            )
        }
    }
}

async fn close_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if let Ok(id) = id.parse::<SessionId>() {
        if state.sessions.close(id) {
            info!(session = %id, "closed listing session");
        }
    }
    Redirect::to("/").into_response()
}

async fn post_detail(State(state): State<AppState>, Path(uid): Path<String>) -> Response {
    if !is_path_safe(&uid) {
        return (
            StatusCode::NOT_FOUND,
            Html(html::render_not_found(&state.config, &uid)),
        )
            .into_response();
    }
    match state.details.lookup(&uid) {
        Lookup::Ready(page) => {
            let cache_control = format!(
                "s-maxage={}, stale-while-revalidate",
                state.config.revalidate.as_secs()
            );
            let mut response = Html(page.to_string()).into_response();
            if let Ok(value) = HeaderValue::from_str(&cache_control) {
                response.headers_mut().insert(header::CACHE_CONTROL, value);
            }
            response
        }
        Lookup::Loading => {
            let mut response = Html(html::render_loading(&state.config)).into_response();
            response
                .headers_mut()
                .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
            response
        }
        Lookup::NotFound => (
            StatusCode::NOT_FOUND,
            Html(html::render_not_found(&state.config, &uid)),
        )
            .into_response(),
        Lookup::Failed(message) => (
            StatusCode::BAD_GATEWAY,
            Html(html::render_error(&state.config, &message)),
        )
            .into_response(),
    }
}

async fn health() -> &'static str {
    "ok"
}

fn find_session(state: &AppState, raw_id: &str) -> Option<(SessionId, Arc<ListingSession>)> {
    let id = raw_id.parse::<SessionId>().ok()?;
    state.sessions.get(id).map(|s| (id, s))
}

fn listing_response(
    config: &SiteConfig,
    id: SessionId,
    state: &PaginationState,
    notice: Option<Notice>,
    status: StatusCode,
) -> Response {
    let view = ListingView {
        state,
        load_more: LoadMore::Form {
            action: format!("/sessions/{id}/more"),
        },
        links: PostLinks::Route,
        notice,
    };
    (status, Html(html::render_listing(config, &view))).into_response()
}

fn error_page(config: &SiteConfig, e: &Error) -> Response {
    warn!(error = %e, "rendering error page");
    let page = html::render_error(config, e.reader_message());
    (StatusCode::BAD_GATEWAY, Html(page)).into_response()
}
