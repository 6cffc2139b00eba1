mod common;

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use httpmock::Method::GET;
use httpmock::MockServer;
use spacetraveling::config::SiteConfig;
use spacetraveling::html::{LOAD_MORE_LABEL, LOADING_LABEL};
use spacetraveling::server::{AppState, router};
use tower::ServiceExt as _;

use common::{
    client, client_with_token, detail, mock_api_root, mock_cursor, mock_document, mock_first_page,
    mock_missing_document, page, summary,
};

struct Reply {
    status: StatusCode,
    location: Option<String>,
    cache_control: Option<String>,
    body: String,
}

async fn send(app: &Router, method: Method, uri: &str) -> Reply {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let header_string = |name: header::HeaderName| {
        response
            .headers()
            .get(name)
            .map(|v| v.to_str().unwrap().to_string())
    };
    let location = header_string(header::LOCATION);
    let cache_control = header_string(header::CACHE_CONTROL);
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    Reply {
        status,
        location,
        cache_control,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

fn app(server: &MockServer) -> Router {
    router(AppState::new(client(server), SiteConfig::default()))
}

/// Pulls the session id out of the listing's load-more form.
fn session_id(body: &str) -> String {
    let start = body.find("/sessions/").expect("load-more form") + "/sessions/".len();
    let rest = &body[start..];
    rest[..rest.find('/').unwrap()].to_string()
}

async fn mock_two_page_listing(server: &MockServer) {
    mock_api_root(server).await;
    mock_first_page(
        server,
        page(
            Some(server.url("/cursor/2")),
            vec![
                summary(
                    "como-utilizar-hooks",
                    "Como utilizar Hooks",
                    "2021-03-15T19:25:28+0000",
                ),
                summary(
                    "criando-um-app-cra-do-zero",
                    "Criando um app CRA do zero",
                    "2021-03-25T19:27:35+0000",
                ),
            ],
        ),
    )
    .await;
    mock_cursor(
        server,
        "/cursor/2",
        page(None, vec![summary("third", "Terceiro post", "2021-04-01T08:00:00+0000")]),
    )
    .await;
}

#[tokio::test]
async fn home_lists_first_page_with_load_more() {
    let server = MockServer::start_async().await;
    mock_two_page_listing(&server).await;
    let app = app(&server);

    let reply = send(&app, Method::GET, "/").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("Como utilizar Hooks"));
    assert!(reply.body.contains("15 março 2021"));
    assert!(reply.body.contains(r#"href="/post/como-utilizar-hooks""#));
    assert!(reply.body.contains(LOAD_MORE_LABEL));
    assert!(!reply.body.contains("Terceiro post"));

    let id = session_id(&reply.body);
    assert!(reply.body.contains(&format!(r#"action="/sessions/{id}/more""#)));
}

#[tokio::test]
async fn load_more_appends_and_hides_the_button() {
    let server = MockServer::start_async().await;
    mock_two_page_listing(&server).await;
    let app = app(&server);

    let home = send(&app, Method::GET, "/").await;
    let id = session_id(&home.body);

    let more = send(&app, Method::POST, &format!("/sessions/{id}/more")).await;
    assert_eq!(more.status, StatusCode::SEE_OTHER);
    assert_eq!(more.location.as_deref(), Some(format!("/sessions/{id}").as_str()));

    let listing = send(&app, Method::GET, &format!("/sessions/{id}")).await;
    assert_eq!(listing.status, StatusCode::OK);
    let first = listing.body.find("Como utilizar Hooks").unwrap();
    let third = listing.body.find("Terceiro post").unwrap();
    assert!(first < third);
    assert!(!listing.body.contains(LOAD_MORE_LABEL));

    // Nothing left to load: still a redirect, nothing appended.
    let again = send(&app, Method::POST, &format!("/sessions/{id}/more")).await;
    assert_eq!(again.status, StatusCode::SEE_OTHER);
    let listing = send(&app, Method::GET, &format!("/sessions/{id}")).await;
    assert_eq!(listing.body.matches("Terceiro post").count(), 1);
}

#[tokio::test]
async fn unknown_or_closed_session_goes_home() {
    let server = MockServer::start_async().await;
    mock_two_page_listing(&server).await;
    let app = app(&server);

    let reply = send(&app, Method::GET, "/sessions/not-hex").await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location.as_deref(), Some("/"));

    let home = send(&app, Method::GET, "/").await;
    let id = session_id(&home.body);
    let closed = send(&app, Method::POST, &format!("/sessions/{id}/close")).await;
    assert_eq!(closed.location.as_deref(), Some("/"));

    let reply = send(&app, Method::POST, &format!("/sessions/{id}/more")).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location.as_deref(), Some("/"));
}

#[tokio::test]
async fn failed_load_more_shows_an_alert_and_keeps_posts() {
    let server = MockServer::start_async().await;
    mock_api_root(&server).await;
    mock_first_page(
        &server,
        page(
            Some(server.url("/broken")),
            vec![summary("a", "Primeiro", "2021-03-15T19:25:28+0000")],
        ),
    )
    .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/broken");
            then.status(500);
        })
        .await;
    let app = app(&server);

    let home = send(&app, Method::GET, "/").await;
    let id = session_id(&home.body);

    let reply = send(&app, Method::POST, &format!("/sessions/{id}/more")).await;
    assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
    assert!(reply.body.contains(r#"role="alert""#));
    assert!(reply.body.contains("Primeiro"));
    assert!(reply.body.contains(LOAD_MORE_LABEL));

    // The failure stays visible on the session page until the next attempt.
    let listing = send(&app, Method::GET, &format!("/sessions/{id}")).await;
    assert!(listing.body.contains(r#"role="alert""#));
}

#[tokio::test]
async fn home_reports_backend_outage() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v2");
            then.status(500);
        })
        .await;

    let reply = send(&app(&server), Method::GET, "/").await;
    assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
    assert!(!reply.body.contains(LOAD_MORE_LABEL));
}

#[tokio::test]
async fn post_page_shows_loading_then_the_post() {
    let server = MockServer::start_async().await;
    mock_api_root(&server).await;
    mock_document(
        &server,
        "como-utilizar-hooks",
        detail("como-utilizar-hooks", "Como utilizar Hooks"),
    )
    .await;
    let app = app(&server);

    let first = send(&app, Method::GET, "/post/como-utilizar-hooks").await;
    assert_eq!(first.status, StatusCode::OK);
    assert!(first.body.contains(LOADING_LABEL));
    assert_eq!(first.cache_control.as_deref(), Some("no-store"));

    let mut ready = None;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let reply = send(&app, Method::GET, "/post/como-utilizar-hooks").await;
        if !reply.body.contains(LOADING_LABEL) {
            ready = Some(reply);
            break;
        }
    }
    let ready = ready.expect("post page was generated");
    assert_eq!(ready.status, StatusCode::OK);
    assert!(ready.body.contains("Como utilizar Hooks"));
    assert!(ready.body.contains("25 mar 2021"));
    assert!(ready.body.contains("Joseph Oliveira"));
    assert!(ready.body.contains(r#"<span class="reading-time">1 min</span>"#));
    assert!(ready.body.contains("<strong>Lorem</strong>"));
    assert_eq!(
        ready.cache_control.as_deref(),
        Some("s-maxage=1800, stale-while-revalidate")
    );
}

#[tokio::test]
async fn missing_post_is_not_found() {
    let server = MockServer::start_async().await;
    mock_api_root(&server).await;
    mock_missing_document(&server, "nope").await;
    let app = app(&server);

    let first = send(&app, Method::GET, "/post/nope").await;
    assert!(first.body.contains(LOADING_LABEL));

    let mut status = first.status;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        status = send(&app, Method::GET, "/post/nope").await.status;
        if status != StatusCode::OK {
            break;
        }
    }
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_check() {
    let server = MockServer::start_async().await;
    let reply = send(&app(&server), Method::GET, "/healthz").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "ok");
}

const TOKEN: &str = "SUPERSECRETTOKEN";

#[tokio::test]
async fn outage_page_does_not_show_the_access_token() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v2");
            then.status(500);
        })
        .await;
    let app = router(AppState::new(
        client_with_token(&server, TOKEN),
        SiteConfig::default(),
    ));

    let reply = send(&app, Method::GET, "/").await;
    assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
    assert!(!reply.body.contains(TOKEN), "{}", reply.body);
    assert!(!reply.body.contains("/api/v2"), "{}", reply.body);
}

#[tokio::test]
async fn failed_load_more_does_not_show_the_cursor() {
    let server = MockServer::start_async().await;
    mock_api_root(&server).await;
    mock_first_page(
        &server,
        page(
            Some(server.url(&format!("/broken?page=2&access_token={TOKEN}"))),
            vec![summary("a", "Primeiro", "2021-03-15T19:25:28+0000")],
        ),
    )
    .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/broken");
            then.status(503).header("retry-after", "0");
        })
        .await;
    let app = router(AppState::new(
        client_with_token(&server, TOKEN),
        SiteConfig::default(),
    ));

    let home = send(&app, Method::GET, "/").await;
    assert!(!home.body.contains(TOKEN));
    let id = session_id(&home.body);

    let reply = send(&app, Method::POST, &format!("/sessions/{id}/more")).await;
    assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
    assert!(reply.body.contains(r#"role="alert""#));
    assert!(!reply.body.contains(TOKEN), "{}", reply.body);

    let listing = send(&app, Method::GET, &format!("/sessions/{id}")).await;
    assert!(!listing.body.contains(TOKEN), "{}", listing.body);
}

#[tokio::test]
async fn unsafe_post_uid_is_not_looked_up() {
    let server = MockServer::start_async().await;
    let any = server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(200).json_body(page(None, vec![]));
        })
        .await;

    let reply = send(&app(&server), Method::GET, "/post/..%2F..%2Fetc").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(any.hits_async().await, 0);
}
