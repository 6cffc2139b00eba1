#![allow(dead_code)]

use std::time::Duration;

use httpmock::Method::GET;
use httpmock::MockServer;
use serde_json::{Value, json};
use spacetraveling::fetcher::Fetcher;
use spacetraveling::prismic::PrismicClient;
use url::Url;

pub const LISTING_Q: &str = r#"[[at(document.type, "posts")]]"#;

pub fn client(server: &MockServer) -> PrismicClient {
    client_with_timeout(server, Duration::from_secs(5))
}

pub fn client_with_timeout(server: &MockServer, timeout: Duration) -> PrismicClient {
    build_client(server, timeout, None)
}

pub fn client_with_token(server: &MockServer, token: &str) -> PrismicClient {
    build_client(server, Duration::from_secs(5), Some(token.to_string()))
}

fn build_client(server: &MockServer, timeout: Duration, token: Option<String>) -> PrismicClient {
    let fetcher = Fetcher::new("spacetraveling-test", timeout, 4, None).unwrap();
    PrismicClient::new(fetcher, Url::parse(&server.url("/api/v2")).unwrap(), token)
}

pub fn summary(uid: &str, title: &str, date: &str) -> Value {
    json!({
        "uid": uid,
        "first_publication_date": date,
        "data": {
            "title": title,
            "subtitle": format!("{title}: subtitle"),
            "author": "Danilo Vieira"
        }
    })
}

pub fn page(next_page: Option<String>, results: Vec<Value>) -> Value {
    json!({ "next_page": next_page, "results": results })
}

pub fn detail(uid: &str, title: &str) -> Value {
    json!({
        "uid": uid,
        "first_publication_date": "2021-03-25T19:25:28+0000",
        "data": {
            "title": title,
            "subtitle": "Pensando em sincronização em vez de ciclos de vida",
            "author": "Joseph Oliveira",
            "banner": {"url": format!("https://images.prismic.io/{uid}.png")},
            "content": [
                {
                    "heading": "Proin et varius",
                    "body": [
                        {
                            "type": "paragraph",
                            "text": "Lorem ipsum dolor sit amet",
                            "spans": [
                                {"start": 0, "end": 5, "type": "strong"},
                                {"start": 6, "end": 11, "type": "hyperlink", "data": {"link_type": "Web", "url": "https://example.com"}}
                            ]
                        }
                    ]
                }
            ]
        }
    })
}

/// API root advertising a master ref.
pub async fn mock_api_root(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v2");
            then.status(200).json_body(json!({
                "refs": [{"id": "master", "ref": "MASTER", "label": "Master", "isMasterRef": true}]
            }));
        })
        .await;
}

/// The listing query's first page.
pub async fn mock_first_page(server: &MockServer, body: Value) {
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v2/documents/search")
                .query_param("ref", "MASTER")
                .query_param("q", LISTING_Q);
            then.status(200).json_body(body);
        })
        .await;
}

/// A page behind an opaque cursor path.
pub async fn mock_cursor(server: &MockServer, path: &str, body: Value) {
    server
        .mock_async(|when, then| {
            when.method(GET).path(path);
            then.status(200).json_body(body);
        })
        .await;
}

pub async fn mock_document(server: &MockServer, uid: &str, body: Value) {
    let q = format!(r#"[[at(my.posts.uid, "{uid}")]]"#);
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v2/documents/search")
                .query_param("q", q.as_str());
            then.status(200).json_body(page(None, vec![body]));
        })
        .await;
}

pub async fn mock_missing_document(server: &MockServer, uid: &str) {
    let q = format!(r#"[[at(my.posts.uid, "{uid}")]]"#);
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v2/documents/search")
                .query_param("q", q.as_str());
            then.status(200).json_body(page(None, vec![]));
        })
        .await;
}
