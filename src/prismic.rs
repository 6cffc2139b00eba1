//! Client for the Prismic REST API (v2).
//!
//! Queries are issued against the master ref; the ref is resolved from the
//! API root on every query so published edits show up on the next render.

use std::fmt;

use url::Url;

use crate::document::{ApiInfo, PageResponse, RawPost};
use crate::error::{Error, Result, redacted};
use crate::fetcher::Fetcher;
use crate::progress::DownloadKind;

/// Document type holding blog posts.
pub const POSTS_TYPE: &str = "posts";

/// Fields fetched for the listing page.
pub const LISTING_FIELDS: [&str; 3] = ["posts.title", "posts.subtitle", "posts.author"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    At { path: String, value: String },
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::At {
            path: path.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::At { path, value } => {
                write!(f, "[at({}, \"{}\")]", path, value.replace('"', "\\\""))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    pub fetch: Vec<String>,
    pub page_size: u32,
}

impl Query {
    pub fn documents_of_type(doc_type: &str) -> Self {
        Self {
            predicates: vec![Predicate::at("document.type", doc_type)],
            fetch: Vec::new(),
            page_size: 20,
        }
    }

    pub fn fetch(mut self, fields: &[&str]) -> Self {
        self.fetch = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn q(&self) -> String {
        let mut out = String::from("[");
        for p in &self.predicates {
            out.push_str(&p.to_string());
        }
        out.push(']');
        out
    }
}

#[derive(Clone)]
pub struct PrismicClient {
    fetcher: Fetcher,
    endpoint: Url,
    access_token: Option<String>,
}

impl PrismicClient {
    pub fn new(fetcher: Fetcher, endpoint: Url, access_token: Option<String>) -> Self {
        Self {
            fetcher,
            endpoint,
            access_token: access_token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn master_ref(&self) -> Result<String> {
        let mut url = self.endpoint.clone();
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair("access_token", token);
        }
        let info: ApiInfo = self.fetcher.get_json(url, DownloadKind::Api).await?;
        info.master_ref()
            .map(str::to_string)
            .ok_or_else(|| Error::MissingMasterRef {
                endpoint: self.endpoint.clone(),
            })
    }

    /// Runs a query and returns the first page of results.
    pub async fn query(&self, query: &Query) -> Result<PageResponse> {
        let reference = self.master_ref().await?;
        let url = self.search_url(&reference, query);
        tracing::debug!(url = %redacted(&url), "querying content api");
        self.fetcher.get_json(url, DownloadKind::Page).await
    }

    /// Fetches the page behind an opaque `next_page` cursor, verbatim.
    pub async fn fetch_page(&self, cursor: &str) -> Result<PageResponse> {
        let url = Url::parse(cursor).map_err(|source| Error::InvalidCursor {
            cursor: cursor.to_string(),
            source,
        })?;
        tracing::debug!(url = %redacted(&url), "following next_page cursor");
        self.fetcher.get_json(url, DownloadKind::Page).await
    }

    pub async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawPost> {
        let reference = self.master_ref().await?;
        let query = Query {
            predicates: vec![Predicate::at(format!("my.{doc_type}.uid"), uid)],
            fetch: Vec::new(),
            page_size: 1,
        };
        let url = self.search_url(&reference, &query);
        let page: PageResponse = self.fetcher.get_json(url, DownloadKind::Document).await?;
        page.results
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound {
                doc_type: doc_type.to_string(),
                uid: uid.to_string(),
            })
    }

    fn search_url(&self, reference: &str, query: &Query) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segs) = url.path_segments_mut() {
            segs.pop_if_empty().push("documents").push("search");
        }
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ref", reference);
            pairs.append_pair("q", &query.q());
            pairs.append_pair("pageSize", &query.page_size.to_string());
            if !query.fetch.is_empty() {
                pairs.append_pair("fetch", &query.fetch.join(","));
            }
            if let Some(token) = &self.access_token {
                pairs.append_pair("access_token", token);
            }
        }
        url
    }
}
