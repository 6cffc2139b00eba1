//! Wire shapes returned by the content API.
//!
//! Fields are lenient here; required-field checks happen in `normalize`.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RawPost {
    pub uid: Option<String>,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub data: RawPostData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPostData {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub banner: Option<RawBanner>,
    #[serde(default)]
    pub content: Option<Vec<RawContentBlock>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBanner {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawContentBlock {
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub body: Vec<RawTextRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTextRun {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<RawSpan>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSpan {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    /// `null` and a missing key both deserialize to `None`.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// One page of query results. `next_page` is an opaque absolute URL.
///
/// A response without a `next_page` key is read as exhausted, same as `null`.
#[derive(Debug, Clone, Deserialize)]
pub struct PageResponse {
    #[serde(default)]
    pub next_page: Option<String>,
    pub results: Vec<RawPost>,
}

impl PageResponse {
    /// The cursor for the following page, with empty strings treated as absent.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_page.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Root of the content API, used to resolve the master ref.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiInfo {
    pub refs: Vec<ApiRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRef {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "isMasterRef", default)]
    pub is_master_ref: bool,
}

impl ApiInfo {
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference.as_str())
    }
}
