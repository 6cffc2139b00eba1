//! Projection of raw documents into the display-ready shape shared by views.

use serde::Serialize;

use crate::date::{DatePreset, format_date};
use crate::document::{RawContentBlock, RawPost, RawSpan, RawTextRun};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedPost {
    pub uid: String,
    /// Already formatted for display; `None` when the document was never published.
    pub first_publication_date: Option<String>,
    pub data: PostData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostData {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<Banner>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentBlock>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Banner {
    pub url: String,
    /// Alt text set in the CMS, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentBlock {
    pub heading: String,
    pub body: Vec<TextRun>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRun {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub spans: Vec<Span>,
}

/// Inline annotation over `start..end` (character offsets) of a run.
///
/// `data` is left out of the serialized form entirely when the backend sent no
/// payload; consumers branch on the key being present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Builds the listing projection: uid, date (listing preset) and the three
/// summary fields.
///
/// The uid ends up in links and, for the static build, in file names, so it
/// must be a single path segment.
pub fn normalize_listing(raw: &RawPost) -> Result<NormalizedPost> {
    let uid = required(raw.uid.as_deref(), "<unknown>", "uid")?;
    if !is_path_safe(uid) {
        return Err(Error::malformed(uid, "uid"));
    }
    Ok(NormalizedPost {
        first_publication_date: display_date(raw, DatePreset::Listing),
        data: PostData {
            title: required(raw.data.title.as_deref(), uid, "title")?.to_string(),
            subtitle: required(raw.data.subtitle.as_deref(), uid, "subtitle")?.to_string(),
            author: required(raw.data.author.as_deref(), uid, "author")?.to_string(),
            banner: None,
            content: None,
        },
        uid: uid.to_string(),
    })
}

/// Builds the detail projection, which adds the banner and the content blocks.
pub fn normalize_detail(raw: &RawPost) -> Result<NormalizedPost> {
    let mut post = normalize_listing(raw)?;
    post.first_publication_date = display_date(raw, DatePreset::Detail);

    let banner = raw.data.banner.as_ref();
    let banner_url = banner
        .and_then(|b| b.url.as_deref())
        .ok_or_else(|| Error::malformed(&post.uid, "banner.url"))?;
    let content = raw
        .data
        .content
        .as_ref()
        .ok_or_else(|| Error::malformed(&post.uid, "content"))?;

    post.data.banner = Some(Banner {
        url: banner_url.to_string(),
        alt: banner
            .and_then(|b| b.alt.as_deref())
            .filter(|a| !a.trim().is_empty())
            .map(str::to_string),
    });
    post.data.content = Some(content.iter().map(normalize_block).collect());
    Ok(post)
}

fn normalize_block(block: &RawContentBlock) -> ContentBlock {
    ContentBlock {
        heading: block.heading.clone().unwrap_or_default(),
        body: block.body.iter().map(normalize_run).collect(),
    }
}

fn normalize_run(run: &RawTextRun) -> TextRun {
    TextRun {
        text: run.text.clone(),
        kind: run.kind.clone(),
        spans: run.spans.iter().map(normalize_span).collect(),
    }
}

fn normalize_span(span: &RawSpan) -> Span {
    Span {
        start: span.start,
        end: span.end,
        kind: span.kind.clone(),
        data: span.data.clone(),
    }
}

fn display_date(raw: &RawPost, preset: DatePreset) -> Option<String> {
    raw.first_publication_date
        .as_deref()
        .map(|iso| format_date(iso, preset))
}

/// Letters, digits, `-`, `_` and `.`, excluding the `.` and `..` segments.
pub fn is_path_safe(uid: &str) -> bool {
    !uid.is_empty()
        && uid != "."
        && uid != ".."
        && uid
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn required<'a>(value: Option<&'a str>, uid: &str, field: &'static str) -> Result<&'a str> {
    value.ok_or_else(|| Error::malformed(uid, field))
}
