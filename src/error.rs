use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("GET {} failed: {source}", redacted(.url))]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {} returned status {status}", redacted(.url))]
    Status { url: Url, status: StatusCode },

    #[error("GET {} failed after {attempts} throttled attempts", redacted(.url))]
    Throttled { url: Url, attempts: usize },

    #[error("could not decode response from {}: {source}", redacted(.url))]
    Decode {
        url: Url,
        #[source]
        source: serde_json::Error,
    },

    #[error("next page cursor is not a valid url: {source}")]
    InvalidCursor {
        cursor: String,
        #[source]
        source: url::ParseError,
    },

    #[error("content api at {endpoint} advertises no master ref")]
    MissingMasterRef { endpoint: Url },

    #[error("document {uid:?} is invalid: missing or unusable `{field}`")]
    MalformedDocument { uid: String, field: &'static str },

    #[error("no {doc_type} document with uid {uid:?}")]
    NotFound { doc_type: String, uid: String },

    #[error("a page load is already in flight")]
    LoadInFlight,
}

impl Error {
    /// True for failures reaching or understanding the content backend.
    ///
    /// These are recoverable: the view shows a notice and the user may retry.
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(
            self,
            Error::Request { .. }
                | Error::Status { .. }
                | Error::Throttled { .. }
                | Error::Decode { .. }
                | Error::InvalidCursor { .. }
                | Error::MissingMasterRef { .. }
        )
    }

    /// Short explanation safe to show a reader. Never contains URLs, which may
    /// carry the access token.
    pub fn reader_message(&self) -> &'static str {
        match self {
            Error::MalformedDocument { .. } => {
                "Um dos posts veio incompleto do servidor de conteúdo."
            }
            Error::NotFound { .. } => "Post não encontrado.",
            Error::LoadInFlight => "Os posts já estão sendo carregados.",
            _ => "O servidor de conteúdo não respondeu como esperado.",
        }
    }

    pub(crate) fn malformed(uid: &str, field: &'static str) -> Self {
        Error::MalformedDocument {
            uid: uid.to_string(),
            field,
        }
    }
}

/// A cursor string with its `access_token` masked; unparsable cursors are
/// not echoed at all.
pub(crate) fn redacted_cursor(cursor: &str) -> String {
    match Url::parse(cursor) {
        Ok(url) => redacted(&url),
        Err(_) => "<invalid cursor>".to_string(),
    }
}

/// The url with the `access_token` value masked, for messages and logs.
pub(crate) fn redacted(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == "access_token") {
        return url.to_string();
    }
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "access_token" { "***".into() } else { v };
            (k.into_owned(), v.into_owned())
        })
        .collect();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_backend_failures() {
        let url = Url::parse("https://repo.cdn.prismic.io/api/v2").unwrap();
        assert!(
            Error::Status {
                url: url.clone(),
                status: StatusCode::BAD_GATEWAY
            }
            .is_backend_unavailable()
        );
        assert!(Error::MissingMasterRef { endpoint: url }.is_backend_unavailable());
        assert!(!Error::malformed("hello", "title").is_backend_unavailable());
        assert!(!Error::LoadInFlight.is_backend_unavailable());
    }

    #[test]
    fn messages_mask_the_access_token() {
        let url = Url::parse(
            "https://repo.cdn.prismic.io/api/v2/documents/search?ref=X&access_token=SECRET&page=2",
        )
        .unwrap();
        let err = Error::Status {
            url,
            status: StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = err.to_string();
        assert!(!message.contains("SECRET"), "{message}");
        assert!(message.contains("access_token=***"), "{message}");
        assert!(message.contains("page=2"), "{message}");
        assert!(!err.reader_message().contains("prismic"));

        let err = Error::InvalidCursor {
            cursor: "::access_token=SECRET".to_string(),
            source: url::ParseError::RelativeUrlWithoutBase,
        };
        assert!(!err.to_string().contains("SECRET"));

        let cursor = "https://repo.cdn.prismic.io/api/v2/documents/search?access_token=SECRET";
        assert!(!redacted_cursor(cursor).contains("SECRET"));
        assert_eq!(redacted_cursor("not a url"), "<invalid cursor>");
    }

    #[test]
    fn malformed_message_names_field() {
        let err = Error::malformed("hello-world", "subtitle");
        assert_eq!(
            err.to_string(),
            "document \"hello-world\" is invalid: missing or unusable `subtitle`"
        );
    }
}
