//! HAR 1.2 capture loading.
//!
//! Only the fields replay needs are read; everything else in the document
//! is ignored. Entries are kept in file order. A request whose `postData`
//! carries neither `text` nor `params` while `bodySize` is positive keeps
//! that size as its declared body length, which replay rejects.

use crate::error::{BenchError, BenchResult};
use crate::http1::DEFAULT_VERSION;
use crate::message::{HeaderField, Message};
use crate::session::{Exchange, Session};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde::de::IgnoredAny;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct HarDocument {
    log: HarLog,
}

#[derive(Debug, Deserialize)]
struct HarLog {
    #[serde(default)]
    entries: Vec<HarEntry>,
}

#[derive(Debug, Deserialize)]
struct HarEntry {
    request: HarRequest,
    #[serde(default)]
    response: Option<HarResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HarRequest {
    method: String,
    url: String,
    #[serde(default)]
    http_version: String,
    #[serde(default)]
    headers: Vec<HarHeader>,
    #[serde(default)]
    post_data: Option<HarPostData>,
    #[serde(default)]
    body_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HarResponse {
    status: i64,
    #[serde(default)]
    status_text: String,
    #[serde(default)]
    http_version: String,
    #[serde(default)]
    headers: Vec<HarHeader>,
    #[serde(default)]
    content: Option<HarContent>,
}

#[derive(Debug, Deserialize)]
struct HarHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct HarPostData {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    params: Vec<IgnoredAny>,
}

#[derive(Debug, Deserialize)]
struct HarContent {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

/// Read a HAR file into a session
///
/// # Errors
///
/// Returns `Io` if the file cannot be read and `Har` if it is not a usable
/// HAR document.
pub fn load_session(path: impl AsRef<Path>) -> BenchResult<Session> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
    let session = parse_session(&text, path)?;
    tracing::debug!(path = %path.display(), exchanges = session.len(), "loaded capture");
    Ok(session)
}

/// Parse HAR JSON text; `origin` is only used in error messages
///
/// # Errors
///
/// Returns `Har` if the text is not a usable HAR document.
pub fn parse_session(text: &str, origin: &Path) -> BenchResult<Session> {
    let har_error = |reason: String| BenchError::Har {
        path: origin.to_path_buf(),
        reason,
    };

    let doc: HarDocument = serde_json::from_str(text).map_err(|e| har_error(e.to_string()))?;

    let mut session = Session::new();
    for (index, entry) in doc.log.entries.into_iter().enumerate() {
        let request = convert_request(entry.request);
        let response = match entry.response {
            Some(res) if res.status > 0 => Some(
                convert_response(res)
                    .map_err(|reason| har_error(format!("entry {}: {}", index, reason)))?,
            ),
            _ => None,
        };
        let exchange = Exchange::new(request, response)?;
        session.push(exchange);
    }
    Ok(session)
}

fn convert_request(req: HarRequest) -> Message {
    let (scheme, authority, path) = split_url(&req.url);
    let host = req
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case("host"))
        .map_or(authority, |h| h.value.as_str());

    let mut headers = vec![
        HeaderField::new(":method", req.method.as_str()),
        HeaderField::new(":path", path),
        HeaderField::new(":version", version_or_default(&req.http_version)),
        HeaderField::new(":scheme", scheme),
        HeaderField::new(":host", host),
    ];
    headers.extend(
        req.headers
            .iter()
            .filter(|h| !h.name.starts_with(':') && !h.name.eq_ignore_ascii_case("host"))
            .map(|h| HeaderField::new(h.name.to_ascii_lowercase(), h.value.as_str())),
    );

    match req.post_data {
        Some(HarPostData {
            text: Some(text), ..
        }) => Message::request(headers, text.into_bytes()),
        // postData without text or params: the body was claimed but not recorded
        Some(HarPostData { text: None, params }) if params.is_empty() => {
            let message = Message::request(headers, Vec::new());
            match req.body_size.and_then(|n| usize::try_from(n).ok()) {
                Some(len) if len > 0 => message.with_declared_body_len(len),
                _ => message,
            }
        }
        _ => Message::request(headers, Vec::new()),
    }
}

fn convert_response(res: HarResponse) -> Result<Message, String> {
    let mut headers = vec![
        HeaderField::new(":status", res.status.to_string()),
        HeaderField::new(":status-text", res.status_text.as_str()),
        HeaderField::new(":version", version_or_default(&res.http_version)),
    ];
    headers.extend(
        res.headers
            .iter()
            .filter(|h| !h.name.starts_with(':'))
            .map(|h| HeaderField::new(h.name.to_ascii_lowercase(), h.value.as_str())),
    );

    let body = match res.content {
        Some(HarContent {
            text: Some(text),
            encoding,
        }) => {
            if encoding.as_deref() == Some("base64") {
                BASE64
                    .decode(text.as_bytes())
                    .map_err(|e| format!("bad base64 body: {}", e))?
            } else {
                text.into_bytes()
            }
        }
        _ => Vec::new(),
    };

    Ok(Message::response(headers, body))
}

fn version_or_default(version: &str) -> &str {
    if version.is_empty() {
        DEFAULT_VERSION
    } else {
        version
    }
}

/// Split a URL into (scheme, authority, path-and-query). Fragments are dropped.
fn split_url(url: &str) -> (&str, &str, &str) {
    let url = url.split('#').next().unwrap_or(url);
    let Some((scheme, rest)) = url.split_once("://") else {
        return ("http", "", if url.is_empty() { "/" } else { url });
    };
    match rest.find(['/', '?']) {
        Some(pos) => (scheme, &rest[..pos], &rest[pos..]),
        None => (scheme, rest, "/"),
    }
}
