//! JSON detection and header rewrites for padded responses.
//!
//! These are the response-side pieces of the JSON-P transform: deciding
//! whether a response is JSON at all, flattening error-looking statuses into
//! a `200` with an error-code body, and keeping `Content-Type` and
//! `Content-Length` consistent with the rewritten body.

use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;

use crate::body::ResponsePayload;

/// Content-Type substring that marks a response as JSON.
pub const APPLICATION_JSON: &str = "application/json";

/// Check whether the response headers advertise a JSON body.
///
/// True iff the `Content-Type` value contains the substring
/// `application/json`, case-sensitively. An absent header or a value that is
/// not valid visible ASCII counts as "not JSON"; detection never fails the
/// response.
pub fn is_json_response(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains(APPLICATION_JSON))
        .unwrap_or(false)
}

/// Flatten error-looking statuses into a `200` with an error-code body.
///
/// JSON-P clients load responses through `<script>` tags, which gives them no
/// access to the HTTP status, so errors have to be tunneled in-band. A status
/// matching `status % 400 == 4 || status % 500 == 5` is replaced by `200 OK`
/// and a buffered body holding exactly `{"errorCode":<status>}`; the original
/// payload is dropped unread. Any other status passes through.
///
/// The arithmetic is narrower than "any 4xx or 5xx": of the statuses
/// representable in HTTP, only 404, 505 and 804 match. 400, 403, 500, 502
/// and 504 do not.
pub fn translate_error_code(
    status: StatusCode,
    payload: ResponsePayload,
) -> (StatusCode, ResponsePayload) {
    let code = status.as_u16();
    if code % 400 == 4 || code % 500 == 5 {
        let body = serde_json::json!({ "errorCode": code }).to_string();
        (StatusCode::OK, ResponsePayload::Buffered(Bytes::from(body)))
    } else {
        (status, payload)
    }
}

/// Rewrite the `Content-Type` value for a padded body.
///
/// Replaces the first occurrence of the substring `json` with `javascript`,
/// case-sensitively, leaving the rest of the value (charset parameters and
/// the like) untouched. A value with no `json` in it is written back as-is.
pub fn rewrite_content_type(headers: &mut HeaderMap) {
    let rewritten = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.replacen("json", "javascript", 1));

    if let Some(rewritten) = rewritten {
        match HeaderValue::from_str(&rewritten) {
            Ok(value) => {
                headers.insert(CONTENT_TYPE, value);
            }
            Err(error) => {
                tracing::debug!(%error, "rewritten content-type not a valid header value, keeping original");
            }
        }
    }
}

/// Bring `Content-Length` in line with the padded body.
///
/// The header is overwritten with `len` only if the response already carried
/// it; a response that never declared a length keeps not declaring one.
pub fn refresh_content_length(headers: &mut HeaderMap, len: usize) {
    if headers.contains_key(CONTENT_LENGTH) {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    }
}
