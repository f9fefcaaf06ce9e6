//! Aggregated request parameters.
//!
//! JSON-P clients put the callback name wherever their HTTP library finds
//! convenient, so detection looks at both the query string and an urlencoded
//! form body, folded into one flat view. The view is an explicit value object
//! owned by the transform; the inner service keeps seeing the request exactly
//! as it arrived.

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Request};

use crate::body::failing_body;

/// Media type of an urlencoded form submission.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Decoded request parameters in arrival order: query string first, then
/// form body.
///
/// Duplicate names are all retained; lookups resolve to the last occurrence,
/// which makes form values shadow query values for the same name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams {
    pairs: Vec<(String, String)>,
}

impl RequestParams {
    /// Parse a raw query string or form-urlencoded body.
    ///
    /// Pairs split on `&`, names and values on the first `=`. A segment
    /// without `=` becomes a name with an empty value, so `?callback` counts
    /// as present. `+` decodes to space, then percent-sequences decode; a
    /// component that does not survive decoding is kept as it was written.
    pub fn parse(input: &str) -> Self {
        let mut params = Self::default();
        params.extend_from(input);
        params
    }

    /// Collect parameters from a request, buffering the body when it is an
    /// urlencoded form.
    ///
    /// The request is handed back with a byte-identical body for the inner
    /// service. If buffering the form body fails, the failure is not
    /// swallowed: the returned request carries a body reproducing the same
    /// error, and only query parameters are recorded.
    pub async fn from_request(req: Request<Body>) -> (Self, Request<Body>) {
        let mut params = Self::parse(req.uri().query().unwrap_or(""));

        if !is_form_urlencoded(req.headers()) {
            return (params, req);
        }

        let (parts, body) = req.into_parts();
        match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => {
                params.extend_from(&String::from_utf8_lossy(&bytes));
                (params, Request::from_parts(parts, Body::from(bytes)))
            }
            Err(error) => (params, Request::from_parts(parts, failing_body(error))),
        }
    }

    /// Whether a parameter with this name is present, even with an empty
    /// value.
    pub fn contains(&self, name: &str) -> bool {
        self.pairs.iter().any(|(n, _)| n == name)
    }

    /// Value of the last occurrence of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Remove every occurrence of `name`, returning the value of the last
    /// one.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let mut last = None;
        self.pairs.retain_mut(|(n, v)| {
            if n == name {
                last = Some(std::mem::take(v));
                false
            } else {
                true
            }
        });
        last
    }

    /// Number of retained pairs, duplicates included.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate pairs in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    fn extend_from(&mut self, input: &str) {
        for segment in input.split('&') {
            if segment.is_empty() {
                continue;
            }
            let (name, value) = match segment.split_once('=') {
                Some((name, value)) => (name, value),
                None => (segment, ""),
            };
            self.pairs
                .push((decode_component(name), decode_component(value)));
        }
    }
}

/// Decode one urlencoded component: `+` means space, then percent-decoding.
///
/// Decoding only fails on invalid UTF-8; in that case the component is
/// returned with percent-sequences intact rather than dropped.
fn decode_component(raw: &str) -> String {
    let plus_decoded = raw.replace('+', " ");
    urlencoding::decode(&plus_decoded)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(plus_decoded)
}

/// Check whether the request body is an urlencoded form.
///
/// Media type comparison is ASCII case-insensitive and ignores parameters
/// after `;`, unlike the case-sensitive substring match used for response
/// detection.
fn is_form_urlencoded(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .map(|media_type| media_type.trim().eq_ignore_ascii_case(FORM_URLENCODED))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use bytes::Bytes;

    // ---- Parsing ----

    #[test]
    fn test_parse_pairs() {
        let params = RequestParams::parse("a=1&b=2");
        assert_eq!(params.get("a"), Some("1"));
        assert_eq!(params.get("b"), Some("2"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(RequestParams::parse("").is_empty());
    }

    #[test]
    fn test_parse_skips_empty_segments() {
        let params = RequestParams::parse("&a=1&&b=2&");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_parse_valueless_name_counts_as_present() {
        let params = RequestParams::parse("callback");
        assert!(params.contains("callback"));
        assert_eq!(params.get("callback"), Some(""));
    }

    #[test]
    fn test_parse_empty_value() {
        let params = RequestParams::parse("callback=");
        assert!(params.contains("callback"));
        assert_eq!(params.get("callback"), Some(""));
    }

    #[test]
    fn test_parse_decodes_plus_and_percent() {
        let params = RequestParams::parse("full+name=Jane+Doe&sym=%26%3D&plus=%2B");
        assert_eq!(params.get("full name"), Some("Jane Doe"));
        assert_eq!(params.get("sym"), Some("&="));
        assert_eq!(params.get("plus"), Some("+"));
    }

    #[test]
    fn test_parse_keeps_undecodable_component() {
        // %ff alone is not valid UTF-8 after decoding
        let params = RequestParams::parse("raw=%ff");
        assert_eq!(params.get("raw"), Some("%ff"));
    }

    #[test]
    fn test_get_prefers_last_occurrence() {
        let params = RequestParams::parse("a=1&a=2&a=3");
        assert_eq!(params.get("a"), Some("3"));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_remove_strips_all_occurrences() {
        let mut params = RequestParams::parse("a=1&callback=first&b=2&callback=second");
        assert_eq!(params.remove("callback").as_deref(), Some("second"));
        assert!(!params.contains("callback"));
        assert_eq!(params.len(), 2);
        assert_eq!(params.remove("callback"), None);
    }

    #[test]
    fn test_iter_keeps_arrival_order() {
        let params = RequestParams::parse("b=2&a=1&b=3");
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("b", "2"), ("a", "1"), ("b", "3")]);
    }

    // ---- Request aggregation ----

    async fn body_bytes(req: Request<Body>) -> Vec<u8> {
        axum::body::to_bytes(req.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_from_request_query_only() {
        let req = Request::builder()
            .uri("/widgets?callback=cb&page=2")
            .body(Body::empty())
            .unwrap();

        let (params, req) = RequestParams::from_request(req).await;
        assert_eq!(params.get("callback"), Some("cb"));
        assert_eq!(params.get("page"), Some("2"));
        assert!(body_bytes(req).await.is_empty());
    }

    #[tokio::test]
    async fn test_from_request_reads_form_body() {
        let req = Request::builder()
            .method("POST")
            .uri("/widgets")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("callback=cb&name=Jane+Doe"))
            .unwrap();

        let (params, req) = RequestParams::from_request(req).await;
        assert_eq!(params.get("callback"), Some("cb"));
        assert_eq!(params.get("name"), Some("Jane Doe"));
        // The inner service must still see the raw form bytes
        assert_eq!(body_bytes(req).await, b"callback=cb&name=Jane+Doe");
    }

    #[tokio::test]
    async fn test_from_request_form_shadows_query() {
        let req = Request::builder()
            .method("POST")
            .uri("/widgets?callback=from-query")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("callback=from-form"))
            .unwrap();

        let (params, _req) = RequestParams::from_request(req).await;
        assert_eq!(params.get("callback"), Some("from-form"));
        assert_eq!(params.len(), 2);
    }

    #[tokio::test]
    async fn test_from_request_media_type_case_insensitive() {
        let req = Request::builder()
            .method("POST")
            .uri("/widgets")
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("Application/X-WWW-Form-Urlencoded; charset=UTF-8"),
            )
            .body(Body::from("callback=cb"))
            .unwrap();

        let (params, _req) = RequestParams::from_request(req).await;
        assert!(params.contains("callback"));
    }

    #[tokio::test]
    async fn test_from_request_ignores_non_form_body() {
        let req = Request::builder()
            .method("POST")
            .uri("/widgets")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"callback":"cb"}"#))
            .unwrap();

        let (params, req) = RequestParams::from_request(req).await;
        assert!(params.is_empty());
        assert_eq!(body_bytes(req).await, br#"{"callback":"cb"}"#);
    }

    #[tokio::test]
    async fn test_from_request_ignores_multipart_body() {
        let form = "--x\r\ncontent-disposition: form-data; name=\"callback\"\r\n\r\ncb\r\n--x--\r\n";
        let req = Request::builder()
            .method("POST")
            .uri("/widgets")
            .header(CONTENT_TYPE, "multipart/form-data; boundary=x")
            .body(Body::from(form))
            .unwrap();

        let (params, req) = RequestParams::from_request(req).await;
        assert!(params.is_empty());
        assert_eq!(body_bytes(req).await, form.as_bytes());
    }

    #[tokio::test]
    async fn test_from_request_broken_form_body_replays_error() {
        let broken = Body::from_stream(futures::stream::once(async {
            Err::<Bytes, std::io::Error>(std::io::Error::other("client went away"))
        }));
        let req = Request::builder()
            .method("POST")
            .uri("/widgets?callback=cb&page=2")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(broken)
            .unwrap();

        let (params, req) = RequestParams::from_request(req).await;
        // Only the query pairs survive when the form body cannot be read
        assert_eq!(params.get("callback"), Some("cb"));
        assert_eq!(params.get("page"), Some("2"));
        assert_eq!(params.len(), 2);

        let error = axum::body::to_bytes(req.into_body(), usize::MAX)
            .await
            .unwrap_err();
        assert!(error.to_string().contains("client went away"));
    }
}
