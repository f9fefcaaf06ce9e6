//! JSON-P padding layer.
//!
//! Wraps an inner service and rewrites its JSON responses into JavaScript
//! function calls when the request asks for one. The rewrite is strictly
//! opt-in per request: without a `callback` parameter, or for any non-JSON
//! response, the inner service's output passes through untouched.

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::{Layer, Service};

use crate::body::{self, ResponsePayload};
use crate::params::RequestParams;
use crate::transform;

/// Request parameter naming the JavaScript function to pad with.
pub const CALLBACK_PARAM: &str = "callback";

/// Layer that applies JSON-P padding to JSON responses on request.
///
/// A response qualifies when its `Content-Type` contains `application/json`
/// and the request carries a `callback` parameter in the query string or an
/// urlencoded form body. Qualifying responses come back as
/// `<callback>(<body>)` with a JavaScript `Content-Type`; error-looking
/// statuses are flattened to `200 OK` with an `{"errorCode":N}` body first,
/// since script tags give the client no way to observe the real status.
///
/// # Example
///
/// ```rust,ignore
/// use axum::{Router, routing::get};
/// use jsonp_axum::JsonpLayer;
///
/// let app = Router::new()
///     .route("/quotes", get(quotes))
///     .layer(JsonpLayer::new());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonpLayer;

impl JsonpLayer {
    /// Create a new JsonpLayer. There is nothing to configure.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S> Layer<S> for JsonpLayer {
    type Service = JsonpService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        JsonpService { inner }
    }
}

/// Service produced by [`JsonpLayer`].
#[derive(Debug, Clone)]
pub struct JsonpService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for JsonpService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Clone inner service for the async block
        let inner = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, inner);

        Box::pin(async move {
            let (mut params, req) = RequestParams::from_request(req).await;
            let res = inner.oneshot(req).await?;

            if !transform::is_json_response(res.headers()) || !params.contains(CALLBACK_PARAM) {
                return Ok(res);
            }

            let callback = params.remove(CALLBACK_PARAM).unwrap_or_default();
            let (mut parts, streamed) = res.into_parts();
            let (status, payload) =
                transform::translate_error_code(parts.status, ResponsePayload::Streamed(streamed));

            let drained = match payload.into_buffered().await {
                Ok(drained) => drained,
                // A broken body belongs to the caller, not to the transform
                Err(error) => return Ok(Response::from_parts(parts, body::failing_body(error))),
            };

            let padded = body::pad(&callback, &drained);
            parts.status = status;
            transform::rewrite_content_type(&mut parts.headers);
            transform::refresh_content_length(&mut parts.headers, padded.len());
            tracing::debug!(callback = %callback, bytes = padded.len(), "padded json response");

            Ok(Response::from_parts(parts, Body::from(padded)))
        })
    }
}

// Import ServiceExt for oneshot
use tower::ServiceExt;
