//! # jsonp-axum
//!
//! JSON-P (JSON with Padding) support for [Axum](https://github.com/tokio-rs/axum)
//! and tower services.
//!
//! This crate provides a single middleware layer that rewrites JSON responses
//! into JavaScript function calls when the client asks for one via a
//! `callback` request parameter, so consumers restricted to `<script src=...>`
//! cross-origin fetches can still use a JSON API.
//!
//! ## Features
//!
//! - **Zero configuration:** drop `JsonpLayer::new()` onto any `Router` or
//!   tower stack handling axum requests.
//! - **Opt-in per request:** only `application/json` responses to requests
//!   carrying a `callback` parameter (query string or urlencoded form body)
//!   are rewritten; everything else passes through byte-identical.
//! - **Error flattening:** error-looking statuses become `200 OK` with an
//!   `{"errorCode":N}` body before padding, so script tags still execute the
//!   callback instead of silently dropping the response.
//! - **Header upkeep:** `Content-Type` switches to its JavaScript flavor and
//!   `Content-Length`, when present, is recomputed for the padded body.
//!
//! ## Getting Started
//!
//! ```rust,ignore
//! use axum::{Json, Router, routing::get};
//! use jsonp_axum::JsonpLayer;
//!
//! async fn quotes() -> Json<serde_json::Value> {
//!     Json(serde_json::json!([{"a": 1}]))
//! }
//!
//! let app: Router = Router::new()
//!     .route("/quotes", get(quotes))
//!     .layer(JsonpLayer::new());
//! ```
//!
//! `GET /quotes?callback=handle` then returns `handle([{"a":1}])` with
//! `Content-Type: application/javascript`, while a plain `GET /quotes` still
//! returns the untouched JSON.

pub mod body;
pub mod layer;
pub mod params;
pub mod transform;

pub use layer::{CALLBACK_PARAM, JsonpLayer, JsonpService};

pub mod prelude {
    //! A prelude for `jsonp-axum` providing the most common types.
    pub use crate::body::ResponsePayload;
    pub use crate::layer::{CALLBACK_PARAM, JsonpLayer, JsonpService};
    pub use crate::params::RequestParams;
}
