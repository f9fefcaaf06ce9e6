use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use jsonp_axum::JsonpLayer;
use serde::Serialize;
use serde_json::{Value, json};
use std::net::SocketAddr;

#[derive(Serialize)]
struct Quote {
    author: &'static str,
    text: &'static str,
}

// Plain JSON handler; the layer does the padding when asked
async fn quotes() -> Json<Vec<Quote>> {
    Json(vec![
        Quote {
            author: "Hal Abelson",
            text: "Programs must be written for people to read.",
        },
        Quote {
            author: "Tony Hoare",
            text: "There are two ways of constructing a software design.",
        },
    ])
}

// A JSON error route, to show the errorCode flattening
async fn missing() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"error": "no such quote"})))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let app = Router::new()
        .route("/quotes", get(quotes))
        .route("/quotes/missing", get(missing))
        .layer(JsonpLayer::new());

    let addr: SocketAddr = "0.0.0.0:3000".parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("JSON-P demo server listening on http://{}", addr);
    println!("Try:");
    println!("  curl 'http://localhost:3000/quotes'");
    println!("  curl 'http://localhost:3000/quotes?callback=render'");
    println!("  curl -i 'http://localhost:3000/quotes/missing?callback=render'");

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
