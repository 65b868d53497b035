//! Liveness HTTP surface for the hosting platform's health checks.

use axum::{Router, http::StatusCode, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::error::Result;

/// Body returned by `GET /`.
pub const LIVENESS_BODY: &str = "PuzzleGold relay is running.";

/// Router with the single `GET /` liveness endpoint.
pub fn health_routes() -> Router {
    Router::new()
        .route("/", get(liveness))
        .layer(TraceLayer::new_for_http())
}

async fn liveness() -> (StatusCode, &'static str) {
    (StatusCode::OK, LIVENESS_BODY)
}

/// Serve the liveness router on an already-bound listener.
pub async fn serve(listener: TcpListener) -> std::io::Result<()> {
    axum::serve(listener, health_routes()).await
}

/// Bind `0.0.0.0:port` and serve until the process exits.
pub async fn bind_and_serve(port: u16) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "Liveness server started");
    serve(listener).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn root_returns_ok() {
        let response = health_routes()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], LIVENESS_BODY.as_bytes());
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let response = health_routes()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn post_is_not_allowed() {
        let response = health_routes()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
