use anyhow::Result;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::brain::Narrate;
use crate::config::NarratorConfig;

/// Ports tried after the configured one when it is taken.
const PORT_FALLBACKS: u16 = 9;

#[derive(Clone)]
pub struct AppState {
    pub narrator: Arc<dyn Narrate>,
}

/// `GET /{event}` answers with the narrated event as plain text. CORS is
/// fully open and there is no authentication.
pub fn router(narrator: Arc<dyn Narrate>) -> Router {
    Router::new()
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
        .route("/{event}", get(narrate_handler))
        .with_state(AppState { narrator })
        .layer(CorsLayer::very_permissive())
}

/// Bind the configured port (or the next free one of the fallbacks) and serve.
pub async fn serve(config: &NarratorConfig, narrator: Arc<dyn Narrate>) -> Result<()> {
    let mut listener = None;
    for port in config.port..=config.port.saturating_add(PORT_FALLBACKS) {
        match tokio::net::TcpListener::bind((config.host.as_str(), port)).await {
            Ok(l) => {
                listener = Some(l);
                break;
            }
            Err(e) => info!(target: "face", port, "port unavailable: {}", e),
        }
    }
    let listener = listener.ok_or_else(|| {
        anyhow::anyhow!(
            "could not bind to any port {}-{}",
            config.port,
            config.port.saturating_add(PORT_FALLBACKS)
        )
    })?;

    info!(target: "face", "narrator listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(narrator)).await?;
    Ok(())
}

async fn narrate_handler(State(state): State<AppState>, Path(event): Path<String>) -> Response {
    info!(target: "face", event = %event, "GET /{{event}}");
    match state.narrator.narrate(&event).await {
        Ok(text) => ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text).into_response(),
        Err(e) => {
            error!(target: "face", "narration failed: {}", e);
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NarratorError;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct EchoNarrator;

    #[async_trait]
    impl Narrate for EchoNarrator {
        async fn narrate(&self, event: &str) -> Result<String, NarratorError> {
            Ok(format!("Lo, {event}!"))
        }
    }

    struct SilentNarrator;

    #[async_trait]
    impl Narrate for SilentNarrator {
        async fn narrate(&self, _event: &str) -> Result<String, NarratorError> {
            Err(NarratorError::EmptyResponse)
        }
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn narrates_the_decoded_path_segment() {
        let app = router(Arc::new(EchoNarrator));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/the%20door%20creaks")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));
        assert_eq!(body_text(response).await, "Lo, the door creaks!");
    }

    #[tokio::test]
    async fn cors_allows_any_origin_with_credentials() {
        let app = router(Arc::new(EchoNarrator));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/hello")
                    .header(header::ORIGIN, "http://game.test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://game.test");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn upstream_failure_is_a_bad_gateway() {
        let app = router(Arc::new(SilentNarrator));
        let response = app
            .oneshot(Request::builder().uri("/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            body_text(response).await,
            "no content in language model response"
        );
    }

    #[tokio::test]
    async fn favicon_is_silenced() {
        let app = router(Arc::new(SilentNarrator));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/favicon.ico")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
