//! HTTP surface: the telemetry endpoint and a landing page.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::error;

/// Builds the router serving `registry` on `telemetry_path` and a landing
/// page on `/`.
pub fn router(registry: Registry, telemetry_path: &str) -> Router {
    let mut app = Router::new().route(telemetry_path, get(handle_metrics));

    if telemetry_path != "/" {
        let page: Arc<str> = landing_page(telemetry_path).into();
        app = app.route(
            "/",
            get(move || {
                let page = page.clone();
                async move { Html(page.to_string()) }
            }),
        );
    }

    app.with_state(registry)
}

/// Gathers and encodes on the blocking pool: collectors talk to memcached
/// over blocking sockets.
async fn handle_metrics(State(registry): State<Registry>) -> Response {
    let encoded = tokio::task::spawn_blocking(move || {
        let families = registry.gather();
        let mut buf = Vec::new();
        TextEncoder::new().encode(&families, &mut buf).map(|()| buf)
    })
    .await;

    match encoded {
        Ok(Ok(body)) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Ok(Err(e)) => {
            error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => {
            error!(error = %e, "metrics gathering panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn landing_page(telemetry_path: &str) -> String {
    format!(
        "<html>\n\
         <head><title>Memcached Exporter</title></head>\n\
         <body>\n\
         <h1>Memcached Exporter</h1>\n\
         <p><a href=\"{telemetry_path}\">Metrics</a></p>\n\
         </body>\n\
         </html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{Collector, MockSource, RecordingDiagnostics, ServerAddress, Target};
    use crate::exporter::MemcachedExporter;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    fn registry(source: MockSource) -> Registry {
        let target = Target::new(
            ServerAddress::Tcp("mock:11211".to_string()),
            Duration::from_secs(1),
        );
        let collector = Collector::new(source, target)
            .with_diagnostics(Arc::new(RecordingDiagnostics::default()));
        let registry = Registry::new();
        registry
            .register(Box::new(MemcachedExporter::new(collector).unwrap()))
            .unwrap();
        registry
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = router(registry(MockSource::typical_server()), "/metrics");
        let (status, content_type, body) = get_body(app, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(prometheus::TEXT_FORMAT));
        assert!(body.contains("memcached_up 1"));
        assert!(body.contains("memcached_version{version=\"1.6.21\"} 1"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint_unreachable_server() {
        let app = router(registry(MockSource::unreachable()), "/metrics");
        let (status, _, body) = get_body(app, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("memcached_up 0"));
        assert!(!body.contains("memcached_uptime_seconds"));
    }

    #[tokio::test]
    async fn test_landing_page_links_telemetry_path() {
        let app = router(registry(MockSource::default()), "/stats");
        let (status, _, body) = get_body(app.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<a href=\"/stats\">"));

        let (status, _, body) = get_body(app.clone(), "/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("memcached_up 1"));

        let (status, _, _) = get_body(app, "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
