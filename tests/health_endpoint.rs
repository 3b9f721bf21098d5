// Integration tests for /health against a live Worker
#[cfg(test)]
mod tests {
    use std::{net::SocketAddr, sync::Arc, time::Duration};

    use arc_swap::ArcSwap;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use worker_bridge::{
        FileSystemAdapter, HttpClientAdapter, HttpHandler,
        config::ServerConfig,
        core::{HealthReport, WorkerStatus},
    };

    async fn spawn_worker(health: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, health).await.unwrap();
        });
        addr
    }

    async fn health_of(config: ServerConfig) -> HealthReport {
        let router = HttpHandler::new(
            Arc::new(ArcSwap::from_pointee(config)),
            Arc::new(HttpClientAdapter::new().unwrap()),
            Arc::new(FileSystemAdapter::new()),
        )
        .router();

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_initialized_worker_is_healthy() {
        let addr = spawn_worker(Router::new().route(
            "/api/health",
            get(|| async { r#"{"status":"ok","initialized":true}"# }),
        ))
        .await;
        let url = format!("http://{addr}");

        let report = health_of(ServerConfig::builder().worker_url(url.clone()).build()).await;

        assert_eq!(report.status, "ok");
        assert!(report.worker_configured);
        assert_eq!(report.worker_url, url);
        assert_eq!(report.worker_status, WorkerStatus::Healthy);
        assert_eq!(report.worker_initialized, Some(true));
        assert_eq!(report.worker_error, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unparsable_payload_counts_as_uninitialized() {
        let addr = spawn_worker(
            Router::new().route("/api/health", get(|| async { "pong" })),
        )
        .await;

        let report = health_of(
            ServerConfig::builder()
                .worker_url(format!("http://{addr}/"))
                .build(),
        )
        .await;

        assert_eq!(report.worker_status, WorkerStatus::Healthy);
        assert_eq!(report.worker_initialized, Some(false));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_non_200_probe_reports_status_code() {
        let addr = spawn_worker(Router::new().route(
            "/api/health",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "starting") }),
        ))
        .await;

        let report = health_of(
            ServerConfig::builder()
                .worker_url(format!("http://{addr}"))
                .build(),
        )
        .await;

        assert_eq!(report.worker_status, WorkerStatus::Error);
        assert_eq!(report.worker_error.as_deref(), Some("HTTP 503"));
        assert_eq!(report.worker_initialized, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_slow_probe_reports_timeout() {
        let addr = spawn_worker(Router::new().route(
            "/api/health",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                r#"{"initialized":true}"#
            }),
        ))
        .await;

        let report = health_of(
            ServerConfig::builder()
                .worker_url(format!("http://{addr}"))
                .health_timeout_secs(1)
                .build(),
        )
        .await;

        assert_eq!(report.worker_status, WorkerStatus::Error);
        assert!(report.worker_error.unwrap().contains("Timeout"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unconfigured_worker_is_not_probed() {
        let report = health_of(ServerConfig::default()).await;

        assert!(!report.worker_configured);
        assert_eq!(report.worker_url, "");
        assert_eq!(report.worker_status, WorkerStatus::NotConfigured);
    }
}
