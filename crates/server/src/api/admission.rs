//! Per-client admission middleware.
//!
//! Derives a client key from the peer address (`ConnectInfo<SocketAddr>`),
//! resolves that client's bucket in the injected [`BucketRegistry`], and either
//! forwards the request or answers `429 {"error":"Too many requests"}` without
//! running the rest of the stack.

use crate::api::errors::ApiError;
use crate::api::metrics;
use axum::extract::{ConnectInfo, State};
use ratewall_core::client_key::{client_key_for_socket, KeyMode};
use ratewall_core::config::REJECTION_MESSAGE;
use ratewall_core::registry::BucketRegistry;
use std::net::SocketAddr;
use std::sync::Arc;

/// Middleware state: the bucket registry and how client keys are derived.
#[derive(Clone, Debug)]
pub struct Admission {
    registry: Arc<BucketRegistry>,
    key_mode: KeyMode,
}

impl Admission {
    pub fn new(registry: Arc<BucketRegistry>, key_mode: KeyMode) -> Self {
        Self { registry, key_mode }
    }

    pub fn registry(&self) -> &Arc<BucketRegistry> {
        &self.registry
    }

    pub fn key_mode(&self) -> KeyMode {
        self.key_mode
    }

    /// Client key for a request, or the shared fallback key when the server
    /// was not started with connect info.
    pub fn client_key<B>(&self, req: &axum::http::Request<B>) -> String {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr);
        client_key_for_socket(peer, self.key_mode)
    }

    /// Runs the admission check for `key`. Both locks are released on return.
    pub fn admit(&self, key: &str) -> bool {
        let admitted = self.registry.check(key);
        metrics::record_admission(admitted);
        admitted
    }
}

/// Admits or rejects the request before any downstream handler runs.
pub async fn admission_middleware(
    State(admission): State<Admission>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, ApiError> {
    let key = admission.client_key(&req);
    if !admission.admit(&key) {
        tracing::info!(client = %key, path = %req.uri().path(), "rate limit exceeded");
        return Err(ApiError::TooManyRequests(REJECTION_MESSAGE.to_string()));
    }
    tracing::debug!(client = %key, "request admitted");
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::routing::get;
    use axum::{middleware, Router};
    use ratewall_core::config::RateLimitConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    fn admission(limit: f64, burst: u32) -> Admission {
        Admission::new(
            Arc::new(BucketRegistry::new(RateLimitConfig::new(limit, burst))),
            KeyMode::FirstColon,
        )
    }

    fn app(admission: Admission, hits: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/",
                get(move || {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        "ok"
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(
                admission,
                admission_middleware,
            ))
    }

    fn request_from(addr: &str) -> Request<Body> {
        let addr: SocketAddr = addr.parse().unwrap();
        let mut req = Request::builder().uri("/").body(Body::empty()).unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    async fn status_of(app: &Router, addr: &str) -> StatusCode {
        app.clone().oneshot(request_from(addr)).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_burst_then_reject_then_refill() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = app(admission(1.0, 2), hits.clone());

        assert_eq!(status_of(&app, "10.0.0.1:1111").await, StatusCode::OK);
        assert_eq!(status_of(&app, "10.0.0.1:2222").await, StatusCode::OK);
        assert_eq!(
            status_of(&app, "10.0.0.1:3333").await,
            StatusCode::TOO_MANY_REQUESTS
        );

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(status_of(&app, "10.0.0.1:4444").await, StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rejection_skips_handler_and_has_exact_body() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = app(admission(1.0, 1), hits.clone());

        assert_eq!(status_of(&app, "10.0.0.1:1").await, StatusCode::OK);
        let resp = app.clone().oneshot(request_from("10.0.0.1:1")).await.unwrap();

        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], br#"{"error":"Too many requests"}"#);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clients_do_not_share_buckets() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = app(admission(1.0, 1), hits);

        assert_eq!(status_of(&app, "10.0.0.1:80").await, StatusCode::OK);
        assert_eq!(
            status_of(&app, "10.0.0.1:80").await,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(status_of(&app, "10.0.0.2:80").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_port_is_not_part_of_the_key() {
        let admission = admission(1.0, 5);
        let registry = admission.registry().clone();
        let app = app(admission, Arc::new(AtomicUsize::new(0)));

        for port in [1000, 2000, 3000] {
            status_of(&app, &format!("10.0.0.1:{port}")).await;
        }
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_connect_info_shares_fallback_key() {
        let admission = admission(1.0, 2);
        let registry = admission.registry().clone();
        let app = app(admission, Arc::new(AtomicUsize::new(0)));

        let plain = || Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(app.clone().oneshot(plain()).await.unwrap().status(), StatusCode::OK);
        assert_eq!(app.clone().oneshot(plain()).await.unwrap().status(), StatusCode::OK);
        assert_eq!(
            app.clone().oneshot(plain()).await.unwrap().status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(
            &registry.get_or_create("unknown"),
            &registry.get_or_create("unknown")
        ));
    }

    #[test]
    fn test_client_key_modes_for_ipv6_peer() {
        let addr: SocketAddr = "[2001:db8::1]:9000".parse().unwrap();
        let mut req = Request::builder().body(()).unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));

        let first_colon = admission(1.0, 1);
        assert_eq!(first_colon.client_key(&req), "[2001");

        let ip = Admission::new(first_colon.registry().clone(), KeyMode::Ip);
        assert_eq!(ip.key_mode(), KeyMode::Ip);
        assert_eq!(ip.client_key(&req), "2001:db8::1");
    }

    #[test]
    fn test_admit_direct() {
        let admission = admission(1.0, 1);
        assert!(admission.admit("/tmp/app.sock"));
        assert!(!admission.admit("/tmp/app.sock"));
    }
}
