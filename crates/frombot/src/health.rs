//! Liveness endpoint for container platforms.

use std::net::SocketAddr;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use frombot_core::{errors::Error, Result};

async fn ok() -> &'static str {
    "OK"
}

/// Every path answers `200 OK`.
pub fn router() -> Router {
    Router::new().route("/", get(ok)).fallback(ok)
}

/// Bind before polling starts so a taken port fails startup.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Config(format!("failed to bind health endpoint on {addr}: {e}")))
}

pub async fn serve(listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "health endpoint listening");
    }
    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| Error::External(format!("health endpoint failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn get_body(uri: &str) -> (StatusCode, Vec<u8>) {
        let resp = router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn root_returns_ok() {
        let (status, body) = get_body("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn any_path_returns_ok() {
        let (status, body) = get_body("/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn serve_stops_on_cancel() {
        let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let token = CancellationToken::new();
        let handle = tokio::spawn(serve(listener, token.clone()));

        token.cancel();
        let res = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(res.is_ok());
    }
}
