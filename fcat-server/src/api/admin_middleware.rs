//! Admin-key middleware
//!
//! Tower layer guarding the admin routes. Requests must carry the shared
//! secret in the `X-Admin-Key` header. Single shared secret by design; there
//! is no per-admin identity or RBAC. An empty configured key disables the
//! check (development mode).

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};

const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Tower layer for admin authentication
#[derive(Clone)]
pub struct AdminLayer {
    pub admin_key: String,
}

impl<S> Layer<S> for AdminLayer {
    type Service = AdminMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AdminMiddleware {
            inner,
            admin_key: self.admin_key.clone(),
        }
    }
}

/// Tower service that checks the admin key header
#[derive(Clone)]
pub struct AdminMiddleware<S> {
    inner: S,
    admin_key: String,
}

impl<S> Service<Request<Body>> for AdminMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let admin_key = self.admin_key.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            // Empty key disables the check (development mode)
            if admin_key.is_empty() {
                tracing::debug!("Admin authentication disabled (empty admin key)");
                return inner.call(request).await;
            }

            let presented = request
                .headers()
                .get(ADMIN_KEY_HEADER)
                .and_then(|v| v.to_str().ok());

            match presented {
                Some(key) if key == admin_key => inner.call(request).await,
                Some(_) => {
                    tracing::warn!("Admin request with wrong key rejected");
                    Ok(unauthorized("invalid admin key"))
                }
                None => Ok(unauthorized("missing X-Admin-Key header")),
            }
        })
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "status": format!("error: {}", message) })),
    )
        .into_response()
}
