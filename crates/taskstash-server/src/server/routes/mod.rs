//! HTTP frontend.
//!
//! A thin adapter over [`RecordService`]: it parses paths and bodies, calls
//! the service and maps its errors onto status codes (see [`error`]).
//!
//! | Route              | Success | Failure                          |
//! |--------------------|---------|----------------------------------|
//! | `GET /tasks`       | `200`   | `503`                            |
//! | `GET /tasks/{id}`  | `200`   | `400`, `404`, `503`, `504`       |
//! | `POST /tasks`      | `201`   | `400`, `503`                     |
//! | `GET /health`      | `200`   | `503` once shutdown has started  |

pub mod error;
pub mod handlers;

use crate::server::telemetry::{
    decrement_requests_inflight, increment_request_errors, increment_requests,
    increment_requests_inflight, record_request_duration,
};
use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use taskstash::{RecordService, Store};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// State shared by every handler.
pub struct AppState<S> {
    pub service: RecordService<S>,
    serving: Arc<AtomicBool>,
    inflight: Arc<AtomicUsize>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            serving: Arc::clone(&self.serving),
            inflight: Arc::clone(&self.inflight),
        }
    }
}

impl<S: Store> AppState<S> {
    pub fn new(service: RecordService<S>) -> Self {
        Self {
            service,
            serving: Arc::new(AtomicBool::new(true)),
            inflight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Flips `/health` to `503`.
    pub fn set_not_serving(&self) {
        self.serving.store(false, Ordering::Release);
    }

    pub fn is_serving(&self) -> bool {
        self.serving.load(Ordering::Acquire) && !self.service.is_shutting_down()
    }

    /// Number of HTTP requests currently being handled.
    pub fn requests_inflight(&self) -> usize {
        self.inflight.load(Ordering::Acquire)
    }
}

pub fn router<S: Store>(state: AppState<S>) -> Router {
    Router::new()
        .route(
            "/tasks",
            get(handlers::list_tasks::<S>).post(handlers::create_task::<S>),
        )
        .route("/tasks/{id}", get(handlers::get_task::<S>))
        .route("/health", get(handlers::health::<S>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    track_requests::<S>,
                )),
        )
        .with_state(state)
}

/// Keeps the in-flight counters balanced even when the request future is
/// dropped before completing (e.g. on client disconnect).
struct InflightRequest(Arc<AtomicUsize>);

impl InflightRequest {
    fn start(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        increment_requests_inflight();
        Self(Arc::clone(counter))
    }
}

impl Drop for InflightRequest {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
        decrement_requests_inflight();
    }
}

async fn track_requests<S: Store>(
    State(state): State<AppState<S>>,
    request: Request,
    next: Next,
) -> Response {
    let start = std::time::Instant::now();
    increment_requests();
    let _inflight = InflightRequest::start(&state.inflight);

    let response = next.run(request).await;

    if response.status().is_server_error() {
        increment_request_errors();
    }
    record_request_duration(start.elapsed().as_secs_f64() * 1000.0);
    response
}
