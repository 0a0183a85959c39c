//! HTTP server.
//!
//! This module wires the axum router, the envelope middleware and the
//! server lifecycle together.

pub mod envelope;
pub mod handlers;

use crate::service::TaskService;
use anyhow::Result;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    service: TaskService,
}

impl AppState {
    pub fn new(service: TaskService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &TaskService {
        &self.service
    }
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/tasks",
            get(handlers::list_tasks)
                .delete(handlers::delete_all_tasks)
                .fallback(handlers::route_not_found),
        )
        .route(
            "/task",
            get(handlers::get_task)
                .patch(handlers::patch_task)
                .put(handlers::replace_task)
                .delete(handlers::delete_task)
                .fallback(handlers::route_not_found),
        )
        .route(
            "/task/create",
            post(handlers::create_task).fallback(handlers::route_not_found),
        )
        .route(
            "/tags",
            get(handlers::list_tags).fallback(handlers::route_not_found),
        )
        .route(
            "/tag/create",
            post(handlers::create_tag).fallback(handlers::route_not_found),
        )
        .route("/ping", get(handlers::ping).fallback(handlers::route_not_found))
        .route("/health", get(handlers::health).fallback(handlers::route_not_found))
        .fallback(handlers::route_not_found)
        // Add middleware
        .layer(CatchPanicLayer::custom(envelope::panic_response))
        .layer(middleware::from_fn(envelope::assign_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Handle for managing a running server.
pub struct ServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    addr: SocketAddr,
}

impl ServerHandle {
    /// Address the server is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.task.await?;
        Ok(())
    }
}

/// Bind `addr` and serve in a background task.
pub async fn start_server(state: AppState, addr: &str) -> Result<ServerHandle> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("tasklit listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Server shutting down");
            })
            .await
        {
            error!("Server error: {}", e);
        }
    });

    Ok(ServerHandle {
        shutdown_tx: Some(shutdown_tx),
        task,
        addr: bound_addr,
    })
}
