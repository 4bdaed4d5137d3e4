// rest/mod.rs — Public REST API server.
//
// Axum HTTP server serving the task CRUD surface plus a health probe.
//
// Endpoints:
//   GET    /health
//   GET    /task/   (also /task)
//   POST   /task/   (also /task)
//   GET    /task/{task_id}
//   PUT    /task/{task_id}
//   PATCH  /task/{task_id}
//   DELETE /task/{task_id}

pub mod error;
pub mod routes;

use anyhow::Result;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::AppContext;

/// Bind and serve until Ctrl-C or SIGTERM.
pub async fn run(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(make_shutdown_future())
        .await?;
    info!("REST server stopped");
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // Health
        .route("/health", get(routes::health::health))
        // Task collection. The trailing-slash form is canonical; axum matches
        // trailing slashes exactly, so the bare form is its own route.
        .route(
            "/task/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/task",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        // Single task
        .route(
            "/task/{task_id}",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .patch(routes::tasks::patch_task)
                .delete(routes::tasks::delete_task),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Resolves on Ctrl-C or (Unix) SIGTERM, letting in-flight requests drain.
async fn make_shutdown_future() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
    info!("shutdown signal received — stopping REST server");
}
