use std::net::SocketAddr;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::{AppConfig, StorageConfig};
use crate::state::AppState;
use crate::{auth, capsules, friends, profile};

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.upload_max_bytes;
    let uploads = match &state.config.storage {
        StorageConfig::Local {
            upload_dir,
            public_base_url,
        } if public_base_url.starts_with('/') => {
            Some((public_base_url.trim_end_matches('/').to_string(), upload_dir.clone()))
        }
        _ => None,
    };

    let mut app = Router::new().nest(
        "/api",
        Router::new()
            .merge(auth::router())
            .merge(profile::router())
            .merge(friends::router())
            .merge(capsules::router())
            .route("/health", get(|| async { "ok" })),
    );
    if let Some((mount, dir)) = uploads {
        app = app.nest_service(&mount, ServeDir::new(dir));
    }

    app.with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
