use std::net::SocketAddr;

use axum::{extract::State, routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;

/// Install the Prometheus recorder and expose the poll counters on `/metrics`.
///
/// The listener is bound before returning, so a bad or busy `bind_addr`
/// fails startup instead of being logged from a background task.
pub async fn start(cfg: &MetricsConfig) -> anyhow::Result<SocketAddr> {
    let addr: SocketAddr = cfg
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics.bind_addr {}: {e}", cfg.bind_addr))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind metrics listener on {addr}: {e}"))?;
    let local = listener.local_addr()?;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus metrics recorder: {e}"))?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router(handle).into_make_service()).await {
            tracing::error!(error = %e, "metrics server error");
        }
    });

    tracing::info!(addr = %local, "metrics endpoint listening");
    Ok(local)
}

fn router(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(render_metrics)).with_state(handle)
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
