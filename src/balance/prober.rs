//! Background backend health probing.
//!
//! A single cooperative task walks every (route, backend) pair each
//! cycle and issues `GET /health` against the backend with a hard 5 s
//! timeout. Any transport failure or a 5xx status marks the backend
//! unhealthy; everything else marks it healthy. The registry is
//! written only when the observed value differs from the stored one.
//!
//! **Shutdown behavior:** the loop selects between the interval tick
//! and a `watch` shutdown signal. A cycle already underway always runs
//! to completion; the task exits at the next loop head and is joined
//! by the server shutdown path.

use std::sync::Arc;
use std::time::Duration;

use http_body_util::BodyExt;

use crate::balance::registry::HealthRegistry;
use crate::config::model::{Backend, RouteConfig};
use crate::server::HttpClient;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn probe_loop(
    client: HttpClient,
    routes: Arc<Vec<RouteConfig>>,
    registry: Arc<HealthRegistry>,
    period: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // Skip first immediate tick; backends start healthy

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => {
                tracing::debug!("health prober shutting down");
                return;
            }
        }

        tracing::debug!("running health probes");

        for route in routes.iter() {
            for backend in &route.backends {
                let healthy = probe_backend(&client, backend).await;
                let was_healthy = registry.is_healthy(&route.path_prefix, &backend.name);

                if healthy != was_healthy {
                    tracing::info!(
                        route = %route.path_prefix,
                        backend = %backend.name,
                        from = was_healthy,
                        to = healthy,
                        "backend liveness changed"
                    );
                    registry.set(&route.path_prefix, &backend.name, healthy);
                }
            }
        }
    }
}

/// One probe: transport error or timeout ⇒ dead, 5xx ⇒ dead,
/// anything in [200, 499] ⇒ alive.
pub async fn probe_backend(client: &HttpClient, backend: &Backend) -> bool {
    let uri: hyper::Uri = match backend.health_url().parse() {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(backend = %backend.name, error = %e, "invalid health probe URL");
            return false;
        }
    };

    let request = match hyper::Request::builder()
        .method(hyper::Method::GET)
        .uri(uri)
        .body(http_body_util::Full::new(bytes::Bytes::new()))
    {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(backend = %backend.name, error = %e, "failed to build health probe");
            return false;
        }
    };

    match tokio::time::timeout(PROBE_TIMEOUT, client.request(request)).await {
        Ok(Ok(response)) => {
            let status = response.status();
            // Drain the body so the pooled connection can be reused
            let _ = response.into_body().collect().await;
            status.as_u16() < 500
        }
        Ok(Err(e)) => {
            tracing::debug!(backend = %backend.name, error = %e, "health probe failed");
            false
        }
        Err(_) => {
            tracing::debug!(backend = %backend.name, "health probe timed out");
            false
        }
    }
}
