//! `junction run` — start the proxy server.
//!
//! Loads and validates the configuration, wires the immutable state
//! snapshot into every component, spawns the background health prober,
//! and serves until a shutdown signal arrives. Shutdown is cooperative:
//! the listener stops accepting, in-flight requests drain, then the
//! prober is signalled and joined.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::balance::registry::HealthRegistry;
use crate::balance::{prober, SelectionPolicy, Selector};
use crate::cache::ResponseCache;
use crate::cli::RunArgs;
use crate::error::JunctionError;
use crate::logging;
use crate::routing::RouteTable;
use crate::security::auth::TokenVerifier;
use crate::security::rate_limit::RateLimiter;
use crate::server::{self, AppState, Stats};
use crate::store::redis_store::RedisStore;
use crate::store::KvStore;

pub async fn execute(args: RunArgs) -> Result<(), JunctionError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let (config, fingerprint) = crate::config::load(&args.config)?;
    let config = Arc::new(config);

    tracing::info!(
        path = %args.config.display(),
        fingerprint = fingerprint.get(..8).unwrap_or(&fingerprint),
        routes = config.routes.len(),
        backends = config.total_backends(),
        "configuration loaded"
    );

    if config.security.ssl_enabled {
        tracing::warn!(
            "ssl_enabled is set; TLS termination is delegated to the fronting listener"
        );
    }

    let http_client = server::build_http_client();

    let store: Option<Arc<dyn KvStore>> = if config.cache.redis_host.is_empty() {
        tracing::info!("no redis host configured; caching and rate limiting disabled");
        None
    } else {
        match RedisStore::connect(&config.cache.url()).await {
            Ok(store) => {
                tracing::info!(
                    host = %config.cache.redis_host,
                    port = config.cache.redis_port,
                    "connected to redis"
                );
                Some(Arc::new(store))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "redis unreachable; caching disabled and rate limiter failing open"
                );
                None
            }
        }
    };

    let routes = RouteTable::new(&config);
    let registry = Arc::new(HealthRegistry::new(&config.routes));
    let selector = Selector::new(Arc::clone(&registry), SelectionPolicy::WeightedRandom);

    let verifier = if config.security.jwt_auth_enabled {
        tracing::info!("bearer-token authentication enabled");
        Some(TokenVerifier::new(&config.security.jwt_secret))
    } else {
        None
    };

    let rate_limiter = RateLimiter::new(
        store.clone(),
        config.performance.rate_limit,
        config.performance.rate_window_seconds,
    );
    let cache = store.clone().map(ResponseCache::new);

    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        routes: routes.clone(),
        registry: Arc::clone(&registry),
        selector,
        verifier,
        rate_limiter,
        cache,
        http_client: http_client.clone(),
        stats: Stats::new(),
        start_time: Instant::now(),
    });

    // Prober lifecycle: started once here, signalled and joined after
    // the listener drains.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let prober_handle = tokio::spawn(prober::probe_loop(
        http_client,
        routes.routes(),
        registry,
        Duration::from_secs(args.probe_interval),
        shutdown_rx,
    ));

    let router = server::build_router(Arc::clone(&state), args.max_body);

    let port = args.port.unwrap_or(config.server.http_port);
    let addr: SocketAddr = format!("{}:{}", args.host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        routes = config.routes.len(),
        backends = config.total_backends(),
        "junction started"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown_signal())
    .await?;

    // Listener is closed and in-flight requests have drained; now stop
    // the prober and wait for any in-flight probe cycle to finish.
    let _ = shutdown_tx.send(true);
    if let Err(e) = prober_handle.await {
        tracing::error!(error = %e, "health prober task failed");
    }

    tracing::info!(
        forwarded = state.stats.forwarded.load(Ordering::Relaxed),
        failed = state.stats.failed.load(Ordering::Relaxed),
        cache_hits = state.stats.cache_hits.load(Ordering::Relaxed),
        rate_limited = state.stats.rate_limited.load(Ordering::Relaxed),
        "junction stopped"
    );
    Ok(())
}
