//! End-to-end tests for the dispatch engine: admission ordering, cache
//! hit/miss behavior, rate limiting, backend exhaustion, WebSocket
//! refusal, authentication, upstream failure mapping, CORS
//! annotation, and compression.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use junction::balance::registry::HealthRegistry;
use junction::balance::{SelectionPolicy, Selector};
use junction::cache::ResponseCache;
use junction::config::model::{Backend, Config, RouteConfig};
use junction::routing::RouteTable;
use junction::security::auth::TokenVerifier;
use junction::security::rate_limit::RateLimiter;
use junction::server::{self, AppState, Stats};
use junction::store::KvStore;

fn route_to(prefix: &str, addr: SocketAddr) -> RouteConfig {
    RouteConfig {
        path_prefix: prefix.into(),
        cache_enabled: false,
        cache_ttl_seconds: 0,
        websocket_enabled: false,
        backends: vec![Backend {
            name: "b1".into(),
            host: addr.ip().to_string(),
            port: addr.port(),
            weight: 1,
        }],
    }
}

fn base_config(routes: Vec<RouteConfig>) -> Config {
    let mut config = Config {
        routes,
        ..Config::default()
    };
    config.security.cors.allowed_origins = vec!["*".to_string()];
    config
}

async fn start_proxy(
    config: Config,
    store: Option<Arc<dyn KvStore>>,
) -> (String, Arc<AppState>, tokio::sync::oneshot::Sender<()>) {
    let config = Arc::new(config);
    let routes = RouteTable::new(&config);
    let registry = Arc::new(HealthRegistry::new(&config.routes));
    let selector = Selector::new(Arc::clone(&registry), SelectionPolicy::WeightedRandom);

    let verifier = config
        .security
        .jwt_auth_enabled
        .then(|| TokenVerifier::new(&config.security.jwt_secret));
    let rate_limiter = RateLimiter::new(
        store.clone(),
        config.performance.rate_limit,
        config.performance.rate_window_seconds,
    );
    let cache = store.map(ResponseCache::new);

    let state = Arc::new(AppState {
        config,
        routes,
        registry,
        selector,
        verifier,
        rate_limiter,
        cache,
        http_client: server::build_http_client(),
        stats: Stats::new(),
        start_time: Instant::now(),
    });

    let router = server::build_router(Arc::clone(&state), 1_048_576);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .await
        .unwrap();
    });

    (format!("http://{addr}"), state, shutdown_tx)
}

fn bearer(secret: &str, exp_offset: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Claims {
        sub: &'static str,
        exp: u64,
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    encode(
        &Header::default(),
        &Claims {
            sub: "tester",
            exp: (now + exp_offset) as u64,
        },
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[tokio::test]
async fn cached_route_serves_second_request_from_cache() {
    let backend = common::spawn_backend(200, &[("Content-Type", "text/plain")], "hello").await;
    let mut config = base_config(vec![route_to("/api/", backend.addr)]);
    config.routes[0].cache_enabled = true;
    config.routes[0].cache_ttl_seconds = 60;

    let store = common::MemoryStore::new();
    let (base, _state, _shutdown) = start_proxy(config, Some(store)).await;

    let first = reqwest::get(format!("{base}/api/x")).await.unwrap();
    assert_eq!(first.status(), 200);
    assert!(first.headers().get("x-proxy-cache").is_none());
    assert_eq!(first.text().await.unwrap(), "hello");
    assert_eq!(backend.hit_count(), 1);

    let second = reqwest::get(format!("{base}/api/x")).await.unwrap();
    assert_eq!(second.status(), 200);
    assert_eq!(second.headers().get("x-proxy-cache").unwrap(), "HIT");
    assert_eq!(second.text().await.unwrap(), "hello");
    assert_eq!(backend.hit_count(), 1, "backend must not be hit on a cache hit");
}

#[tokio::test]
async fn cache_disabled_route_always_forwards() {
    let backend = common::spawn_backend(200, &[("Content-Type", "text/plain")], "hello").await;
    let config = base_config(vec![route_to("/api/", backend.addr)]);
    let store = common::MemoryStore::new();
    let (base, _state, _shutdown) = start_proxy(config, Some(store.clone())).await;

    reqwest::get(format!("{base}/api/x")).await.unwrap();
    reqwest::get(format!("{base}/api/x")).await.unwrap();
    assert_eq!(backend.hit_count(), 2);
    assert!(!store.contains("cache:GET:/api/x"));
}

#[tokio::test]
async fn fourth_request_is_rate_limited() {
    let backend = common::spawn_backend(200, &[], "ok").await;
    let mut config = base_config(vec![route_to("/", backend.addr)]);
    config.performance.rate_limit = 3;
    config.performance.rate_window_seconds = 60;

    let store = common::MemoryStore::new();
    let (base, _state, _shutdown) = start_proxy(config, Some(store)).await;

    for _ in 0..3 {
        let resp = reqwest::get(format!("{base}/")).await.unwrap();
        assert_eq!(resp.status(), 200);
    }

    let resp = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(resp.status(), 429);
    assert_eq!(resp.text().await.unwrap(), "Rate limit exceeded");
}

#[tokio::test]
async fn exhausted_route_returns_503() {
    let dead = common::unreachable_addr().await;
    let config = base_config(vec![route_to("/", dead)]);
    let (base, state, _shutdown) = start_proxy(config, None).await;

    state.registry.set("/", "b1", false);

    let resp = reqwest::get(format!("{base}/anything")).await.unwrap();
    assert_eq!(resp.status(), 503);
    assert_eq!(resp.text().await.unwrap(), "No backend available");
}

#[tokio::test]
async fn websocket_upgrade_is_refused_on_http_port() {
    let backend = common::spawn_backend(200, &[], "ok").await;
    let config = base_config(vec![route_to("/", backend.addr)]);
    let (base, _state, _shutdown) = start_proxy(config, None).await;

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{base}/"))
        .header("Upgrade", "websocket")
        .header("Connection", "Upgrade")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    assert_eq!(
        resp.text().await.unwrap(),
        "WebSocket connections should be made to the WebSocket port"
    );
    assert_eq!(backend.hit_count(), 0);
}

#[tokio::test]
async fn bearer_auth_admits_valid_and_rejects_expired() {
    let backend = common::spawn_backend(200, &[], "ok").await;
    let mut config = base_config(vec![route_to("/", backend.addr)]);
    config.security.jwt_auth_enabled = true;
    config.security.jwt_secret = "k".into();

    let (base, _state, _shutdown) = start_proxy(config, None).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base}/"))
        .bearer_auth(bearer("k", 60))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{base}/"))
        .bearer_auth(bearer("k", -1))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    // CORS pre-flight bypasses auth and reaches the backend
    let resp = client
        .request(reqwest::Method::OPTIONS, format!("{base}/"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn admission_gates_apply_in_order() {
    let backend = common::spawn_backend(200, &[], "ok").await;
    let store = common::MemoryStore::new();

    // Allow-list rejection outranks everything else
    let mut config = base_config(vec![route_to("/api/", backend.addr)]);
    config.security.ip_whitelist = vec!["203.0.113.9".into()];
    config.security.jwt_auth_enabled = true;
    config.security.jwt_secret = "k".into();
    let (base, _state, _shutdown) = start_proxy(config, Some(store.clone())).await;
    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{base}/nowhere"))
        .header("Upgrade", "websocket")
        .header("Connection", "Upgrade")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    assert_eq!(resp.text().await.unwrap(), "Forbidden");

    // Missing auth outranks rate limiting and routing
    let mut config = base_config(vec![route_to("/api/", backend.addr)]);
    config.security.jwt_auth_enabled = true;
    config.security.jwt_secret = "k".into();
    config.performance.rate_limit = 1;
    let (base, _state, _shutdown) = start_proxy(config, Some(common::MemoryStore::new())).await;
    let resp = client.get(format!("{base}/nowhere")).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    // Rate limiting outranks the route-table miss
    let mut config = base_config(vec![route_to("/api/", backend.addr)]);
    config.performance.rate_limit = 1;
    let (base, _state, _shutdown) = start_proxy(config, Some(common::MemoryStore::new())).await;
    let resp = client.get(format!("{base}/api/ok")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let resp = client.get(format!("{base}/nowhere")).send().await.unwrap();
    assert_eq!(resp.status(), 429);

    // Route-table miss outranks the upgrade refusal
    let config = base_config(vec![route_to("/api/", backend.addr)]);
    let (base, _state, _shutdown) = start_proxy(config, None).await;
    let resp = client
        .get(format!("{base}/nowhere"))
        .header("Upgrade", "websocket")
        .header("Connection", "Upgrade")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.text().await.unwrap(), "Not Found");
}

#[tokio::test]
async fn upstream_failure_maps_to_502_with_error_text() {
    let dead = common::unreachable_addr().await;
    let config = base_config(vec![route_to("/", dead)]);
    let (base, _state, _shutdown) = start_proxy(config, None).await;

    let resp = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(resp.status(), 502);
    let body = resp.text().await.unwrap();
    assert!(
        body.starts_with("Error forwarding request: "),
        "unexpected body: {body}"
    );
}

#[tokio::test]
async fn cors_headers_attach_to_success_and_rejection() {
    let backend = common::spawn_backend(200, &[], "ok").await;
    let config = base_config(vec![route_to("/api/", backend.addr)]);
    let (base, _state, _shutdown) = start_proxy(config, None).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base}/api/x"))
        .header("Origin", "https://app.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "https://app.example.com"
    );
    assert_eq!(
        resp.headers()
            .get("access-control-allow-credentials")
            .unwrap(),
        "true"
    );

    let resp = client
        .get(format!("{base}/nowhere"))
        .header("Origin", "https://app.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "https://app.example.com"
    );

    // No Origin, no CORS headers
    let resp = client.get(format!("{base}/api/x")).send().await.unwrap();
    assert!(resp.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn large_text_bodies_are_gzipped_when_accepted() {
    use std::io::Read;

    let body = "junction ".repeat(500);
    let backend = common::spawn_backend(200, &[("Content-Type", "text/plain")], &body).await;
    let config = base_config(vec![route_to("/", backend.addr)]);
    let (base, _state, _shutdown) = start_proxy(config, None).await;

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{base}/big"))
        .header("Accept-Encoding", "gzip")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("content-encoding").unwrap(), "gzip");
    let compressed = resp.bytes().await.unwrap();
    assert!(compressed.len() < body.len());

    let mut decoder = flate2::read::GzDecoder::new(&compressed[..]);
    let mut decoded = String::new();
    decoder.read_to_string(&mut decoded).unwrap();
    assert_eq!(decoded, body);

    // Without Accept-Encoding the body passes through unchanged
    let resp = client.get(format!("{base}/big")).send().await.unwrap();
    assert!(resp.headers().get("content-encoding").is_none());
    assert_eq!(resp.text().await.unwrap(), body);
}

#[tokio::test]
async fn client_host_header_is_relayed_untouched() {
    let backend = common::spawn_backend(200, &[], "ok").await;
    let config = base_config(vec![route_to("/", backend.addr)]);
    let (base, _state, _shutdown) = start_proxy(config, None).await;

    let resp = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(resp.status(), 200);

    // The backend sees the Host the client sent to the proxy, not its
    // own authority.
    let head = backend.last_head();
    let proxy_authority = base.trim_start_matches("http://");
    assert!(
        head.to_ascii_lowercase()
            .contains(&format!("host: {proxy_authority}")),
        "backend saw head: {head}"
    );
}

#[tokio::test]
async fn broken_store_fails_open_end_to_end() {
    let backend = common::spawn_backend(200, &[("Content-Type", "text/plain")], "hello").await;
    let mut config = base_config(vec![route_to("/api/", backend.addr)]);
    config.routes[0].cache_enabled = true;
    config.routes[0].cache_ttl_seconds = 60;
    config.performance.rate_limit = 1;

    // No store at all: caching silently off, limiter fail-open
    let (base, _state, _shutdown) = start_proxy(config, None).await;
    for _ in 0..5 {
        let resp = reqwest::get(format!("{base}/api/x")).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert!(resp.headers().get("x-proxy-cache").is_none());
    }
    assert_eq!(backend.hit_count(), 5);
}
