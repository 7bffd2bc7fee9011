//! Concurrent backend liveness tracking.
//!
//! [`HealthRegistry`] maps (route prefix, backend name) to a liveness
//! flag. Every configured backend is seeded healthy at startup. The
//! prober is the only steady-state writer; dispatch-path selections
//! read concurrently. A `std::sync::RwLock` guards the map — no await
//! point ever holds the guard, so readers see whole values and writes
//! are totally ordered.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::config::model::{Backend, RouteConfig};

pub struct HealthRegistry {
    inner: RwLock<HashMap<(String, String), bool>>,
}

impl HealthRegistry {
    #[must_use]
    pub fn new(routes: &[RouteConfig]) -> Self {
        let mut inner = HashMap::new();
        for route in routes {
            for backend in &route.backends {
                inner.insert((route.path_prefix.clone(), backend.name.clone()), true);
            }
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Backends not present in the registry are treated as healthy;
    /// selection never widens beyond the route's configured set.
    #[must_use]
    pub fn is_healthy(&self, route_prefix: &str, backend_name: &str) -> bool {
        let map = self.inner.read().expect("health registry lock poisoned");
        map.get(&(route_prefix.to_string(), backend_name.to_string()))
            .copied()
            .unwrap_or(true)
    }

    pub fn set(&self, route_prefix: &str, backend_name: &str, healthy: bool) {
        let mut map = self.inner.write().expect("health registry lock poisoned");
        map.insert((route_prefix.to_string(), backend_name.to_string()), healthy);
        drop(map);

        tracing::info!(
            route = %route_prefix,
            backend = %backend_name,
            healthy,
            "backend liveness updated"
        );
    }

    /// Healthy backends of the route, in the route's configured order.
    #[must_use]
    pub fn snapshot_healthy(&self, route: &RouteConfig) -> Vec<Backend> {
        let map = self.inner.read().expect("health registry lock poisoned");
        route
            .backends
            .iter()
            .filter(|b| {
                map.get(&(route.path_prefix.clone(), b.name.clone()))
                    .copied()
                    .unwrap_or(true)
            })
            .cloned()
            .collect()
    }
}
