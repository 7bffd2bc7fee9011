//! Backend selection over the health registry.
//!
//! [`Selector::select`] picks a backend for a route from the healthy
//! snapshot. The default policy is weighted random: a backend's share
//! of traffic converges to `weight / Σ weights` over the healthy set.
//! A round-robin policy exists as a static alternative; its per-route
//! cursor is the only selector state and sits behind a mutex. The
//! weighted path takes no lock beyond the registry's read guard.

pub mod prober;
pub mod registry;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rand::Rng;

use crate::config::model::{Backend, RouteConfig};
use registry::HealthRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    #[default]
    WeightedRandom,
    RoundRobin,
}

pub struct Selector {
    registry: Arc<HealthRegistry>,
    policy: SelectionPolicy,
    cursors: Mutex<HashMap<String, usize>>,
}

impl Selector {
    #[must_use]
    pub fn new(registry: Arc<HealthRegistry>, policy: SelectionPolicy) -> Self {
        Self {
            registry,
            policy,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    /// Pick a backend for the route; `None` when every backend is
    /// unhealthy (the caller surfaces 503).
    #[must_use]
    pub fn select(&self, route: &RouteConfig) -> Option<Backend> {
        let healthy = self.registry.snapshot_healthy(route);
        if healthy.is_empty() {
            tracing::warn!(route = %route.path_prefix, "no healthy backend available");
            return None;
        }

        match self.policy {
            SelectionPolicy::WeightedRandom => Some(Self::weighted_random(&healthy)),
            SelectionPolicy::RoundRobin => Some(self.round_robin(&route.path_prefix, &healthy)),
        }
    }

    fn weighted_random(healthy: &[Backend]) -> Backend {
        if healthy.len() == 1 {
            return healthy[0].clone();
        }

        let total: u64 = healthy.iter().map(|b| u64::from(b.weight.max(1))).sum();
        let roll = rand::thread_rng().gen_range(1..=total);

        let mut acc = 0u64;
        for backend in healthy {
            acc += u64::from(backend.weight.max(1));
            if acc >= roll {
                return backend.clone();
            }
        }

        // roll ≤ total, so the walk always lands inside the slice
        healthy[0].clone()
    }

    fn round_robin(&self, route_prefix: &str, healthy: &[Backend]) -> Backend {
        let mut cursors = self.cursors.lock().expect("selector cursor lock poisoned");
        let cursor = cursors.entry(route_prefix.to_string()).or_insert(0);
        let picked = healthy[*cursor % healthy.len()].clone();
        *cursor = cursor.wrapping_add(1);
        picked
    }
}
