//! Longest-prefix route matching for incoming HTTP requests.
//!
//! [`RouteTable`] is built once at startup from the configured routes
//! and never mutated afterwards, so lookups need no synchronization.
//! [`RouteTable::matches`] returns the route whose `path_prefix` is the
//! longest prefix of the request path; when duplicate prefixes slip
//! through validation the first one wins.

use std::sync::Arc;

use crate::config::model::{Config, RouteConfig};

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Arc<Vec<RouteConfig>>,
}

impl RouteTable {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            routes: Arc::new(config.routes.clone()),
        }
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> Option<&RouteConfig> {
        let mut best: Option<&RouteConfig> = None;
        let mut best_len = 0usize;

        for route in self.routes.iter() {
            if !path.starts_with(&route.path_prefix) {
                continue;
            }
            // Strict '>' keeps the first route on duplicate prefixes; an
            // empty prefix matches everything at length zero.
            let len = route.path_prefix.len();
            if best.is_none() || len > best_len {
                best = Some(route);
                best_len = len;
            }
        }

        best
    }

    #[must_use]
    pub fn routes(&self) -> Arc<Vec<RouteConfig>> {
        Arc::clone(&self.routes)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
