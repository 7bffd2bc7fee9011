//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`Config`] for structural
//! errors such as empty route sets, malformed prefixes, duplicate
//! prefixes, backend-less routes, duplicate backend names, and
//! inconsistent security settings. Returns a list of
//! [`ValidationError`] values with per-field suggestions.

use std::collections::HashSet;

use super::model::Config;
use crate::error::ValidationError;

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.security.jwt_auth_enabled && config.security.jwt_secret.is_empty() {
        errors.push(ValidationError {
            route: "(root)".into(),
            field: "security.jwt_secret".into(),
            message: "a secret is required when jwt_auth_enabled is true".into(),
            suggestion: None,
        });
    }

    if config.performance.rate_limit > 0 && config.performance.rate_window_seconds == 0 {
        errors.push(ValidationError {
            route: "(root)".into(),
            field: "performance.rate_window_seconds".into(),
            message: "window must be positive when rate_limit is set".into(),
            suggestion: Some("set rate_limit to 0 to disable rate limiting".into()),
        });
    }

    if config.routes.is_empty() {
        errors.push(ValidationError {
            route: "(root)".into(),
            field: "routes".into(),
            message: "at least one route must be defined".into(),
            suggestion: None,
        });
        return Err(errors);
    }

    let mut seen_prefixes = HashSet::new();

    for (i, route) in config.routes.iter().enumerate() {
        let route_id = if route.path_prefix.is_empty() {
            format!("routes[{i}]")
        } else {
            route.path_prefix.clone()
        };

        if !route.path_prefix.is_empty() && !route.path_prefix.starts_with('/') {
            errors.push(ValidationError {
                route: route_id.clone(),
                field: "path_prefix".into(),
                message: "prefix must start with '/' or be empty for a catch-all".into(),
                suggestion: Some(format!("did you mean '/{}'?", route.path_prefix)),
            });
        }

        if !seen_prefixes.insert(&route.path_prefix) {
            errors.push(ValidationError {
                route: route_id.clone(),
                field: "path_prefix".into(),
                message: "duplicate route prefix; only the first will ever match".into(),
                suggestion: None,
            });
        }

        if route.cache_enabled && route.cache_ttl_seconds == 0 {
            errors.push(ValidationError {
                route: route_id.clone(),
                field: "cache_ttl_seconds".into(),
                message: "a positive TTL is required when cache_enabled is true".into(),
                suggestion: None,
            });
        }

        if route.backends.is_empty() {
            errors.push(ValidationError {
                route: route_id.clone(),
                field: "backends".into(),
                message: "at least one backend is required".into(),
                suggestion: None,
            });
            continue;
        }

        let mut seen_names = HashSet::new();
        for backend in &route.backends {
            if backend.name.is_empty() {
                errors.push(ValidationError {
                    route: route_id.clone(),
                    field: "backends.name".into(),
                    message: "backend name cannot be empty".into(),
                    suggestion: None,
                });
            } else if !seen_names.insert(&backend.name) {
                errors.push(ValidationError {
                    route: route_id.clone(),
                    field: "backends.name".into(),
                    message: format!("duplicate backend name '{}'", backend.name),
                    suggestion: Some("health tracking keys on the name; make it unique".into()),
                });
            }

            if backend.host.is_empty() {
                errors.push(ValidationError {
                    route: route_id.clone(),
                    field: "backends.host".into(),
                    message: "backend host cannot be empty".into(),
                    suggestion: None,
                });
            }

            if backend.port == 0 {
                errors.push(ValidationError {
                    route: route_id.clone(),
                    field: "backends.port".into(),
                    message: "backend port cannot be 0".into(),
                    suggestion: None,
                });
            }

            if backend.weight == 0 {
                errors.push(ValidationError {
                    route: route_id.clone(),
                    field: "backends.weight".into(),
                    message: "weight must be at least 1".into(),
                    suggestion: None,
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
