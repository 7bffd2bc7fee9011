//! `junction validate` — check a config file without starting.

use crate::cli::ValidateArgs;
use crate::error::JunctionError;

pub fn execute(args: &ValidateArgs) -> Result<(), JunctionError> {
    let (config, fingerprint) = crate::config::load(&args.config)?;

    println!("\u{2713} {} is valid", args.config.display());
    println!(
        "  fingerprint: {}",
        fingerprint.get(..8).unwrap_or(&fingerprint)
    );
    println!(
        "  routes:      {} routes, {} backends",
        config.routes.len(),
        config.total_backends()
    );
    for route in &config.routes {
        let prefix = if route.path_prefix.is_empty() {
            "(catch-all)"
        } else {
            &route.path_prefix
        };
        let cache = if route.cache_enabled {
            format!("cache {}s", route.cache_ttl_seconds)
        } else {
            "no cache".to_string()
        };
        println!(
            "    {prefix}  \u{2192}  {} backend(s), {cache}",
            route.backends.len()
        );
    }

    Ok(())
}
