//! `junction init` — generate a starter config file.

use std::path::Path;

use crate::cli::InitArgs;
use crate::error::JunctionError;

const STARTER_CONFIG: &str = r#"{
  "server": {
    "http_port": 8080
  },
  "security": {
    "ssl_enabled": false,
    "jwt_auth_enabled": false,
    "jwt_secret": "",
    "cors": {
      "allowed_origins": ["*"]
    },
    "ip_whitelist": []
  },
  "performance": {
    "rate_limit": 100,
    "rate_window_seconds": 60,
    "gzip_enabled": true
  },
  "cache": {
    "redis_host": "localhost",
    "redis_port": 6379,
    "redis_password": ""
  },
  "routes": [
    {
      "path_prefix": "/api/",
      "cache_enabled": true,
      "cache_ttl_seconds": 60,
      "websocket_enabled": false,
      "backends": [
        { "name": "api-1", "host": "127.0.0.1", "port": 9001, "weight": 2 },
        { "name": "api-2", "host": "127.0.0.1", "port": 9002, "weight": 1 }
      ]
    },
    {
      "path_prefix": "/",
      "cache_enabled": false,
      "cache_ttl_seconds": 0,
      "websocket_enabled": false,
      "backends": [
        { "name": "web-1", "host": "127.0.0.1", "port": 9010, "weight": 1 }
      ]
    }
  ]
}
"#;

pub fn execute(args: &InitArgs) -> Result<(), JunctionError> {
    write_starter(&args.output)?;
    println!("Created {}", args.output.display());
    println!("\nNext steps:\n  1. Edit the routes and backends\n  2. junction validate {}\n  3. junction run -c {}", args.output.display(), args.output.display());
    Ok(())
}

fn write_starter(path: &Path) -> Result<(), JunctionError> {
    if path.exists() {
        return Err(JunctionError::FileExists {
            path: path.to_path_buf(),
        });
    }
    std::fs::write(path, STARTER_CONFIG)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_config_is_valid() {
        let config = crate::config::parse_and_validate(STARTER_CONFIG.as_bytes(), "starter")
            .expect("starter config must pass validation");
        assert_eq!(config.routes.len(), 2);
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = std::env::temp_dir().join("junction-init-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("junction.json");
        let _ = std::fs::remove_file(&path);

        write_starter(&path).unwrap();
        let err = write_starter(&path).unwrap_err();
        assert!(matches!(err, JunctionError::FileExists { .. }));

        let _ = std::fs::remove_file(&path);
    }
}
