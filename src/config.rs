use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Vigila";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the application data directory
/// ~/Vigila/ on all platforms (user-visible, per deployment requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Vigila")
}

/// Path of the incident register database.
/// Overridable with VIGILA_DB for test and staging deployments.
pub fn database_path() -> PathBuf {
    match std::env::var("VIGILA_DB") {
        Ok(path) => PathBuf::from(path),
        Err(_) => app_data_dir().join("vigila.db"),
    }
}

/// Bind address for the REST API.
/// The service is hospital-internal; the default binds loopback and the
/// deployment reverse proxy fronts the ward network.
pub fn bind_addr() -> SocketAddr {
    std::env::var("VIGILA_ADDR")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8087)))
}

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> &'static str {
    "vigila=info,tower_http=warn"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Vigila"));
    }

    #[test]
    fn default_bind_is_loopback() {
        let addr = bind_addr();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 8087);
    }

    #[test]
    fn app_name_is_vigila() {
        assert_eq!(APP_NAME, "Vigila");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.4.0");
    }
}
