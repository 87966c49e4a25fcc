//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults. The config file is
//! optional; a deployment can run from `KRATOS_PUBLIC_URL`,
//! `HYDRA_ADMIN_URL`, `BASE_URL` and `PORT` alone.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file looked up in the working directory
const DEFAULT_CONFIG_FILE: &str = "login-ui.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub kratos: KratosConfig,
    #[serde(default)]
    pub hydra: HydraConfig,
}

/// HTTP server settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// Externally visible base URL used when rewriting the login return_to.
    /// Derived from the request's Host header when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Timeout applied to every upstream call
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Grace period for in-flight requests on shutdown
    #[serde(default = "default_timeout")]
    pub drain_timeout_secs: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Directory holding the built UI; unmatched paths are served from here
    #[serde(default)]
    pub ui_dir: Option<PathBuf>,
}

/// Identity provider settings
#[derive(Debug, Default, Deserialize)]
pub struct KratosConfig {
    #[serde(default)]
    pub public_url: String,
}

/// Authorization server settings
#[derive(Debug, Default, Deserialize)]
pub struct HydraConfig {
    #[serde(default)]
    pub admin_url: String,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_timeout() -> u64 {
    15
}

fn default_max_connections() -> usize {
    1000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            base_url: None,
            timeout_secs: default_timeout(),
            drain_timeout_secs: default_timeout(),
            max_connections: default_max_connections(),
            ui_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

impl Config {
    /// Load configuration from an optional TOML file, then overlay
    /// environment variables and validate.
    pub fn load(path: Option<&Path>) -> common::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let contents =
                    std::fs::read_to_string(path).map_err(|source| common::Error::Read {
                        path: path.to_path_buf(),
                        source,
                    })?;
                toml::from_str(&contents)?
            }
            None => Config::default(),
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> common::Result<()> {
        if let Ok(url) = std::env::var("KRATOS_PUBLIC_URL") {
            self.kratos.public_url = url;
        }
        if let Ok(url) = std::env::var("HYDRA_ADMIN_URL") {
            self.hydra.admin_url = url;
        }
        if let Ok(url) = std::env::var("BASE_URL") {
            if !url.is_empty() {
                self.server.base_url = Some(url);
            }
        }
        if let Ok(port) = std::env::var("PORT") {
            if !port.is_empty() {
                let port: u16 = port.parse().map_err(|e| {
                    common::Error::Config(format!(
                        "PORT must be a valid port number, got {port:?}: {e}"
                    ))
                })?;
                self.server.listen_addr.set_port(port);
            }
        }
        Ok(())
    }

    fn validate(&self) -> common::Result<()> {
        validate_url("kratos.public_url (KRATOS_PUBLIC_URL)", &self.kratos.public_url)?;
        validate_url("hydra.admin_url (HYDRA_ADMIN_URL)", &self.hydra.admin_url)?;

        if self.server.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if self.server.drain_timeout_secs == 0 {
            return Err(common::Error::Config(
                "drain_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Resolve config file path from CLI arg, CONFIG_PATH env var, or the
    /// default file if it exists in the working directory.
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(PathBuf::from(p));
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return Some(PathBuf::from(p));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.exists().then_some(default)
    }
}

fn validate_url(name: &str, url: &str) -> common::Result<()> {
    if url.is_empty() {
        return Err(common::Error::Config(format!("{name} is required")));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(common::Error::Config(format!(
            "{name} must start with http:// or https://, got: {url}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &[
        "KRATOS_PUBLIC_URL",
        "HYDRA_ADMIN_URL",
        "BASE_URL",
        "PORT",
        "CONFIG_PATH",
    ];

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn clear_env() {
        for key in ENV_KEYS {
            unsafe { std::env::remove_var(key) };
        }
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn valid_toml() -> &'static str {
        r#"
[server]
listen_addr = "127.0.0.1:9000"
base_url = "https://login.example.com"
ui_dir = "ui/dist"

[kratos]
public_url = "http://kratos:4433"

[hydra]
admin_url = "http://hydra:4445"
"#
    }

    #[test]
    fn test_load_valid_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };
        let file = write_config(valid_toml());

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(
            config.server.base_url.as_deref(),
            Some("https://login.example.com")
        );
        assert_eq!(config.server.timeout_secs, 15);
        assert_eq!(config.server.drain_timeout_secs, 15);
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.server.ui_dir, Some(PathBuf::from("ui/dist")));
        assert_eq!(config.kratos.public_url, "http://kratos:4433");
        assert_eq!(config.hydra.admin_url, "http://hydra:4445");
    }

    #[test]
    fn test_load_from_env_only() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe {
            clear_env();
            set_env("KRATOS_PUBLIC_URL", "http://kratos-env:4433");
            set_env("HYDRA_ADMIN_URL", "https://hydra-env:4445");
            set_env("PORT", "8181");
        }

        let config = Config::load(None).unwrap();
        assert_eq!(config.kratos.public_url, "http://kratos-env:4433");
        assert_eq!(config.hydra.admin_url, "https://hydra-env:4445");
        assert_eq!(config.server.listen_addr, "0.0.0.0:8181".parse().unwrap());
        assert!(config.server.base_url.is_none());

        unsafe { clear_env() };
    }

    #[test]
    fn test_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe {
            clear_env();
            set_env("BASE_URL", "https://override.example.com");
            set_env("KRATOS_PUBLIC_URL", "http://kratos-override:4433");
        }
        let file = write_config(valid_toml());

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(
            config.server.base_url.as_deref(),
            Some("https://override.example.com")
        );
        assert_eq!(config.kratos.public_url, "http://kratos-override:4433");
        assert_eq!(config.hydra.admin_url, "http://hydra:4445");

        unsafe { clear_env() };
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Some(Path::new("/nonexistent/path/login-ui.toml")));
        assert!(matches!(result, Err(common::Error::Read { .. })));
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = write_config("not valid {{{{ toml");
        let result = Config::load(Some(file.path()));
        assert!(matches!(result, Err(common::Error::Toml(_))));
    }

    #[test]
    fn test_missing_upstream_url_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe {
            clear_env();
            set_env("HYDRA_ADMIN_URL", "http://hydra:4445");
        }

        let err = Config::load(None).unwrap_err().to_string();
        assert!(err.contains("kratos.public_url"), "got: {err}");
        assert!(err.contains("is required"), "got: {err}");

        unsafe { clear_env() };
    }

    #[test]
    fn test_invalid_upstream_url_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };
        let file = write_config(
            r#"
[kratos]
public_url = "http://kratos:4433"

[hydra]
admin_url = "hydra:4445"
"#,
        );

        let err = Config::load(Some(file.path())).unwrap_err().to_string();
        assert!(
            err.contains("hydra.admin_url (HYDRA_ADMIN_URL) must start with http"),
            "got: {err}"
        );
    }

    #[test]
    fn test_invalid_port_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe {
            clear_env();
            set_env("KRATOS_PUBLIC_URL", "http://kratos:4433");
            set_env("HYDRA_ADMIN_URL", "http://hydra:4445");
            set_env("PORT", "eighty");
        }

        let err = Config::load(None).unwrap_err().to_string();
        assert!(err.contains("PORT must be a valid port number"), "got: {err}");

        unsafe { clear_env() };
    }

    #[test]
    fn test_zero_limits_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };
        for field in ["timeout_secs", "drain_timeout_secs", "max_connections"] {
            let file = write_config(&format!(
                r#"
[server]
{field} = 0

[kratos]
public_url = "http://kratos:4433"

[hydra]
admin_url = "http://hydra:4445"
"#
            ));
            let err = Config::load(Some(file.path())).unwrap_err().to_string();
            assert!(err.contains(field), "{field} = 0 must be rejected, got: {err}");
        }
    }

    #[test]
    fn test_resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/should-lose.toml") };
        let path = Config::resolve_path(Some("/cli/wins.toml"));
        assert_eq!(path, Some(PathBuf::from("/cli/wins.toml")));
        unsafe { clear_env() };
    }

    #[test]
    fn test_resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        let path = Config::resolve_path(None);
        assert_eq!(path, Some(PathBuf::from("/env/path.toml")));
        unsafe { clear_env() };
    }
}
