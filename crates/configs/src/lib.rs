use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

/// Secret used when `debug = true` and no `JWT_SECRET` was provided.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub app: AppSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 5000, worker_threads: Some(4) }
    }
}

/// Connection settings. An empty `url` selects the in-memory user store.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }

/// JWT signing secret and token lifetimes (seconds).
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_access_lifetime")]
    pub access_token_lifetime_secs: i64,
    #[serde(default = "default_refresh_lifetime")]
    pub refresh_token_lifetime_secs: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_lifetime_secs: default_access_lifetime(),
            refresh_token_lifetime_secs: default_refresh_lifetime(),
        }
    }
}

/// Upper bound for either token lifetime: one year.
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;

fn default_access_lifetime() -> i64 { 5 * 60 }
fn default_refresh_lifetime() -> i64 { 24 * 60 * 60 }

/// Application mode and local file directories served in debug mode.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_media_url")]
    pub media_url: String,
    #[serde(default = "default_media_root")]
    pub media_root: String,
    #[serde(default = "default_static_url")]
    pub static_url: String,
    #[serde(default = "default_static_root")]
    pub static_root: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            debug: false,
            media_url: default_media_url(),
            media_root: default_media_root(),
            static_url: default_static_url(),
            static_root: default_static_root(),
        }
    }
}

fn default_media_url() -> String { "/media/".into() }
fn default_media_root() -> String { "media".into() }
fn default_static_url() -> String { "/static/".into() }
fn default_static_root() -> String { "staticfiles".into() }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`), falling back to defaults when the
    /// file does not exist, then fill gaps from the environment and validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) => match e.downcast_ref::<std::io::Error>() {
                Some(io) if io.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
                _ => return Err(e),
            },
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize_from_env();
        self.server.normalize()?;
        self.app.normalize_from_env();
        self.app.normalize();
        self.database.normalize_from_env();
        self.database.validate()?;
        self.auth.normalize_from_env();
        self.auth.resolve_secret(self.app.debug)?;
        self.auth.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize_from_env(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.port = port;
        }
        if let Some(w) = std::env::var("TOKIO_WORKER_THREADS").ok().and_then(|v| v.parse::<usize>().ok()) {
            self.worker_threads = Some(w);
        }
    }

    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        if let Some(w) = self.worker_threads {
            if w == 0 { self.worker_threads = Some(4); }
        } else {
            self.worker_threads = Some(4);
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        if self.url.trim().is_empty() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                self.url = url;
            }
        }
    }

    /// True when no database is configured and the in-memory store is used.
    pub fn is_in_memory(&self) -> bool {
        self.url.trim().is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_in_memory() {
            return Ok(());
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
            return Err(anyhow!("database.url must start with postgresql:// or postgres://"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl AuthSettings {
    pub fn normalize_from_env(&mut self) {
        if self.jwt_secret.trim().is_empty() {
            if let Ok(secret) = std::env::var("JWT_SECRET") {
                self.jwt_secret = secret;
            }
        }
    }

    /// Debug builds may run with the well-known development secret; production may not.
    fn resolve_secret(&mut self, debug: bool) -> Result<()> {
        if !self.jwt_secret.trim().is_empty() {
            return Ok(());
        }
        if debug {
            self.jwt_secret = DEV_JWT_SECRET.to_string();
            return Ok(());
        }
        Err(anyhow!("auth.jwt_secret is empty; set it in config.toml or JWT_SECRET"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.access_token_lifetime_secs <= 0 || self.refresh_token_lifetime_secs <= 0 {
            return Err(anyhow!("token lifetimes must be positive seconds"));
        }
        if self.access_token_lifetime_secs > MAX_TOKEN_LIFETIME_SECS || self.refresh_token_lifetime_secs > MAX_TOKEN_LIFETIME_SECS {
            return Err(anyhow!("token lifetimes must not exceed {} seconds", MAX_TOKEN_LIFETIME_SECS));
        }
        if self.refresh_token_lifetime_secs < self.access_token_lifetime_secs {
            return Err(anyhow!("refresh token lifetime must not be shorter than access token lifetime"));
        }
        Ok(())
    }
}

impl AppSettings {
    fn normalize_from_env(&mut self) {
        if let Ok(v) = std::env::var("DEBUG") {
            self.debug = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
    }

    /// URL prefixes always start and end with `/`.
    fn normalize(&mut self) {
        self.media_url = normalize_prefix(&self.media_url);
        self.static_url = normalize_prefix(&self.static_url);
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg = parse(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8000

            [auth]
            jwt_secret = "s3cret"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.auth.jwt_secret, "s3cret");
        assert_eq!(cfg.auth.access_token_lifetime_secs, 300);
        assert_eq!(cfg.auth.refresh_token_lifetime_secs, 86_400);
        assert!(cfg.database.is_in_memory());
        assert!(!cfg.app.debug);
        assert_eq!(cfg.app.media_url, "/media/");
    }

    #[test]
    fn database_validation_rejects_non_postgres_urls() {
        let db = DatabaseConfig { url: "mysql://localhost/x".into(), ..Default::default() };
        assert!(db.validate().is_err());
        let db = DatabaseConfig { url: "postgres://localhost/x".into(), ..Default::default() };
        assert!(db.validate().is_ok());
        assert!(DatabaseConfig::default().validate().is_ok());
    }

    #[test]
    fn debug_mode_falls_back_to_dev_secret() {
        let mut auth = AuthSettings::default();
        auth.resolve_secret(true).unwrap();
        assert_eq!(auth.jwt_secret, DEV_JWT_SECRET);

        let mut auth = AuthSettings::default();
        assert!(auth.resolve_secret(false).is_err());
    }

    #[test]
    fn token_lifetimes_must_be_ordered() {
        let auth = AuthSettings { jwt_secret: "x".into(), access_token_lifetime_secs: 600, refresh_token_lifetime_secs: 60 };
        assert!(auth.validate().is_err());
        let auth = AuthSettings { jwt_secret: "x".into(), access_token_lifetime_secs: 0, refresh_token_lifetime_secs: 60 };
        assert!(auth.validate().is_err());
    }

    #[test]
    fn token_lifetimes_are_bounded() {
        let auth = AuthSettings { jwt_secret: "x".into(), access_token_lifetime_secs: 60, refresh_token_lifetime_secs: i64::MAX };
        assert!(auth.validate().is_err());
        let auth = AuthSettings {
            jwt_secret: "x".into(),
            access_token_lifetime_secs: MAX_TOKEN_LIFETIME_SECS + 1,
            refresh_token_lifetime_secs: MAX_TOKEN_LIFETIME_SECS + 1,
        };
        assert!(auth.validate().is_err());
        let auth = AuthSettings { jwt_secret: "x".into(), access_token_lifetime_secs: 60, refresh_token_lifetime_secs: MAX_TOKEN_LIFETIME_SECS };
        assert!(auth.validate().is_ok());

        let err = parse("[auth]\njwt_secret = \"x\"\nrefresh_token_lifetime_secs = 9223372036854775807\n")
            .and_then(|mut cfg| cfg.normalize_and_validate());
        assert!(err.is_err());
    }

    #[test]
    fn url_prefixes_are_slash_wrapped() {
        assert_eq!(normalize_prefix("media"), "/media/");
        assert_eq!(normalize_prefix("/static"), "/static/");
        assert_eq!(normalize_prefix("/"), "/");
    }
}
