//! Layered configuration: defaults, then `onboardserver.toml`, then `ONBOARD_*`
//! environment variables (`__` separates nesting), then the conventional
//! `DATABASE_URL`, `JWT_SECRET` and `PORT` variables.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::onboarding::service::DEFAULT_MAX_WEEK_NUM;

pub const DEFAULT_CONFIG_FILE: &str = "onboardserver.toml";
pub const CONFIG_PATH_ENV: &str = "ONBOARD_CONFIG";
pub const DEV_JWT_SECRET: &str = "onboardserver-development-secret-change-me";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub token_expiry_hours: i64,
    pub bootstrap_admin_email: Option<String>,
    pub bootstrap_admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_expiry_hours: 24,
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub max_week_num: i32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_week_num: DEFAULT_MAX_WEEK_NUM,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub catalog: CatalogConfig,
    pub cors_allowed_origins: Vec<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("ONBOARD_").split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database.url".into()))
            .merge(Env::raw().only(&["JWT_SECRET"]).map(|_| "auth.jwt_secret".into()))
            .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
    }

    pub fn load_from(file: &Path) -> Result<Self, figment::Error> {
        Self::figment(file).extract()
    }

    pub fn load() -> Result<Self, figment::Error> {
        let file = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&file)
    }

    pub fn database_url(&self) -> Option<&str> {
        non_empty(&self.database.url)
    }

    /// The configured secret, or the development secret when none is set.
    pub fn jwt_secret(&self) -> (&str, bool) {
        match non_empty(&self.auth.jwt_secret) {
            Some(secret) => (secret, true),
            None => (DEV_JWT_SECRET, false),
        }
    }

    pub fn bootstrap_admin(&self) -> Option<(&str, &str)> {
        Some((
            non_empty(&self.auth.bootstrap_admin_email)?,
            non_empty(&self.auth.bootstrap_admin_password)?,
        ))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.token_expiry_hours, 24);
        assert_eq!(config.catalog.max_week_num, 12);
        assert_eq!(config.database_url(), None);
        assert_eq!(config.jwt_secret(), (DEV_JWT_SECRET, false));
        assert_eq!(config.bootstrap_admin(), None);
    }

    #[test]
    fn test_toml_layer_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
cors_allowed_origins = ["http://localhost:3000"]

[server]
port = 8088

[catalog]
max_week_num = 8

[auth]
bootstrap_admin_email = "admin@example.com"
bootstrap_admin_password = "change-me-now"
"#
        )
        .unwrap();

        let config = AppConfig::figment(file.path()).extract::<AppConfig>().unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.catalog.max_week_num, 8);
        assert_eq!(config.cors_allowed_origins, vec!["http://localhost:3000"]);
        assert_eq!(
            config.bootstrap_admin(),
            Some(("admin@example.com", "change-me-now"))
        );
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let mut config = AppConfig::default();
        config.database.url = Some("  ".into());
        config.auth.jwt_secret = Some(String::new());
        assert_eq!(config.database_url(), None);
        assert!(!config.jwt_secret().1);
    }

    #[test]
    fn test_missing_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::figment(&dir.path().join("absent.toml"))
            .extract::<AppConfig>()
            .unwrap();
        assert_eq!(config.catalog, CatalogConfig::default());
    }
}
