//! Application-level configuration loading: file first, environment on top.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::dao::document_store::DEFAULT_STORE_TIMEOUT;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "FAMILY_GAME_BACK_CONFIG_PATH";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";
const DEFAULT_COUCH_URL: &str = "http://localhost:5984";
const DEFAULT_COUCH_DB: &str = "family_game";

/// Backend selected to hold the documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local maps; data is lost on restart.
    Memory,
    /// MongoDB server, one collection per table.
    Mongo {
        /// Connection string.
        uri: String,
        /// Database name; the URI's default database when absent.
        database: Option<String>,
    },
    /// CouchDB server, all tables sharing one database.
    Couch {
        /// Server URL, without the database.
        base_url: String,
        database: String,
        /// Basic auth user, used together with `password`.
        username: Option<String>,
        password: Option<String>,
    },
}

impl StorageBackend {
    fn default_mongo() -> Self {
        StorageBackend::Mongo {
            uri: DEFAULT_MONGO_URI.into(),
            database: None,
        }
    }

    fn default_couch() -> Self {
        StorageBackend::Couch {
            base_url: DEFAULT_COUCH_URL.into(),
            database: DEFAULT_COUCH_DB.into(),
            username: None,
            password: None,
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Mongo { .. } => "mongo",
            StorageBackend::Couch { .. } => "couch",
        }
    }
}

/// Names of the tables (collections) holding each document kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    /// Top-level games.
    pub games: String,
    /// Users, each owning its games.
    pub users: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            games: "games".into(),
            users: "users".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// TCP port the HTTP server binds on all interfaces.
    pub port: u16,
    pub storage: StorageBackend,
    /// Table names, overridable through `GAMES_TABLE` and `USERS_TABLE`.
    pub tables: TableNames,
    /// Allowed CORS origins; empty means any origin.
    pub cors_origins: Vec<String>,
    /// Upper bound on each store call; `None` disables it.
    pub store_timeout: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            storage: StorageBackend::default_mongo(),
            tables: TableNames::default(),
            cors_origins: Vec::new(),
            store_timeout: Some(DEFAULT_STORE_TIMEOUT),
        }
    }
}

impl AppConfig {
    /// Load the configuration file (falling back to defaults) and apply
    /// environment overrides.
    pub fn load() -> Self {
        let mut config = Self::from_file();
        config.apply_overrides(|name| env::var(name).ok().filter(|value| !value.is_empty()));
        info!(
            port = config.port,
            storage = config.storage.name(),
            games_table = %config.tables.games,
            users_table = %config.tables.users,
            "configuration resolved"
        );
        config
    }

    fn from_file() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration file");
                    raw.into()
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Apply overrides read through `lookup` (the process environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("PORT").or_else(|| lookup("SERVER_PORT")) {
            match raw.parse() {
                Ok(port) => self.port = port,
                Err(_) => warn!(value = %raw, "ignoring invalid port override"),
            }
        }

        if let Some(name) = lookup("STORAGE_BACKEND") {
            match name.to_ascii_lowercase().as_str() {
                "memory" => self.storage = StorageBackend::Memory,
                "mongo" | "mongodb" => {
                    if !matches!(self.storage, StorageBackend::Mongo { .. }) {
                        self.storage = StorageBackend::default_mongo();
                    }
                }
                "couch" | "couchdb" => {
                    if !matches!(self.storage, StorageBackend::Couch { .. }) {
                        self.storage = StorageBackend::default_couch();
                    }
                }
                other => warn!(backend = other, "unknown STORAGE_BACKEND; keeping configured backend"),
            }
        }

        match &mut self.storage {
            StorageBackend::Memory => {}
            StorageBackend::Mongo { uri, database } => {
                if let Some(value) = lookup("MONGO_URI") {
                    *uri = value;
                }
                if let Some(value) = lookup("MONGO_DB") {
                    *database = Some(value);
                }
            }
            StorageBackend::Couch {
                base_url,
                database,
                username,
                password,
            } => {
                if let Some(value) = lookup("COUCH_BASE_URL") {
                    *base_url = value;
                }
                if let Some(value) = lookup("COUCH_DB") {
                    *database = value;
                }
                if let Some(value) = lookup("COUCH_USERNAME") {
                    *username = Some(value);
                }
                if let Some(value) = lookup("COUCH_PASSWORD") {
                    *password = Some(value);
                }
            }
        }

        if let Some(value) = lookup("GAMES_TABLE") {
            self.tables.games = value;
        }
        if let Some(value) = lookup("USERS_TABLE") {
            self.tables.users = value;
        }
        if let Some(value) = lookup("CORS_ORIGINS") {
            self.cors_origins = split_origins(&value);
        }
        if let Some(raw) = lookup("STORE_TIMEOUT_MS") {
            match raw.parse::<u64>() {
                Ok(millis) => self.store_timeout = timeout_from_millis(millis),
                Err(_) => warn!(value = %raw, "ignoring invalid STORE_TIMEOUT_MS"),
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    port: Option<u16>,
    storage: Option<RawStorage>,
    tables: RawTables,
    cors_origins: Vec<String>,
    store_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
enum RawStorage {
    Memory,
    Mongo {
        #[serde(default)]
        uri: Option<String>,
        #[serde(default)]
        database: Option<String>,
    },
    Couch {
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        database: Option<String>,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTables {
    games: Option<String>,
    users: Option<String>,
}

impl From<RawStorage> for StorageBackend {
    fn from(value: RawStorage) -> Self {
        match value {
            RawStorage::Memory => StorageBackend::Memory,
            RawStorage::Mongo { uri, database } => StorageBackend::Mongo {
                uri: uri.unwrap_or_else(|| DEFAULT_MONGO_URI.into()),
                database,
            },
            RawStorage::Couch {
                base_url,
                database,
                username,
                password,
            } => StorageBackend::Couch {
                base_url: base_url.unwrap_or_else(|| DEFAULT_COUCH_URL.into()),
                database: database.unwrap_or_else(|| DEFAULT_COUCH_DB.into()),
                username,
                password,
            },
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            port: value.port.unwrap_or(defaults.port),
            storage: value.storage.map(Into::into).unwrap_or(defaults.storage),
            tables: TableNames {
                games: value.tables.games.unwrap_or(defaults.tables.games),
                users: value.tables.users.unwrap_or(defaults.tables.users),
            },
            cors_origins: value.cors_origins,
            store_timeout: value
                .store_timeout_ms
                .map_or(defaults.store_timeout, timeout_from_millis),
        }
    }
}

/// Zero disables the deadline.
fn timeout_from_millis(millis: u64) -> Option<Duration> {
    (millis > 0).then(|| Duration::from_millis(millis))
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn file_values_fill_in_over_defaults() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "port": 9000,
                "storage": {"backend": "couch", "base_url": "http://couch:5984", "database": "quiz"},
                "tables": {"games": "games-table-dev"},
                "cors_origins": ["http://localhost:3000"],
                "store_timeout_ms": 0
            }"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.port, 9000);
        assert_eq!(
            config.storage,
            StorageBackend::Couch {
                base_url: "http://couch:5984".into(),
                database: "quiz".into(),
                username: None,
                password: None,
            }
        );
        assert_eq!(config.tables.games, "games-table-dev");
        assert_eq!(config.tables.users, "users");
        assert_eq!(config.cors_origins, ["http://localhost:3000"]);
        assert_eq!(config.store_timeout, None);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let raw: RawConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(AppConfig::from(raw), AppConfig::default());
    }

    #[test]
    fn environment_switches_backend_and_overrides_fields() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup(&[
            ("SERVER_PORT", "3001"),
            ("STORAGE_BACKEND", "couch"),
            ("COUCH_USERNAME", "admin"),
            ("COUCH_PASSWORD", "secret"),
            ("USERS_TABLE", "users-table-dev"),
            ("CORS_ORIGINS", "http://a.test, ,http://b.test"),
            ("STORE_TIMEOUT_MS", "250"),
        ]));

        assert_eq!(config.port, 3001);
        assert!(matches!(
            config.storage,
            StorageBackend::Couch { ref username, ref password, .. }
                if username.as_deref() == Some("admin") && password.as_deref() == Some("secret")
        ));
        assert_eq!(config.tables.users, "users-table-dev");
        assert_eq!(config.cors_origins, ["http://a.test", "http://b.test"]);
        assert_eq!(config.store_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup(&[("PORT", "eighty"), ("STORAGE_BACKEND", "dynamo")]));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn mongo_overrides_apply_to_the_default_backend() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup(&[
            ("MONGO_URI", "mongodb://db:27017"),
            ("MONGO_DB", "quiz"),
        ]));
        assert_eq!(
            config.storage,
            StorageBackend::Mongo {
                uri: "mongodb://db:27017".into(),
                database: Some("quiz".into()),
            }
        );
    }
}
