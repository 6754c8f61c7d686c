//! Server configuration from a TOML file plus CLI overrides.
//!
//! # Invariants
//! - Every section is optional; missing keys fall back to defaults.
//! - CLI flags override file values.

use clap::Parser;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_DATABASE_PATH: &str = "bookshelf.sqlite3";
/// Database path value that selects an in-memory store.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// Command-line arguments for the `bookshelf` server.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "bookshelf", version, about = "CRUD REST API for the bookshelf catalog")]
pub struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Listen address, e.g. 0.0.0.0:8080.
    #[arg(long)]
    pub bind: Option<String>,
    /// SQLite database file, or `:memory:`.
    #[arg(long)]
    pub database: Option<String>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Absolute directory for rolling log files; stderr when unset.
    #[arg(long)]
    pub log_dir: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DATABASE_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Falls back to the build-mode default when unset.
    pub level: Option<String>,
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Accepted bearer tokens. Empty disables authorization.
    pub tokens: Vec<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    InvalidBind(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::InvalidBind(value) => write!(f, "invalid bind address `{value}`"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::InvalidBind(_) => None,
        }
    }
}

impl AppConfig {
    /// Parses config from TOML text.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Reads the config file, or returns defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Loads the file named by `--config` and applies the remaining flags.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = Self::load(cli.config.as_deref())?;
        config.apply_cli(cli);
        Ok(config)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(bind) = &cli.bind {
            self.server.bind = bind.clone();
        }
        if let Some(database) = &cli.database {
            self.database.path = database.clone();
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = Some(level.clone());
        }
        if let Some(dir) = &cli.log_dir {
            self.logging.dir = Some(dir.clone());
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidBind(self.server.bind.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, Cli, ConfigError, DEFAULT_BIND, DEFAULT_DATABASE_PATH};
    use clap::Parser;
    use std::io::Write;
    use std::path::Path;

    #[test]
    fn defaults_apply_when_no_file_is_given() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.database.path, DEFAULT_DATABASE_PATH);
        assert!(config.auth.tokens.is_empty());
        assert!(config.logging.level.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_sections() {
        let config = AppConfig::from_toml_str(
            r#"
            [database]
            path = ":memory:"

            [auth]
            tokens = ["secret"]
            "#,
            Path::new("inline.toml"),
        )
        .unwrap();

        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.database.path, ":memory:");
        assert_eq!(config.auth.tokens, ["secret"]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = AppConfig::from_toml_str("[server]\nport = 80\n", Path::new("bad.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn cli_flags_override_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind = \"0.0.0.0:9000\"\n[logging]\nlevel = \"warn\"").unwrap();

        let cli = Cli::parse_from([
            "bookshelf",
            "--config",
            file.path().to_str().unwrap(),
            "--bind",
            "127.0.0.1:7000",
            "--database",
            "/tmp/other.db",
        ]);
        let config = AppConfig::resolve(&cli).unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:7000");
        assert_eq!(config.database.path, "/tmp/other.db");
        assert_eq!(config.logging.level.as_deref(), Some("warn"));
        assert_eq!(config.bind_addr().unwrap().port(), 7000);
    }

    #[test]
    fn missing_file_and_bad_bind_are_errors() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/bookshelf.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let mut config = AppConfig::default();
        config.server.bind = "localhost".to_string();
        assert!(matches!(config.bind_addr(), Err(ConfigError::InvalidBind(_))));
    }
}
