//! TOML-based configuration for prismo.
//!
//! Supports a config file (prismo.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [compiler]
//! dialect = "postgres"          # postgres | mysql | sqlite
//! quote_identifiers = false
//! unknown_relation = "error"    # error | skip
//! max_relation_depth = 8
//!
//! [executor]
//! statement_timeout_ms = 30000  # 0 disables the deadline
//!
//! [sqlite]
//! path = "${APP_DB_PATH}"
//! busy_timeout_ms = 5000
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::compile::{CompileOptions, RelationPolicy, DEFAULT_MAX_RELATION_DEPTH};
use crate::executor::{ExecContext, SqliteAdapter};
use crate::sql::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to open database: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Compiler configuration.
    pub compiler: CompilerSettings,

    /// Executor configuration.
    pub executor: ExecutorSettings,

    /// Embedded SQLite adapter configuration.
    pub sqlite: SqliteSettings,
}

/// Compiler configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Target dialect (postgres, mysql, sqlite).
    pub dialect: Dialect,

    /// Quote every identifier.
    pub quote_identifiers: bool,

    /// What to do with relations the registry does not know.
    pub unknown_relation: RelationPolicy,

    /// Maximum depth of nested relation inclusion.
    pub max_relation_depth: usize,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::Postgres,
            quote_identifiers: false,
            unknown_relation: RelationPolicy::Error,
            max_relation_depth: DEFAULT_MAX_RELATION_DEPTH,
        }
    }
}

impl CompilerSettings {
    /// Convert to compiler options.
    pub fn to_options(&self) -> CompileOptions {
        CompileOptions::default()
            .with_dialect(self.dialect)
            .with_quoted_identifiers(self.quote_identifiers)
            .with_relation_policy(self.unknown_relation)
            .with_max_relation_depth(self.max_relation_depth)
    }
}

/// Executor configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Per-call deadline in milliseconds; 0 means none.
    pub statement_timeout_ms: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            statement_timeout_ms: 30_000,
        }
    }
}

impl ExecutorSettings {
    pub fn statement_timeout(&self) -> Option<Duration> {
        (self.statement_timeout_ms > 0).then(|| Duration::from_millis(self.statement_timeout_ms))
    }

    /// A fresh execution context carrying the configured deadline.
    pub fn context(&self) -> ExecContext {
        match self.statement_timeout() {
            Some(limit) => ExecContext::background().with_timeout(limit),
            None => ExecContext::background(),
        }
    }
}

/// Embedded SQLite configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SqliteSettings {
    /// Database file path (supports ${ENV_VAR} expansion), or `:memory:`.
    pub path: String,

    /// How long to wait on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for SqliteSettings {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            busy_timeout_ms: 5_000,
        }
    }
}

impl SqliteSettings {
    /// Get the database path with environment variables expanded.
    pub fn resolved_path(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.path)
    }

    /// Open the configured database.
    pub fn open(&self) -> Result<SqliteAdapter, SettingsError> {
        let path = self.resolved_path()?;
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(&path)?
        };
        conn.busy_timeout(Duration::from_millis(self.busy_timeout_ms))?;
        Ok(SqliteAdapter::from_connection(conn))
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `PRISMO_CONFIG`
    /// 2. `./prismo.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("PRISMO_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("prismo.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        // Return defaults if no config file found
        Ok(Settings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.compiler.max_relation_depth == 0 {
            return Err(SettingsError::InvalidConfig(
                "compiler.max_relation_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let braced = chars.next_if_eq(&'{').is_some();
        let mut var_name = String::new();
        if braced {
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
        }

        if var_name.is_empty() && !braced {
            // Just a lone $, keep it
            result.push('$');
            continue;
        }
        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
