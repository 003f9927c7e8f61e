//! Configuration module for prismo.
//!
//! Compiler options, executor deadlines and the embedded SQLite database,
//! loaded from TOML with environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, CompilerSettings, ExecutorSettings, Settings, SettingsError, SqliteSettings,
};
