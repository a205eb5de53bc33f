use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(
    name = "tiendita",
    version,
    about = "Minimal market REST backend: users and product catalog over SQLite"
)]
pub struct Cli {
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,

    #[arg(long, short = 'd', value_name = "URL")]
    pub database_url: Option<String>,

    #[arg(long, value_name = "FILE")]
    pub users_file: Option<PathBuf>,

    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub database_url: String,
    pub users_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config in {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    users_file: Option<PathBuf>,
}

impl AppConfig {
    /// Precedence: CLI flag, then config file, then environment
    /// (`TIENDITA_DATABASE_URL` or `DATABASE_URL`), then defaults.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let from_file = read_file_config(cli.config.as_deref())?;
        Ok(merge(cli, from_file, read_database_url_env()))
    }
}

fn merge(cli: Cli, from_file: FileConfig, env_database_url: Option<String>) -> AppConfig {
    let bind = cli
        .bind
        .or(from_file.bind)
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));
    let database_url = cli
        .database_url
        .or(from_file.database_url)
        .or(env_database_url)
        .unwrap_or_else(|| String::from("sqlite://tiendita.db"));
    let users_file = cli.users_file.or(from_file.users_file);

    AppConfig {
        bind,
        database_url,
        users_file,
    }
}

fn read_file_config(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn read_database_url_env() -> Option<String> {
    ["TIENDITA_DATABASE_URL", "DATABASE_URL"]
        .iter()
        .find_map(|key| std::env::var(key).ok())
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::net::SocketAddr;
    use std::path::PathBuf;

    use anyhow::Result;
    use tempfile::tempdir;

    use super::{merge, read_file_config, Cli, FileConfig};

    fn empty_cli() -> Cli {
        Cli {
            bind: None,
            database_url: None,
            users_file: None,
            config: None,
        }
    }

    #[test]
    fn merge_falls_back_to_defaults() {
        let config = merge(empty_cli(), FileConfig::default(), None);

        assert_eq!(config.bind, SocketAddr::from(([0, 0, 0, 0], 3000)));
        assert_eq!(config.database_url, "sqlite://tiendita.db");
        assert!(config.users_file.is_none());
    }

    #[test]
    fn cli_takes_precedence_over_file_and_env() {
        let cli = Cli {
            database_url: Some(String::from("sqlite://from-cli.db")),
            ..empty_cli()
        };
        let file = FileConfig {
            database_url: Some(String::from("sqlite://from-file.db")),
            ..FileConfig::default()
        };

        let config = merge(cli, file, Some(String::from("sqlite://from-env.db")));
        assert_eq!(config.database_url, "sqlite://from-cli.db");
    }

    #[test]
    fn file_takes_precedence_over_env() {
        let file = FileConfig {
            database_url: Some(String::from("sqlite://from-file.db")),
            ..FileConfig::default()
        };

        let config = merge(empty_cli(), file, Some(String::from("sqlite://from-env.db")));
        assert_eq!(config.database_url, "sqlite://from-file.db");
    }

    #[test]
    fn config_file_parses_all_fields() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("tiendita.toml");
        std::fs::write(
            &path,
            "bind = \"127.0.0.1:8080\"\ndatabase_url = \"sqlite://shop.db\"\nusers_file = \"users.toml\"\n",
        )?;

        let parsed = read_file_config(Some(&path))?;

        assert_eq!(parsed.bind, Some(SocketAddr::from(([127, 0, 0, 1], 8080))));
        assert_eq!(parsed.database_url.as_deref(), Some("sqlite://shop.db"));
        assert_eq!(parsed.users_file, Some(PathBuf::from("users.toml")));
        Ok(())
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let result = read_file_config(Some(std::path::Path::new("/nonexistent/tiendita.toml")));
        assert!(result.is_err());
    }
}
