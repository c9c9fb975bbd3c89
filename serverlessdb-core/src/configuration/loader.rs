//! Configuration file discovery and environment fallback.
//!
//! Resolution order:
//! 1. An explicit `--config` path. Missing or unparseable is an error.
//! 2. `~/.serverlessdb.{toml,yaml,yml,json}`, then `~/.serverlessdb` (TOML).
//!    A file that fails to parse is skipped with a warning.
//! 3. `NETLIFY_DATABASE_*` environment variables.
//!
//! Environment variables are only consulted when no file was used.

use super::database::{Configuration, RawConfiguration};
use crate::{Result, ServerlessDbError};
use ::config::{Environment, File, FileFormat};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Base name of the configuration file in the home directory.
pub const DEFAULT_CONFIG_NAME: &str = ".serverlessdb";

/// Extensions probed next to [`DEFAULT_CONFIG_NAME`] before the bare file.
pub const CONFIG_FILE_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Prefix for environment variable configuration (`NETLIFY_DATABASE_HOSTNAME`).
pub const ENV_PREFIX: &str = "NETLIFY";

/// Separator between prefix and key, and between nested key segments.
const ENV_SEPARATOR: &str = "_";

/// Where the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A configuration file
    File(PathBuf),
    /// `NETLIFY_*` environment variables
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Environment => write!(f, "{}_* environment variables", ENV_PREFIX),
        }
    }
}

/// Result of [`ConfigLoader::load`].
#[derive(Debug, Clone)]
pub struct LoadedConfiguration {
    /// Validated configuration
    pub configuration: Configuration,
    /// Source it was read from
    pub source: ConfigSource,
}

/// Resolves the process configuration.
///
/// # Example
/// ```rust,no_run
/// use serverlessdb_core::configuration::ConfigLoader;
///
/// let loaded = ConfigLoader::new().load()?;
/// println!("{}", loaded.configuration.database.db_name);
/// # Ok::<(), serverlessdb_core::ServerlessDbError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    explicit_path: Option<PathBuf>,
    search_dir: Option<PathBuf>,
    environment: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    /// Loader that searches the home directory and the process environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this file instead of searching for one.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_path = Some(path.into());
        self
    }

    /// Search this directory instead of the home directory.
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dir = Some(dir.into());
        self
    }

    /// Read variables from this map instead of the process environment.
    pub fn with_environment(mut self, vars: HashMap<String, String>) -> Self {
        self.environment = Some(vars);
        self
    }

    /// Loads and validates the configuration.
    ///
    /// # Errors
    /// - the home directory cannot be determined (no explicit path given)
    /// - the explicit file is missing or malformed
    /// - environment values cannot be converted to their field types
    /// - the resulting configuration fails validation
    pub fn load(&self) -> Result<LoadedConfiguration> {
        let loaded = self.resolve()?;
        loaded.configuration.database.validate()?;
        Ok(loaded)
    }

    fn resolve(&self) -> Result<LoadedConfiguration> {
        if let Some(path) = &self.explicit_path {
            let configuration = read_file(path)?;
            info!("Using config file: {}", path.display());
            return Ok(LoadedConfiguration {
                configuration,
                source: ConfigSource::File(path.clone()),
            });
        }

        let dir = match &self.search_dir {
            Some(dir) => dir.clone(),
            None => home_dir()?,
        };

        if let Some(path) = find_config_file(&dir) {
            match read_file(&path) {
                Ok(configuration) => {
                    info!("Using config file: {}", path.display());
                    return Ok(LoadedConfiguration {
                        configuration,
                        source: ConfigSource::File(path),
                    });
                }
                Err(e) => warn!("Ignoring unreadable config file: {}", e),
            }
        } else {
            debug!("No {} config file in {}", DEFAULT_CONFIG_NAME, dir.display());
        }

        let configuration = self.read_environment()?;
        debug!("Using {}", ConfigSource::Environment);
        Ok(LoadedConfiguration {
            configuration,
            source: ConfigSource::Environment,
        })
    }

    fn read_environment(&self) -> Result<Configuration> {
        let mut source = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR);
        if let Some(vars) = &self.environment {
            source = source.source(Some(vars.clone().into_iter().collect()));
        }

        let settings = ::config::Config::builder()
            .add_source(source)
            .build()
            .map_err(|source| ServerlessDbError::ConfigLoad { path: None, source })?;

        settings
            .try_deserialize::<RawConfiguration>()
            .map(Configuration::from)
            .map_err(|source| ServerlessDbError::ConfigLoad { path: None, source })
    }
}

#[allow(deprecated)]
fn home_dir() -> Result<PathBuf> {
    std::env::home_dir()
        .filter(|dir| !dir.as_os_str().is_empty())
        .ok_or_else(|| ServerlessDbError::configuration("Unable to determine home directory"))
}

/// Returns the first existing config file candidate in `dir`.
fn find_config_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", DEFAULT_CONFIG_NAME, ext)))
        .chain(std::iter::once(dir.join(DEFAULT_CONFIG_NAME)))
        .find(|path| path.is_file())
}

/// Picks a parser from the file extension; anything unrecognized is TOML.
fn file_format(path: &Path) -> FileFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        _ => FileFormat::Toml,
    }
}

fn read_file(path: &Path) -> Result<Configuration> {
    let load_error = |source| ServerlessDbError::ConfigLoad {
        path: Some(path.to_path_buf()),
        source,
    };

    let settings = ::config::Config::builder()
        .add_source(File::new(&path.to_string_lossy(), file_format(path)).required(true))
        .build()
        .map_err(load_error)?;

    settings
        .try_deserialize::<RawConfiguration>()
        .map(Configuration::from)
        .map_err(load_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TOML_CONFIG: &str = r#"
[database]
hostname = "file-host"
port = 5433
username = "file_user"
password = "file_pass"
sslmodeon = true
dbname = "file_db"
"#;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_default_file_in_search_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_NAME);
        std::fs::write(&path, TOML_CONFIG).unwrap();

        let loaded = ConfigLoader::new()
            .with_search_dir(dir.path())
            .with_environment(HashMap::new())
            .load()
            .unwrap();

        assert_eq!(loaded.source, ConfigSource::File(path));
        let db = &loaded.configuration.database;
        assert_eq!(db.host, "file-host");
        assert_eq!(db.port, 5433);
        assert_eq!(db.credentials.username(), "file_user");
        assert!(db.credentials.has_password());
        assert!(db.ssl_mode_on);
        assert_eq!(db.db_name, "file_db");
    }

    #[test]
    fn test_extension_variant_preferred_over_bare_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), TOML_CONFIG).unwrap();
        let yaml = dir.path().join(".serverlessdb.yaml");
        std::fs::write(&yaml, "database:\n  dbname: yaml_db\n").unwrap();

        let loaded = ConfigLoader::new()
            .with_search_dir(dir.path())
            .with_environment(HashMap::new())
            .load()
            .unwrap();

        assert_eq!(loaded.source, ConfigSource::File(yaml));
        assert_eq!(loaded.configuration.database.db_name, "yaml_db");
        assert_eq!(loaded.configuration.database.host, "localhost");
    }

    #[test]
    fn test_file_takes_precedence_over_environment() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), TOML_CONFIG).unwrap();

        let loaded = ConfigLoader::new()
            .with_search_dir(dir.path())
            .with_environment(env(&[
                ("NETLIFY_DATABASE_HOSTNAME", "env-host"),
                ("NETLIFY_DATABASE_DBNAME", "env_db"),
            ]))
            .load()
            .unwrap();

        assert!(matches!(loaded.source, ConfigSource::File(_)));
        assert_eq!(loaded.configuration.database.host, "file-host");
        assert_eq!(loaded.configuration.database.db_name, "file_db");
    }

    #[test]
    fn test_environment_fallback() {
        let dir = TempDir::new().unwrap();

        let loaded = ConfigLoader::new()
            .with_search_dir(dir.path())
            .with_environment(env(&[
                ("NETLIFY_DATABASE_HOSTNAME", "env-host"),
                ("NETLIFY_DATABASE_PORT", "6000"),
                ("NETLIFY_DATABASE_USERNAME", "env_user"),
                ("NETLIFY_DATABASE_PASSWORD", "007"),
                ("NETLIFY_DATABASE_SSLMODEON", "true"),
                ("NETLIFY_DATABASE_DBNAME", "env_db"),
                ("UNRELATED_DATABASE_DBNAME", "ignored"),
            ]))
            .load()
            .unwrap();

        assert_eq!(loaded.source, ConfigSource::Environment);
        let db = &loaded.configuration.database;
        assert_eq!(db.host, "env-host");
        assert_eq!(db.port, 6000);
        assert_eq!(db.credentials.username(), "env_user");
        assert!(db.ssl_mode_on);
        assert_eq!(db.db_name, "env_db");

        let url = db.connection_url().unwrap();
        assert!(url.contains("env_user:007@env-host:6000/env_db"));
    }

    #[test]
    fn test_environment_fallback_applies_defaults() {
        let dir = TempDir::new().unwrap();

        let loaded = ConfigLoader::new()
            .with_search_dir(dir.path())
            .with_environment(HashMap::new())
            .load()
            .unwrap();

        assert_eq!(loaded.source, ConfigSource::Environment);
        assert_eq!(loaded.configuration.database.host, "localhost");
        assert_eq!(loaded.configuration.database.port, 5432);
    }

    #[test]
    fn test_environment_invalid_port_is_error() {
        let dir = TempDir::new().unwrap();

        let result = ConfigLoader::new()
            .with_search_dir(dir.path())
            .with_environment(env(&[("NETLIFY_DATABASE_PORT", "not-a-port")]))
            .load();

        assert!(matches!(
            result,
            Err(ServerlessDbError::ConfigLoad { path: None, .. })
        ));
    }

    #[test]
    fn test_malformed_default_file_falls_back_to_environment() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "[database\nport = ").unwrap();

        let loaded = ConfigLoader::new()
            .with_search_dir(dir.path())
            .with_environment(env(&[("NETLIFY_DATABASE_DBNAME", "env_db")]))
            .load()
            .unwrap();

        assert_eq!(loaded.source, ConfigSource::Environment);
        assert_eq!(loaded.configuration.database.db_name, "env_db");
    }

    #[test]
    fn test_explicit_file_with_extension_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"database": {"hostname": "json-host", "dbname": "json_db"}}"#,
        )
        .unwrap();

        let loaded = ConfigLoader::new()
            .with_config_file(&path)
            .with_environment(HashMap::new())
            .load()
            .unwrap();

        assert_eq!(loaded.source, ConfigSource::File(path));
        assert_eq!(loaded.configuration.database.host, "json-host");
        assert_eq!(loaded.configuration.database.db_name, "json_db");
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");

        let result = ConfigLoader::new()
            .with_config_file(&path)
            .with_environment(env(&[("NETLIFY_DATABASE_DBNAME", "env_db")]))
            .load();

        match result {
            Err(ServerlessDbError::ConfigLoad { path: Some(p), .. }) => assert_eq!(p, path),
            other => panic!("expected ConfigLoad error, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[database]\nport = \"many\"\n").unwrap();

        let result = ConfigLoader::new().with_config_file(&path).load();
        assert!(matches!(result, Err(ServerlessDbError::ConfigLoad { .. })));
    }

    #[test]
    fn test_empty_username_fails_validation() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_NAME),
            "[database]\nusername = \"\"\n",
        )
        .unwrap();

        let result = ConfigLoader::new()
            .with_search_dir(dir.path())
            .with_environment(HashMap::new())
            .load();
        assert!(matches!(
            result,
            Err(ServerlessDbError::Configuration { .. })
        ));
    }

    #[test]
    fn test_process_environment_fallback() {
        let dir = TempDir::new().unwrap();

        temp_env::with_vars(
            [
                ("NETLIFY_DATABASE_HOSTNAME", Some("process-host")),
                ("NETLIFY_DATABASE_DBNAME", Some("process_db")),
            ],
            || {
                let loaded = ConfigLoader::new()
                    .with_search_dir(dir.path())
                    .load()
                    .unwrap();
                assert_eq!(loaded.source, ConfigSource::Environment);
                assert_eq!(loaded.configuration.database.host, "process-host");
                assert_eq!(loaded.configuration.database.db_name, "process_db");
            },
        );
    }

    #[test]
    fn test_file_format_detection() {
        assert_eq!(file_format(Path::new("a.yaml")), FileFormat::Yaml);
        assert_eq!(file_format(Path::new("a.yml")), FileFormat::Yaml);
        assert_eq!(file_format(Path::new("a.json")), FileFormat::Json);
        assert_eq!(file_format(Path::new(".serverlessdb")), FileFormat::Toml);
        assert_eq!(file_format(Path::new("a.toml")), FileFormat::Toml);
    }
}
