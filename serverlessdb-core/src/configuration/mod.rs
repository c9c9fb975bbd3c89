//! Configuration model and loader.
//!
//! - `database`: connection parameters and connection URL assembly
//! - `loader`: config file discovery with environment-variable fallback
//!
//! Configuration is read once at startup and passed explicitly into the
//! provisioning operation.

mod database;
mod loader;

pub use database::{Configuration, DatabaseConfig, SslMode};
pub use loader::{
    CONFIG_FILE_EXTENSIONS, ConfigLoader, ConfigSource, DEFAULT_CONFIG_NAME, ENV_PREFIX,
    LoadedConfiguration,
};
