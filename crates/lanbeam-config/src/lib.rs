//! lanbeam configuration system.
//!
//! TOML-based configuration for the relay server, the peer client and the
//! transfer engine. All sections use serde defaults so partial configs
//! work out of the box.

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    ClientConfig, LanbeamConfig, RelayServerConfig, TransferConfig, MAX_CHUNK_SIZE,
};

use std::path::Path;

use lanbeam_common::ConfigError;

/// Load config and validate it.
///
/// With an explicit `path` the file must exist. Without one the platform
/// default is used and created on first run. Unlike
/// [`toml_loader::load_from_path`], validation failures are returned as
/// errors instead of being logged.
pub fn load_config(path: Option<&Path>) -> Result<LanbeamConfig, ConfigError> {
    let config = match path {
        Some(path) => toml_loader::load_from_path(path)?,
        None => toml_loader::load_default()?,
    };
    validation::validate(&config)?;
    Ok(config)
}
