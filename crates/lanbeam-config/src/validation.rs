//! Configuration validation.
//!
//! Each section has its own validator; this collects every error into a
//! single `ConfigError`.

mod helpers;
mod relay;
mod transfer;


use crate::schema::LanbeamConfig;
use lanbeam_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &LanbeamConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    relay::validate_relay(&mut errors, config);
    relay::validate_client(&mut errors, config);
    transfer::validate_transfer(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
