//! Relay server and client connection validation.

use crate::schema::LanbeamConfig;

use super::helpers::validate_range;

pub(crate) fn validate_relay(errors: &mut Vec<String>, config: &LanbeamConfig) {
    if config.relay.port == 0 {
        errors.push("relay.port must not be 0".into());
    }
    if config.relay.room.trim().is_empty() {
        errors.push("relay.room must not be empty".into());
    }
    validate_range(
        errors,
        "relay.join_timeout_secs",
        config.relay.join_timeout_secs,
        1,
        300,
    );
    validate_range(
        errors,
        "relay.outbound_buffer",
        config.relay.outbound_buffer as u64,
        1,
        65_536,
    );
}

pub(crate) fn validate_client(errors: &mut Vec<String>, config: &LanbeamConfig) {
    let url = &config.client.relay_url;
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        errors.push(format!("client.relay_url = {url} must be a ws:// or wss:// URL"));
    }
    if config.client.reconnect_delay_secs > config.client.max_reconnect_delay_secs {
        errors.push(
            "client.reconnect_delay_secs must not exceed client.max_reconnect_delay_secs".into(),
        );
    }
    validate_range(
        errors,
        "client.connect_timeout_secs",
        config.client.connect_timeout_secs,
        1,
        120,
    );
}
