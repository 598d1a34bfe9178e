//! Transfer engine validation (chunk size, water marks).

use crate::schema::{LanbeamConfig, MAX_CHUNK_SIZE};

use super::helpers::validate_range;

pub(crate) fn validate_transfer(errors: &mut Vec<String>, config: &LanbeamConfig) {
    let transfer = &config.transfer;
    validate_range(
        errors,
        "transfer.chunk_size",
        transfer.chunk_size as u64,
        1,
        MAX_CHUNK_SIZE as u64,
    );
    if transfer.low_water_mark >= transfer.high_water_mark {
        errors.push(format!(
            "transfer.low_water_mark = {} must be below transfer.high_water_mark = {}",
            transfer.low_water_mark, transfer.high_water_mark
        ));
    }
    if transfer.high_water_mark < transfer.chunk_size {
        errors.push("transfer.high_water_mark must hold at least one chunk".into());
    }
    validate_range(
        errors,
        "transfer.backpressure_poll_ms",
        transfer.backpressure_poll_ms,
        1,
        1000,
    );
}
