use serde::Serialize;

use crate::error::FaersError;

pub fn to_pretty<T: Serialize>(value: &T) -> Result<String, FaersError> {
    Ok(serde_json::to_string_pretty(value)?)
}
