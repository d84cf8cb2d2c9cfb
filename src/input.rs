use serde_json::Value;

use crate::error::{ErrorCode, ValidationErrors};

/// Input accepted by the decoding entry points: JSON text, raw bytes or
/// an already-parsed `serde_json::Value`.
pub trait Input {
    fn to_value(&self) -> Result<Value, ValidationErrors>;
}

impl Input for Value {
    fn to_value(&self) -> Result<Value, ValidationErrors> {
        Ok(self.clone())
    }
}

impl Input for str {
    fn to_value(&self) -> Result<Value, ValidationErrors> {
        serde_json::from_str(self).map_err(|e| {
            ValidationErrors::single(ErrorCode::ParseError, format!("invalid JSON: {}", e))
        })
    }
}

impl Input for String {
    fn to_value(&self) -> Result<Value, ValidationErrors> {
        self.as_str().to_value()
    }
}

impl Input for [u8] {
    fn to_value(&self) -> Result<Value, ValidationErrors> {
        serde_json::from_slice(self).map_err(|e| {
            ValidationErrors::single(ErrorCode::ParseError, format!("invalid JSON: {}", e))
        })
    }
}
