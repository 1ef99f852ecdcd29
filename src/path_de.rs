use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::DeserializationError;

/// Deserialize an already-parsed value, keeping the JSON path of the failure.
pub fn from_value_with_path<T: DeserializeOwned>(value: &Value) -> Result<T, DeserializationError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| {
        let path = err.path().to_string();
        DeserializationError { path, message: err.into_inner().to_string() }
    })
}

/// Parse and deserialize JSON text. Syntax errors report the path reached so far.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, DeserializationError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    match serde_path_to_error::deserialize::<_, T>(de) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(DeserializationError { path, message: err.into_inner().to_string() })
        }
    }
}
