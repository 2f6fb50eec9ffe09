//! Storage format of the `credentials` column.
//!
//! Rows hold the blob JSON-stringified and then stored as a JSON value, so the raw column is a JSON
//! string whose content is the blob object. Reading also accepts the blob stored as a plain object.

use crate::error::AppError;
use crate::vault::EncryptedBlob;
use serde_json::Value;

pub fn encode_credentials(blob: &EncryptedBlob) -> Result<Value, AppError> {
    let inner = serde_json::to_string(blob).map_err(|e| AppError::Vault(format!("encoding credentials: {}", e)))?;
    Ok(Value::String(inner))
}

pub fn decode_credentials(raw: Value) -> Result<EncryptedBlob, AppError> {
    let parsed = match raw {
        Value::String(s) => serde_json::from_str::<EncryptedBlob>(&s),
        other @ Value::Object(_) => serde_json::from_value::<EncryptedBlob>(other),
        other => {
            return Err(AppError::Vault(format!(
                "credentials column holds {} instead of an encrypted blob",
                json_kind(&other)
            )))
        }
    };
    parsed.map_err(|e| AppError::Vault(format!("stored credentials are malformed: {}", e)))
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blob() -> EncryptedBlob {
        EncryptedBlob {
            iv: "00112233445566778899aabbccddeeff".into(),
            cipher_text: "deadbeef".into(),
        }
    }

    #[test]
    fn encoded_column_is_a_json_string_of_the_blob() {
        let v = encode_credentials(&blob()).unwrap();
        let Value::String(inner) = &v else {
            panic!("expected string, got {v}");
        };
        let obj: Value = serde_json::from_str(inner).unwrap();
        assert_eq!(obj["iv"], "00112233445566778899aabbccddeeff");
        assert_eq!(obj["encryptedData"], "deadbeef");
        assert_eq!(decode_credentials(v).unwrap(), blob());
    }

    #[test]
    fn decodes_singly_encoded_object() {
        let v = json!({ "iv": "00112233445566778899aabbccddeeff", "encryptedData": "deadbeef" });
        assert_eq!(decode_credentials(v).unwrap(), blob());
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(matches!(decode_credentials(json!(null)), Err(AppError::Vault(_))));
        assert!(matches!(decode_credentials(json!("not json")), Err(AppError::Vault(_))));
        assert!(matches!(decode_credentials(json!({ "iv": "00" })), Err(AppError::Vault(_))));
    }
}
