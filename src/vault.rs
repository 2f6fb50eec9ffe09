//! Credential vault: AES-256-CBC with a fresh IV per encryption. Pure transformation, no I/O.

use crate::error::{AppError, ConfigError};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 16;

/// Ciphertext plus the IV it was produced with, both hex encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    pub iv: String,
    #[serde(rename = "encryptedData", alias = "cipherText")]
    pub cipher_text: String,
}

/// Decrypted output: a key/value record when the plaintext parses as a JSON object, else the raw text.
#[derive(Clone, Debug, PartialEq)]
pub enum Decrypted {
    Record(Map<String, Value>),
    Text(String),
}

impl Decrypted {
    fn from_plaintext(text: String) -> Self {
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Decrypted::Record(map),
            _ => Decrypted::Text(text),
        }
    }
}

/// Process-wide symmetric key. Accepts 32 raw bytes or 64 hex characters.
#[derive(Clone)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        EncryptionKey(bytes)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut key = [0u8; KEY_LEN];
        if raw.len() == KEY_LEN * 2 {
            if let Ok(bytes) = hex::decode(raw) {
                key.copy_from_slice(&bytes);
                return Ok(EncryptionKey(key));
            }
        }
        if raw.len() == KEY_LEN {
            key.copy_from_slice(raw.as_bytes());
            return Ok(EncryptionKey(key));
        }
        Err(ConfigError::Invalid {
            name: "ENCRYPTION_KEY",
            reason: format!(
                "expected {} bytes or {} hex characters, got {} bytes",
                KEY_LEN,
                KEY_LEN * 2,
                raw.len()
            ),
        })
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

#[derive(Clone, Debug)]
pub struct Vault {
    key: EncryptionKey,
}

impl Vault {
    pub fn new(key: EncryptionKey) -> Self {
        Vault { key }
    }

    /// Returns `None` for empty input.
    pub fn encrypt(&self, plaintext: &str) -> Result<Option<EncryptedBlob>, AppError> {
        if plaintext.is_empty() {
            return Ok(None);
        }
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        let cipher = Aes256CbcEnc::new_from_slices(&self.key.0, &iv)
            .map_err(|e| AppError::Vault(format!("cipher init: {}", e)))?;
        let encrypted = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        Ok(Some(EncryptedBlob {
            iv: hex::encode(iv),
            cipher_text: hex::encode(encrypted),
        }))
    }

    /// Encrypt the JSON form of a structured value.
    pub fn encrypt_value(&self, value: &Value) -> Result<EncryptedBlob, AppError> {
        let text = serde_json::to_string(value).map_err(|e| AppError::Vault(e.to_string()))?;
        self.encrypt(&text)?
            .ok_or_else(|| AppError::Vault("nothing to encrypt".into()))
    }

    /// Wrong key or a damaged blob is an error, never garbage output.
    pub fn decrypt(&self, blob: &EncryptedBlob) -> Result<Decrypted, AppError> {
        let iv = hex::decode(&blob.iv).map_err(|e| AppError::Vault(format!("iv is not hex: {}", e)))?;
        if iv.len() != IV_LEN {
            return Err(AppError::Vault(format!("iv must be {} bytes, got {}", IV_LEN, iv.len())));
        }
        let cipher_text = hex::decode(&blob.cipher_text)
            .map_err(|e| AppError::Vault(format!("cipher text is not hex: {}", e)))?;
        let cipher = Aes256CbcDec::new_from_slices(&self.key.0, &iv)
            .map_err(|e| AppError::Vault(format!("cipher init: {}", e)))?;
        let plain = cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&cipher_text)
            .map_err(|_| AppError::Vault("decryption failed: wrong key or corrupted data".into()))?;
        let text = String::from_utf8(plain)
            .map_err(|_| AppError::Vault("decryption failed: plaintext is not valid UTF-8".into()))?;
        Ok(Decrypted::from_plaintext(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault(byte: u8) -> Vault {
        Vault::new(EncryptionKey::from_bytes([byte; KEY_LEN]))
    }

    #[test]
    fn record_round_trips() {
        let v = vault(7);
        let record = serde_json::json!({
            "host": "db.internal", "port": 3306, "database": "app", "user": "svc", "password": "s3cr3t"
        });
        let blob = v.encrypt_value(&record).unwrap();
        assert_eq!(blob.iv.len(), IV_LEN * 2);
        match v.decrypt(&blob).unwrap() {
            Decrypted::Record(map) => assert_eq!(Value::Object(map), record),
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn same_input_gets_fresh_iv() {
        let v = vault(1);
        let a = v.encrypt("same").unwrap().unwrap();
        let b = v.encrypt("same").unwrap().unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.cipher_text, b.cipher_text);
    }

    #[test]
    fn non_record_plaintext_is_returned_raw() {
        let v = vault(2);
        let blob = v.encrypt("plain secret").unwrap().unwrap();
        assert_eq!(v.decrypt(&blob).unwrap(), Decrypted::Text("plain secret".into()));
    }

    #[test]
    fn empty_input_encrypts_to_none() {
        assert!(vault(3).encrypt("").unwrap().is_none());
    }

    #[test]
    fn wrong_key_fails_loudly() {
        let blob = vault(4).encrypt(r#"{"mongoUri":"mongodb://localhost:27017/test"}"#).unwrap().unwrap();
        assert!(matches!(vault(5).decrypt(&blob), Err(AppError::Vault(_))));
    }

    #[test]
    fn corrupted_blob_fails() {
        let v = vault(6);
        let mut blob = v.encrypt("abc").unwrap().unwrap();
        blob.iv.truncate(10);
        assert!(v.decrypt(&blob).is_err());
        let mut blob = v.encrypt("abc").unwrap().unwrap();
        blob.cipher_text = "zz".into();
        assert!(v.decrypt(&blob).is_err());
    }

    #[test]
    fn blob_serializes_with_stored_field_names() {
        let blob = EncryptedBlob { iv: "00".into(), cipher_text: "ff".into() };
        let json = serde_json::to_value(&blob).unwrap();
        assert_eq!(json["encryptedData"], "ff");
        let alias: EncryptedBlob = serde_json::from_value(serde_json::json!({"iv": "00", "cipherText": "ff"})).unwrap();
        assert_eq!(alias, blob);
    }

    #[test]
    fn key_parsing() {
        assert!(EncryptionKey::parse(&"k".repeat(32)).is_ok());
        assert!(EncryptionKey::parse(&"ab".repeat(32)).is_ok());
        assert!(EncryptionKey::parse("short").is_err());
    }
}
