//! Server-side encryption of stored workspaces.
//!
//! An encrypted workspace is stored as an envelope: the plain summary
//! fields of the workspace (id, name, description, last modified details,
//! scope-only configuration) plus an `encryptionStrategy` block and the
//! base64 `ciphertext` of the full document. The key is derived from the
//! installation passphrase with PBKDF2-HMAC-SHA256 and the document is
//! sealed with AES-GCM.

use archway_core::workspace::WorkspaceDocument;
use archway_core::{ArchwayError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::num::NonZeroU32;

const STRATEGY_TYPE: &str = "aes-gcm";
const DEFAULT_KEY_SIZE: u32 = 256;
const SALT_LENGTH: usize = 16;

/// Fields copied from the plaintext document onto the envelope.
const SUMMARY_FIELDS: [&str; 7] = [
    "id",
    "name",
    "description",
    "lastModifiedDate",
    "lastModifiedUser",
    "lastModifiedAgent",
    "configuration",
];

/// Where an envelope was encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionLocation {
    Client,
    Server,
}

/// The `encryptionStrategy` block of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionStrategyInfo {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub location: Option<EncryptionLocation>,
    #[serde(default = "default_key_size")]
    pub key_size: u32,
    #[serde(default)]
    pub iteration_count: u32,
    #[serde(default)]
    pub salt: String,
    #[serde(default)]
    pub iv: String,
}

fn default_key_size() -> u32 {
    DEFAULT_KEY_SIZE
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeView {
    encryption_strategy: EncryptionStrategyInfo,
    #[serde(default)]
    ciphertext: String,
}

/// Reads the declared location of an envelope, `None` when absent or the
/// text is not an envelope.
pub fn envelope_location(json: &str) -> Option<EncryptionLocation> {
    serde_json::from_str::<EnvelopeView>(json)
        .ok()
        .and_then(|envelope| envelope.encryption_strategy.location)
}

/// AES-GCM envelope encryption keyed by the installation passphrase.
pub struct AesEncryptionStrategy {
    passphrase: String,
    iterations: NonZeroU32,
    rng: SystemRandom,
}

impl std::fmt::Debug for AesEncryptionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesEncryptionStrategy")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

impl AesEncryptionStrategy {
    pub fn new(passphrase: impl Into<String>, iterations: u32) -> Result<Self> {
        let passphrase = passphrase.into();
        if passphrase.is_empty() {
            return Err(ArchwayError::config("Encryption passphrase must not be empty"));
        }
        let iterations = NonZeroU32::new(iterations)
            .ok_or_else(|| ArchwayError::config("Encryption iterations must be at least 1"))?;

        Ok(Self {
            passphrase,
            iterations,
            rng: SystemRandom::new(),
        })
    }

    /// Wraps a document in a server-side envelope.
    pub fn encrypt(&self, workspace: &WorkspaceDocument) -> Result<String> {
        let plaintext = workspace.to_json()?;

        let mut salt = [0u8; SALT_LENGTH];
        let mut iv = [0u8; aead::NONCE_LEN];
        self.fill_random(&mut salt)?;
        self.fill_random(&mut iv)?;

        let key = self.derive_key(&salt, self.iterations, DEFAULT_KEY_SIZE)?;
        let mut in_out = plaintext.into_bytes();
        key.seal_in_place_append_tag(Nonce::assume_unique_for_key(iv), Aad::empty(), &mut in_out)
            .map_err(|_| ArchwayError::encryption("Could not encrypt workspace"))?;

        let strategy = EncryptionStrategyInfo {
            kind: STRATEGY_TYPE.to_string(),
            location: Some(EncryptionLocation::Server),
            key_size: DEFAULT_KEY_SIZE,
            iteration_count: self.iterations.get(),
            salt: BASE64.encode(salt),
            iv: BASE64.encode(iv),
        };

        let mut envelope = Map::new();
        for field in SUMMARY_FIELDS {
            if let Some(value) = workspace.as_value().get(field) {
                envelope.insert(field.to_string(), value.clone());
            }
        }
        envelope.insert(
            "encryptionStrategy".to_string(),
            serde_json::to_value(&strategy)?,
        );
        envelope.insert(
            "ciphertext".to_string(),
            Value::String(BASE64.encode(&in_out)),
        );

        Ok(serde_json::to_string(&envelope)?)
    }

    /// Opens a server-side envelope and returns the plaintext document.
    pub fn decrypt(&self, envelope_json: &str) -> Result<String> {
        let envelope: EnvelopeView = serde_json::from_str(envelope_json)?;
        let strategy = envelope.encryption_strategy;

        let salt = decode(&strategy.salt, "salt")?;
        let iv: [u8; aead::NONCE_LEN] = decode(&strategy.iv, "iv")?
            .try_into()
            .map_err(|_| ArchwayError::encryption("Envelope iv has the wrong length"))?;
        let iterations = NonZeroU32::new(strategy.iteration_count).unwrap_or(self.iterations);

        let key = self.derive_key(&salt, iterations, strategy.key_size)?;
        let mut in_out = decode(&envelope.ciphertext, "ciphertext")?;
        let plaintext = key
            .open_in_place(Nonce::assume_unique_for_key(iv), Aad::empty(), &mut in_out)
            .map_err(|_| {
                ArchwayError::encryption("Could not decrypt workspace; check the passphrase")
            })?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|e| ArchwayError::encryption(format!("Decrypted workspace is not UTF-8: {}", e)))
    }

    fn fill_random(&self, buffer: &mut [u8]) -> Result<()> {
        self.rng
            .fill(buffer)
            .map_err(|_| ArchwayError::encryption("Random number generator failure"))
    }

    fn derive_key(&self, salt: &[u8], iterations: NonZeroU32, key_size: u32) -> Result<LessSafeKey> {
        let (algorithm, length) = match key_size {
            128 => (&aead::AES_128_GCM, 16),
            256 => (&aead::AES_256_GCM, 32),
            other => {
                return Err(ArchwayError::encryption(format!(
                    "Unsupported key size {}",
                    other
                )));
            }
        };

        let mut key = vec![0u8; length];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations,
            salt,
            self.passphrase.as_bytes(),
            &mut key,
        );

        let unbound = UnboundKey::new(algorithm, &key)
            .map_err(|_| ArchwayError::encryption("Could not create encryption key"))?;
        Ok(LessSafeKey::new(unbound))
    }
}

fn decode(value: &str, field: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(value.trim())
        .map_err(|e| ArchwayError::encryption(format!("Envelope {} is not base64: {}", field, e)))
}
