//! Signing collaborator and the ed25519 key type behind it.

use std::{
    fmt,
    sync::LazyLock,
};

use ed25519_dalek::{
    KEYPAIR_LENGTH,
    SECRET_KEY_LENGTH,
    Signer as _,
    SigningKey,
};
use rand::{
    TryRngCore,
    rngs::OsRng,
};
use regex::Regex;
use sha2::{
    Digest,
    Sha256,
};
use thiserror::Error;

/// Length in bytes of an account address.
pub const ADDRESS_LENGTH: usize = 20;

static PRIVATE_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[0-9a-fA-F]{128}$").expect("valid private key pattern"));
static PUBLIC_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[0-9a-fA-F]{64}$").expect("valid public key pattern"));
static ADDRESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[0-9a-f]{40}$").expect("valid address pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("os random source failed: {0}")]
    Entropy(String),
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Signs relay proofs. Implementations return the signature hex encoded.
#[cfg_attr(test, mockall::automock)]
pub trait Signer: Send + Sync {
    fn sign(&self, payload: &[u8]) -> Result<String, SignerError>;
}

/// An ed25519 account key.
#[derive(Clone)]
pub struct Ed25519Signer {
    key: SigningKey,
}

impl Ed25519Signer {
    /// Loads a key from its 128 hex character form (seed followed by the
    /// public key). Keys whose public half does not belong to the seed are
    /// rejected.
    pub fn from_private_key(private_key: &str) -> Result<Self, SignerError> {
        if !validate_private_key(private_key) {
            return Err(SignerError::InvalidPrivateKey(
                "expected 128 hex characters".to_string(),
            ));
        }
        let mut bytes = [0u8; KEYPAIR_LENGTH];
        hex::decode_to_slice(private_key, &mut bytes)
            .map_err(|e| SignerError::InvalidPrivateKey(e.to_string()))?;
        let key = SigningKey::from_keypair_bytes(&bytes)
            .map_err(|e| SignerError::InvalidPrivateKey(e.to_string()))?;

        Ok(Self { key })
    }

    /// Generates a fresh key from the operating system random source.
    pub fn random() -> Result<Self, SignerError> {
        let mut seed = [0u8; SECRET_KEY_LENGTH];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| SignerError::Entropy(e.to_string()))?;

        Ok(Self {
            key: SigningKey::from_bytes(&seed),
        })
    }

    pub fn public_key(&self) -> String {
        hex::encode(self.key.verifying_key().as_bytes())
    }

    pub fn private_key(&self) -> String {
        hex::encode(self.key.to_keypair_bytes())
    }

    pub fn address(&self) -> String {
        address_from_public_key_bytes(self.key.verifying_key().as_bytes())
    }

    /// Raw 64-byte signature over `payload`.
    pub fn sign_bytes(&self, payload: &[u8]) -> [u8; 64] {
        self.key.sign(payload).to_bytes()
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, payload: &[u8]) -> Result<String, SignerError> {
        Ok(hex::encode(self.sign_bytes(payload)))
    }
}

impl fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Address of a hex encoded public key: the first 20 bytes of its SHA-256.
pub fn address_from_public_key(public_key: &str) -> Result<String, SignerError> {
    if !validate_public_key(public_key) {
        return Err(SignerError::InvalidPublicKey(
            "expected 64 hex characters".to_string(),
        ));
    }
    let bytes =
        hex::decode(public_key).map_err(|e| SignerError::InvalidPublicKey(e.to_string()))?;
    Ok(address_from_public_key_bytes(&bytes))
}

fn address_from_public_key_bytes(public_key: &[u8]) -> String {
    let digest = Sha256::digest(public_key);
    hex::encode(&digest[..ADDRESS_LENGTH])
}

pub fn validate_private_key(private_key: &str) -> bool {
    PRIVATE_KEY_PATTERN.is_match(private_key)
}

pub fn validate_public_key(public_key: &str) -> bool {
    PUBLIC_KEY_PATTERN.is_match(public_key)
}

pub fn validate_address(address: &str) -> bool {
    ADDRESS_PATTERN.is_match(address)
}
