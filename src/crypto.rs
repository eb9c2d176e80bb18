//! `WebAuthn` cryptography operations
//!
//! Verification calls out to a [`CryptoProvider`] for digests, key import and
//! signature checks. [`SoftwareCryptoProvider`] is the default implementation
//! backed by `ring`, `p256` and `rsa`.

use async_trait::async_trait;
use log::debug;
use p256::ecdsa::signature::Verifier as _;
use p256::pkcs8::DecodePublicKey as _;
use ring::digest;
use rsa::pkcs8::DecodePublicKey as _;
use rsa::signature::Verifier as _;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, WebAuthnError};

/// COSE identifier for ECDSA with SHA-256
pub const COSE_ALG_ES256: i64 = -7;

/// COSE identifier for EdDSA (not supported)
pub const COSE_ALG_EDDSA: i64 = -8;

/// COSE identifier for RSASSA-PKCS1-v1_5 with SHA-256
pub const COSE_ALG_RS256: i64 = -257;

/// Supported credential signature algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoseAlgorithm {
    /// ECDSA, P-256, SHA-256
    Es256,
    /// RSASSA-PKCS1-v1_5, SHA-256
    Rs256,
}

impl CoseAlgorithm {
    /// Map a COSE algorithm identifier
    ///
    /// # Errors
    /// Returns `UnsupportedAlgorithm` for anything other than -7 and -257
    pub fn from_cose(alg: i64) -> Result<Self> {
        match alg {
            COSE_ALG_ES256 => Ok(Self::Es256),
            COSE_ALG_RS256 => Ok(Self::Rs256),
            other => Err(WebAuthnError::UnsupportedAlgorithm(other)),
        }
    }

    #[must_use]
    pub fn cose_id(self) -> i64 {
        match self {
            Self::Es256 => COSE_ALG_ES256,
            Self::Rs256 => COSE_ALG_RS256,
        }
    }

    /// Algorithm used to import the credential public key
    #[must_use]
    pub fn import_algorithm(self) -> ImportAlgorithm {
        match self {
            Self::Es256 => ImportAlgorithm::Ecdsa {
                named_curve: NamedCurve::P256,
            },
            Self::Rs256 => ImportAlgorithm::RsassaPkcs1v15 {
                hash: HashAlgorithm::Sha256,
            },
        }
    }

    /// Algorithm used to verify assertion signatures
    #[must_use]
    pub fn verify_algorithm(self) -> VerifyAlgorithm {
        match self {
            Self::Es256 => VerifyAlgorithm::Ecdsa {
                hash: HashAlgorithm::Sha256,
            },
            Self::Rs256 => VerifyAlgorithm::RsassaPkcs1v15 {
                hash: HashAlgorithm::Sha256,
            },
        }
    }

    #[must_use]
    pub fn is_ecdsa(self) -> bool {
        matches!(self, Self::Es256)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedCurve {
    P256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
}

/// Key import parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportAlgorithm {
    Ecdsa { named_curve: NamedCurve },
    RsassaPkcs1v15 { hash: HashAlgorithm },
}

/// Signature verification parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyAlgorithm {
    Ecdsa { hash: HashAlgorithm },
    RsassaPkcs1v15 { hash: HashAlgorithm },
}

/// Encoding of the stored credential public key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyFormat {
    /// DER `SubjectPublicKeyInfo`
    #[default]
    Spki,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyUsage {
    Verify,
}

/// Options for importing the credential public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyOptions {
    #[serde(default)]
    pub format: KeyFormat,
    /// Whether the imported key may be exported again (default `false`)
    #[serde(default)]
    pub extractable: bool,
    /// Permitted operations (default `[Verify]`)
    #[serde(default = "default_usages")]
    pub usages: Vec<KeyUsage>,
}

impl Default for PublicKeyOptions {
    fn default() -> Self {
        Self {
            format: KeyFormat::Spki,
            extractable: false,
            usages: default_usages(),
        }
    }
}

fn default_usages() -> Vec<KeyUsage> {
    vec![KeyUsage::Verify]
}

/// External cryptographic operations used during verification
///
/// Implementations may be backed by hardware; import and verify are async for
/// that reason. A provider must not retry a failed verification.
#[async_trait]
pub trait CryptoProvider: Send + Sync {
    /// Imported key handle
    type Key: Send + Sync;

    fn sha256(&self, data: &[u8]) -> [u8; 32];

    /// Import a public key
    ///
    /// # Errors
    /// Returns `CryptoProviderError` if the key material or options are unusable
    async fn import_public_key(
        &self,
        key: &[u8],
        algorithm: ImportAlgorithm,
        options: &PublicKeyOptions,
    ) -> Result<Self::Key>;

    /// Verify `signature` over `data`
    ///
    /// A signature that does not verify is `Ok(false)`.
    ///
    /// # Errors
    /// Returns `CryptoProviderError` if the algorithm does not fit the key
    async fn verify(
        &self,
        algorithm: VerifyAlgorithm,
        key: &Self::Key,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool>;
}

/// Key imported by [`SoftwareCryptoProvider`]
#[derive(Debug, Clone)]
pub enum SoftwareKey {
    EcdsaP256(p256::ecdsa::VerifyingKey),
    Rsa(rsa::RsaPublicKey),
}

/// Pure-software provider
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareCryptoProvider;

impl SoftwareCryptoProvider {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CryptoProvider for SoftwareCryptoProvider {
    type Key = SoftwareKey;

    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        sha256(data)
    }

    async fn import_public_key(
        &self,
        key: &[u8],
        algorithm: ImportAlgorithm,
        options: &PublicKeyOptions,
    ) -> Result<SoftwareKey> {
        if !options.usages.contains(&KeyUsage::Verify) {
            return Err(WebAuthnError::CryptoProviderError(
                "Key usages do not include verify".to_string(),
            ));
        }
        match algorithm {
            ImportAlgorithm::Ecdsa {
                named_curve: NamedCurve::P256,
            } => p256::ecdsa::VerifyingKey::from_public_key_der(key)
                .map(SoftwareKey::EcdsaP256)
                .map_err(|e| {
                    WebAuthnError::CryptoProviderError(format!("Invalid P-256 SPKI key: {e}"))
                }),
            ImportAlgorithm::RsassaPkcs1v15 {
                hash: HashAlgorithm::Sha256,
            } => rsa::RsaPublicKey::from_public_key_der(key)
                .map(SoftwareKey::Rsa)
                .map_err(|e| {
                    WebAuthnError::CryptoProviderError(format!("Invalid RSA SPKI key: {e}"))
                }),
        }
    }

    async fn verify(
        &self,
        algorithm: VerifyAlgorithm,
        key: &SoftwareKey,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool> {
        match (algorithm, key) {
            (
                VerifyAlgorithm::Ecdsa {
                    hash: HashAlgorithm::Sha256,
                },
                SoftwareKey::EcdsaP256(verifying_key),
            ) => {
                // Raw r || s only; anything else does not verify
                let Ok(signature) = p256::ecdsa::Signature::from_slice(signature) else {
                    debug!("ECDSA signature of {} bytes is not raw r || s", signature.len());
                    return Ok(false);
                };
                Ok(verifying_key.verify(data, &signature).is_ok())
            }
            (
                VerifyAlgorithm::RsassaPkcs1v15 {
                    hash: HashAlgorithm::Sha256,
                },
                SoftwareKey::Rsa(public_key),
            ) => {
                let verifying_key =
                    rsa::pkcs1v15::VerifyingKey::<sha2::Sha256>::new(public_key.clone());
                let Ok(signature) = rsa::pkcs1v15::Signature::try_from(signature) else {
                    return Ok(false);
                };
                Ok(verifying_key.verify(data, &signature).is_ok())
            }
            _ => Err(WebAuthnError::CryptoProviderError(
                "Verify algorithm does not match imported key".to_string(),
            )),
        }
    }
}

/// Hash data using SHA-256
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let digest = digest::digest(&digest::SHA256, data);
    let mut out = [0u8; 32];
    out.copy_from_slice(digest.as_ref());
    out
}

/// Compare two byte strings without stopping at the first difference
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
