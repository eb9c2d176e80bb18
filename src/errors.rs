//! `WebAuthn` verification error types
//!
//! Every rejection made by the parsers and validators is surfaced as one of
//! these variants. Callers should treat any error as a failed ceremony; the
//! variant only exists so the reason can be logged.

use thiserror::Error;

/// Errors that can occur while parsing or validating a `WebAuthn` ceremony
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WebAuthnError {
    /// Authenticator data is shorter than its layout requires
    #[error("Malformed authenticator data: {0}")]
    MalformedAuthData(String),

    /// Attestation object could not be decoded or lacks `authData`
    #[error("Attestation decode error: {0}")]
    AttestationDecodeError(String),

    /// Attestation format other than `none`
    #[error("Unsupported attestation format: {0}")]
    UnsupportedAttestationFormat(String),

    /// `none` attestation carried a non-empty statement
    #[error("Unexpected attestation statement for format none ({0} entries)")]
    UnexpectedAttestationStatement(usize),

    /// ECDSA signature is not a DER `SEQUENCE { INTEGER, INTEGER }`
    #[error("Invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    /// Required field is absent or empty
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Credential type is not `public-key`
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Stored credential and assertion refer to different credentials
    #[error("Credential and assertion mismatch on {0}")]
    CredentialAssertionMismatch(&'static str),

    /// A clientDataJSON field differs from the expected value
    #[error("Client data mismatch on {0}")]
    ClientDataMismatch(&'static str),

    /// clientDataJSON is not valid JSON or lacks a required member
    #[error("Client data decode error: {0}")]
    ClientDataDecodeError(String),

    /// A counter value is negative
    #[error("Invalid counter value: {0}")]
    InvalidCounter(i64),

    /// Assertion counter did not strictly increase over the stored one
    #[error("Replay suspected: assertion counter {received} is not greater than stored counter {stored}")]
    ReplaySuspected { stored: i64, received: i64 },

    /// User presence flag not set
    #[error("User presence required")]
    UserPresenceRequired,

    /// User verification flag not set
    #[error("User verification required")]
    UserVerificationRequired,

    /// `rpIdHash` does not match SHA-256 of the expected RP ID
    #[error("RP ID hash mismatch")]
    RpIdMismatch,

    /// COSE algorithm identifier outside the supported set
    #[error("Unsupported COSE algorithm: {0}")]
    UnsupportedAlgorithm(i64),

    /// Failure surfaced from the crypto provider (e.g. malformed key material)
    #[error("Crypto provider error: {0}")]
    CryptoProviderError(String),

    /// A base64url wire field could not be decoded
    #[error("Encoding error: {0}")]
    EncodingError(String),
}

impl WebAuthnError {
    /// Stable name of the error kind, suitable for structured logging
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedAuthData(_) => "MalformedAuthData",
            Self::AttestationDecodeError(_) => "AttestationDecodeError",
            Self::UnsupportedAttestationFormat(_) => "UnsupportedAttestationFormat",
            Self::UnexpectedAttestationStatement(_) => "UnexpectedAttestationStatement",
            Self::InvalidSignatureEncoding(_) => "InvalidSignatureEncoding",
            Self::MissingField(_) => "MissingField",
            Self::TypeMismatch { .. } => "TypeMismatch",
            Self::CredentialAssertionMismatch(_) => "CredentialAssertionMismatch",
            Self::ClientDataMismatch(_) => "ClientDataMismatch",
            Self::ClientDataDecodeError(_) => "ClientDataDecodeError",
            Self::InvalidCounter(_) => "InvalidCounter",
            Self::ReplaySuspected { .. } => "ReplaySuspected",
            Self::UserPresenceRequired => "UserPresenceRequired",
            Self::UserVerificationRequired => "UserVerificationRequired",
            Self::RpIdMismatch => "RpIdMismatch",
            Self::UnsupportedAlgorithm(_) => "UnsupportedAlgorithm",
            Self::CryptoProviderError(_) => "CryptoProviderError",
            Self::EncodingError(_) => "EncodingError",
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, WebAuthnError>;
