//! Client data JSON processing
//!
//! Both ceremonies compare the `type`, `challenge` and `origin` members of
//! clientDataJSON against caller-supplied values using exact string equality.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, WebAuthnError};

/// `type` member of clientDataJSON for registration
pub const TYPE_CREATE: &str = "webauthn.create";

/// `type` member of clientDataJSON for authentication
pub const TYPE_GET: &str = "webauthn.get";

/// Decoded clientDataJSON
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ClientData {
    #[serde(rename = "type")]
    pub r#type: String,
    pub challenge: String,
    pub origin: String,
    #[serde(rename = "crossOrigin", default, skip_serializing_if = "Option::is_none")]
    pub cross_origin: Option<bool>,
    #[serde(rename = "topOrigin", default, skip_serializing_if = "Option::is_none")]
    pub top_origin: Option<String>,
}

impl ClientData {
    /// Decode raw clientDataJSON bytes
    ///
    /// # Errors
    /// Returns `ClientDataDecodeError` if the bytes are not JSON or a required member is missing
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| WebAuthnError::ClientDataDecodeError(format!("Invalid client data JSON: {e}")))
    }

    /// Compare against the expected ceremony values
    ///
    /// # Errors
    /// Returns `ClientDataMismatch` naming the first member that differs
    pub fn verify(&self, expected_type: &str, expected_challenge: &str, expected_origin: &str) -> Result<()> {
        if self.r#type != expected_type {
            return Err(WebAuthnError::ClientDataMismatch("type"));
        }
        if self.challenge != expected_challenge {
            return Err(WebAuthnError::ClientDataMismatch("challenge"));
        }
        if self.origin != expected_origin {
            return Err(WebAuthnError::ClientDataMismatch("origin"));
        }
        Ok(())
    }
}
