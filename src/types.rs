//! `WebAuthn` verification types
//!
//! Domain types hold decoded bytes. The `*Json` types mirror the browser's
//! `PublicKeyCredential.toJSON()` form, with binary members base64url encoded,
//! and convert into the domain types with `TryFrom`.

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::attestation::{decode_attestation_object_with, AttestationEnvelope};
use crate::auth_data::{AuthenticatorData, CoseKeySpan};
use crate::client_data::{ClientData, TYPE_CREATE, TYPE_GET};
use crate::errors::{Result, WebAuthnError};

/// Credential type every accepted credential must carry
pub const PUBLIC_KEY_CREDENTIAL_TYPE: &str = "public-key";

/// Attestation response returned by `navigator.credentials.create()`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttestationResponse {
    pub client_data_json: Vec<u8>,
    pub attestation_object: Vec<u8>,
    /// SPKI encoded credential public key; empty if the client did not provide one
    pub public_key: Vec<u8>,
    /// COSE algorithm identifier
    pub public_key_algorithm: i64,
}

/// A newly created credential, also used as the stored credential record
/// when validating later assertions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationCredential {
    pub id: String,
    pub raw_id: Vec<u8>,
    pub r#type: String,
    pub response: AttestationResponse,
}

impl RegistrationCredential {
    /// Decode the response's clientDataJSON
    ///
    /// # Errors
    /// Returns `ClientDataDecodeError` if the JSON is invalid
    pub fn client_data(&self) -> Result<ClientData> {
        ClientData::from_bytes(&self.response.client_data_json)
    }

    /// Decode the attestation object
    ///
    /// # Errors
    /// See [`decode_attestation_object_with`]
    pub fn attestation(&self, key_span: CoseKeySpan) -> Result<AttestationEnvelope> {
        decode_attestation_object_with(&self.response.attestation_object, key_span)
    }

    /// Authenticator data carried in the attestation object
    ///
    /// # Errors
    /// See [`decode_attestation_object_with`]
    pub fn auth_data(&self) -> Result<AuthenticatorData> {
        self.attestation(CoseKeySpan::default()).map(|e| e.auth_data)
    }

    /// Parse the browser JSON form
    ///
    /// # Errors
    /// Returns `EncodingError` if the JSON or a base64url member is invalid
    pub fn from_json(json: &str) -> Result<Self> {
        let wire: RegistrationCredentialJson = serde_json::from_str(json)
            .map_err(|e| WebAuthnError::EncodingError(format!("Invalid credential JSON: {e}")))?;
        Self::try_from(wire)
    }
}

/// Assertion response returned by `navigator.credentials.get()`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssertionResponse {
    pub client_data_json: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    /// DER encoded for ECDSA, raw for RSA
    pub signature: Vec<u8>,
    pub user_handle: Option<Vec<u8>>,
}

/// Authentication assertion
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticationAssertion {
    pub id: String,
    pub raw_id: Vec<u8>,
    pub r#type: String,
    pub response: AssertionResponse,
}

impl AuthenticationAssertion {
    /// Decode the response's clientDataJSON
    ///
    /// # Errors
    /// Returns `ClientDataDecodeError` if the JSON is invalid
    pub fn client_data(&self) -> Result<ClientData> {
        ClientData::from_bytes(&self.response.client_data_json)
    }

    /// Parse the response's authenticator data with the default key span
    ///
    /// # Errors
    /// Returns `MalformedAuthData` if the bytes are too short
    pub fn auth_data(&self) -> Result<AuthenticatorData> {
        AuthenticatorData::parse(&self.response.authenticator_data)
    }

    /// Parse the browser JSON form
    ///
    /// # Errors
    /// Returns `EncodingError` if the JSON or a base64url member is invalid
    pub fn from_json(json: &str) -> Result<Self> {
        let wire: AuthenticationAssertionJson = serde_json::from_str(json)
            .map_err(|e| WebAuthnError::EncodingError(format!("Invalid assertion JSON: {e}")))?;
        Self::try_from(wire)
    }
}

/// Caller-supplied ground truth for one registration ceremony
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ExpectedRegistrationProps {
    pub challenge: String,
    pub origin: String,
    #[serde(default = "default_create_type")]
    pub r#type: String,
}

impl ExpectedRegistrationProps {
    /// Expected values with the `webauthn.create` type
    #[must_use]
    pub fn new(challenge: &str, origin: &str) -> Self {
        Self {
            challenge: challenge.to_string(),
            origin: origin.to_string(),
            r#type: TYPE_CREATE.to_string(),
        }
    }
}

/// Caller-supplied ground truth for one authentication ceremony
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ExpectedAuthenticationProps {
    /// Plain RP ID domain, hashed during validation
    pub rp_id: String,
    pub challenge: String,
    pub origin: String,
    #[serde(default = "default_get_type")]
    pub r#type: String,
    /// Last counter value persisted for this credential
    pub counter_credential: i64,
}

impl ExpectedAuthenticationProps {
    /// Expected values with the `webauthn.get` type
    #[must_use]
    pub fn new(rp_id: &str, challenge: &str, origin: &str, counter_credential: i64) -> Self {
        Self {
            rp_id: rp_id.to_string(),
            challenge: challenge.to_string(),
            origin: origin.to_string(),
            r#type: TYPE_GET.to_string(),
            counter_credential,
        }
    }
}

/// Values read from the incoming assertion
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct IncomingAuthenticationProps {
    pub counter_assertion: i64,
}

impl IncomingAuthenticationProps {
    /// Read the counter out of the assertion's authenticator data
    ///
    /// # Errors
    /// Returns `MalformedAuthData` if the authenticator data is too short
    pub fn from_assertion(assertion: &AuthenticationAssertion) -> Result<Self> {
        let auth_data = assertion.auth_data()?;
        Ok(Self {
            counter_assertion: i64::from(auth_data.counter),
        })
    }
}

fn default_create_type() -> String {
    TYPE_CREATE.to_string()
}

fn default_get_type() -> String {
    TYPE_GET.to_string()
}

/// Registration credential as serialized by the browser
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationCredentialJson {
    pub id: String,
    pub raw_id: String,
    pub r#type: String,
    pub response: AttestationResponseJson,
    #[serde(default)]
    pub authenticator_attachment: Option<String>,
    #[serde(default)]
    pub client_extension_results: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponseJson {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub attestation_object: String,
    #[serde(default)]
    pub public_key: Option<String>,
    pub public_key_algorithm: i64,
    #[serde(default)]
    pub transports: Option<Vec<String>>,
}

/// Authentication assertion as serialized by the browser
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationAssertionJson {
    pub id: String,
    pub raw_id: String,
    pub r#type: String,
    pub response: AssertionResponseJson,
    #[serde(default)]
    pub authenticator_attachment: Option<String>,
    #[serde(default)]
    pub client_extension_results: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponseJson {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub authenticator_data: String,
    pub signature: String,
    #[serde(default)]
    pub user_handle: Option<String>,
}

impl TryFrom<RegistrationCredentialJson> for RegistrationCredential {
    type Error = WebAuthnError;

    fn try_from(wire: RegistrationCredentialJson) -> Result<Self> {
        let response = wire.response;
        Ok(Self {
            raw_id: decode_b64url("rawId", &wire.raw_id)?,
            id: wire.id,
            r#type: wire.r#type,
            response: AttestationResponse {
                client_data_json: decode_b64url("clientDataJSON", &response.client_data_json)?,
                attestation_object: decode_b64url(
                    "attestationObject",
                    &response.attestation_object,
                )?,
                public_key: response
                    .public_key
                    .as_deref()
                    .map(|key| decode_b64url("publicKey", key))
                    .transpose()?
                    .unwrap_or_default(),
                public_key_algorithm: response.public_key_algorithm,
            },
        })
    }
}

impl TryFrom<AuthenticationAssertionJson> for AuthenticationAssertion {
    type Error = WebAuthnError;

    fn try_from(wire: AuthenticationAssertionJson) -> Result<Self> {
        let response = wire.response;
        Ok(Self {
            raw_id: decode_b64url("rawId", &wire.raw_id)?,
            id: wire.id,
            r#type: wire.r#type,
            response: AssertionResponse {
                client_data_json: decode_b64url("clientDataJSON", &response.client_data_json)?,
                authenticator_data: decode_b64url(
                    "authenticatorData",
                    &response.authenticator_data,
                )?,
                signature: decode_b64url("signature", &response.signature)?,
                user_handle: response
                    .user_handle
                    .as_deref()
                    .map(|handle| decode_b64url("userHandle", handle))
                    .transpose()?,
            },
        })
    }
}

/// Decode base64url, with or without padding
fn decode_b64url(field: &str, value: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(value)
        .or_else(|_| URL_SAFE.decode(value))
        .map_err(|_| WebAuthnError::EncodingError(format!("Invalid {field} encoding")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASSERTION_JSON: &str = r#"{
        "id": "AQID",
        "rawId": "AQID",
        "type": "public-key",
        "response": {
            "clientDataJSON": "eyJ0eXBlIjoid2ViYXV0aG4uZ2V0In0",
            "authenticatorData": "AAAA",
            "signature": "MEQ=",
            "userHandle": "dXNlcg"
        },
        "clientExtensionResults": {}
    }"#;

    #[test]
    fn test_assertion_from_json() {
        let assertion = AuthenticationAssertion::from_json(ASSERTION_JSON).unwrap();
        assert_eq!(assertion.id, "AQID");
        assert_eq!(assertion.raw_id, vec![1, 2, 3]);
        assert_eq!(assertion.r#type, PUBLIC_KEY_CREDENTIAL_TYPE);
        assert_eq!(
            assertion.response.client_data_json,
            br#"{"type":"webauthn.get"}"#.to_vec()
        );
        assert_eq!(assertion.response.authenticator_data, vec![0, 0, 0]);
        // Padded base64url is accepted too
        assert_eq!(assertion.response.signature, vec![0x30, 0x44]);
        assert_eq!(assertion.response.user_handle, Some(b"user".to_vec()));
    }

    #[test]
    fn test_registration_from_json_without_public_key() {
        let json = r#"{
            "id": "AQID",
            "rawId": "AQID",
            "type": "public-key",
            "response": {
                "clientDataJSON": "e30",
                "attestationObject": "oA",
                "publicKeyAlgorithm": -7,
                "transports": ["internal"]
            }
        }"#;
        let credential = RegistrationCredential::from_json(json).unwrap();
        assert!(credential.response.public_key.is_empty());
        assert_eq!(credential.response.public_key_algorithm, -7);
        assert_eq!(credential.response.attestation_object, vec![0xa0]);
    }

    #[test]
    fn test_invalid_base64_names_field() {
        let json = ASSERTION_JSON.replace("\"MEQ=\"", "\"!!!\"");
        let err = AuthenticationAssertion::from_json(&json).unwrap_err();
        assert_eq!(
            err,
            WebAuthnError::EncodingError("Invalid signature encoding".to_string())
        );
    }

    #[test]
    fn test_expected_props_default_types() {
        let expected: ExpectedAuthenticationProps = serde_json::from_str(
            r#"{"rp_id":"example.com","challenge":"abc","origin":"https://example.com","counter_credential":3}"#,
        )
        .unwrap();
        assert_eq!(expected.r#type, TYPE_GET);
        assert_eq!(
            expected,
            ExpectedAuthenticationProps::new("example.com", "abc", "https://example.com", 3)
        );
        assert_eq!(
            ExpectedRegistrationProps::new("abc", "https://example.com").r#type,
            TYPE_CREATE
        );
    }
}
