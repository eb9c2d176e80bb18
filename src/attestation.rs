//! Attestation object decoding
//!
//! The attestation object is a CBOR map with `fmt`, `attStmt` and `authData`
//! entries. The outer map is decoded with `ciborium`; `authData` is handed to
//! the authenticator data parser.

use ciborium::value::Value;
use log::debug;

use crate::auth_data::{AuthenticatorData, CoseKeySpan};
use crate::errors::{Result, WebAuthnError};

/// Attestation format accepted by the registration validator
pub const FORMAT_NONE: &str = "none";

/// Decoded attestation object
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationEnvelope {
    pub fmt: String,
    /// Attestation statement, kept as a CBOR value
    pub att_stmt: Value,
    pub auth_data: AuthenticatorData,
    /// `authData` exactly as it appeared in the envelope
    pub raw_auth_data: Vec<u8>,
}

impl AttestationEnvelope {
    /// Number of entries in the attestation statement map
    ///
    /// A statement that is not a map counts as one entry so it is never
    /// mistaken for an empty statement.
    #[must_use]
    pub fn statement_len(&self) -> usize {
        match &self.att_stmt {
            Value::Map(entries) => entries.len(),
            _ => 1,
        }
    }
}

/// Decode an attestation object with the default fixed key span
///
/// # Errors
/// See [`decode_attestation_object_with`]
pub fn decode_attestation_object(bytes: &[u8]) -> Result<AttestationEnvelope> {
    decode_attestation_object_with(bytes, CoseKeySpan::default())
}

/// Decode an attestation object
///
/// # Errors
/// Returns `AttestationDecodeError` if:
/// - The bytes are not a CBOR map
/// - `authData` is missing or not a byte string
/// - `fmt` is missing or not a text string
/// - `attStmt` is missing
///
/// Returns `MalformedAuthData` if `authData` itself cannot be parsed
pub fn decode_attestation_object_with(
    bytes: &[u8],
    key_span: CoseKeySpan,
) -> Result<AttestationEnvelope> {
    let value: Value = ciborium::de::from_reader(bytes).map_err(|e| {
        WebAuthnError::AttestationDecodeError(format!("Invalid CBOR attestation format: {e}"))
    })?;

    let Value::Map(entries) = value else {
        return Err(WebAuthnError::AttestationDecodeError(
            "Attestation object is not a map".to_string(),
        ));
    };

    let mut fmt = None;
    let mut att_stmt = None;
    let mut raw_auth_data = None;
    for (key, value) in entries {
        match key.as_text() {
            Some("fmt") => fmt = Some(value),
            Some("attStmt") => att_stmt = Some(value),
            Some("authData") => raw_auth_data = Some(value),
            _ => {}
        }
    }

    let Some(Value::Bytes(raw_auth_data)) = raw_auth_data else {
        return Err(WebAuthnError::AttestationDecodeError(
            "Missing authData in attestation".to_string(),
        ));
    };
    let Some(Value::Text(fmt)) = fmt else {
        return Err(WebAuthnError::AttestationDecodeError(
            "Missing fmt in attestation".to_string(),
        ));
    };
    let att_stmt = att_stmt.ok_or_else(|| {
        WebAuthnError::AttestationDecodeError("Missing attStmt in attestation".to_string())
    })?;

    let auth_data = AuthenticatorData::parse_with(&raw_auth_data, key_span)?;
    debug!("Decoded attestation object: fmt={fmt}");

    Ok(AttestationEnvelope {
        fmt,
        att_stmt,
        auth_data,
        raw_auth_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth_data::AuthenticatorFlags;
    use crate::testing::{attestation_object, AuthenticatorDataBuilder};

    fn auth_data() -> Vec<u8> {
        AuthenticatorDataBuilder::new()
            .flags(AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA)
            .attested([3; 16], &[4; 32], &[5; 77])
            .build()
    }

    #[test]
    fn test_decode_none_attestation() {
        let bytes = attestation_object("none", Value::Map(vec![]), &auth_data());
        let envelope = decode_attestation_object(&bytes).unwrap();
        assert_eq!(envelope.fmt, FORMAT_NONE);
        assert_eq!(envelope.statement_len(), 0);
        assert_eq!(envelope.raw_auth_data, auth_data());
        assert_eq!(envelope.auth_data.credential_id(), Some(&[4u8; 32][..]));
    }

    #[test]
    fn test_non_map_statement_is_not_empty() {
        let bytes = attestation_object("none", Value::Null, &auth_data());
        let envelope = decode_attestation_object(&bytes).unwrap();
        assert_eq!(envelope.statement_len(), 1);
    }

    #[test]
    fn test_rejects_garbage() {
        let err = decode_attestation_object(&[0xff, 0x00, 0x13]).unwrap_err();
        assert!(matches!(err, WebAuthnError::AttestationDecodeError(_)));
    }

    #[test]
    fn test_rejects_non_map() {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&Value::Text("authData".into()), &mut bytes).unwrap();
        let err = decode_attestation_object(&bytes).unwrap_err();
        assert!(matches!(err, WebAuthnError::AttestationDecodeError(_)));
    }

    #[test]
    fn test_rejects_missing_auth_data() {
        let map = Value::Map(vec![
            (Value::Text("fmt".into()), Value::Text("none".into())),
            (Value::Text("attStmt".into()), Value::Map(vec![])),
        ]);
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&map, &mut bytes).unwrap();

        let err = decode_attestation_object(&bytes).unwrap_err();
        assert_eq!(
            err,
            WebAuthnError::AttestationDecodeError("Missing authData in attestation".to_string())
        );
    }

    #[test]
    fn test_short_auth_data_is_malformed() {
        let bytes = attestation_object("none", Value::Map(vec![]), &[0u8; 20]);
        let err = decode_attestation_object(&bytes).unwrap_err();
        assert!(matches!(err, WebAuthnError::MalformedAuthData(_)));
    }
}
