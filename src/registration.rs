//! Registration ceremony validation
//!
//! Checks a newly created credential against the expected challenge, origin
//! and type, then decodes the attestation object. Only the `none`
//! attestation format with an empty statement is accepted.

use log::{debug, info, warn};

use crate::attestation::FORMAT_NONE;
use crate::auth_data::CoseKeySpan;
use crate::errors::{Result, WebAuthnError};
use crate::types::{ExpectedRegistrationProps, RegistrationCredential, PUBLIC_KEY_CREDENTIAL_TYPE};

/// Validates registration credentials
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistrationValidator {
    key_span: CoseKeySpan,
}

impl RegistrationValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific credential public key delimitation when decoding `authData`
    #[must_use]
    pub fn with_key_span(mut self, key_span: CoseKeySpan) -> Self {
        self.key_span = key_span;
        self
    }

    /// Validate a registration credential
    ///
    /// # Errors
    /// Returns:
    /// - `MissingField` if `id` or `rawId` is empty
    /// - `TypeMismatch` if the credential type is not `public-key`
    /// - `ClientDataDecodeError` / `ClientDataMismatch` for clientDataJSON problems
    /// - `AttestationDecodeError` / `MalformedAuthData` if the attestation object cannot be decoded
    /// - `UnsupportedAttestationFormat` for any format other than `none`
    /// - `UnexpectedAttestationStatement` if a `none` attestation has a statement
    pub fn validate(
        &self,
        credential: &RegistrationCredential,
        expected: &ExpectedRegistrationProps,
    ) -> Result<bool> {
        self.run(credential, expected)
            .inspect(|_| info!("Registration accepted for credential {}", credential.id))
            .inspect_err(|e| warn!("Registration rejected: {} ({e})", e.kind()))
    }

    fn run(
        &self,
        credential: &RegistrationCredential,
        expected: &ExpectedRegistrationProps,
    ) -> Result<bool> {
        // 1. Structure
        check_credential_structure(&credential.id, &credential.raw_id, &credential.r#type)?;

        // 2. Client data
        credential
            .client_data()?
            .verify(&expected.r#type, &expected.challenge, &expected.origin)?;
        debug!("Registration client data matches expected values");

        // 3. Attestation object
        let envelope = credential.attestation(self.key_span)?;

        // 4. Attestation format
        if envelope.fmt != FORMAT_NONE {
            return Err(WebAuthnError::UnsupportedAttestationFormat(envelope.fmt));
        }
        let statement_len = envelope.statement_len();
        if statement_len != 0 {
            return Err(WebAuthnError::UnexpectedAttestationStatement(statement_len));
        }

        Ok(true)
    }
}

/// Validate a registration credential with default options
///
/// # Errors
/// See [`RegistrationValidator::validate`]
pub fn validate_registration(
    credential: &RegistrationCredential,
    expected: &ExpectedRegistrationProps,
) -> Result<bool> {
    RegistrationValidator::new().validate(credential, expected)
}

/// Shared structural checks on `id`, `rawId` and `type`
pub(crate) fn check_credential_structure(id: &str, raw_id: &[u8], r#type: &str) -> Result<()> {
    if id.is_empty() {
        return Err(WebAuthnError::MissingField("id"));
    }
    if raw_id.is_empty() {
        return Err(WebAuthnError::MissingField("rawId"));
    }
    if r#type.is_empty() {
        return Err(WebAuthnError::MissingField("type"));
    }
    if r#type != PUBLIC_KEY_CREDENTIAL_TYPE {
        return Err(WebAuthnError::TypeMismatch {
            expected: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
            found: r#type.to_string(),
        });
    }
    Ok(())
}
