//! Authentication ceremony validation
//!
//! Runs the assertion through structural, counter, client data, flag and RP
//! ID checks before handing the signature to the crypto provider. Every
//! policy failure is an error; only the final signature check can produce
//! `Ok(false)`.

use log::{debug, info, warn};

use crate::auth_data::{AuthenticatorData, CoseKeySpan};
use crate::crypto::{
    constant_time_eq, CoseAlgorithm, CryptoProvider, PublicKeyOptions, SoftwareCryptoProvider,
};
use crate::errors::{Result, WebAuthnError};
use crate::registration::check_credential_structure;
use crate::signature::asn1_to_raw_signature;
use crate::types::{
    AuthenticationAssertion, ExpectedAuthenticationProps, IncomingAuthenticationProps,
    RegistrationCredential,
};

/// Validates authentication assertions against a stored credential
#[derive(Debug, Clone, Default)]
pub struct AuthenticationValidator<P = SoftwareCryptoProvider> {
    provider: P,
    key_span: CoseKeySpan,
}

impl AuthenticationValidator<SoftwareCryptoProvider> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_provider(SoftwareCryptoProvider::new())
    }
}

impl<P: CryptoProvider> AuthenticationValidator<P> {
    /// Validator backed by a custom crypto provider
    #[must_use]
    pub fn with_provider(provider: P) -> Self {
        Self {
            provider,
            key_span: CoseKeySpan::default(),
        }
    }

    /// Use a specific credential public key delimitation when parsing authenticator data
    #[must_use]
    pub fn with_key_span(mut self, key_span: CoseKeySpan) -> Self {
        self.key_span = key_span;
        self
    }

    /// Validate an assertion
    ///
    /// `convert_ecdsa_signature` converts DER ECDSA signatures to raw `r || s`
    /// before verification; it has no effect for RSA.
    ///
    /// Returns the result of the signature check.
    ///
    /// # Errors
    /// Returns:
    /// - `MissingField` / `TypeMismatch` / `CredentialAssertionMismatch` for structural problems
    /// - `InvalidCounter` if either counter is negative
    /// - `ReplaySuspected` if a non-zero assertion counter does not exceed the stored counter
    /// - `ClientDataDecodeError` / `ClientDataMismatch` for clientDataJSON problems
    /// - `MalformedAuthData` if the authenticator data cannot be parsed
    /// - `UserPresenceRequired` / `UserVerificationRequired` if a flag is not set
    /// - `RpIdMismatch` if `rpIdHash` is not the hash of the expected RP ID
    /// - `UnsupportedAlgorithm` for COSE algorithms other than -7 and -257
    /// - `InvalidSignatureEncoding` if an ECDSA signature cannot be converted
    /// - `CryptoProviderError` if the key cannot be imported
    pub async fn validate(
        &self,
        credential: &RegistrationCredential,
        assertion: &AuthenticationAssertion,
        expected: &ExpectedAuthenticationProps,
        incoming: &IncomingAuthenticationProps,
        key_options: &PublicKeyOptions,
        convert_ecdsa_signature: bool,
    ) -> Result<bool> {
        let result = self
            .run(
                credential,
                assertion,
                expected,
                incoming,
                key_options,
                convert_ecdsa_signature,
            )
            .await;

        match &result {
            Ok(true) => info!("Authentication accepted for credential {}", credential.id),
            Ok(false) => warn!(
                "Authentication rejected for credential {}: signature did not verify",
                credential.id
            ),
            Err(e) => warn!("Authentication rejected: {} ({e})", e.kind()),
        }
        result
    }

    async fn run(
        &self,
        credential: &RegistrationCredential,
        assertion: &AuthenticationAssertion,
        expected: &ExpectedAuthenticationProps,
        incoming: &IncomingAuthenticationProps,
        key_options: &PublicKeyOptions,
        convert_ecdsa_signature: bool,
    ) -> Result<bool> {
        // 1. Structure and credential binding
        check_credential_structure(&credential.id, &credential.raw_id, &credential.r#type)?;
        check_credential_structure(&assertion.id, &assertion.raw_id, &assertion.r#type)?;
        if credential.id != assertion.id {
            return Err(WebAuthnError::CredentialAssertionMismatch("id"));
        }
        if credential.raw_id != assertion.raw_id {
            return Err(WebAuthnError::CredentialAssertionMismatch("rawId"));
        }

        // 2. Counters
        check_counters(expected.counter_credential, incoming.counter_assertion)?;

        // 3. Client data
        assertion
            .client_data()?
            .verify(&expected.r#type, &expected.challenge, &expected.origin)?;
        debug!("Assertion client data matches expected values");

        // 4. Flags
        let auth_data =
            AuthenticatorData::parse_with(&assertion.response.authenticator_data, self.key_span)?;
        if !auth_data.flags.user_present() {
            return Err(WebAuthnError::UserPresenceRequired);
        }
        if !auth_data.flags.user_verified() {
            return Err(WebAuthnError::UserVerificationRequired);
        }

        // 5. RP ID binding
        let expected_rp_id_hash = self.provider.sha256(expected.rp_id.as_bytes());
        if !constant_time_eq(&expected_rp_id_hash, &auth_data.rp_id_hash) {
            return Err(WebAuthnError::RpIdMismatch);
        }
        debug!("RP ID hash matches {}", expected.rp_id);

        // 6. Algorithm
        let algorithm = CoseAlgorithm::from_cose(credential.response.public_key_algorithm)?;

        // 7. Key import
        if credential.response.public_key.is_empty() {
            return Err(WebAuthnError::MissingField("response.publicKey"));
        }
        let key = self
            .provider
            .import_public_key(
                &credential.response.public_key,
                algorithm.import_algorithm(),
                key_options,
            )
            .await?;

        // 8. Signature encoding
        let signature = if convert_ecdsa_signature && algorithm.is_ecdsa() {
            asn1_to_raw_signature(&assertion.response.signature)?
        } else {
            assertion.response.signature.clone()
        };

        // 9. Signed data
        let client_data_hash = self.provider.sha256(&assertion.response.client_data_json);
        let mut signed_data =
            Vec::with_capacity(assertion.response.authenticator_data.len() + client_data_hash.len());
        signed_data.extend_from_slice(&assertion.response.authenticator_data);
        signed_data.extend_from_slice(&client_data_hash);

        // 10. Verify
        self.provider
            .verify(algorithm.verify_algorithm(), &key, &signature, &signed_data)
            .await
    }
}

/// Counter policy
///
/// A zero assertion counter means the authenticator does not implement
/// counters and skips the strict-increase check.
fn check_counters(counter_credential: i64, counter_assertion: i64) -> Result<()> {
    if counter_credential < 0 {
        return Err(WebAuthnError::InvalidCounter(counter_credential));
    }
    if counter_assertion < 0 {
        return Err(WebAuthnError::InvalidCounter(counter_assertion));
    }
    if counter_assertion == 0 {
        debug!("Authenticator does not implement signature counters");
        return Ok(());
    }
    if counter_assertion <= counter_credential {
        return Err(WebAuthnError::ReplaySuspected {
            stored: counter_credential,
            received: counter_assertion,
        });
    }
    Ok(())
}

/// Validate an assertion with the software crypto provider
///
/// # Errors
/// See [`AuthenticationValidator::validate`]
pub async fn validate_authentication(
    credential: &RegistrationCredential,
    assertion: &AuthenticationAssertion,
    expected: &ExpectedAuthenticationProps,
    incoming: &IncomingAuthenticationProps,
    key_options: &PublicKeyOptions,
    convert_ecdsa_signature: bool,
) -> Result<bool> {
    AuthenticationValidator::new()
        .validate(
            credential,
            assertion,
            expected,
            incoming,
            key_options,
            convert_ecdsa_signature,
        )
        .await
}
