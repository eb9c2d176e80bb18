#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `WebAuthn` credential verification
//!
//! Validates registration credentials (`none` attestation) and authentication
//! assertions (ES256 and RS256) against caller-supplied expected values. No
//! state is kept between calls: the caller persists credentials and counters.

/// Version of the webauthn-verifier library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod attestation;
pub mod auth_data;
pub mod authentication;
pub mod client_data;
pub mod crypto;
mod cursor;
pub mod errors;
pub mod registration;
pub mod settings;
pub mod signature;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use attestation::{decode_attestation_object, AttestationEnvelope};
pub use auth_data::{parse_authenticator_data, AuthenticatorData, AuthenticatorFlags, CoseKeySpan};
pub use authentication::{validate_authentication, AuthenticationValidator};
pub use crypto::{CryptoProvider, PublicKeyOptions, SoftwareCryptoProvider};
pub use errors::{Result, WebAuthnError};
pub use registration::{validate_registration, RegistrationValidator};
pub use settings::VerifierSettings;
pub use signature::asn1_to_raw_signature;
pub use types::{
    AuthenticationAssertion, ExpectedAuthenticationProps, ExpectedRegistrationProps,
    IncomingAuthenticationProps, RegistrationCredential,
};
