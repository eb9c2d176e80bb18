//! Test fixtures and builders
//!
//! Available to unit tests and, with the `testing` feature, to integration
//! tests.
//!
//! - [`builders`] - authenticator data, attestation objects, DER signatures and full ceremonies
//! - [`fixtures`] - signatures pinned from real key material
//!
//! ```rust,ignore
//! use webauthn_verifier::testing::AuthenticationCeremony;
//!
//! let ceremony = AuthenticationCeremony::es256().sign_count(5).build();
//! ```

pub mod builders;
pub mod fixtures;

pub use builders::*;

/// RP ID used by the builders
pub const TEST_RP_ID: &str = "example.com";

/// Origin used by the builders
pub const TEST_ORIGIN: &str = "https://example.com";

/// Base64url of `test-challenge`
pub const TEST_CHALLENGE: &str = "dGVzdC1jaGFsbGVuZ2U";

/// Raw credential ID used by the builders
pub const TEST_CREDENTIAL_RAW_ID: [u8; 16] = [
    0x6b, 0x1e, 0x2c, 0x93, 0x04, 0xa7, 0x5d, 0x10, 0xe2, 0x38, 0x7f, 0xc4, 0x51, 0x09, 0xbd, 0x66,
];
