//! Signatures pinned from real key material
//!
//! All values are standard base64. The RSA and P-256 signatures cover
//! `AUTHENTICATOR_DATA || SHA-256(CLIENT_DATA_JSON)`.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;

use super::{TEST_CHALLENGE, TEST_CREDENTIAL_RAW_ID, TEST_ORIGIN, TEST_RP_ID};
use crate::crypto::{CryptoProvider, COSE_ALG_ES256, COSE_ALG_RS256};
use crate::types::{
    AssertionResponse, AttestationResponse, AuthenticationAssertion, ExpectedAuthenticationProps,
    IncomingAuthenticationProps, RegistrationCredential, PUBLIC_KEY_CREDENTIAL_TYPE,
};

use super::builders::AuthenticationCeremony;

/// SHA-256("example.com"), flags UP | UV, counter 11
pub const AUTHENTICATOR_DATA: &str = "o3mm9u6vuaVeN4wRgDTidR5oL6ufLTCrE9ISVYbOGUcFAAAACw==";

/// Counter carried in [`AUTHENTICATOR_DATA`]
pub const AUTHENTICATOR_DATA_COUNTER: u32 = 11;

pub const CLIENT_DATA_JSON: &str = r#"{"type":"webauthn.get","challenge":"dGVzdC1jaGFsbGVuZ2U","origin":"https://example.com","crossOrigin":false}"#;

/// RSA-2048 public key, DER `SubjectPublicKeyInfo`
pub const RS256_PUBLIC_KEY_SPKI: &str = "MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEA1uK8/Xqw2xc9uRthjrZ6+EBBDPHCgWLvpoon+grKYVv8Q7NrFf067Ou1ynpjkBrG5skbPkV8CJUinIaZssTBOKJjMUkKoyeW3rMEZFbxMpSyp18hulcLSaaVCOuiu48M5mHucawPX2BA2Gu+8u2WcepxqIOwsycJjVaZ9m8goHSkSQQOop/q4VJhgnFqCJIXJ+4jL3LG7qSG0tu+yHHTsGKZSLLoSERKJT/NlScAsRsdhJz3fJ2mvKCyfvJ9Q54sSmwI9iPPbCQ4iPR9MPEjG4qfAaQdH+iW+tspoZMangHIZvAw+3gFtxa31IGFesDq2YYYUFEdw36boSHUP7+fRwIDAQAB";

/// RSASSA-PKCS1-v1_5 / SHA-256 signature
pub const RS256_SIGNATURE: &str = "o5e3qIABG8uW+QAzepXzTXVtZqP8qjUUafnqWIjMqyiIjDQoXy9PGnzeXXPubQL9F60lBf9iXec3BJKiJYdgPDAUvxYYkNUjrksNlHahYivA3gQ38s8H6j4QNGCJvGQ82k7HKxYq8A9wYWxShW/6ufq5jDzAo6/KRzHR1WMpb9NlSSpQLttA1dNC06hov/kY4GD5WLuhy/mF2nZ3IgQTvd2MvRhqNi6lF/GIgDiQGnMvu9ayQ/aTRhQZtZGwEguzU+niPLCZtypnK0gZB54WP05w8ut5FlScRdfVf9aj9aPgIS95Y/EeGzzpmL6qQxxSlND4Tnb9bxJp4xBJraM83w==";

/// P-256 public key, DER `SubjectPublicKeyInfo`
pub const ES256_PUBLIC_KEY_SPKI: &str = "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEElDNJWWueFfW4x9b9dmMGNY/Z4Ghax3ffz4lJchHPTzn9OLk1ogPmv4nnnZbviIt15pwJpeptqru6T/lYa0TGQ==";

/// ECDSA signature as returned by an authenticator; `r` carries a sign-padding byte
pub const ES256_SIGNATURE_DER: &str = "MEUCIQC2Ol48RnR45y/qHeYZH7tYmFHeLye/MLGOq6t8FUBfCwIgEyr+KEjZ6Jk/JSSBYTG0l0e3EzTgjAE6A9sgKLmL7MY=";

/// [`ES256_SIGNATURE_DER`] as raw `r || s`
pub const ES256_SIGNATURE_RAW: &str = "tjpePEZ0eOcv6h3mGR+7WJhR3i8nvzCxjqurfBVAXwsTKv4oSNnomT8lJIFhMbSXR7cTNOCMAToD2yAouYvsxg==";

fn decode(value: &str) -> Vec<u8> {
    STANDARD.decode(value).expect("fixture is valid base64")
}

/// `AUTHENTICATOR_DATA || SHA-256(CLIENT_DATA_JSON)`
#[must_use]
pub fn signed_data(provider: &impl CryptoProvider) -> Vec<u8> {
    let mut data = decode(AUTHENTICATOR_DATA);
    data.extend_from_slice(&provider.sha256(CLIENT_DATA_JSON.as_bytes()));
    data
}

/// Ceremony built from the pinned RSA signature
#[must_use]
pub fn rs256_ceremony() -> AuthenticationCeremony {
    pinned_ceremony(RS256_PUBLIC_KEY_SPKI, COSE_ALG_RS256, RS256_SIGNATURE)
}

/// Ceremony built from the pinned P-256 signature
#[must_use]
pub fn es256_ceremony() -> AuthenticationCeremony {
    pinned_ceremony(ES256_PUBLIC_KEY_SPKI, COSE_ALG_ES256, ES256_SIGNATURE_DER)
}

fn pinned_ceremony(spki: &str, alg: i64, signature: &str) -> AuthenticationCeremony {
    let id = URL_SAFE_NO_PAD.encode(TEST_CREDENTIAL_RAW_ID);
    let client_data_json = CLIENT_DATA_JSON.as_bytes().to_vec();

    AuthenticationCeremony {
        credential: RegistrationCredential {
            id: id.clone(),
            raw_id: TEST_CREDENTIAL_RAW_ID.to_vec(),
            r#type: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
            response: AttestationResponse {
                client_data_json: Vec::new(),
                attestation_object: Vec::new(),
                public_key: decode(spki),
                public_key_algorithm: alg,
            },
        },
        assertion: AuthenticationAssertion {
            id,
            raw_id: TEST_CREDENTIAL_RAW_ID.to_vec(),
            r#type: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
            response: AssertionResponse {
                client_data_json,
                authenticator_data: decode(AUTHENTICATOR_DATA),
                signature: decode(signature),
                user_handle: None,
            },
        },
        expected: ExpectedAuthenticationProps::new(TEST_RP_ID, TEST_CHALLENGE, TEST_ORIGIN, 10),
        incoming: IncomingAuthenticationProps {
            counter_assertion: i64::from(AUTHENTICATOR_DATA_COUNTER),
        },
    }
}
