//! Fluent builders for creating test ceremonies
//!
//! Signing uses a fixed P-256 scalar so every build is deterministic (RFC 6979).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ciborium::value::Value;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::EncodePublicKey;

use super::{TEST_CHALLENGE, TEST_CREDENTIAL_RAW_ID, TEST_ORIGIN, TEST_RP_ID};
use crate::auth_data::AuthenticatorFlags;
use crate::client_data::{TYPE_CREATE, TYPE_GET};
use crate::crypto::{sha256, COSE_ALG_ES256};
use crate::types::{
    AssertionResponse, AttestationResponse, AuthenticationAssertion, ExpectedAuthenticationProps,
    IncomingAuthenticationProps, RegistrationCredential, PUBLIC_KEY_CREDENTIAL_TYPE,
};

/// Fixed, valid P-256 private scalar
const TEST_KEY_SCALAR: [u8; 32] = [
    0xc9, 0xaf, 0xa9, 0xd8, 0x45, 0xba, 0x75, 0x16, 0x6b, 0x5c, 0x21, 0x57, 0x67, 0xb1, 0xd6, 0x93,
    0x4e, 0x50, 0xc3, 0xdb, 0x36, 0xe8, 0x9b, 0x12, 0x7b, 0x8a, 0x62, 0x2b, 0x12, 0x0f, 0x67, 0x21,
];

/// Deterministic P-256 credential key
#[derive(Clone, Debug)]
pub struct TestKey {
    signing_key: SigningKey,
}

impl Default for TestKey {
    fn default() -> Self {
        Self::new()
    }
}

impl TestKey {
    #[must_use]
    pub fn new() -> Self {
        Self {
            signing_key: SigningKey::from_slice(&TEST_KEY_SCALAR).expect("valid test scalar"),
        }
    }

    #[must_use]
    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// DER `SubjectPublicKeyInfo`
    #[must_use]
    pub fn spki(&self) -> Vec<u8> {
        self.verifying_key()
            .to_public_key_der()
            .expect("encodable public key")
            .as_bytes()
            .to_vec()
    }

    /// EC2 COSE_Key: `{1: 2, 3: -7, -1: 1, -2: x, -3: y}`, 77 bytes
    #[must_use]
    pub fn cose_key(&self) -> Vec<u8> {
        let point = self.verifying_key().to_encoded_point(false);
        let x = point.x().expect("uncompressed point").to_vec();
        let y = point.y().expect("uncompressed point").to_vec();
        let map = Value::Map(vec![
            (Value::Integer(1_i64.into()), Value::Integer(2_i64.into())),
            (Value::Integer(3_i64.into()), Value::Integer(COSE_ALG_ES256.into())),
            (Value::Integer((-1_i64).into()), Value::Integer(1_i64.into())),
            (Value::Integer((-2_i64).into()), Value::Bytes(x)),
            (Value::Integer((-3_i64).into()), Value::Bytes(y)),
        ]);
        let mut out = Vec::new();
        ciborium::ser::into_writer(&map, &mut out).expect("serializable COSE key");
        out
    }

    /// DER encoded signature, as an authenticator returns it
    #[must_use]
    pub fn sign_der(&self, data: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(data);
        signature.to_der().as_bytes().to_vec()
    }

    /// Raw `r || s` signature
    #[must_use]
    pub fn sign_raw(&self, data: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(data);
        signature.to_bytes().to_vec()
    }
}

/// Builder for raw authenticator data
#[derive(Clone, Debug)]
pub struct AuthenticatorDataBuilder {
    rp_id_hash: [u8; 32],
    flags: u8,
    counter: u32,
    attested: Option<([u8; 16], Vec<u8>, Vec<u8>)>,
    trailing: Vec<u8>,
}

impl Default for AuthenticatorDataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthenticatorDataBuilder {
    /// Hash of [`TEST_RP_ID`], flags UP | UV, counter 0
    #[must_use]
    pub fn new() -> Self {
        Self {
            rp_id_hash: sha256(TEST_RP_ID.as_bytes()),
            flags: AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::USER_VERIFIED,
            counter: 0,
            attested: None,
            trailing: Vec::new(),
        }
    }

    #[must_use]
    pub fn rp_id(mut self, rp_id: &str) -> Self {
        self.rp_id_hash = sha256(rp_id.as_bytes());
        self
    }

    /// Raw flags byte; does not add AT or ED automatically
    #[must_use]
    pub fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn counter(mut self, counter: u32) -> Self {
        self.counter = counter;
        self
    }

    /// Attested credential data; the length field is derived from `credential_id`
    #[must_use]
    pub fn attested(mut self, aaguid: [u8; 16], credential_id: &[u8], public_key: &[u8]) -> Self {
        self.attested = Some((aaguid, credential_id.to_vec(), public_key.to_vec()));
        self
    }

    /// Bytes appended after everything else (extensions, or junk)
    #[must_use]
    pub fn trailing(mut self, bytes: &[u8]) -> Self {
        self.trailing = bytes.to_vec();
        self
    }

    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(37);
        out.extend_from_slice(&self.rp_id_hash);
        out.push(self.flags);
        out.extend_from_slice(&self.counter.to_be_bytes());
        if let Some((aaguid, credential_id, public_key)) = self.attested {
            out.extend_from_slice(&aaguid);
            let id_len = u16::try_from(credential_id.len()).expect("credential ID fits in u16");
            out.extend_from_slice(&id_len.to_be_bytes());
            out.extend_from_slice(&credential_id);
            out.extend_from_slice(&public_key);
        }
        out.extend_from_slice(&self.trailing);
        out
    }
}

/// DER `SEQUENCE { INTEGER r, INTEGER s }` with short-form lengths
#[must_use]
pub fn der_signature(r: &[u8], s: &[u8]) -> Vec<u8> {
    let short_len = |len: usize| u8::try_from(len).expect("short-form DER length");
    let mut out = vec![0x30, short_len(4 + r.len() + s.len())];
    for component in [r, s] {
        out.push(0x02);
        out.push(short_len(component.len()));
        out.extend_from_slice(component);
    }
    out
}

/// CBOR attestation object `{fmt, attStmt, authData}`
#[must_use]
pub fn attestation_object(fmt: &str, att_stmt: Value, auth_data: &[u8]) -> Vec<u8> {
    let map = Value::Map(vec![
        (Value::Text("fmt".into()), Value::Text(fmt.into())),
        (Value::Text("attStmt".into()), att_stmt),
        (Value::Text("authData".into()), Value::Bytes(auth_data.to_vec())),
    ]);
    let mut out = Vec::new();
    ciborium::ser::into_writer(&map, &mut out).expect("serializable attestation object");
    out
}

/// clientDataJSON bytes
#[must_use]
pub fn client_data_json(r#type: &str, challenge: &str, origin: &str) -> Vec<u8> {
    format!(
        r#"{{"type":"{kind}","challenge":"{challenge}","origin":"{origin}","crossOrigin":false}}"#,
        kind = r#type
    )
    .into_bytes()
}

/// Builder for a registration credential with `none` attestation
#[derive(Clone, Debug)]
pub struct RegistrationCredentialBuilder {
    key: TestKey,
    fmt: String,
    statement: Value,
    challenge: String,
    origin: String,
}

impl Default for RegistrationCredentialBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationCredentialBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            key: TestKey::new(),
            fmt: "none".to_string(),
            statement: Value::Map(vec![]),
            challenge: TEST_CHALLENGE.to_string(),
            origin: TEST_ORIGIN.to_string(),
        }
    }

    #[must_use]
    pub fn format(mut self, fmt: &str) -> Self {
        self.fmt = fmt.to_string();
        self
    }

    #[must_use]
    pub fn statement(mut self, statement: Value) -> Self {
        self.statement = statement;
        self
    }

    #[must_use]
    pub fn challenge(mut self, challenge: &str) -> Self {
        self.challenge = challenge.to_string();
        self
    }

    #[must_use]
    pub fn build(self) -> RegistrationCredential {
        let auth_data = AuthenticatorDataBuilder::new()
            .flags(
                AuthenticatorFlags::USER_PRESENT
                    | AuthenticatorFlags::USER_VERIFIED
                    | AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA,
            )
            .attested([0; 16], &TEST_CREDENTIAL_RAW_ID, &self.key.cose_key())
            .build();

        RegistrationCredential {
            id: URL_SAFE_NO_PAD.encode(TEST_CREDENTIAL_RAW_ID),
            raw_id: TEST_CREDENTIAL_RAW_ID.to_vec(),
            r#type: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
            response: AttestationResponse {
                client_data_json: client_data_json(TYPE_CREATE, &self.challenge, &self.origin),
                attestation_object: attestation_object(&self.fmt, self.statement, &auth_data),
                public_key: self.key.spki(),
                public_key_algorithm: COSE_ALG_ES256,
            },
        }
    }
}

/// Everything `validate_authentication` needs for one ceremony
#[derive(Clone, Debug)]
pub struct AuthenticationCeremony {
    pub credential: RegistrationCredential,
    pub assertion: AuthenticationAssertion,
    pub expected: ExpectedAuthenticationProps,
    pub incoming: IncomingAuthenticationProps,
}

impl AuthenticationCeremony {
    /// Builder for a ceremony signed with [`TestKey`]
    #[must_use]
    pub fn es256() -> AuthenticationCeremonyBuilder {
        AuthenticationCeremonyBuilder::new()
    }
}

/// Builder for a signed authentication ceremony
#[derive(Clone, Debug)]
pub struct AuthenticationCeremonyBuilder {
    key: TestKey,
    flags: u8,
    sign_count: u32,
    stored_counter: i64,
    rp_id: String,
    challenge: String,
}

impl Default for AuthenticationCeremonyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthenticationCeremonyBuilder {
    /// Flags UP | UV, sign count 1, stored counter 0
    #[must_use]
    pub fn new() -> Self {
        Self {
            key: TestKey::new(),
            flags: AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::USER_VERIFIED,
            sign_count: 1,
            stored_counter: 0,
            rp_id: TEST_RP_ID.to_string(),
            challenge: TEST_CHALLENGE.to_string(),
        }
    }

    #[must_use]
    pub fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    /// Counter written into the authenticator data
    #[must_use]
    pub fn sign_count(mut self, sign_count: u32) -> Self {
        self.sign_count = sign_count;
        self
    }

    /// Counter the relying party has on record
    #[must_use]
    pub fn stored_counter(mut self, stored_counter: i64) -> Self {
        self.stored_counter = stored_counter;
        self
    }

    /// RP ID the authenticator hashes into the assertion
    #[must_use]
    pub fn authenticator_rp_id(mut self, rp_id: &str) -> Self {
        self.rp_id = rp_id.to_string();
        self
    }

    #[must_use]
    pub fn challenge(mut self, challenge: &str) -> Self {
        self.challenge = challenge.to_string();
        self
    }

    #[must_use]
    pub fn build(self) -> AuthenticationCeremony {
        let authenticator_data = AuthenticatorDataBuilder::new()
            .rp_id(&self.rp_id)
            .flags(self.flags)
            .counter(self.sign_count)
            .build();
        let client_data_json = client_data_json(TYPE_GET, &self.challenge, TEST_ORIGIN);

        let mut signed_data = authenticator_data.clone();
        signed_data.extend_from_slice(&sha256(&client_data_json));
        let signature = self.key.sign_der(&signed_data);

        let credential = RegistrationCredentialBuilder {
            key: self.key,
            ..RegistrationCredentialBuilder::new()
        }
        .build();

        let assertion = AuthenticationAssertion {
            id: credential.id.clone(),
            raw_id: credential.raw_id.clone(),
            r#type: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
            response: AssertionResponse {
                client_data_json,
                authenticator_data,
                signature,
                user_handle: Some(b"user-1".to_vec()),
            },
        };

        AuthenticationCeremony {
            credential,
            assertion,
            expected: ExpectedAuthenticationProps::new(
                TEST_RP_ID,
                TEST_CHALLENGE,
                TEST_ORIGIN,
                self.stored_counter,
            ),
            incoming: IncomingAuthenticationProps {
                counter_assertion: i64::from(self.sign_count),
            },
        }
    }
}
