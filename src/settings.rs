use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::auth_data::{CoseKeySpan, DEFAULT_COSE_KEY_LEN};
use crate::types::{ExpectedAuthenticationProps, ExpectedRegistrationProps};

const SETTINGS_FILE: &str = "Settings.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct VerifierSettings {
    pub relying_party: RelyingPartySettings,
    pub verification: VerificationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RelyingPartySettings {
    /// Domain whose SHA-256 must match the authenticator's `rpIdHash`
    pub rp_id: String,
    /// Origin expected in clientDataJSON
    pub origin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VerificationSettings {
    /// Convert DER ECDSA signatures to raw `r || s` before verification
    pub convert_ecdsa_signature: bool,
    pub cose_key_span: KeySpanMode,
    /// Span length used when `cose_key_span = "fixed"`
    pub fixed_cose_key_length: usize,
}

/// How the credential public key is delimited inside attested credential data
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeySpanMode {
    #[default]
    Fixed,
    Cbor,
}

impl std::str::FromStr for KeySpanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "cbor" => Ok(Self::Cbor),
            other => Err(format!("Unknown COSE key span mode: {other}")),
        }
    }
}

impl Default for RelyingPartySettings {
    fn default() -> Self {
        Self {
            rp_id: "localhost".to_string(),
            origin: "https://localhost".to_string(),
        }
    }
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            convert_ecdsa_signature: true,
            cose_key_span: KeySpanMode::Fixed,
            fixed_cose_key_length: DEFAULT_COSE_KEY_LEN,
        }
    }
}

impl VerificationSettings {
    #[must_use]
    pub fn key_span(&self) -> CoseKeySpan {
        match self.cose_key_span {
            KeySpanMode::Fixed => CoseKeySpan::Fixed(self.fixed_cose_key_length),
            KeySpanMode::Cbor => CoseKeySpan::SelfDelimited,
        }
    }
}

impl VerifierSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A settings file exists but cannot be read
    /// - TOML parsing fails
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::initialize_environment();

        let secrets_dir = std::env::var("WEBAUTHN_SECRETS_DIR").ok();
        let mut settings = Self::load_base_settings(Path::new("."), secrets_dir.as_deref())?;

        Self::apply_env_overrides(&mut settings);

        debug!(
            "Verifier settings: rp_id={}, origin={}, key span {:?}",
            settings.relying_party.rp_id,
            settings.relying_party.origin,
            settings.verification.key_span()
        );
        Ok(settings)
    }

    /// Read `.env` and start the logger; a logger installed earlier is kept
    fn initialize_environment() {
        Self::load_env_file();
        let _ = env_logger::try_init();
    }

    /// Load base settings from TOML file(s) or use defaults
    ///
    /// Priority, highest first:
    /// 1. Environment variables (applied separately)
    /// 2. Settings.toml in `secrets_dir`
    /// 3. Settings.toml in `working_dir`
    /// 4. Defaults
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file cannot be read or parsed
    fn load_base_settings(
        working_dir: &Path,
        secrets_dir: Option<&str>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = working_dir.join(SETTINGS_FILE);
        if default_config_path.exists() {
            settings = basic_toml::from_str(&fs::read_to_string(&default_config_path)?)?;
            info!("Loaded base settings from {}", default_config_path.display());
        }

        if let Some(secrets_dir) = secrets_dir {
            let secrets_path = Path::new(secrets_dir).join(SETTINGS_FILE);
            if secrets_path.exists() {
                settings = basic_toml::from_str(&fs::read_to_string(&secrets_path)?)?;
                info!("Overriding settings from {}", secrets_path.display());
            } else {
                info!(
                    "WEBAUTHN_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Apply environment variable overrides to settings
    fn apply_env_overrides(settings: &mut Self) {
        if let Ok(rp_id) = std::env::var("WEBAUTHN_RP_ID") {
            settings.relying_party.rp_id = rp_id;
        }
        if let Ok(origin) = std::env::var("WEBAUTHN_ORIGIN") {
            settings.relying_party.origin = origin;
        }
        if let Ok(value) = std::env::var("WEBAUTHN_CONVERT_ECDSA_SIGNATURE") {
            if let Ok(convert) = value.parse::<bool>() {
                settings.verification.convert_ecdsa_signature = convert;
            }
        }
        if let Ok(value) = std::env::var("WEBAUTHN_COSE_KEY_SPAN") {
            if let Ok(mode) = value.parse::<KeySpanMode>() {
                settings.verification.cose_key_span = mode;
            }
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Expected values for a registration with the given challenge
    #[must_use]
    pub fn expected_registration(&self, challenge: &str) -> ExpectedRegistrationProps {
        ExpectedRegistrationProps::new(challenge, &self.relying_party.origin)
    }

    /// Expected values for an authentication with the given challenge and stored counter
    #[must_use]
    pub fn expected_authentication(
        &self,
        challenge: &str,
        counter_credential: i64,
    ) -> ExpectedAuthenticationProps {
        ExpectedAuthenticationProps::new(
            &self.relying_party.rp_id,
            challenge,
            &self.relying_party.origin,
            counter_credential,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clean_env_vars() {
        std::env::remove_var("WEBAUTHN_RP_ID");
        std::env::remove_var("WEBAUTHN_ORIGIN");
        std::env::remove_var("WEBAUTHN_CONVERT_ECDSA_SIGNATURE");
        std::env::remove_var("WEBAUTHN_COSE_KEY_SPAN");
        std::env::remove_var("WEBAUTHN_SECRETS_DIR");
    }

    #[test]
    fn test_defaults() {
        let settings = VerifierSettings::default();
        assert_eq!(settings.relying_party.rp_id, "localhost");
        assert_eq!(settings.relying_party.origin, "https://localhost");
        assert!(settings.verification.convert_ecdsa_signature);
        assert_eq!(settings.verification.key_span(), CoseKeySpan::Fixed(77));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: VerifierSettings = basic_toml::from_str(
            r#"
            [verification]
            cose_key_span = "cbor"
            "#,
        )
        .unwrap();
        assert_eq!(settings.relying_party, RelyingPartySettings::default());
        assert!(settings.verification.convert_ecdsa_signature);
        assert_eq!(settings.verification.key_span(), CoseKeySpan::SelfDelimited);
    }

    #[test]
    fn test_settings_dir_precedence() {
        let working_dir = tempfile::tempdir().unwrap();
        let secrets_dir = tempfile::tempdir().unwrap();

        // Defaults when no file exists
        let settings = VerifierSettings::load_base_settings(working_dir.path(), None).unwrap();
        assert_eq!(settings, VerifierSettings::default());

        fs::write(
            working_dir.path().join(SETTINGS_FILE),
            "[relying_party]\nrp_id = \"root.example\"\norigin = \"https://root.example\"\n",
        )
        .unwrap();
        let settings = VerifierSettings::load_base_settings(working_dir.path(), None).unwrap();
        assert_eq!(settings.relying_party.rp_id, "root.example");

        // A secrets dir without a file keeps the working directory settings
        let secrets = secrets_dir.path().to_str().unwrap();
        let settings =
            VerifierSettings::load_base_settings(working_dir.path(), Some(secrets)).unwrap();
        assert_eq!(settings.relying_party.rp_id, "root.example");

        fs::write(
            secrets_dir.path().join(SETTINGS_FILE),
            "[relying_party]\nrp_id = \"secret.example\"\n",
        )
        .unwrap();
        let settings =
            VerifierSettings::load_base_settings(working_dir.path(), Some(secrets)).unwrap();
        assert_eq!(settings.relying_party.rp_id, "secret.example");
        assert_eq!(settings.relying_party.origin, "https://localhost");
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let working_dir = tempfile::tempdir().unwrap();
        fs::write(working_dir.path().join(SETTINGS_FILE), "[relying_party\n").unwrap();
        assert!(VerifierSettings::load_base_settings(working_dir.path(), None).is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clean_env_vars();

        std::env::set_var("WEBAUTHN_RP_ID", "env.example");
        std::env::set_var("WEBAUTHN_ORIGIN", "https://env.example");
        std::env::set_var("WEBAUTHN_CONVERT_ECDSA_SIGNATURE", "false");
        std::env::set_var("WEBAUTHN_COSE_KEY_SPAN", "CBOR");

        let mut settings = VerifierSettings::default();
        VerifierSettings::apply_env_overrides(&mut settings);

        assert_eq!(settings.relying_party.rp_id, "env.example");
        assert_eq!(settings.relying_party.origin, "https://env.example");
        assert!(!settings.verification.convert_ecdsa_signature);
        assert_eq!(settings.verification.cose_key_span, KeySpanMode::Cbor);

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_are_ignored() {
        clean_env_vars();

        std::env::set_var("WEBAUTHN_CONVERT_ECDSA_SIGNATURE", "maybe");
        std::env::set_var("WEBAUTHN_COSE_KEY_SPAN", "variable");

        let mut settings = VerifierSettings::default();
        VerifierSettings::apply_env_overrides(&mut settings);
        assert_eq!(settings, VerifierSettings::default());

        clean_env_vars();
    }

    #[test]
    fn test_expected_props_helpers() {
        let mut settings = VerifierSettings::default();
        settings.relying_party.rp_id = "example.com".to_string();
        settings.relying_party.origin = "https://example.com".to_string();

        let registration = settings.expected_registration("abc");
        assert_eq!(
            registration,
            ExpectedRegistrationProps::new("abc", "https://example.com")
        );

        let authentication = settings.expected_authentication("abc", 7);
        assert_eq!(
            authentication,
            ExpectedAuthenticationProps::new("example.com", "abc", "https://example.com", 7)
        );
    }
}
