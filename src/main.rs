#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use log::info;
use serde::Deserialize;
use webauthn_verifier::{
    crypto::PublicKeyOptions,
    settings::VerifierSettings,
    types::{AuthenticationAssertionJson, RegistrationCredentialJson},
    AuthenticationAssertion, AuthenticationValidator, IncomingAuthenticationProps,
    RegistrationCredential, RegistrationValidator, VERSION,
};

const USAGE: &str = "usage: webauthn-verify <registration|authentication> <ceremony.json>";

/// Registration ceremony file
#[derive(Deserialize)]
struct RegistrationCeremony {
    credential: RegistrationCredentialJson,
    challenge: String,
}

/// Authentication ceremony file; `credential` is the stored registration record
#[derive(Deserialize)]
struct AuthenticationCeremony {
    credential: RegistrationCredentialJson,
    assertion: AuthenticationAssertionJson,
    challenge: String,
    stored_counter: i64,
    #[serde(default)]
    key_options: PublicKeyOptions,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Also loads .env and initializes the logger
    let settings = VerifierSettings::load()
        .map_err(|e| anyhow::anyhow!("Failed to load settings: {e}"))?;

    let mut args = std::env::args().skip(1);
    let (Some(ceremony), Some(path)) = (args.next(), args.next()) else {
        eprintln!("{USAGE}");
        return Ok(ExitCode::from(2));
    };
    let path = PathBuf::from(path);
    let contents = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    info!("webauthn-verify {VERSION}: {ceremony} ceremony from {}", path.display());

    let verdict = match ceremony.as_str() {
        "registration" => verify_registration(&settings, &contents)?,
        "authentication" => verify_authentication(&settings, &contents).await?,
        other => bail!("Unknown ceremony '{other}'\n{USAGE}"),
    };

    if verdict {
        println!("✓ {ceremony} verified");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("✗ {ceremony} rejected");
        Ok(ExitCode::FAILURE)
    }
}

fn verify_registration(settings: &VerifierSettings, contents: &str) -> anyhow::Result<bool> {
    let ceremony: RegistrationCeremony =
        serde_json::from_str(contents).context("Invalid registration ceremony file")?;
    let credential = RegistrationCredential::try_from(ceremony.credential)?;
    let expected = settings.expected_registration(&ceremony.challenge);

    Ok(print_verdict(
        RegistrationValidator::new()
            .with_key_span(settings.verification.key_span())
            .validate(&credential, &expected),
    ))
}

async fn verify_authentication(settings: &VerifierSettings, contents: &str) -> anyhow::Result<bool> {
    let ceremony: AuthenticationCeremony =
        serde_json::from_str(contents).context("Invalid authentication ceremony file")?;
    let credential = RegistrationCredential::try_from(ceremony.credential)?;
    let assertion = AuthenticationAssertion::try_from(ceremony.assertion)?;
    let incoming = IncomingAuthenticationProps::from_assertion(&assertion)?;
    let expected = settings.expected_authentication(&ceremony.challenge, ceremony.stored_counter);

    let result = AuthenticationValidator::new()
        .with_key_span(settings.verification.key_span())
        .validate(
            &credential,
            &assertion,
            &expected,
            &incoming,
            &ceremony.key_options,
            settings.verification.convert_ecdsa_signature,
        )
        .await;
    Ok(print_verdict(result))
}

/// Validation errors are verdicts here, not program failures
fn print_verdict(result: webauthn_verifier::Result<bool>) -> bool {
    match result {
        Ok(verdict) => verdict,
        Err(e) => {
            eprintln!("{}: {e}", e.kind());
            false
        }
    }
}
