use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use clap::Parser;
use serde_json::json;
use std::error::Error;
use std::fs;
use std::process::ExitCode;

use webauthn_attest::{
    AaguidMetadataStore, AssertionResponse, CoseKey, RegistrationResponse, RelyingPartyConfig,
    verify_assertion_response, verify_registration_response,
};

#[derive(Parser)]
enum VerifyCli {
    Register(RegisterArgs),
    Authenticate(AuthenticateArgs),
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Verify a PublicKeyCredential from navigator.credentials.create() \
    and print the credential to store")]
struct RegisterArgs {
    #[arg(short, long, default_value = "registration.json")]
    response: String,

    /// Base64URL challenge issued for the ceremony
    #[arg(short, long)]
    challenge: String,

    /// AAGUID metadata file, the bundled list when omitted
    #[arg(short, long)]
    metadata: Option<String>,
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Verify a PublicKeyCredential from navigator.credentials.get() \
    against a stored public key and counter")]
struct AuthenticateArgs {
    #[arg(short, long, default_value = "assertion.json")]
    response: String,

    /// Base64URL challenge issued for the ceremony
    #[arg(short, long)]
    challenge: String,

    /// Base64URL COSE key printed by `register`
    #[arg(short, long)]
    public_key: String,

    #[arg(short, long, default_value_t = 0)]
    sign_count: u32,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    run(VerifyCli::parse())
}

fn run(cli: VerifyCli) -> ExitCode {
    let result = match cli {
        VerifyCli::Register(args) => register(&args).map_err(|e| ("registration", e)),
        VerifyCli::Authenticate(args) => authenticate(&args).map_err(|e| ("authentication", e)),
    };

    match result {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err((ceremony, e)) => {
            eprintln!("{ceremony} failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn register(args: &RegisterArgs) -> Result<String, Box<dyn Error>> {
    let config = RelyingPartyConfig::from_env()?;
    let metadata = match &args.metadata {
        Some(path) => AaguidMetadataStore::from_json(&fs::read_to_string(path)?)?,
        None => AaguidMetadataStore::builtin()?,
    };
    tracing::info!("Loaded metadata for {} authenticators", metadata.len());

    let response: RegistrationResponse =
        serde_json::from_str(&fs::read_to_string(&args.response)?)?;
    let challenge = URL_SAFE_NO_PAD.decode(&args.challenge)?;

    let credential = verify_registration_response(&config, &metadata, &response, &challenge)?;

    let j = json!({
        "credentialId": credential.credential_id_base64url(),
        "publicKey": URL_SAFE_NO_PAD.encode(credential.public_key.as_bytes()),
        "aaguid": credential.aaguid.to_string(),
        "signCount": credential.sign_count,
        "format": credential.format.as_str(),
        "attestationLevel": credential.attestation_level.as_str(),
        "userVerified": credential.user_verified,
        "backupEligible": credential.backup_eligible,
        "backedUp": credential.backed_up,
        "authenticator": credential.metadata.map(|m| m.name),
    });

    Ok(serde_json::to_string_pretty(&j)?)
}

fn authenticate(args: &AuthenticateArgs) -> Result<String, Box<dyn Error>> {
    let config = RelyingPartyConfig::from_env()?;

    let response: AssertionResponse = serde_json::from_str(&fs::read_to_string(&args.response)?)?;
    let challenge = URL_SAFE_NO_PAD.decode(&args.challenge)?;
    let public_key = CoseKey::from_cbor_bytes(&URL_SAFE_NO_PAD.decode(&args.public_key)?)?;

    let outcome = verify_assertion_response(
        &config,
        &response,
        &challenge,
        &public_key,
        args.sign_count,
    )?;

    let j = json!({
        "credentialId": response.raw_id,
        "signCount": outcome.sign_count,
        "userVerified": outcome.user_verified,
        "backedUp": outcome.backed_up,
    });

    Ok(serde_json::to_string_pretty(&j)?)
}
