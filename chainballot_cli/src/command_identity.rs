use crate::config::CliConfig;
use crate::{caller_of, expand, require_secret_key, sign_and_emit};
use chainballot::{Transaction, VerifyIdentityTransaction};
use std::convert::TryInto;

pub fn command_identity(matches: &clap::ArgMatches, cli: &CliConfig) {
    // Subcommands
    if let Some(matches) = matches.subcommand_matches("verify") {
        command_identity_verify(matches, cli);
    }
}

pub fn command_identity_verify(matches: &clap::ArgMatches, cli: &CliConfig) {
    let secret_key = require_secret_key(cli);

    let proof = decode_hex(matches, "PROOF-HEX");
    let commitment = decode_hex(matches, "COMMITMENT-HEX");
    let commitment: [u8; 32] = commitment.as_slice().try_into().unwrap_or_else(|_| {
        eprintln!(
            "chainballot identity verify: commitment must be 32 bytes, got {}",
            commitment.len()
        );
        std::process::exit(1);
    });
    let method = expand(matches.value_of("METHOD").unwrap_or_default());

    let verification =
        VerifyIdentityTransaction::new(caller_of(secret_key), proof, commitment, &method);

    sign_and_emit(
        matches,
        cli,
        secret_key,
        Transaction::VerifyIdentity(verification),
    );
}

fn decode_hex(matches: &clap::ArgMatches, name: &str) -> Vec<u8> {
    let raw = expand(matches.value_of(name).unwrap_or_default());
    hex::decode(raw.trim()).unwrap_or_else(|e| {
        eprintln!("chainballot identity verify: {} is not valid hex: {}", name, e);
        std::process::exit(1);
    })
}
