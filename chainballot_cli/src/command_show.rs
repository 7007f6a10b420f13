use crate::config::CliConfig;
use crate::{expand, ledger_file, value_u64};
use chainballot::Principal;
use serde::Serialize;

pub fn command_show(matches: &clap::ArgMatches, cli: &CliConfig) {
    let ledger = ledger_file::load(cli);
    let service = ledger.service();

    // Subcommands
    if let Some(matches) = matches.subcommand_matches("election") {
        let election_id = value_u64(matches, "ELECTION-ID");
        let height = crate::height_of(matches).unwrap_or_else(|| ledger.height());

        let election = service.election(election_id).unwrap_or_else(|| not_found("election"));
        print_json(&serde_json::json!({
            "election": election,
            "height": height,
            "phase": election.phase(height).to_string(),
        }));
    } else if let Some(matches) = matches.subcommand_matches("candidates") {
        let election_id = value_u64(matches, "ELECTION-ID");
        match service.candidates(election_id) {
            Ok(candidates) => print_json(&candidates),
            Err(_) => not_found("election"),
        }
    } else if let Some(matches) = matches.subcommand_matches("voter") {
        let election_id = value_u64(matches, "ELECTION-ID");
        let principal = principal_arg(matches);
        match service.voter(election_id, &principal) {
            Some(voter) => print_json(&voter),
            None => not_found("voter"),
        }
    } else if let Some(matches) = matches.subcommand_matches("identity") {
        let principal = principal_arg(matches);
        match service.attestation(&principal) {
            Some(attestation) => print_json(&attestation),
            None => not_found("attestation"),
        }
    }
}

fn principal_arg(matches: &clap::ArgMatches) -> Principal {
    let raw = expand(matches.value_of("PRINCIPAL").unwrap_or_default());
    raw.trim().parse().unwrap_or_else(|e| {
        eprintln!("chainballot show: invalid principal {}: {}", raw, e);
        std::process::exit(1);
    })
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("chainballot show: unable to serialize: {}", e);
            std::process::exit(1);
        }
    }
}

fn not_found(what: &str) -> ! {
    eprintln!("chainballot show: {} not found", what);
    std::process::exit(1);
}
