use crate::config::CliConfig;
use crate::{caller_of, expand, require_secret_key, sign_and_emit, value_u64};
use chainballot::{AddCandidateTransaction, Transaction};

pub fn command_candidate(matches: &clap::ArgMatches, cli: &CliConfig) {
    // Subcommands
    if let Some(matches) = matches.subcommand_matches("add") {
        command_candidate_add(matches, cli);
    }
}

pub fn command_candidate_add(matches: &clap::ArgMatches, cli: &CliConfig) {
    let secret_key = require_secret_key(cli);

    let election = value_u64(matches, "ELECTION-ID");
    let name = expand(matches.value_of("NAME").unwrap_or_default());
    let manifesto = expand(matches.value_of("MANIFESTO").unwrap_or_default());

    let candidate =
        AddCandidateTransaction::new(caller_of(secret_key), election, &name, &manifesto);

    sign_and_emit(
        matches,
        cli,
        secret_key,
        Transaction::AddCandidate(candidate),
    );
}
