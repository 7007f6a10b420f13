use crate::config::CliConfig;
use crate::{caller_of, expand, require_secret_key, sign_and_emit, value_u64};
use chainballot::{CreateElectionTransaction, Transaction};

pub fn command_election(matches: &clap::ArgMatches, cli: &CliConfig) {
    // Subcommands
    if let Some(matches) = matches.subcommand_matches("create") {
        command_election_create(matches, cli);
    }
}

pub fn command_election_create(matches: &clap::ArgMatches, cli: &CliConfig) {
    let secret_key = require_secret_key(cli);

    let name = expand(matches.value_of("NAME").unwrap_or_default());
    let description = expand(matches.value_of("DESCRIPTION").unwrap_or_default());

    let election = CreateElectionTransaction::new(
        caller_of(secret_key),
        &name,
        &description,
        value_u64(matches, "registration-end"),
        value_u64(matches, "start"),
        value_u64(matches, "end"),
    );

    sign_and_emit(
        matches,
        cli,
        secret_key,
        Transaction::CreateElection(election),
    );
}
