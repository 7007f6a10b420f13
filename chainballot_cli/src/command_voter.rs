use crate::config::CliConfig;
use crate::{caller_of, require_secret_key, sign_and_emit, value_u64};
use chainballot::{RegisterVoterTransaction, Transaction};

pub fn command_voter(matches: &clap::ArgMatches, cli: &CliConfig) {
    // Subcommands
    if let Some(matches) = matches.subcommand_matches("register") {
        command_voter_register(matches, cli);
    }
}

pub fn command_voter_register(matches: &clap::ArgMatches, cli: &CliConfig) {
    let secret_key = require_secret_key(cli);

    let election = value_u64(matches, "ELECTION-ID");
    let weight = value_u64(matches, "weight");

    let registration = RegisterVoterTransaction::new(caller_of(secret_key), election, weight);

    sign_and_emit(
        matches,
        cli,
        secret_key,
        Transaction::RegisterVoter(registration),
    );
}
