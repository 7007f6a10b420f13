use crate::config::CliConfig;
use crate::{caller_of, require_secret_key, sign_and_emit, value_u64};
use chainballot::{CastVoteTransaction, Transaction};

pub fn command_vote(matches: &clap::ArgMatches, cli: &CliConfig) {
    let secret_key = require_secret_key(cli);

    let election = value_u64(matches, "ELECTION-ID");
    let candidate = value_u64(matches, "CANDIDATE-ID");

    let vote = CastVoteTransaction::new(caller_of(secret_key), election, candidate);

    sign_and_emit(matches, cli, secret_key, Transaction::CastVote(vote));
}
