use chainballot::{BlockHeight, Principal, SignedTransaction, Transaction};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use ed25519_dalek::{PublicKey, SecretKey};

#[macro_use]
extern crate log;

mod command_candidate;
mod command_election;
mod command_identity;
mod command_keygen;
mod command_post_transaction;
mod command_replay;
mod command_show;
mod command_vote;
mod command_voter;
mod config;
mod ledger_file;

use command_candidate::*;
use command_election::*;
use command_identity::*;
use command_keygen::*;
use command_post_transaction::*;
use command_replay::*;
use command_show::*;
use command_vote::*;
use command_voter::*;
use config::CliConfig;

fn main() {
    let matches = App::new("ChainBallot CLI")
        .version("0.1")
        .author("Patrick Hayes <patrick.d.hayes@gmail.com>")
        .about("Runs block-height gated elections against a local ledger file")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("secret-key")
                .long("secret-key")
                .takes_value(true)
                .global(true)
                .help("Hex secret key used to sign transactions - can also be set with CHAINBALLOT_SECRET_KEY"),
        )
        .arg(
            Arg::with_name("ledger")
                .long("ledger")
                .takes_value(true)
                .global(true)
                .help("Ledger file - can also be set with CHAINBALLOT_LEDGER"),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .takes_value(true)
                .global(true)
                .help("JSON config file - can also be set with CHAINBALLOT_CONFIG"),
        )
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .global(true)
                .help("Sets the level of verbosity"),
        )
        .subcommand(SubCommand::with_name("keygen").about("Generate a new secret and public key"))
        .subcommand(
            SubCommand::with_name("election")
                .about("Election transactions")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(
                    SubCommand::with_name("create")
                        .about("Create an election administered by the signer")
                        .arg(Arg::with_name("NAME").index(1).required(true))
                        .arg(Arg::with_name("DESCRIPTION").index(2).required(true))
                        .arg(block_arg("registration-end", "Last block of the registration phase"))
                        .arg(block_arg("start", "First block of the voting phase"))
                        .arg(block_arg("end", "Last block of the voting phase"))
                        .arg(post_arg())
                        .arg(height_arg(false)),
                ),
        )
        .subcommand(
            SubCommand::with_name("candidate")
                .about("Candidate transactions")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(
                    SubCommand::with_name("add")
                        .about("Add a candidate to an election (admin only)")
                        .arg(Arg::with_name("ELECTION-ID").index(1).required(true))
                        .arg(Arg::with_name("NAME").index(2).required(true))
                        .arg(Arg::with_name("MANIFESTO").index(3).required(true))
                        .arg(post_arg())
                        .arg(height_arg(false)),
                ),
        )
        .subcommand(
            SubCommand::with_name("voter")
                .about("Voter transactions")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(
                    SubCommand::with_name("register")
                        .about("Register the signer as a voter")
                        .arg(Arg::with_name("ELECTION-ID").index(1).required(true))
                        .arg(
                            Arg::with_name("weight")
                                .long("weight")
                                .takes_value(true)
                                .default_value("1")
                                .help("Voting weight"),
                        )
                        .arg(post_arg())
                        .arg(height_arg(false)),
                ),
        )
        .subcommand(
            SubCommand::with_name("vote")
                .about("Cast the signer's vote")
                .arg(Arg::with_name("ELECTION-ID").index(1).required(true))
                .arg(Arg::with_name("CANDIDATE-ID").index(2).required(true))
                .arg(post_arg())
                .arg(height_arg(false)),
        )
        .subcommand(
            SubCommand::with_name("identity")
                .about("Identity transactions")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(
                    SubCommand::with_name("verify")
                        .about("Submit an identity proof for the signer")
                        .arg(Arg::with_name("PROOF-HEX").index(1).required(true))
                        .arg(Arg::with_name("COMMITMENT-HEX").index(2).required(true))
                        .arg(Arg::with_name("METHOD").index(3).required(true))
                        .arg(post_arg())
                        .arg(height_arg(false)),
                ),
        )
        .subcommand(
            SubCommand::with_name("post")
                .about("Post signed transaction(s) to the ledger")
                .arg(
                    Arg::with_name("INPUT")
                        .index(1)
                        .required(true)
                        .help("Transaction file in JSON or CBOR format"),
                )
                .arg(height_arg(true)),
        )
        .subcommand(
            SubCommand::with_name("show")
                .about("Query the ledger")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(
                    SubCommand::with_name("election")
                        .about("Show an election and its phase")
                        .arg(Arg::with_name("ELECTION-ID").index(1).required(true))
                        .arg(height_arg(false)),
                )
                .subcommand(
                    SubCommand::with_name("candidates")
                        .about("Show the candidates of an election with their tallies")
                        .arg(Arg::with_name("ELECTION-ID").index(1).required(true)),
                )
                .subcommand(
                    SubCommand::with_name("voter")
                        .about("Show a voter record")
                        .arg(Arg::with_name("ELECTION-ID").index(1).required(true))
                        .arg(Arg::with_name("PRINCIPAL").index(2).required(true)),
                )
                .subcommand(
                    SubCommand::with_name("identity")
                        .about("Show an identity attestation")
                        .arg(Arg::with_name("PRINCIPAL").index(1).required(true)),
                ),
        )
        .subcommand(
            SubCommand::with_name("replay")
                .about("Apply a list of height-stamped transactions to a fresh ledger")
                .arg(
                    Arg::with_name("INPUT")
                        .index(1)
                        .required(true)
                        .help("JSON list of {\"height\": H, \"tx\": TX} entries"),
                ),
        )
        .get_matches();

    let level = match config::occurrences(&matches, "v") {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let cli = CliConfig::from_env(&matches);
    debug!("ledger file: {}", cli.ledger_path);

    // Subcommands
    match matches.subcommand() {
        ("keygen", Some(matches)) => command_keygen(matches),
        ("election", Some(matches)) => command_election(matches, &cli),
        ("candidate", Some(matches)) => command_candidate(matches, &cli),
        ("voter", Some(matches)) => command_voter(matches, &cli),
        ("vote", Some(matches)) => command_vote(matches, &cli),
        ("identity", Some(matches)) => command_identity(matches, &cli),
        ("post", Some(matches)) => command_post_transaction(matches, &cli),
        ("show", Some(matches)) => command_show(matches, &cli),
        ("replay", Some(matches)) => command_replay(matches, &cli),
        _ => {}
    }
}

fn block_arg(name: &'static str, help: &'static str) -> Arg<'static, 'static> {
    Arg::with_name(name)
        .long(name)
        .takes_value(true)
        .required(true)
        .help(help)
}

fn post_arg() -> Arg<'static, 'static> {
    Arg::with_name("post")
        .long("post")
        .requires("height")
        .help("Also submit the signed transaction to the ledger file")
}

fn height_arg(required: bool) -> Arg<'static, 'static> {
    Arg::with_name("height")
        .long("height")
        .takes_value(true)
        .required(required)
        .help("Block height")
}

pub fn expand(input: &str) -> String {
    match shellexpand::full(input) {
        Ok(expanded) => expanded.into_owned(),
        Err(e) => {
            eprintln!("chainballot: unable to expand {}: {}", input, e);
            std::process::exit(1);
        }
    }
}

/// Parse a required numeric argument, exiting on failure
pub fn value_u64(matches: &ArgMatches, name: &str) -> u64 {
    let raw = expand(matches.value_of(name).unwrap_or_default());
    raw.parse().unwrap_or_else(|e| {
        eprintln!("chainballot: invalid {} {:?}: {}", name, raw, e);
        std::process::exit(1);
    })
}

/// Parse an optional block height
pub fn height_of(matches: &ArgMatches) -> Option<BlockHeight> {
    if matches.is_present("height") {
        Some(value_u64(matches, "height"))
    } else {
        None
    }
}

pub fn require_secret_key(cli: &CliConfig) -> &SecretKey {
    cli.secret_key.as_ref().unwrap_or_else(|| {
        eprintln!("Please provide a secret key either via --secret-key or CHAINBALLOT_SECRET_KEY");
        std::process::exit(1);
    })
}

pub fn caller_of(secret_key: &SecretKey) -> Principal {
    let public_key: PublicKey = secret_key.into();
    public_key.into()
}

/// Sign a transaction, print it as JSON and, with `--post`, submit it to the ledger file
pub fn sign_and_emit(matches: &ArgMatches, cli: &CliConfig, secret_key: &SecretKey, tx: Transaction) {
    let signed: SignedTransaction = tx.sign(secret_key).unwrap_or_else(|e| {
        eprintln!("chainballot: unable to sign transaction: {}", e);
        std::process::exit(1);
    });

    let tx_json = serde_json::to_string_pretty(&signed).unwrap_or_else(|e| {
        eprintln!("chainballot: unable to serialize transaction: {}", e);
        std::process::exit(1);
    });
    println!("{}", tx_json);

    if matches.is_present("post") {
        if let Some(height) = height_of(matches) {
            ledger_file::submit_all(cli, &[signed], height);
        }
    }
}
