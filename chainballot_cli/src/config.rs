use chainballot::Config;
use clap::ArgMatches;
use ed25519_dalek::SecretKey;
use std::env::var;

pub struct CliConfig {
    pub secret_key: Option<SecretKey>,
    pub ledger_path: String,
    pub config: Config,
}

impl CliConfig {
    /// Read settings from the environment. Command-line flags win.
    pub fn from_env(matches: &ArgMatches) -> Self {
        let secret_key = match flag_or_env(matches, "secret-key", "CHAINBALLOT_SECRET_KEY") {
            Some(val) => Some(parse_secret_key(&val)),
            None => None,
        };

        let ledger_path = flag_or_env(matches, "ledger", "CHAINBALLOT_LEDGER")
            .map(|path| crate::expand(&path))
            .unwrap_or_else(|| "./chainballot-ledger.json".to_owned());

        let config = match flag_or_env(matches, "config", "CHAINBALLOT_CONFIG") {
            Some(path) => {
                let path = crate::expand(&path);
                let bytes = std::fs::read(&path).unwrap_or_else(|e| {
                    eprintln!("chainballot: unable to read config {}: {}", path, e);
                    std::process::exit(1);
                });
                Config::from_json(&bytes).unwrap_or_else(|e| {
                    eprintln!("chainballot: invalid config {}: {}", path, e);
                    std::process::exit(1);
                })
            }
            None => Config::default(),
        };

        CliConfig {
            secret_key,
            ledger_path,
            config,
        }
    }
}

fn flag_or_env(matches: &ArgMatches, flag: &str, env: &str) -> Option<String> {
    match flag_value(matches, flag) {
        Some(val) => Some(val),
        None => var(env).ok(),
    }
}

// Global flags may be given after the subcommand, so look in the deepest matches first
fn flag_value(matches: &ArgMatches, flag: &str) -> Option<String> {
    let nested = matches.subcommand().1.and_then(|sub| flag_value(sub, flag));
    nested.or_else(|| matches.value_of(flag).map(str::to_owned))
}

/// Count a repeatable flag across every level of subcommands
pub fn occurrences(matches: &ArgMatches, flag: &str) -> u64 {
    let nested = matches
        .subcommand()
        .1
        .map(|sub| occurrences(sub, flag))
        .unwrap_or(0);
    matches.occurrences_of(flag).max(nested)
}

fn parse_secret_key(val: &str) -> SecretKey {
    let bytes = hex::decode(val.trim()).unwrap_or_else(|e| {
        eprintln!("chainballot: secret key must be hex: {}", e);
        std::process::exit(1);
    });
    SecretKey::from_bytes(&bytes).unwrap_or_else(|e| {
        eprintln!("chainballot: invalid secret key: {}", e);
        std::process::exit(1);
    })
}
