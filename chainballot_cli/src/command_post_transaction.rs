use crate::config::CliConfig;
use crate::ledger_file;
use chainballot::{SignedTransaction, Transaction};
use content_inspector::ContentType;

pub fn command_post_transaction(matches: &clap::ArgMatches, cli: &CliConfig) {
    let filename = crate::expand(matches.value_of("INPUT").unwrap_or_default());
    let height = crate::value_u64(matches, "height");

    let file_bytes = match std::fs::read(&filename) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("chainballot post: unable to read {}: {}", &filename, e);
            std::process::exit(1);
        }
    };

    let txs = match content_inspector::inspect(&file_bytes) {
        ContentType::UTF_8 => {
            let json_string = String::from_utf8_lossy(&file_bytes);
            parse_json(&filename, json_string.trim())
        }
        ContentType::BINARY => {
            let tx = SignedTransaction::from_bytes(&file_bytes).unwrap_or_else(|e| {
                eprintln!("chainballot post: unable to read {}: {}", &filename, e);
                std::process::exit(1);
            });
            vec![tx]
        }
        _ => {
            eprintln!("chainballot post: invalid file format for {}", filename);
            std::process::exit(1);
        }
    };

    ledger_file::submit_all(cli, &txs, height);
}

fn parse_json(filename: &str, json_string: &str) -> Vec<SignedTransaction> {
    // If the first letter is `[` then it's a vector of transactions
    if json_string.starts_with('[') {
        serde_json::from_str(json_string).unwrap_or_else(|e| {
            eprintln!(
                "chainballot post: error deserializing transaction list: {}",
                e
            );
            std::process::exit(1);
        })
    } else {
        let tx: SignedTransaction = serde_json::from_str(json_string).unwrap_or_else(|e| {
            // Maybe it's an unsigned transaction?
            let unsigned: Result<Transaction, _> = serde_json::from_str(json_string);
            if unsigned.is_ok() {
                eprintln!(
                    "chainballot post: {} is unsigned, sign it before posting",
                    filename
                );
            } else {
                eprintln!("chainballot post: unable to read {}: {}", filename, e);
            }

            std::process::exit(1);
        });
        vec![tx]
    }
}
