use crate::config::CliConfig;
use chainballot::{BlockHeight, Error, Ledger, LedgerSnapshot, Receipt, SignedTransaction};
use std::path::Path;

/// Load the ledger file, or start an empty ledger if it does not exist yet
pub fn load(cli: &CliConfig) -> Ledger {
    if !Path::new(&cli.ledger_path).exists() {
        info!("{} does not exist, starting an empty ledger", cli.ledger_path);
        return Ledger::new(&cli.config);
    }

    let bytes = std::fs::read(&cli.ledger_path).unwrap_or_else(|e| {
        eprintln!("chainballot: unable to read {}: {}", cli.ledger_path, e);
        std::process::exit(1);
    });
    let snapshot: LedgerSnapshot = serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        eprintln!("chainballot: corrupt ledger file {}: {}", cli.ledger_path, e);
        std::process::exit(1);
    });

    if snapshot.service != cli.config.service {
        warn!(
            "{} keeps the service policy it was created with, ignoring the configured one",
            cli.ledger_path
        );
    }

    Ledger::from_snapshot(snapshot, &cli.config)
}

pub fn save(cli: &CliConfig, ledger: &Ledger) {
    let json = serde_json::to_string_pretty(&ledger.snapshot()).unwrap_or_else(|e| {
        eprintln!("chainballot: unable to serialize ledger: {}", e);
        std::process::exit(1);
    });
    std::fs::write(&cli.ledger_path, json).unwrap_or_else(|e| {
        eprintln!("chainballot: unable to write {}: {}", cli.ledger_path, e);
        std::process::exit(1);
    });
}

/// Submit transactions in order at one height, printing a receipt for each.
///
/// Stops at the first rejection. Transactions committed before it are kept.
pub fn submit_all(cli: &CliConfig, txs: &[SignedTransaction], height: BlockHeight) {
    let mut ledger = load(cli);
    let mut failed = false;

    for tx in txs {
        match ledger.submit(tx, height) {
            Ok(receipt) => print_receipt(&receipt),
            Err(e) => {
                report_rejection(tx, &e);
                failed = true;
                break;
            }
        }
    }

    save(cli, &ledger);
    if failed {
        std::process::exit(1);
    }
}

pub fn print_receipt(receipt: &Receipt) {
    match serde_json::to_string_pretty(receipt) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("chainballot: unable to serialize receipt: {}", e),
    }
}

pub fn report_rejection(tx: &SignedTransaction, e: &Error) {
    match e.election_error() {
        Some(code) => eprintln!(
            "chainballot: {} transaction from {} rejected: {} (error code {})",
            tx.transaction_type(),
            tx.caller(),
            code,
            code.code()
        ),
        None => eprintln!(
            "chainballot: {} transaction from {} rejected: {}",
            tx.transaction_type(),
            tx.caller(),
            e
        ),
    }
}
