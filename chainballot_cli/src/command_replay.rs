use crate::config::CliConfig;
use crate::ledger_file::{print_receipt, report_rejection};
use chainballot::{BlockHeight, Ledger, SignedTransaction, Store};
use serde::Deserialize;

#[derive(Deserialize)]
struct ReplayEntry {
    height: BlockHeight,
    tx: SignedTransaction,
}

/// Apply every entry to a fresh in-memory ledger. The ledger file is not touched.
pub fn command_replay(matches: &clap::ArgMatches, cli: &CliConfig) {
    let filename = crate::expand(matches.value_of("INPUT").unwrap_or_default());

    let file_bytes = std::fs::read(&filename).unwrap_or_else(|e| {
        eprintln!("chainballot replay: unable to read {}: {}", filename, e);
        std::process::exit(1);
    });
    let entries: Vec<ReplayEntry> = serde_json::from_slice(&file_bytes).unwrap_or_else(|e| {
        eprintln!("chainballot replay: unable to parse {}: {}", filename, e);
        std::process::exit(1);
    });

    let mut ledger = Ledger::new(&cli.config);
    let mut rejected = 0;
    for entry in &entries {
        match ledger.submit(&entry.tx, entry.height) {
            Ok(receipt) => print_receipt(&receipt),
            Err(e) => {
                rejected += 1;
                report_rejection(&entry.tx, &e);
            }
        }
    }

    println!(
        "applied {} of {} transactions, ledger height {}",
        entries.len() - rejected,
        entries.len(),
        ledger.height()
    );

    let service = ledger.service();
    for election in service.store().elections() {
        println!(
            "election {} \"{}\" ({} at height {})",
            election.id,
            election.name,
            election.phase(ledger.height()),
            ledger.height()
        );
        for candidate in service.store().get_candidates(election.id) {
            println!(
                "  candidate {} \"{}\": {}",
                candidate.id, candidate.name, candidate.vote_tally
            );
        }
    }
}
