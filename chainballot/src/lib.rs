#[macro_use]
extern crate serde;

#[macro_use]
extern crate log;

mod candidate;
mod config;
mod election;
mod error;
mod event;
mod identity;
mod ledger;
mod principal;
mod serde_hex;
mod service;
mod store;
mod transaction;
mod util;
mod voter;

pub use candidate::*;
pub use config::*;
pub use election::*;
pub use error::*;
pub use event::*;
pub use identity::*;
pub use ledger::*;
pub use principal::*;
pub use serde_hex::*;
pub use service::*;
pub use store::*;
pub use transaction::*;
pub use util::*;
pub use voter::*;

/// Height of a block on the host ledger. Supplied by the caller of every operation.
pub type BlockHeight = u64;

/// Election identifier, allocated from a global monotonic counter.
pub type ElectionId = u64;

/// Candidate identifier, dense and per-election, starting at 0.
pub type CandidateId = u64;

/// A voter's contribution to a candidate's tally.
pub type Weight = u64;
