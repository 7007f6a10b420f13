use crate::*;
use num_enum::TryFromPrimitive;
use thiserror::Error;

/// Errors raised at the ledger boundary: decoding, signatures, field caps and replay.
#[derive(Debug, Error)]
pub enum Error {
    #[error("chainballot: signature error: {0}")]
    SignatureError(#[from] ed25519_dalek::SignatureError),

    #[error("chainballot: secret key does not belong to the transaction caller")]
    MismatchedPublicKeys,

    #[error("chainballot: invalid hex - {0}")]
    BadHex(#[from] hex::FromHexError),

    #[error("chainballot: invalid length - expected {expected} bytes, found {found}")]
    BadLength { expected: usize, found: usize },

    #[error("chainballot: CBOR error: {0}")]
    CBORDeserialization(#[from] serde_cbor::Error),

    #[error("chainballot: JSON error: {0}")]
    JSONDeserialization(#[from] serde_json::Error),

    #[error("chainballot: error deserializing transaction: unknown format")]
    DeserializationUnknownFormat,

    #[error("chainballot: field `{field}` exceeds maximum length of {max}")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("chainballot: transaction {0} already applied")]
    DuplicateTransaction(TransactionId),

    #[error("chainballot: block height {requested} is behind current height {current}")]
    HeightRegression {
        current: BlockHeight,
        requested: BlockHeight,
    },

    #[error("chainballot: ledger lock poisoned")]
    LockPoisoned,

    #[error("chainballot: {0}")]
    Election(#[from] ElectionError),
}

impl Error {
    /// The core error carried by this error, if the call reached the election service.
    pub fn election_error(&self) -> Option<ElectionError> {
        match self {
            Error::Election(e) => Some(*e),
            _ => None,
        }
    }
}

/// Errors raised by the election service.
///
/// The taxonomy is flat and every variant has a stable numeric code.
/// A call that fails with any of these leaves all records unchanged.
#[derive(
    Debug, Error, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ElectionError {
    /// Caller lacks the required role, or failed a proof check.
    #[error("unauthorized")]
    Unauthorized = 1,

    /// Referenced election, voter or record is absent.
    #[error("not found")]
    NotFound = 2,

    #[error("already voted")]
    AlreadyVoted = 3,

    #[error("voting closed")]
    VotingClosed = 4,

    #[error("voting not started")]
    VotingNotStarted = 5,

    #[error("invalid candidate")]
    InvalidCandidate = 6,

    #[error("already registered")]
    AlreadyRegistered = 7,

    #[error("registration closed")]
    RegistrationClosed = 8,

    /// Block thresholds are not strictly ordered at creation.
    #[error("invalid parameters")]
    InvalidParameters = 9,

    /// A tally or counter would exceed `u64::MAX`.
    #[error("arithmetic overflow")]
    Overflow = 10,
}

impl ElectionError {
    pub fn code(self) -> u8 {
        self as u8
    }
}
