use crate::*;
use digest::Digest;
use ed25519_dalek::ExpandedSecretKey;
use ed25519_dalek::PublicKey;
use ed25519_dalek::SecretKey;
use ed25519_dalek::Signature;
use num_enum::TryFromPrimitive;
use serde::Serialize;
use std::convert::AsRef;
use std::ops::Deref;

/// An unsigned transaction
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum Transaction {
    CreateElection(CreateElectionTransaction),
    AddCandidate(AddCandidateTransaction),
    RegisterVoter(RegisterVoterTransaction),
    CastVote(CastVoteTransaction),
    VerifyIdentity(VerifyIdentityTransaction),
}

impl Transaction {
    /// Get the transaction type
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            Transaction::CreateElection(_) => TransactionType::Election,
            Transaction::AddCandidate(_) => TransactionType::Candidate,
            Transaction::RegisterVoter(_) => TransactionType::Voter,
            Transaction::CastVote(_) => TransactionType::Vote,
            Transaction::VerifyIdentity(_) => TransactionType::Identity,
        }
    }

    /// The principal on whose behalf the transaction runs
    pub fn caller(&self) -> Principal {
        match self {
            Transaction::CreateElection(tx) => tx.caller,
            Transaction::AddCandidate(tx) => tx.caller,
            Transaction::RegisterVoter(tx) => tx.caller,
            Transaction::CastVote(tx) => tx.caller,
            Transaction::VerifyIdentity(tx) => tx.caller,
        }
    }

    /// Sign the transaction with the caller's secret key
    pub fn sign(self, secret: &SecretKey) -> Result<SignedTransaction, Error> {
        let signed = match self {
            Transaction::CreateElection(tx) => Signed::sign(secret, tx)?.into(),
            Transaction::AddCandidate(tx) => Signed::sign(secret, tx)?.into(),
            Transaction::RegisterVoter(tx) => Signed::sign(secret, tx)?.into(),
            Transaction::CastVote(tx) => Signed::sign(secret, tx)?.into(),
            Transaction::VerifyIdentity(tx) => Signed::sign(secret, tx)?.into(),
        };
        Ok(signed)
    }
}

/// A signed transaction
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum SignedTransaction {
    CreateElection(Signed<CreateElectionTransaction>),
    AddCandidate(Signed<AddCandidateTransaction>),
    RegisterVoter(Signed<RegisterVoterTransaction>),
    CastVote(Signed<CastVoteTransaction>),
    VerifyIdentity(Signed<VerifyIdentityTransaction>),
}

impl SignedTransaction {
    /// Get the transaction type
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            SignedTransaction::CreateElection(_) => TransactionType::Election,
            SignedTransaction::AddCandidate(_) => TransactionType::Candidate,
            SignedTransaction::RegisterVoter(_) => TransactionType::Voter,
            SignedTransaction::CastVote(_) => TransactionType::Vote,
            SignedTransaction::VerifyIdentity(_) => TransactionType::Identity,
        }
    }

    pub fn caller(&self) -> Principal {
        match self {
            SignedTransaction::CreateElection(signed) => signed.caller(),
            SignedTransaction::AddCandidate(signed) => signed.caller(),
            SignedTransaction::RegisterVoter(signed) => signed.caller(),
            SignedTransaction::CastVote(signed) => signed.caller(),
            SignedTransaction::VerifyIdentity(signed) => signed.caller(),
        }
    }

    /// Pack into bytes
    pub fn as_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_cbor::to_vec(self)?)
    }

    /// Unpack from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        match bytes.first() {
            // If it starts with `{` then it's JSON
            Some(b'{') => Ok(serde_json::from_slice(bytes)?),
            Some(_) => Ok(serde_cbor::from_slice(bytes)?),
            None => Err(Error::DeserializationUnknownFormat),
        }
    }

    /// Get the transaction ID: the SHA-256 digest of the packed signed transaction
    pub fn id(&self) -> Result<TransactionId, Error> {
        let digest = sha2::Sha256::digest(&self.as_bytes()?);
        let mut id = [0u8; 32];
        id.copy_from_slice(&digest);
        Ok(TransactionId(id))
    }

    pub fn verify_signature(&self) -> Result<(), Error> {
        match self {
            SignedTransaction::CreateElection(signed) => signed.verify_signature(),
            SignedTransaction::AddCandidate(signed) => signed.verify_signature(),
            SignedTransaction::RegisterVoter(signed) => signed.verify_signature(),
            SignedTransaction::CastVote(signed) => signed.verify_signature(),
            SignedTransaction::VerifyIdentity(signed) => signed.verify_signature(),
        }
    }

    /// Verify the signature and check field limits
    pub fn validate(&self, limits: &Limits) -> Result<(), Error> {
        match self {
            SignedTransaction::CreateElection(signed) => signed.validate(limits),
            SignedTransaction::AddCandidate(signed) => signed.validate(limits),
            SignedTransaction::RegisterVoter(signed) => signed.validate(limits),
            SignedTransaction::CastVote(signed) => signed.validate(limits),
            SignedTransaction::VerifyIdentity(signed) => signed.validate(limits),
        }
    }
}

/// This trait should be considered sealed and should not be implemented outside this crate
#[doc(hidden)]
pub trait Signable: Serialize {
    fn caller(&self) -> Principal;

    /// Check the fields the ledger boundary is responsible for
    fn validate_tx(&self, limits: &Limits) -> Result<(), Error>;

    fn as_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_cbor::to_vec(&self)?)
    }
}

/// A generic signed transaction
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Signed<T: Signable> {
    pub tx: T,

    #[serde(with = "crate::ed_signature_hex")]
    pub sig: Signature,
}

impl<T: Signable> Signed<T> {
    /// Sign a transaction, producing a Signed<T>
    pub fn sign(secret: &SecretKey, transaction: T) -> Result<Self, Error> {
        let public_key = PublicKey::from(secret);
        if Principal::from(&public_key) != transaction.caller() {
            return Err(Error::MismatchedPublicKeys);
        }

        let serialized = transaction.as_bytes()?;

        let expanded: ExpandedSecretKey = secret.into();
        let signature = expanded.sign(&serialized, &public_key);

        Ok(Signed {
            tx: transaction,
            sig: signature,
        })
    }

    /// Verify the signature against the caller's public key
    pub fn verify_signature(&self) -> Result<(), Error> {
        let serialized = self.tx.as_bytes()?;
        let public_key = self.tx.caller().public_key()?;
        public_key.verify_strict(&serialized, &self.sig)?;
        Ok(())
    }

    /// Get the inner unsigned transaction
    pub fn inner(&self) -> &T {
        &self.tx
    }

    /// Verify the signature and validate the transaction
    pub fn validate(&self, limits: &Limits) -> Result<(), Error> {
        self.verify_signature()?;
        self.validate_tx(limits)?;

        Ok(())
    }
}

impl<T: Signable> AsRef<T> for Signed<T> {
    fn as_ref(&self) -> &T {
        &self.tx
    }
}

impl<T: Signable> Deref for Signed<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.tx
    }
}

/// Transaction identifier, used by the ledger to reject replays
#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(#[serde(with = "crate::digest_hex")] pub [u8; 32]);

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "TransactionId({})", self)
    }
}

/// A transaction type
#[derive(Serialize, Deserialize, TryFromPrimitive, Copy, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TransactionType {
    Election = 1,
    Candidate = 2,
    Voter = 3,
    Vote = 4,
    Identity = 5,
}

impl TransactionType {
    pub fn name(&self) -> &'static str {
        match self {
            TransactionType::Election => "election",
            TransactionType::Candidate => "candidate",
            TransactionType::Voter => "voter",
            TransactionType::Vote => "vote",
            TransactionType::Identity => "identity",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<Signed<CreateElectionTransaction>> for SignedTransaction {
    fn from(tx: Signed<CreateElectionTransaction>) -> Self {
        SignedTransaction::CreateElection(tx)
    }
}

impl From<Signed<AddCandidateTransaction>> for SignedTransaction {
    fn from(tx: Signed<AddCandidateTransaction>) -> Self {
        SignedTransaction::AddCandidate(tx)
    }
}

impl From<Signed<RegisterVoterTransaction>> for SignedTransaction {
    fn from(tx: Signed<RegisterVoterTransaction>) -> Self {
        SignedTransaction::RegisterVoter(tx)
    }
}

impl From<Signed<CastVoteTransaction>> for SignedTransaction {
    fn from(tx: Signed<CastVoteTransaction>) -> Self {
        SignedTransaction::CastVote(tx)
    }
}

impl From<Signed<VerifyIdentityTransaction>> for SignedTransaction {
    fn from(tx: Signed<VerifyIdentityTransaction>) -> Self {
        SignedTransaction::VerifyIdentity(tx)
    }
}
