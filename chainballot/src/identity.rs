use crate::*;
use digest::Digest;

/// A record asserting that a principal passed identity verification.
///
/// Attestations are global, not per-election. A later verification by the same
/// principal replaces the record; no history is kept.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    pub principal: Principal,
    pub verified: bool,
    pub verification_method: String,
    pub verification_height: BlockHeight,
}

impl Attestation {
    pub fn new(principal: Principal, verification_method: &str, height: BlockHeight) -> Self {
        Attestation {
            principal,
            verified: true,
            verification_method: verification_method.to_owned(),
            verification_height: height,
        }
    }
}

/// Validates a proof artifact against an identity commitment.
///
/// The election service only records the outcome; the cryptography lives behind this trait.
pub trait ProofVerifier {
    fn is_valid_proof(&self, proof: &[u8], commitment: &[u8; 32]) -> bool;
}

/// Accepts every proof.
///
/// **This verifier provides no security.** Any caller can obtain a verified attestation
/// for themselves with arbitrary inputs. It is the default so that the service behaves
/// like a ledger with no verifier installed; substitute a real verifier for production use.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllVerifier;

impl ProofVerifier for AcceptAllVerifier {
    fn is_valid_proof(&self, _proof: &[u8], _commitment: &[u8; 32]) -> bool {
        true
    }
}

/// Accepts a proof when the commitment is its SHA-256 digest.
///
/// A hash opening, not a zero-knowledge proof: the artifact is revealed on the ledger.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256CommitmentVerifier;

impl ProofVerifier for Sha256CommitmentVerifier {
    fn is_valid_proof(&self, proof: &[u8], commitment: &[u8; 32]) -> bool {
        sha2::Sha256::digest(proof).as_slice() == &commitment[..]
    }
}

/// Transaction 5: VerifyIdentity
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VerifyIdentityTransaction {
    pub caller: Principal,
    pub nonce: u64,

    #[serde(with = "crate::bytes_hex")]
    pub proof: Vec<u8>,

    #[serde(with = "crate::digest_hex")]
    pub commitment: [u8; 32],

    pub verification_method: String,
}

impl VerifyIdentityTransaction {
    pub fn new(
        caller: Principal,
        proof: Vec<u8>,
        commitment: [u8; 32],
        verification_method: &str,
    ) -> Self {
        VerifyIdentityTransaction {
            caller,
            nonce: rand::random(),
            proof,
            commitment,
            verification_method: verification_method.to_owned(),
        }
    }
}

impl Signable for VerifyIdentityTransaction {
    fn caller(&self) -> Principal {
        self.caller
    }

    fn validate_tx(&self, limits: &Limits) -> Result<(), Error> {
        limits.check("proof", self.proof.len(), limits.proof_artifact)?;
        limits.check(
            "verification_method",
            self.verification_method.len(),
            limits.verification_method,
        )?;
        Ok(())
    }
}
