use crate::*;

/// Maximum lengths enforced on transaction fields before they reach the election service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Limits {
    pub election_name: usize,
    pub election_description: usize,
    pub candidate_name: usize,
    pub candidate_manifesto: usize,
    pub verification_method: usize,
    pub proof_artifact: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            election_name: 100,
            election_description: 500,
            candidate_name: 100,
            candidate_manifesto: 500,
            verification_method: 50,
            proof_artifact: 1024,
        }
    }
}

impl Limits {
    /// Check a field against its cap. Text is measured in bytes.
    pub fn check(&self, field: &'static str, len: usize, max: usize) -> Result<(), Error> {
        if len > max {
            return Err(Error::FieldTooLong { field, max });
        }
        Ok(())
    }
}

/// Policy switches for the election service.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    /// When set, `register_voter` requires the caller to hold a verified identity
    /// attestation and fails with `Unauthorized` otherwise.
    ///
    /// Off by default: registration does not consult the attestation store.
    pub require_attestation: bool,

    /// Proof verifier installed for `verify_identity`
    pub verifier: VerifierKind,
}

/// The built-in proof verifiers, selectable from configuration
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerifierKind {
    /// [`AcceptAllVerifier`]. Provides no security.
    AcceptAll,
    Sha256Commitment,
}

impl Default for VerifierKind {
    fn default() -> Self {
        VerifierKind::AcceptAll
    }
}

impl VerifierKind {
    pub fn build(self) -> Box<dyn ProofVerifier + Send + Sync> {
        match self {
            VerifierKind::AcceptAll => Box::new(AcceptAllVerifier),
            VerifierKind::Sha256Commitment => Box::new(Sha256CommitmentVerifier),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub limits: Limits,
    pub service: ServiceConfig,
}

impl Config {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json(bytes: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
