use crate::*;
use std::collections::BTreeMap;
use std::convert::TryFrom;

/// A single write produced by an election service operation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateChange {
    PutElection(Election),
    PutCandidate(Candidate),
    PutVoter(Voter),
    PutAttestation(Attestation),
    SetNextElectionId { next: ElectionId },
}

/// The writes of one operation, committed together.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<StateChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        ChangeSet::default()
    }

    pub fn push(&mut self, change: StateChange) -> &mut Self {
        self.changes.push(change);
        self
    }

    pub fn changes(&self) -> &[StateChange] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl IntoIterator for ChangeSet {
    type Item = StateChange;
    type IntoIter = std::vec::IntoIter<StateChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

/// Storage for the four record families and the election id counter
pub trait Store {
    /// The id the next created election will receive
    fn next_election_id(&self) -> ElectionId;

    fn get_election(&self, id: ElectionId) -> Option<Election>;

    fn get_candidate(&self, election: ElectionId, candidate: CandidateId) -> Option<Candidate>;

    /// All candidates of an election, ordered by id
    fn get_candidates(&self, election: ElectionId) -> Vec<Candidate>;

    fn get_voter(&self, election: ElectionId, voter: &Principal) -> Option<Voter>;

    fn get_attestation(&self, principal: &Principal) -> Option<Attestation>;

    /// Apply every change in the set. Implementations must make the whole set
    /// visible at once or not at all.
    fn commit(&mut self, changes: ChangeSet);
}

/// A simple store that uses in-memory BTreeMaps
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct MemStore {
    next_election_id: ElectionId,
    elections: BTreeMap<ElectionId, Election>,

    // Candidate ids are dense, so the id is the index
    candidates: BTreeMap<ElectionId, Vec<Candidate>>,
    voters: BTreeMap<ElectionId, BTreeMap<Principal, Voter>>,
    attestations: BTreeMap<Principal, Attestation>,
}

impl MemStore {
    pub fn elections(&self) -> impl Iterator<Item = &Election> {
        self.elections.values()
    }

    pub fn voters(&self, election: ElectionId) -> impl Iterator<Item = &Voter> {
        self.voters.get(&election).into_iter().flat_map(|v| v.values())
    }

    fn apply(&mut self, change: StateChange) {
        match change {
            StateChange::PutElection(election) => {
                self.elections.insert(election.id, election);
            }
            StateChange::PutCandidate(candidate) => {
                let list = self.candidates.entry(candidate.election).or_default();
                let slot = usize::try_from(candidate.id)
                    .ok()
                    .and_then(|index| list.get_mut(index));
                match slot {
                    Some(slot) => *slot = candidate,
                    None => list.push(candidate),
                }
            }
            StateChange::PutVoter(voter) => {
                self.voters
                    .entry(voter.election)
                    .or_default()
                    .insert(voter.principal, voter);
            }
            StateChange::PutAttestation(attestation) => {
                self.attestations
                    .insert(attestation.principal, attestation);
            }
            StateChange::SetNextElectionId { next } => {
                self.next_election_id = next;
            }
        }
    }
}

impl Store for MemStore {
    fn next_election_id(&self) -> ElectionId {
        self.next_election_id
    }

    fn get_election(&self, id: ElectionId) -> Option<Election> {
        self.elections.get(&id).cloned()
    }

    fn get_candidate(&self, election: ElectionId, candidate: CandidateId) -> Option<Candidate> {
        self.candidates
            .get(&election)
            .and_then(|list| list.get(usize::try_from(candidate).ok()?))
            .cloned()
    }

    fn get_candidates(&self, election: ElectionId) -> Vec<Candidate> {
        self.candidates.get(&election).cloned().unwrap_or_default()
    }

    fn get_voter(&self, election: ElectionId, voter: &Principal) -> Option<Voter> {
        self.voters
            .get(&election)
            .and_then(|voters| voters.get(voter))
            .cloned()
    }

    fn get_attestation(&self, principal: &Principal) -> Option<Attestation> {
        self.attestations.get(principal).cloned()
    }

    // Applying to a MemStore cannot fail, so a partially applied set is never observed
    // by anyone holding `&self`.
    fn commit(&mut self, changes: ChangeSet) {
        for change in changes {
            self.apply(change);
        }
    }
}
