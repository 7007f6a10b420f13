use crate::*;

/// A voter's registration in one election, keyed by `(election, principal)`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Voter {
    pub election: ElectionId,
    pub principal: Principal,
    pub registered: bool,
    pub voted: bool,

    /// Fixed at registration; added to the chosen candidate's tally
    pub weight: Weight,

    /// Block height of the vote, once cast
    pub vote_height: Option<BlockHeight>,
}

impl Voter {
    pub fn new(election: ElectionId, principal: Principal, weight: Weight) -> Self {
        Voter {
            election,
            principal,
            registered: true,
            voted: false,
            weight,
            vote_height: None,
        }
    }

    pub fn mark_voted(&mut self, height: BlockHeight) {
        self.voted = true;
        self.vote_height = Some(height);
    }
}

/// Transaction 3: RegisterVoter
///
/// The weight is chosen by the caller and is not checked against any stake or identity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RegisterVoterTransaction {
    pub caller: Principal,
    pub nonce: u64,

    pub election: ElectionId,
    pub weight: Weight,
}

impl RegisterVoterTransaction {
    pub fn new(caller: Principal, election: ElectionId, weight: Weight) -> Self {
        RegisterVoterTransaction {
            caller,
            nonce: rand::random(),
            election,
            weight,
        }
    }
}

impl Signable for RegisterVoterTransaction {
    fn caller(&self) -> Principal {
        self.caller
    }

    fn validate_tx(&self, _limits: &Limits) -> Result<(), Error> {
        Ok(())
    }
}

/// Transaction 4: CastVote
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CastVoteTransaction {
    pub caller: Principal,
    pub nonce: u64,

    pub election: ElectionId,
    pub candidate: CandidateId,
}

impl CastVoteTransaction {
    pub fn new(caller: Principal, election: ElectionId, candidate: CandidateId) -> Self {
        CastVoteTransaction {
            caller,
            nonce: rand::random(),
            election,
            candidate,
        }
    }
}

impl Signable for CastVoteTransaction {
    fn caller(&self) -> Principal {
        self.caller
    }

    fn validate_tx(&self, _limits: &Limits) -> Result<(), Error> {
        Ok(())
    }
}
