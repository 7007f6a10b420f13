use crate::*;

/// Advisory label stored at creation. Never updated; use [`Election::phase`] instead.
pub const ELECTION_STATUS_CREATED: &str = "created";

/// An election record.
///
/// The three block thresholds satisfy `registration_end_block < start_block < end_block`,
/// checked once at creation. `admin` and the thresholds never change afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Election {
    pub id: ElectionId,
    pub name: String,
    pub description: String,
    pub registration_end_block: BlockHeight,
    pub start_block: BlockHeight,
    pub end_block: BlockHeight,
    pub admin: Principal,

    /// Number of candidates, and the id the next candidate will receive
    pub candidate_count: u64,
    pub voter_count: u64,

    /// Informational only. The phase is derived from block height on every call.
    pub status: String,
}

/// The phase of an election, derived from the current block height.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Registration,
    Pending,
    Voting,
    Closed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Phase::Registration => "registration",
            Phase::Pending => "pending",
            Phase::Voting => "voting",
            Phase::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}

impl Election {
    /// Create a new election record with both counters at zero.
    ///
    /// Fails with `InvalidParameters` unless
    /// `registration_end_block < start_block < end_block`.
    pub fn new(
        id: ElectionId,
        name: &str,
        description: &str,
        registration_end_block: BlockHeight,
        start_block: BlockHeight,
        end_block: BlockHeight,
        admin: Principal,
    ) -> Result<Self, ElectionError> {
        if registration_end_block >= start_block || start_block >= end_block {
            return Err(ElectionError::InvalidParameters);
        }

        Ok(Election {
            id,
            name: name.to_owned(),
            description: description.to_owned(),
            registration_end_block,
            start_block,
            end_block,
            admin,
            candidate_count: 0,
            voter_count: 0,
            status: ELECTION_STATUS_CREATED.to_owned(),
        })
    }

    pub fn phase(&self, height: BlockHeight) -> Phase {
        if height <= self.registration_end_block {
            Phase::Registration
        } else if height < self.start_block {
            Phase::Pending
        } else if height <= self.end_block {
            Phase::Voting
        } else {
            Phase::Closed
        }
    }

    pub fn check_registration_open(&self, height: BlockHeight) -> Result<(), ElectionError> {
        if height > self.registration_end_block {
            return Err(ElectionError::RegistrationClosed);
        }
        Ok(())
    }

    /// Start is checked before end, so a height before the window reports `VotingNotStarted`.
    pub fn check_voting_open(&self, height: BlockHeight) -> Result<(), ElectionError> {
        if height < self.start_block {
            return Err(ElectionError::VotingNotStarted);
        }
        if height > self.end_block {
            return Err(ElectionError::VotingClosed);
        }
        Ok(())
    }

    /// Hand out the next candidate id and advance the candidate counter.
    pub fn allocate_candidate_id(&mut self) -> Result<CandidateId, ElectionError> {
        let id = self.candidate_count;
        self.candidate_count = id.checked_add(1).ok_or(ElectionError::Overflow)?;
        Ok(id)
    }

    pub fn record_voter(&mut self) -> Result<(), ElectionError> {
        self.voter_count = self
            .voter_count
            .checked_add(1)
            .ok_or(ElectionError::Overflow)?;
        Ok(())
    }
}

/// Transaction 1: CreateElection
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CreateElectionTransaction {
    /// The creator, who becomes the election admin
    pub caller: Principal,
    pub nonce: u64,

    pub name: String,
    pub description: String,
    pub registration_end_block: BlockHeight,
    pub start_block: BlockHeight,
    pub end_block: BlockHeight,
}

impl CreateElectionTransaction {
    pub fn new(
        caller: Principal,
        name: &str,
        description: &str,
        registration_end_block: BlockHeight,
        start_block: BlockHeight,
        end_block: BlockHeight,
    ) -> Self {
        CreateElectionTransaction {
            caller,
            nonce: rand::random(),
            name: name.to_owned(),
            description: description.to_owned(),
            registration_end_block,
            start_block,
            end_block,
        }
    }
}

impl Signable for CreateElectionTransaction {
    fn caller(&self) -> Principal {
        self.caller
    }

    fn validate_tx(&self, limits: &Limits) -> Result<(), Error> {
        limits.check("name", self.name.len(), limits.election_name)?;
        limits.check(
            "description",
            self.description.len(),
            limits.election_description,
        )?;
        Ok(())
    }
}
