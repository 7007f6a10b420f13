use crate::*;

/// A candidate in an election, keyed by `(election, id)`.
///
/// Only `vote_tally` changes after creation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub election: ElectionId,
    pub id: CandidateId,
    pub name: String,
    pub manifesto: String,
    pub vote_tally: u64,
}

impl Candidate {
    pub fn new(election: ElectionId, id: CandidateId, name: &str, manifesto: &str) -> Self {
        Candidate {
            election,
            id,
            name: name.to_owned(),
            manifesto: manifesto.to_owned(),
            vote_tally: 0,
        }
    }

    /// Add one voter's weight to the tally.
    pub fn add_weight(&mut self, weight: Weight) -> Result<(), ElectionError> {
        self.vote_tally = self
            .vote_tally
            .checked_add(weight)
            .ok_or(ElectionError::Overflow)?;
        Ok(())
    }
}

/// Transaction 2: AddCandidate
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AddCandidateTransaction {
    pub caller: Principal,
    pub nonce: u64,

    pub election: ElectionId,
    pub name: String,
    pub manifesto: String,
}

impl AddCandidateTransaction {
    pub fn new(caller: Principal, election: ElectionId, name: &str, manifesto: &str) -> Self {
        AddCandidateTransaction {
            caller,
            nonce: rand::random(),
            election,
            name: name.to_owned(),
            manifesto: manifesto.to_owned(),
        }
    }
}

impl Signable for AddCandidateTransaction {
    fn caller(&self) -> Principal {
        self.caller
    }

    fn validate_tx(&self, limits: &Limits) -> Result<(), Error> {
        limits.check("name", self.name.len(), limits.candidate_name)?;
        limits.check("manifesto", self.manifesto.len(), limits.candidate_manifesto)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_accumulates_weight() {
        let mut candidate = Candidate::new(0, 0, "Alice", "Lower fees");
        assert_eq!(candidate.vote_tally, 0);

        candidate.add_weight(3).unwrap();
        candidate.add_weight(0).unwrap();
        candidate.add_weight(4).unwrap();
        assert_eq!(candidate.vote_tally, 7);

        assert_eq!(candidate.add_weight(u64::MAX), Err(ElectionError::Overflow));
        assert_eq!(candidate.vote_tally, 7);
    }

    #[test]
    fn manifesto_limit() {
        let limits = Limits::default();
        let tx = AddCandidateTransaction::new([2u8; 32].into(), 0, "Bob", &"m".repeat(501));
        assert!(matches!(
            tx.validate_tx(&limits),
            Err(Error::FieldTooLong {
                field: "manifesto",
                max: 500
            })
        ));
    }
}
