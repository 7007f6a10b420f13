use crate::*;

/// Who is calling, and at which block height.
///
/// The height is an input: the service never reads a clock of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Principal,
    pub height: BlockHeight,
}

impl CallContext {
    pub fn new(caller: Principal, height: BlockHeight) -> Self {
        CallContext { caller, height }
    }
}

// Result of the read-only half of an operation
struct Prepared<T> {
    changes: ChangeSet,
    event: Event,
    output: T,
}

/// The election engine.
///
/// Every operation reads its preconditions from the store, builds the complete
/// change set, and only then commits it. A failed precondition returns before
/// anything is written, so the store is left untouched.
pub struct ElectionService<S: Store = MemStore, E: EventSink = EventLog> {
    store: S,
    events: E,
    verifier: Box<dyn ProofVerifier + Send + Sync>,
    config: ServiceConfig,
}

impl Default for ElectionService {
    fn default() -> Self {
        ElectionService::new(MemStore::default(), EventLog::default())
    }
}

impl<S: Store, E: EventSink> ElectionService<S, E> {
    /// Create a service with the default policy and the accept-all proof verifier.
    pub fn new(store: S, events: E) -> Self {
        ElectionService {
            store,
            events,
            verifier: Box::new(AcceptAllVerifier),
            config: ServiceConfig::default(),
        }
    }

    /// Install a custom proof verifier, replacing the one selected by the config.
    pub fn with_verifier<V>(mut self, verifier: V) -> Self
    where
        V: ProofVerifier + Send + Sync + 'static,
    {
        self.verifier = Box::new(verifier);
        self
    }

    /// Set the policy and install the verifier it names.
    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.verifier = config.verifier.build();
        self.config = config;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn into_parts(self) -> (S, E) {
        (self.store, self.events)
    }

    /// Create an election administered by the caller and return its id.
    pub fn create_election(
        &mut self,
        ctx: &CallContext,
        name: &str,
        description: &str,
        registration_end_block: BlockHeight,
        start_block: BlockHeight,
        end_block: BlockHeight,
    ) -> Result<ElectionId, ElectionError> {
        let prepared = self.prepare_create_election(
            ctx,
            name,
            description,
            registration_end_block,
            start_block,
            end_block,
        );
        self.execute("create_election", ctx, prepared)
    }

    /// Add a candidate. Admin only, during registration.
    pub fn add_candidate(
        &mut self,
        ctx: &CallContext,
        election_id: ElectionId,
        name: &str,
        manifesto: &str,
    ) -> Result<CandidateId, ElectionError> {
        let prepared = self.prepare_add_candidate(ctx, election_id, name, manifesto);
        self.execute("add_candidate", ctx, prepared)
    }

    /// Register the caller as a voter with the given weight, during registration.
    pub fn register_voter(
        &mut self,
        ctx: &CallContext,
        election_id: ElectionId,
        weight: Weight,
    ) -> Result<(), ElectionError> {
        let prepared = self.prepare_register_voter(ctx, election_id, weight);
        self.execute("register_voter", ctx, prepared)
    }

    /// Cast the caller's vote, adding their weight to the candidate's tally.
    pub fn cast_vote(
        &mut self,
        ctx: &CallContext,
        election_id: ElectionId,
        candidate_id: CandidateId,
    ) -> Result<(), ElectionError> {
        let prepared = self.prepare_cast_vote(ctx, election_id, candidate_id);
        self.execute("cast_vote", ctx, prepared)
    }

    /// Record a verified identity for the caller if the proof checks out.
    ///
    /// With the default [`AcceptAllVerifier`] every call succeeds.
    pub fn verify_identity(
        &mut self,
        ctx: &CallContext,
        proof: &[u8],
        commitment: &[u8; 32],
        verification_method: &str,
    ) -> Result<(), ElectionError> {
        let prepared = self.prepare_verify_identity(ctx, proof, commitment, verification_method);
        self.execute("verify_identity", ctx, prepared)
    }

    // Lookups
    // -------

    pub fn election(&self, election_id: ElectionId) -> Option<Election> {
        self.store.get_election(election_id)
    }

    /// Number of elections ever created
    pub fn election_count(&self) -> u64 {
        self.store.next_election_id()
    }

    /// The phase of an election at the given height
    pub fn phase(&self, election_id: ElectionId, height: BlockHeight) -> Result<Phase, ElectionError> {
        let election = self
            .store
            .get_election(election_id)
            .ok_or(ElectionError::NotFound)?;
        Ok(election.phase(height))
    }

    pub fn candidate(&self, election_id: ElectionId, candidate_id: CandidateId) -> Option<Candidate> {
        self.store.get_candidate(election_id, candidate_id)
    }

    /// All candidates with their running tallies, ordered by id
    pub fn candidates(&self, election_id: ElectionId) -> Result<Vec<Candidate>, ElectionError> {
        if self.store.get_election(election_id).is_none() {
            return Err(ElectionError::NotFound);
        }
        Ok(self.store.get_candidates(election_id))
    }

    pub fn voter(&self, election_id: ElectionId, principal: &Principal) -> Option<Voter> {
        self.store.get_voter(election_id, principal)
    }

    pub fn attestation(&self, principal: &Principal) -> Option<Attestation> {
        self.store.get_attestation(principal)
    }

    pub fn is_verified(&self, principal: &Principal) -> bool {
        self.store
            .get_attestation(principal)
            .map(|a| a.verified)
            .unwrap_or(false)
    }

    fn execute<T>(
        &mut self,
        op: &'static str,
        ctx: &CallContext,
        prepared: Result<Prepared<T>, ElectionError>,
    ) -> Result<T, ElectionError> {
        match prepared {
            Ok(Prepared {
                changes,
                event,
                output,
            }) => {
                self.store.commit(changes);
                info!(
                    "chainballot: {} by {} committed at height {}",
                    op, ctx.caller, ctx.height
                );
                self.events.emit(event);
                Ok(output)
            }
            Err(err) => {
                debug!(
                    "chainballot: {} by {} rejected at height {}: {}",
                    op, ctx.caller, ctx.height, err
                );
                Err(err)
            }
        }
    }

    fn prepare_create_election(
        &self,
        ctx: &CallContext,
        name: &str,
        description: &str,
        registration_end_block: BlockHeight,
        start_block: BlockHeight,
        end_block: BlockHeight,
    ) -> Result<Prepared<ElectionId>, ElectionError> {
        let id = self.store.next_election_id();
        let election = Election::new(
            id,
            name,
            description,
            registration_end_block,
            start_block,
            end_block,
            ctx.caller,
        )?;
        let next = id.checked_add(1).ok_or(ElectionError::Overflow)?;

        let mut changes = ChangeSet::new();
        changes
            .push(StateChange::PutElection(election))
            .push(StateChange::SetNextElectionId { next });

        Ok(Prepared {
            changes,
            event: Event::ElectionCreated {
                election: id,
                admin: ctx.caller,
                height: ctx.height,
            },
            output: id,
        })
    }

    fn prepare_add_candidate(
        &self,
        ctx: &CallContext,
        election_id: ElectionId,
        name: &str,
        manifesto: &str,
    ) -> Result<Prepared<CandidateId>, ElectionError> {
        let mut election = self
            .store
            .get_election(election_id)
            .ok_or(ElectionError::NotFound)?;

        if ctx.caller != election.admin {
            return Err(ElectionError::Unauthorized);
        }
        election.check_registration_open(ctx.height)?;

        let candidate_id = election.allocate_candidate_id()?;
        let candidate = Candidate::new(election_id, candidate_id, name, manifesto);

        let mut changes = ChangeSet::new();
        changes
            .push(StateChange::PutCandidate(candidate))
            .push(StateChange::PutElection(election));

        Ok(Prepared {
            changes,
            event: Event::CandidateAdded {
                election: election_id,
                candidate: candidate_id,
                height: ctx.height,
            },
            output: candidate_id,
        })
    }

    fn prepare_register_voter(
        &self,
        ctx: &CallContext,
        election_id: ElectionId,
        weight: Weight,
    ) -> Result<Prepared<()>, ElectionError> {
        let mut election = self
            .store
            .get_election(election_id)
            .ok_or(ElectionError::NotFound)?;

        election.check_registration_open(ctx.height)?;

        if let Some(existing) = self.store.get_voter(election_id, &ctx.caller) {
            if existing.registered {
                return Err(ElectionError::AlreadyRegistered);
            }
        }

        if self.config.require_attestation && !self.is_verified(&ctx.caller) {
            return Err(ElectionError::Unauthorized);
        }

        election.record_voter()?;
        let voter = Voter::new(election_id, ctx.caller, weight);

        let mut changes = ChangeSet::new();
        changes
            .push(StateChange::PutVoter(voter))
            .push(StateChange::PutElection(election));

        Ok(Prepared {
            changes,
            event: Event::VoterRegistered {
                election: election_id,
                voter: ctx.caller,
                weight,
                height: ctx.height,
            },
            output: (),
        })
    }

    fn prepare_cast_vote(
        &self,
        ctx: &CallContext,
        election_id: ElectionId,
        candidate_id: CandidateId,
    ) -> Result<Prepared<()>, ElectionError> {
        let election = self
            .store
            .get_election(election_id)
            .ok_or(ElectionError::NotFound)?;
        let mut voter = self
            .store
            .get_voter(election_id, &ctx.caller)
            .ok_or(ElectionError::NotFound)?;
        let mut candidate = self
            .store
            .get_candidate(election_id, candidate_id)
            .ok_or(ElectionError::InvalidCandidate)?;

        election.check_voting_open(ctx.height)?;

        if !voter.registered {
            return Err(ElectionError::Unauthorized);
        }
        if voter.voted {
            return Err(ElectionError::AlreadyVoted);
        }

        candidate.add_weight(voter.weight)?;
        voter.mark_voted(ctx.height);

        let event = Event::VoteCast {
            election: election_id,
            candidate: candidate_id,
            voter: ctx.caller,
            weight: voter.weight,
            height: ctx.height,
        };

        let mut changes = ChangeSet::new();
        changes
            .push(StateChange::PutVoter(voter))
            .push(StateChange::PutCandidate(candidate));

        Ok(Prepared {
            changes,
            event,
            output: (),
        })
    }

    fn prepare_verify_identity(
        &self,
        ctx: &CallContext,
        proof: &[u8],
        commitment: &[u8; 32],
        verification_method: &str,
    ) -> Result<Prepared<()>, ElectionError> {
        if !self.verifier.is_valid_proof(proof, commitment) {
            return Err(ElectionError::Unauthorized);
        }

        let attestation = Attestation::new(ctx.caller, verification_method, ctx.height);

        let mut changes = ChangeSet::new();
        changes.push(StateChange::PutAttestation(attestation));

        Ok(Prepared {
            changes,
            event: Event::IdentityVerified {
                principal: ctx.caller,
                method: verification_method.to_owned(),
                height: ctx.height,
            },
            output: (),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(b: u8) -> Principal {
        [b; 32].into()
    }

    fn at(caller: u8, height: BlockHeight) -> CallContext {
        CallContext::new(principal(caller), height)
    }

    const ADMIN: u8 = 1;

    // registration ends at 10, voting runs 11..=20
    fn service_with_election() -> (ElectionService, ElectionId) {
        let mut service: ElectionService = ElectionService::default();
        let id = service
            .create_election(&at(ADMIN, 0), "Board", "Annual vote", 10, 11, 20)
            .unwrap();
        (service, id)
    }

    fn snapshot(service: &ElectionService) -> String {
        serde_json::to_string(service.store()).unwrap()
    }

    #[test]
    fn election_ids_strictly_increase() {
        let mut service: ElectionService = ElectionService::default();
        let mut last = None;
        for i in 0..5u8 {
            let id = service
                .create_election(&at(i, u64::from(i)), "e", "", 1, 2, 3)
                .unwrap();
            if let Some(prev) = last {
                assert!(id > prev);
            }
            last = Some(id);
        }
        assert_eq!(service.election_count(), 5);
        assert_eq!(last, Some(4));

        let e = service.election(2).unwrap();
        assert_eq!(e.admin, principal(2));
        assert!(e.registration_end_block < e.start_block && e.start_block < e.end_block);
    }

    #[test]
    fn create_election_rejects_bad_thresholds_without_consuming_an_id() {
        let mut service: ElectionService = ElectionService::default();
        let before = snapshot(&service);

        assert_eq!(
            service.create_election(&at(ADMIN, 0), "e", "", 10, 10, 20),
            Err(ElectionError::InvalidParameters)
        );
        assert_eq!(
            service.create_election(&at(ADMIN, 0), "e", "", 5, 11, 11),
            Err(ElectionError::InvalidParameters)
        );
        assert_eq!(snapshot(&service), before);
        assert!(service.events().is_empty());

        assert_eq!(
            service.create_election(&at(ADMIN, 0), "e", "", 10, 11, 20),
            Ok(0)
        );
    }

    #[test]
    fn candidate_ids_are_dense() {
        let (mut service, id) = service_with_election();
        for expected in 0..4 {
            let candidate = service
                .add_candidate(&at(ADMIN, 3), id, &format!("c{}", expected), "")
                .unwrap();
            assert_eq!(candidate, expected);
        }

        let election = service.election(id).unwrap();
        assert_eq!(election.candidate_count, 4);
        let ids: Vec<CandidateId> = service
            .candidates(id)
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert!(service.candidates(id).unwrap().iter().all(|c| c.vote_tally == 0));
    }

    #[test]
    fn add_candidate_precondition_order() {
        let (mut service, id) = service_with_election();

        assert_eq!(
            service.add_candidate(&at(ADMIN, 3), 99, "a", ""),
            Err(ElectionError::NotFound)
        );
        // Authorization is checked before the window
        assert_eq!(
            service.add_candidate(&at(2, 11), id, "a", ""),
            Err(ElectionError::Unauthorized)
        );
        assert_eq!(
            service.add_candidate(&at(2, 3), id, "a", ""),
            Err(ElectionError::Unauthorized)
        );
        assert_eq!(
            service.add_candidate(&at(ADMIN, 11), id, "a", ""),
            Err(ElectionError::RegistrationClosed)
        );
        assert_eq!(service.election(id).unwrap().candidate_count, 0);
    }

    #[test]
    fn registration_window_boundary() {
        let (mut service, id) = service_with_election();

        assert_eq!(service.add_candidate(&at(ADMIN, 10), id, "a", ""), Ok(0));
        assert_eq!(
            service.add_candidate(&at(ADMIN, 11), id, "b", ""),
            Err(ElectionError::RegistrationClosed)
        );

        assert_eq!(service.register_voter(&at(2, 10), id, 1), Ok(()));
        assert_eq!(
            service.register_voter(&at(3, 11), id, 1),
            Err(ElectionError::RegistrationClosed)
        );
    }

    #[test]
    fn register_voter_once() {
        let (mut service, id) = service_with_election();

        assert_eq!(
            service.register_voter(&at(2, 5), 42, 1),
            Err(ElectionError::NotFound)
        );

        service.register_voter(&at(2, 5), id, 7).unwrap();
        let before = snapshot(&service);
        assert_eq!(
            service.register_voter(&at(2, 6), id, 9),
            Err(ElectionError::AlreadyRegistered)
        );
        assert_eq!(snapshot(&service), before);

        let voter = service.voter(id, &principal(2)).unwrap();
        assert!(voter.registered);
        assert!(!voter.voted);
        assert_eq!(voter.weight, 7);
        assert_eq!(voter.vote_height, None);
        assert_eq!(service.election(id).unwrap().voter_count, 1);

        // The same principal may register in another election
        let other = service
            .create_election(&at(ADMIN, 5), "Other", "", 10, 11, 20)
            .unwrap();
        service.register_voter(&at(2, 6), other, 1).unwrap();
        assert_eq!(service.election(other).unwrap().voter_count, 1);
    }

    #[test]
    fn voting_window_boundary() {
        let (mut service, id) = service_with_election();
        service.add_candidate(&at(ADMIN, 1), id, "a", "").unwrap();
        for voter in 2..=5 {
            service.register_voter(&at(voter, 2), id, 1).unwrap();
        }

        assert_eq!(
            service.cast_vote(&at(2, 10), id, 0),
            Err(ElectionError::VotingNotStarted)
        );
        assert_eq!(service.cast_vote(&at(3, 11), id, 0), Ok(()));
        assert_eq!(service.cast_vote(&at(4, 20), id, 0), Ok(()));
        assert_eq!(
            service.cast_vote(&at(5, 21), id, 0),
            Err(ElectionError::VotingClosed)
        );
        assert_eq!(service.candidate(id, 0).unwrap().vote_tally, 2);
        assert_eq!(service.voter(id, &principal(4)).unwrap().vote_height, Some(20));
    }

    #[test]
    fn cast_vote_precondition_order() {
        let (mut service, id) = service_with_election();
        service.add_candidate(&at(ADMIN, 1), id, "a", "").unwrap();
        service.register_voter(&at(2, 2), id, 1).unwrap();

        assert_eq!(
            service.cast_vote(&at(2, 15), 9, 0),
            Err(ElectionError::NotFound)
        );
        // Unregistered voter is reported before a bad candidate or window
        assert_eq!(
            service.cast_vote(&at(3, 5), id, 7),
            Err(ElectionError::NotFound)
        );
        // Bad candidate is reported before the window
        assert_eq!(
            service.cast_vote(&at(2, 5), id, 7),
            Err(ElectionError::InvalidCandidate)
        );
        assert_eq!(
            service.cast_vote(&at(2, 5), id, 0),
            Err(ElectionError::VotingNotStarted)
        );
    }

    #[test]
    fn second_vote_fails_and_leaves_tally_alone() {
        let (mut service, id) = service_with_election();
        service.add_candidate(&at(ADMIN, 1), id, "a", "").unwrap();
        service.add_candidate(&at(ADMIN, 1), id, "b", "").unwrap();
        service.register_voter(&at(2, 2), id, 5).unwrap();

        service.cast_vote(&at(2, 12), id, 0).unwrap();
        let before = snapshot(&service);

        assert_eq!(
            service.cast_vote(&at(2, 13), id, 0),
            Err(ElectionError::AlreadyVoted)
        );
        assert_eq!(
            service.cast_vote(&at(2, 13), id, 1),
            Err(ElectionError::AlreadyVoted)
        );
        assert_eq!(snapshot(&service), before);
        assert_eq!(service.candidate(id, 0).unwrap().vote_tally, 5);
        assert_eq!(service.candidate(id, 1).unwrap().vote_tally, 0);
    }

    #[test]
    fn tally_is_sum_of_weights() {
        let (mut service, id) = service_with_election();
        service.add_candidate(&at(ADMIN, 1), id, "a", "").unwrap();
        service.add_candidate(&at(ADMIN, 1), id, "b", "").unwrap();

        let ballots: Vec<(u8, Weight, CandidateId)> =
            vec![(2, 3, 0), (3, 10, 1), (4, 0, 0), (5, 7, 0), (6, 1, 1)];
        for (voter, weight, _) in &ballots {
            service.register_voter(&at(*voter, 4), id, *weight).unwrap();
        }
        for (voter, _, candidate) in &ballots {
            service.cast_vote(&at(*voter, 15), id, *candidate).unwrap();
        }

        for candidate in service.candidates(id).unwrap() {
            let expected: Weight = ballots
                .iter()
                .filter(|(_, _, c)| *c == candidate.id)
                .map(|(_, w, _)| *w)
                .sum();
            assert_eq!(candidate.vote_tally, expected);
        }
    }

    #[test]
    fn tally_overflow_is_rejected_atomically() {
        let (mut service, id) = service_with_election();
        service.add_candidate(&at(ADMIN, 1), id, "a", "").unwrap();
        service.register_voter(&at(2, 2), id, u64::MAX).unwrap();
        service.register_voter(&at(3, 2), id, 1).unwrap();

        service.cast_vote(&at(2, 12), id, 0).unwrap();
        let before = snapshot(&service);
        assert_eq!(
            service.cast_vote(&at(3, 12), id, 0),
            Err(ElectionError::Overflow)
        );
        assert_eq!(snapshot(&service), before);
        assert!(!service.voter(id, &principal(3)).unwrap().voted);
    }

    #[test]
    fn verify_identity_overwrites() {
        let mut service: ElectionService = ElectionService::default();
        let me = at(2, 4);

        service
            .verify_identity(&me, b"proof-1", &[0u8; 32], "zk-passport")
            .unwrap();
        assert!(service.is_verified(&principal(2)));
        assert!(!service.is_verified(&principal(3)));

        service
            .verify_identity(&at(2, 9), b"", &[1u8; 32], "kyc")
            .unwrap();
        let attestation = service.attestation(&principal(2)).unwrap();
        assert!(attestation.verified);
        assert_eq!(attestation.verification_method, "kyc");
        assert_eq!(attestation.verification_height, 9);

        assert_eq!(
            service.events().last(),
            Some(&Event::IdentityVerified {
                principal: principal(2),
                method: "kyc".to_owned(),
                height: 9,
            })
        );
    }

    #[test]
    fn rejected_proof_is_unauthorized() {
        let mut service: ElectionService = ElectionService::default().with_verifier(Sha256CommitmentVerifier);
        let before = snapshot(&service);

        assert_eq!(
            service.verify_identity(&at(2, 1), b"wrong", &[0u8; 32], "hash"),
            Err(ElectionError::Unauthorized)
        );
        assert_eq!(snapshot(&service), before);
        assert!(service.events().is_empty());
        assert!(service.attestation(&principal(2)).is_none());
    }

    #[test]
    fn registration_ignores_attestations_by_default() {
        let (mut service, id) = service_with_election();
        assert!(!service.config().require_attestation);
        assert!(!service.is_verified(&principal(2)));
        assert_eq!(service.register_voter(&at(2, 1), id, 1), Ok(()));
    }

    #[test]
    fn registration_can_require_attestation() {
        let mut service: ElectionService = ElectionService::default().with_config(ServiceConfig {
            require_attestation: true,
            ..ServiceConfig::default()
        });
        let id = service
            .create_election(&at(ADMIN, 0), "e", "", 10, 11, 20)
            .unwrap();

        assert_eq!(
            service.register_voter(&at(2, 1), id, 1),
            Err(ElectionError::Unauthorized)
        );
        service
            .verify_identity(&at(2, 2), b"p", &[0u8; 32], "zk")
            .unwrap();
        assert_eq!(service.register_voter(&at(2, 3), id, 1), Ok(()));
    }

    #[test]
    fn phase_lookup() {
        let (service, id) = service_with_election();
        assert_eq!(service.phase(id, 10), Ok(Phase::Registration));
        assert_eq!(service.phase(id, 11), Ok(Phase::Voting));
        assert_eq!(service.phase(id, 21), Ok(Phase::Closed));
        assert_eq!(service.phase(id + 1, 0), Err(ElectionError::NotFound));
        assert_eq!(service.candidates(id + 1), Err(ElectionError::NotFound));
    }

    #[test]
    fn events_follow_commits() {
        let (mut service, id) = service_with_election();
        service.add_candidate(&at(ADMIN, 1), id, "a", "").unwrap();
        service.register_voter(&at(2, 2), id, 3).unwrap();
        let _ = service.register_voter(&at(2, 2), id, 3);
        service.cast_vote(&at(2, 11), id, 0).unwrap();

        let events = service.events().events();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], Event::ElectionCreated { election: 0, .. }));
        assert!(matches!(events[1], Event::CandidateAdded { candidate: 0, .. }));
        assert!(matches!(events[2], Event::VoterRegistered { weight: 3, .. }));
        assert!(matches!(
            events[3],
            Event::VoteCast {
                weight: 3,
                height: 11,
                ..
            }
        ));
    }
}
