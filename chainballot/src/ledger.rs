use crate::*;
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

/// What a committed transaction produced
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Outcome {
    ElectionCreated(ElectionId),
    CandidateAdded(CandidateId),
    VoterRegistered,
    VoteCast,
    IdentityVerified,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub id: TransactionId,
    pub transaction_type: TransactionType,
    pub caller: Principal,
    pub height: BlockHeight,
    pub outcome: Outcome,
}

/// Serializable state of an in-memory ledger
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub height: BlockHeight,
    pub applied: BTreeSet<TransactionId>,
    pub store: MemStore,
    pub events: EventLog,

    /// Policy the ledger was created with. It travels with the state.
    #[serde(default)]
    pub service: ServiceConfig,
}

/// The host execution environment.
///
/// Accepts signed transactions one at a time, checks them at the boundary
/// (height, signature, field limits, replay) and hands them to the election
/// service with the signer as caller.
///
/// The height only moves forward. Once a transaction passes the boundary
/// checks the ledger height advances to its height, even if the election
/// service then rejects it; records and the applied set are left untouched.
pub struct Ledger<S: Store = MemStore, E: EventSink = EventLog> {
    service: ElectionService<S, E>,
    limits: Limits,
    height: BlockHeight,
    applied: BTreeSet<TransactionId>,
}

impl Ledger {
    pub fn new(config: &Config) -> Self {
        let snapshot = LedgerSnapshot {
            service: config.service.clone(),
            ..LedgerSnapshot::default()
        };
        Ledger::from_snapshot(snapshot, config)
    }

    /// Restore a ledger. The service policy comes from the snapshot, only the
    /// boundary limits are taken from `config`.
    pub fn from_snapshot(snapshot: LedgerSnapshot, config: &Config) -> Self {
        let service = ElectionService::new(snapshot.store, snapshot.events)
            .with_config(snapshot.service);
        Ledger {
            service,
            limits: config.limits.clone(),
            height: snapshot.height,
            applied: snapshot.applied,
        }
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            height: self.height,
            applied: self.applied.clone(),
            store: self.service.store().clone(),
            events: self.service.events().clone(),
            service: self.service.config().clone(),
        }
    }
}

impl<S: Store, E: EventSink> Ledger<S, E> {
    pub fn with_service(service: ElectionService<S, E>, limits: Limits) -> Self {
        Ledger {
            service,
            limits,
            height: 0,
            applied: BTreeSet::new(),
        }
    }

    pub fn with_verifier<V>(mut self, verifier: V) -> Self
    where
        V: ProofVerifier + Send + Sync + 'static,
    {
        self.service = self.service.with_verifier(verifier);
        self
    }

    /// Highest height of any transaction that passed the boundary checks
    pub fn height(&self) -> BlockHeight {
        self.height
    }

    pub fn service(&self) -> &ElectionService<S, E> {
        &self.service
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn is_applied(&self, id: &TransactionId) -> bool {
        self.applied.contains(id)
    }

    /// Apply a signed transaction at the given block height
    pub fn submit(
        &mut self,
        tx: &SignedTransaction,
        height: BlockHeight,
    ) -> Result<Receipt, Error> {
        if height < self.height {
            warn!(
                "chainballot: rejecting {} transaction at height {} behind ledger height {}",
                tx.transaction_type(),
                height,
                self.height
            );
            return Err(Error::HeightRegression {
                current: self.height,
                requested: height,
            });
        }

        if let Err(e) = tx.validate(&self.limits) {
            warn!(
                "chainballot: rejecting {} transaction from {}: {}",
                tx.transaction_type(),
                tx.caller(),
                e
            );
            return Err(e);
        }

        let id = tx.id()?;
        if self.applied.contains(&id) {
            warn!("chainballot: rejecting replayed transaction {}", id);
            return Err(Error::DuplicateTransaction(id));
        }

        self.height = height;

        let ctx = CallContext::new(tx.caller(), height);
        let outcome = match tx {
            SignedTransaction::CreateElection(signed) => {
                Outcome::ElectionCreated(self.service.create_election(
                    &ctx,
                    &signed.name,
                    &signed.description,
                    signed.registration_end_block,
                    signed.start_block,
                    signed.end_block,
                )?)
            }
            SignedTransaction::AddCandidate(signed) => Outcome::CandidateAdded(
                self.service
                    .add_candidate(&ctx, signed.election, &signed.name, &signed.manifesto)?,
            ),
            SignedTransaction::RegisterVoter(signed) => {
                self.service
                    .register_voter(&ctx, signed.election, signed.weight)?;
                Outcome::VoterRegistered
            }
            SignedTransaction::CastVote(signed) => {
                self.service
                    .cast_vote(&ctx, signed.election, signed.candidate)?;
                Outcome::VoteCast
            }
            SignedTransaction::VerifyIdentity(signed) => {
                self.service.verify_identity(
                    &ctx,
                    &signed.proof,
                    &signed.commitment,
                    &signed.verification_method,
                )?;
                Outcome::IdentityVerified
            }
        };

        self.applied.insert(id);

        Ok(Receipt {
            id,
            transaction_type: tx.transaction_type(),
            caller: ctx.caller,
            height,
            outcome,
        })
    }
}

/// A ledger shared between threads.
///
/// Submissions hold the write lock for the whole operation, so writes are
/// serialized. Reads hold the read lock and see a consistent snapshot.
pub struct SharedLedger<S: Store = MemStore, E: EventSink = EventLog> {
    inner: Arc<RwLock<Ledger<S, E>>>,
}

impl<S: Store, E: EventSink> Clone for SharedLedger<S, E> {
    fn clone(&self) -> Self {
        SharedLedger {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store, E: EventSink> SharedLedger<S, E> {
    pub fn new(ledger: Ledger<S, E>) -> Self {
        SharedLedger {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    pub fn submit(
        &self,
        tx: &SignedTransaction,
        height: BlockHeight,
    ) -> Result<Receipt, Error> {
        let mut ledger = self.inner.write().map_err(|_| Error::LockPoisoned)?;
        ledger.submit(tx, height)
    }

    /// Run a read-only query against the ledger
    pub fn read<F, R>(&self, f: F) -> Result<R, Error>
    where
        F: FnOnce(&Ledger<S, E>) -> R,
    {
        let ledger = self.inner.read().map_err(|_| Error::LockPoisoned)?;
        Ok(f(&ledger))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SecretKey;

    struct Account {
        secret: SecretKey,
        principal: Principal,
    }

    fn account() -> Account {
        let (secret, public) = generate_keypair();
        Account {
            secret,
            principal: Principal::from(&public),
        }
    }

    fn sign<T: Signable>(account: &Account, tx: T) -> SignedTransaction
    where
        SignedTransaction: From<Signed<T>>,
    {
        Signed::sign(&account.secret, tx).unwrap().into()
    }

    fn create(admin: &Account) -> SignedTransaction {
        sign(
            admin,
            CreateElectionTransaction::new(admin.principal, "Board", "", 10, 11, 20),
        )
    }

    #[test]
    fn submit_returns_receipts() {
        let admin = account();
        let mut ledger = Ledger::new(&Config::default());

        let receipt = ledger.submit(&create(&admin), 1).unwrap();
        assert_eq!(receipt.outcome, Outcome::ElectionCreated(0));
        assert_eq!(receipt.transaction_type, TransactionType::Election);
        assert_eq!(receipt.caller, admin.principal);
        assert_eq!(ledger.height(), 1);
        assert!(ledger.is_applied(&receipt.id));

        let add = sign(
            &admin,
            AddCandidateTransaction::new(admin.principal, 0, "Alice", "Lower fees"),
        );
        let receipt = ledger.submit(&add, 2).unwrap();
        assert_eq!(receipt.outcome, Outcome::CandidateAdded(0));
        assert_eq!(ledger.service().election(0).unwrap().admin, admin.principal);
    }

    #[test]
    fn replay_is_rejected() {
        let admin = account();
        let mut ledger = Ledger::new(&Config::default());
        let tx = create(&admin);

        let receipt = ledger.submit(&tx, 1).unwrap();
        match ledger.submit(&tx, 2) {
            Err(Error::DuplicateTransaction(id)) => assert_eq!(id, receipt.id),
            other => panic!("expected duplicate, got {:?}", other),
        }
        assert_eq!(ledger.service().election_count(), 1);
        assert_eq!(ledger.height(), 1);

        // Same intent with a fresh nonce is a new transaction
        ledger.submit(&create(&admin), 2).unwrap();
        assert_eq!(ledger.service().election_count(), 2);
    }

    #[test]
    fn height_cannot_go_backwards() {
        let admin = account();
        let mut ledger = Ledger::new(&Config::default());
        ledger.submit(&create(&admin), 5).unwrap();

        assert!(matches!(
            ledger.submit(&create(&admin), 4),
            Err(Error::HeightRegression {
                current: 5,
                requested: 4
            })
        ));
        // Several transactions may share a block
        ledger.submit(&create(&admin), 5).unwrap();
    }

    #[test]
    fn forged_caller_is_rejected() {
        let admin = account();
        let mallory = account();
        let mut ledger = Ledger::new(&Config::default());
        ledger.submit(&create(&admin), 1).unwrap();

        // Mallory signs a transaction claiming to be the admin
        let tx = AddCandidateTransaction::new(admin.principal, 0, "Mallory", "");
        let bytes = Signable::as_bytes(&tx).unwrap();
        let expanded: ed25519_dalek::ExpandedSecretKey = (&mallory.secret).into();
        let sig = expanded.sign(&bytes, &mallory.principal.public_key().unwrap());
        let forged: SignedTransaction = Signed { tx, sig }.into();

        assert!(matches!(
            ledger.submit(&forged, 2),
            Err(Error::SignatureError(_))
        ));
        assert_eq!(ledger.service().election(0).unwrap().candidate_count, 0);
    }

    #[test]
    fn limits_are_enforced_before_the_service() {
        let admin = account();
        let config = Config {
            limits: Limits {
                election_name: 3,
                ..Limits::default()
            },
            ..Config::default()
        };
        let mut ledger = Ledger::new(&config);

        assert!(matches!(
            ledger.submit(&create(&admin), 1),
            Err(Error::FieldTooLong { field: "name", max: 3 })
        ));
        assert_eq!(ledger.service().election_count(), 0);
        assert_eq!(ledger.height(), 0);
    }

    #[test]
    fn core_failure_leaves_records_untouched() {
        let admin = account();
        let voter = account();
        let mut ledger = Ledger::new(&Config::default());
        ledger.submit(&create(&admin), 1).unwrap();

        let before = ledger.snapshot();
        let late = sign(&voter, RegisterVoterTransaction::new(voter.principal, 0, 1));
        let err = ledger.submit(&late, 11).unwrap_err();
        assert_eq!(err.election_error(), Some(ElectionError::RegistrationClosed));

        let after = ledger.snapshot();
        assert_eq!(
            serde_json::to_string(&after.store).unwrap(),
            serde_json::to_string(&before.store).unwrap()
        );
        assert_eq!(after.events, before.events);
        assert_eq!(after.applied, before.applied);
        assert_eq!(after.height, 11);

        // The same transaction is not marked as applied and may still be retried
        let retry = ledger.submit(&late, 11).unwrap_err();
        assert_eq!(
            retry.election_error(),
            Some(ElectionError::RegistrationClosed)
        );
    }

    #[test]
    fn rejected_call_still_advances_height() {
        let admin = account();
        let voter = account();
        let mut ledger = Ledger::new(&Config::default());
        ledger.submit(&create(&admin), 1).unwrap();

        // Registration closed at 10; going back to 10 must not reopen it
        let late = sign(&voter, RegisterVoterTransaction::new(voter.principal, 0, 1));
        assert_eq!(
            ledger.submit(&late, 11).unwrap_err().election_error(),
            Some(ElectionError::RegistrationClosed)
        );
        assert!(matches!(
            ledger.submit(&late, 10),
            Err(Error::HeightRegression {
                current: 11,
                requested: 10
            })
        ));
        assert!(ledger.service().voter(0, &voter.principal).is_none());
    }

    #[test]
    fn closed_voting_stays_closed() {
        let admin = account();
        let voter = account();
        let mut ledger = Ledger::new(&Config::default());
        ledger.submit(&create(&admin), 1).unwrap();
        ledger
            .submit(
                &sign(&admin, AddCandidateTransaction::new(admin.principal, 0, "A", "")),
                2,
            )
            .unwrap();
        ledger
            .submit(
                &sign(&voter, RegisterVoterTransaction::new(voter.principal, 0, 2)),
                3,
            )
            .unwrap();

        let vote = sign(&voter, CastVoteTransaction::new(voter.principal, 0, 0));
        assert_eq!(
            ledger.submit(&vote, 21).unwrap_err().election_error(),
            Some(ElectionError::VotingClosed)
        );
        assert!(matches!(
            ledger.submit(&vote, 20),
            Err(Error::HeightRegression { .. })
        ));
        assert_eq!(ledger.service().candidate(0, 0).unwrap().vote_tally, 0);
    }

    #[test]
    fn snapshot_keeps_service_policy() {
        let config = Config {
            service: ServiceConfig {
                require_attestation: true,
                verifier: VerifierKind::Sha256Commitment,
            },
            ..Config::default()
        };
        let admin = account();
        let voter = account();
        let mut ledger = Ledger::new(&config);
        ledger.submit(&create(&admin), 1).unwrap();

        // Restoring with a default config must not relax the policy
        let mut restored = Ledger::from_snapshot(ledger.snapshot(), &Config::default());
        assert_eq!(restored.service().config(), &config.service);

        let register = sign(&voter, RegisterVoterTransaction::new(voter.principal, 0, 1));
        assert_eq!(
            restored.submit(&register, 2).unwrap_err().election_error(),
            Some(ElectionError::Unauthorized)
        );

        let bogus = sign(
            &voter,
            VerifyIdentityTransaction::new(voter.principal, b"proof".to_vec(), [0u8; 32], "sha256"),
        );
        assert_eq!(
            restored.submit(&bogus, 3).unwrap_err().election_error(),
            Some(ElectionError::Unauthorized)
        );
    }

    #[test]
    fn snapshot_restores_state() {
        let admin = account();
        let mut ledger = Ledger::new(&Config::default());
        let tx = create(&admin);
        ledger.submit(&tx, 3).unwrap();

        let json = serde_json::to_string(&ledger.snapshot()).unwrap();
        let snapshot: LedgerSnapshot = serde_json::from_str(&json).unwrap();
        let mut restored = Ledger::from_snapshot(snapshot, &Config::default());

        assert_eq!(restored.height(), 3);
        assert_eq!(restored.service().election_count(), 1);
        assert_eq!(restored.service().events().len(), 1);
        assert!(matches!(
            restored.submit(&tx, 3),
            Err(Error::DuplicateTransaction(_))
        ));
    }

    #[test]
    fn shared_ledger_readers_see_consistent_tallies() {
        let admin = account();
        let voters: Vec<Account> = (0..20).map(|_| account()).collect();

        let mut ledger = Ledger::new(&Config::default());
        ledger.submit(&create(&admin), 1).unwrap();
        ledger
            .submit(
                &sign(&admin, AddCandidateTransaction::new(admin.principal, 0, "A", "")),
                1,
            )
            .unwrap();
        for (i, v) in voters.iter().enumerate() {
            let tx = sign(v, RegisterVoterTransaction::new(v.principal, 0, i as u64 + 1));
            ledger.submit(&tx, 2).unwrap();
        }

        let votes: Vec<SignedTransaction> = voters
            .iter()
            .map(|v| sign(v, CastVoteTransaction::new(v.principal, 0, 0)))
            .collect();

        let shared = SharedLedger::new(ledger);

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let (tally, voted_weight) = shared
                            .read(|l| {
                                let tally = l.service().candidate(0, 0).unwrap().vote_tally;
                                let voted: u64 = l
                                    .service()
                                    .store()
                                    .voters(0)
                                    .filter(|v| v.voted)
                                    .map(|v| v.weight)
                                    .sum();
                                (tally, voted)
                            })
                            .unwrap();
                        assert_eq!(tally, voted_weight);
                    }
                })
            })
            .collect();

        let writer = {
            let shared = shared.clone();
            std::thread::spawn(move || {
                for vote in &votes {
                    shared.submit(vote, 15).unwrap();
                }
            })
        };

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }

        let total = shared
            .read(|l| l.service().candidate(0, 0).unwrap().vote_tally)
            .unwrap();
        assert_eq!(total, (1..=20).sum::<u64>());
    }
}
