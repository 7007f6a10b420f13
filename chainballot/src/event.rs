use crate::*;

/// Notifications emitted after an operation commits.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    ElectionCreated {
        election: ElectionId,
        admin: Principal,
        height: BlockHeight,
    },
    CandidateAdded {
        election: ElectionId,
        candidate: CandidateId,
        height: BlockHeight,
    },
    VoterRegistered {
        election: ElectionId,
        voter: Principal,
        weight: Weight,
        height: BlockHeight,
    },
    VoteCast {
        election: ElectionId,
        candidate: CandidateId,
        voter: Principal,
        weight: Weight,
        height: BlockHeight,
    },
    IdentityVerified {
        principal: Principal,
        method: String,
        height: BlockHeight,
    },
}

/// An append-only destination for events
pub trait EventSink {
    fn emit(&mut self, event: Event);
}

/// Keeps every event in memory, in emission order
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}
