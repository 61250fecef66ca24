//! Per-mutation lifecycle state and the bounded history of resolved ids

use crate::types::ClientMutationId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Where a client mutation is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    /// Applied optimistically, awaiting the server
    Pending,
    /// Server accepted it; its canonical state is in the store
    Confirmed,
    /// Server refused it; the prior snapshot was restored
    Rejected,
    /// A newer remote change to the same record won
    SupersededByRemote,
    /// A later local gesture on the same record replaced it
    SupersededByLocal,
}

impl MutationState {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Superseded mutations never touch the store again
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::SupersededByRemote | Self::SupersededByLocal)
    }
}

impl fmt::Display for MutationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::SupersededByRemote => "superseded by remote",
            Self::SupersededByLocal => "superseded by local",
        };
        f.write_str(s)
    }
}

/// Resolved client mutation ids, oldest evicted first
#[derive(Debug, Clone)]
pub(crate) struct Ledger {
    states: HashMap<ClientMutationId, MutationState>,
    order: VecDeque<ClientMutationId>,
    limit: usize,
}

impl Ledger {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            states: HashMap::new(),
            order: VecDeque::new(),
            limit,
        }
    }

    pub(crate) fn get(&self, id: &ClientMutationId) -> Option<MutationState> {
        self.states.get(id).copied()
    }

    pub(crate) fn record(&mut self, id: ClientMutationId, state: MutationState) {
        if self.states.insert(id, state).is_none() {
            self.order.push_back(id);
        }
        while self.order.len() > self.limit {
            if let Some(evicted) = self.order.pop_front() {
                self.states.remove(&evicted);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }
}
