//! Mutation reconciliation
//!
//! [`MutationReconciler`] owns a [`BoardStore`] and is the only thing that
//! mutates it. Three sources feed it:
//!
//! - [`apply_optimistic`](MutationReconciler::apply_optimistic) for local
//!   gestures, before the request is sent
//! - [`apply_authoritative`](MutationReconciler::apply_authoritative) and
//!   [`reject_optimistic`](MutationReconciler::reject_optimistic) when that
//!   request resolves
//! - [`apply_remote`](MutationReconciler::apply_remote) for real-time events
//!
//! Each local mutation is tracked under its [`ClientMutationId`] and moves
//! through [`MutationState`]. At most one mutation per target is pending at a
//! time; a later gesture on the same target supersedes the earlier one and
//! inherits its snapshot, so rollback always lands on the last state the
//! server agreed with.
//!
//! A remote event for a target whose pending mutation was issued after the
//! event's server timestamp is buffered until that mutation resolves.
//!
//! A local column deletion swallows pending moves of the tasks it removes.
//! Their snapshots travel with the deletion, so rolling it back puts each
//! task where the server last had it.

mod ledger;
mod snapshot;

pub use ledger::MutationState;

use crate::error::{Result, SyncError};
use crate::store::{BoardListener, BoardStore};
use crate::types::{
    ClientMutationId, Column, ColumnId, Mutation, MutationTarget, PendingMutation, RemoteEvent,
    ServerState, Task, TaskId,
};
use ledger::Ledger;
use snapshot::Snapshot;
use std::collections::{HashMap, VecDeque};
use std::fmt::Display;
use std::sync::Arc;
use taskboard_common::Pretty;
use taskboard_config::ReconcilerConfig;
use tracing::{debug, info, warn};

/// Why a call left the store untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The mutation was already confirmed
    AlreadyApplied,
    /// The mutation was superseded or already rolled back
    Stale,
    /// The event echoes a mutation this client already resolved
    Echo,
}

/// Result of [`MutationReconciler::apply_optimistic`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimisticOutcome {
    Applied,
    /// Applied, replacing a pending mutation on the same target
    Superseded { previous: ClientMutationId },
}

/// Result of [`MutationReconciler::apply_authoritative`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthoritativeOutcome {
    /// Server state applied; buffered events were replayed or discarded
    Confirmed { replayed: usize, discarded: usize },
    /// No record of this id; applied as a plain remote upsert
    AppliedAsRemote,
    Ignored(IgnoreReason),
}

/// Result of [`MutationReconciler::reject_optimistic`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectOutcome {
    /// Snapshot restored, then buffered events replayed on top
    RolledBack { replayed: usize },
    Ignored(IgnoreReason),
}

/// Result of [`MutationReconciler::apply_remote`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    Applied,
    /// Held behind a newer local mutation; `depth` events now wait
    Buffered { depth: usize },
    /// The event echoed a pending mutation and confirmed it
    ConfirmedEcho(ClientMutationId),
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone)]
struct MutationEntry {
    pending: PendingMutation,
    snapshot: Snapshot,
    /// Task mutations a local column deletion superseded, with their snapshots
    cascaded: Vec<(ClientMutationId, Snapshot)>,
}

/// The state machine that merges local, authoritative and remote updates
#[derive(Debug)]
pub struct MutationReconciler {
    store: BoardStore,
    config: ReconcilerConfig,
    entries: HashMap<ClientMutationId, MutationEntry>,
    by_target: HashMap<MutationTarget, ClientMutationId>,
    ledger: Ledger,
    buffered: HashMap<MutationTarget, VecDeque<RemoteEvent>>,
}

impl MutationReconciler {
    pub fn new(store: BoardStore, config: ReconcilerConfig) -> Self {
        let ledger = Ledger::new(config.resolved_history_limit);
        Self {
            store,
            config,
            entries: HashMap::new(),
            by_target: HashMap::new(),
            ledger,
            buffered: HashMap::new(),
        }
    }

    /// Read-only access for selectors
    pub fn store(&self) -> &BoardStore {
        &self.store
    }

    pub fn add_listener(&mut self, listener: Arc<dyn BoardListener>) {
        self.store.add_listener(listener);
    }

    /// Current state of a client mutation, if it is pending or still remembered
    pub fn state(&self, id: &ClientMutationId) -> Option<MutationState> {
        if self.entries.contains_key(id) {
            Some(MutationState::Pending)
        } else {
            self.ledger.get(id)
        }
    }

    /// The pending mutation on a target, if any
    pub fn pending_for(&self, target: &MutationTarget) -> Option<&PendingMutation> {
        self.by_target
            .get(target)
            .and_then(|id| self.entries.get(id))
            .map(|entry| &entry.pending)
    }

    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }

    /// Remote events waiting behind a target's pending mutation
    pub fn buffered_count(&self, target: &MutationTarget) -> usize {
        self.buffered.get(target).map_or(0, VecDeque::len)
    }

    // =========================================================================
    // Local mutations
    // =========================================================================

    /// Apply a local mutation before the server has seen it.
    ///
    /// On error the store is unchanged and nothing is recorded.
    pub fn apply_optimistic(&mut self, pending: PendingMutation) -> Result<OptimisticOutcome> {
        let id = pending.client_mutation_id;
        if self.state(&id).is_some() {
            return Err(SyncError::DuplicateMutation { id: id.to_string() });
        }
        if let Some(target) = unconfirmed_reference(&pending.mutation) {
            return Err(SyncError::UnconfirmedCreate {
                target: target.to_string(),
            });
        }

        let target = pending.target();
        let previous = self.by_target.get(&target).copied();
        let (snapshot, mut cascaded) = match previous.and_then(|p| self.entries.get(&p)) {
            Some(entry) => (
                entry.snapshot.carried_over(&self.store),
                entry.cascaded.clone(),
            ),
            None => (Snapshot::capture(&self.store, &target), Vec::new()),
        };

        let removed = apply_mutation(&mut self.store, &pending.mutation)?;

        if let Some(previous) = previous {
            self.entries.remove(&previous);
            self.ledger.record(previous, MutationState::SupersededByLocal);
            debug!("{} superseded by local mutation {}", previous, id);
        }
        cascaded.extend(self.supersede_cascaded(&removed, MutationState::SupersededByLocal));

        debug!(
            "Applied optimistic {} of {} ({}): {}",
            pending.kind(),
            target,
            id,
            Pretty(&pending.mutation)
        );
        self.by_target.insert(target, id);
        self.entries.insert(
            id,
            MutationEntry {
                pending,
                snapshot,
                cascaded,
            },
        );

        Ok(match previous {
            Some(previous) => OptimisticOutcome::Superseded { previous },
            None => OptimisticOutcome::Applied,
        })
    }

    /// Apply the server's canonical result for a local mutation.
    ///
    /// Applying the same result twice leaves the store as after the first.
    /// When the result cannot be applied the mutation's snapshot is restored,
    /// the mutation is marked superseded by remote and the error is returned;
    /// the store has drifted from the server and needs a resync.
    pub fn apply_authoritative(
        &mut self,
        id: ClientMutationId,
        state: ServerState,
    ) -> Result<AuthoritativeOutcome> {
        let Some(target) = self.entries.get(&id).map(|e| e.pending.target()) else {
            return match self.ledger.get(&id) {
                Some(MutationState::Confirmed) => {
                    debug!("{} already confirmed", id);
                    Ok(AuthoritativeOutcome::Ignored(IgnoreReason::AlreadyApplied))
                }
                Some(resolved) => {
                    if resolved == MutationState::SupersededByLocal {
                        self.adopt_cascaded_result(id, &state);
                    }
                    debug!("Discarding response for {} mutation {}", resolved, id);
                    Ok(AuthoritativeOutcome::Ignored(IgnoreReason::Stale))
                }
                None => {
                    self.apply_server_state(None, &state)?;
                    self.ledger.record(id, MutationState::Confirmed);
                    debug!("Applied response for unknown mutation {} as remote", id);
                    Ok(AuthoritativeOutcome::AppliedAsRemote)
                }
            };
        };

        if let Err(e) = self.apply_server_state(Some(&target), &state) {
            if let Some(entry) = self.entries.remove(&id) {
                self.by_target.remove(&target);
                self.restore(entry);
                self.ledger.record(id, MutationState::SupersededByRemote);
                let replayed = self.replay_all(&target);
                warn!(
                    "Response for {} ({}) could not be applied: {}; restored snapshot, replayed {} buffered events",
                    target, id, e, replayed
                );
            }
            return Err(e);
        }
        self.entries.remove(&id);
        self.by_target.remove(&target);
        self.ledger.record(id, MutationState::Confirmed);

        let (replayed, discarded) = self.replay_after_confirm(&target, &state);
        info!(
            "Confirmed {} ({}); replayed {} buffered events, discarded {}",
            target, id, replayed, discarded
        );
        Ok(AuthoritativeOutcome::Confirmed {
            replayed,
            discarded,
        })
    }

    /// Restore the snapshot taken when a local mutation was first applied.
    pub fn reject_optimistic(
        &mut self,
        id: ClientMutationId,
        reason: impl Display,
    ) -> Result<RejectOutcome> {
        let Some(entry) = self.entries.remove(&id) else {
            return match self.ledger.get(&id) {
                Some(resolved) => {
                    debug!("Ignoring rejection of {} mutation {}", resolved, id);
                    Ok(RejectOutcome::Ignored(IgnoreReason::Stale))
                }
                None => Err(SyncError::UnknownMutation { id: id.to_string() }),
            };
        };

        let target = entry.pending.target();
        let kind = entry.pending.kind();
        self.by_target.remove(&target);
        self.restore(entry);
        self.ledger.record(id, MutationState::Rejected);

        let replayed = self.replay_all(&target);
        warn!("Rolled back {} of {} ({}): {}", kind, target, id, reason);
        Ok(RejectOutcome::RolledBack { replayed })
    }

    // =========================================================================
    // Remote events
    // =========================================================================

    /// Fold in an event from the real-time channel.
    ///
    /// An event is buffered when the target's pending mutation was issued
    /// after the event's server timestamp. The two timestamps come from
    /// different clocks, so skew between this client and the server decides
    /// borderline cases: a client clock running ahead buffers more events
    /// and one running behind lets more of them supersede local gestures.
    pub fn apply_remote(&mut self, event: RemoteEvent) -> Result<RemoteOutcome> {
        if let Some(id) = event.client_mutation_id {
            if self.entries.contains_key(&id) {
                self.apply_authoritative(id, event.payload.server_state())?;
                return Ok(RemoteOutcome::ConfirmedEcho(id));
            }
            match self.ledger.get(&id) {
                Some(state) if !state.is_superseded() => {
                    debug!("Dropping echo of {} mutation {}", state, id);
                    return Ok(RemoteOutcome::Ignored(IgnoreReason::Echo));
                }
                // A superseded mutation's echo is ordinary server history
                _ => {}
            }
        }

        let target = event.target();
        let Some(pending_id) = self.by_target.get(&target).copied() else {
            self.apply_event(&event)?;
            return Ok(RemoteOutcome::Applied);
        };

        let issued_at = self
            .entries
            .get(&pending_id)
            .map(|entry| entry.pending.issued_at);
        if issued_at.is_some_and(|issued_at| issued_at > event.server_timestamp) {
            let limit = self.config.max_buffered_events;
            let queue = self.buffered.entry(target.clone()).or_default();
            queue.push_back(event);
            while queue.len() > limit {
                if let Some(dropped) = queue.pop_front() {
                    warn!(
                        "Buffer for {} full; dropping {} from {}",
                        target,
                        dropped.payload.event_name(),
                        dropped.server_timestamp
                    );
                }
            }
            let depth = queue.len();
            debug!("Buffered remote event for {} behind {}", target, pending_id);
            return Ok(RemoteOutcome::Buffered { depth });
        }

        self.apply_event(&event)?;
        self.entries.remove(&pending_id);
        self.by_target.remove(&target);
        self.ledger
            .record(pending_id, MutationState::SupersededByRemote);
        if let Some(stale) = self.buffered.remove(&target) {
            debug!("Discarding {} buffered events for {}", stale.len(), target);
        }
        info!(
            "Remote {} for {} superseded pending mutation {}",
            event.payload.event_name(),
            target,
            pending_id
        );
        Ok(RemoteOutcome::Applied)
    }

    /// Replace the board with a fresh fetch and re-apply pending mutations.
    ///
    /// Buffered events are dropped since the fetch already reflects them.
    /// Pending mutations that no longer apply are marked superseded by remote.
    pub fn resync(&mut self, columns: Vec<Column>, tasks: Vec<Task>) -> Result<()> {
        self.store.resync(columns, tasks)?;
        self.buffered.clear();
        self.by_target.clear();

        let mut pending: Vec<MutationEntry> = self.entries.drain().map(|(_, e)| e).collect();
        pending.sort_by(|a, b| {
            a.pending
                .issued_at
                .cmp(&b.pending.issued_at)
                .then_with(|| a.pending.client_mutation_id.cmp(&b.pending.client_mutation_id))
        });

        let count = pending.len();
        for entry in pending {
            let id = entry.pending.client_mutation_id;
            let target = entry.pending.target();
            let snapshot = Snapshot::capture(&self.store, &target);
            match apply_mutation(&mut self.store, &entry.pending.mutation) {
                Ok(removed) => {
                    let cascaded =
                        self.supersede_cascaded(&removed, MutationState::SupersededByLocal);
                    self.by_target.insert(target, id);
                    self.entries.insert(
                        id,
                        MutationEntry {
                            pending: entry.pending,
                            snapshot,
                            cascaded,
                        },
                    );
                }
                Err(e) => {
                    warn!("Pending {} no longer applies after resync: {}", id, e);
                    self.ledger.record(id, MutationState::SupersededByRemote);
                }
            }
        }
        info!(
            "Resynced board {}; {} of {} pending mutations re-applied",
            self.store.project_id(),
            self.entries.len(),
            count
        );
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Write server state into the store.
    ///
    /// `replacing` is the pending mutation's target; when it names a temporary
    /// record the server's record takes its place.
    fn apply_server_state(
        &mut self,
        replacing: Option<&MutationTarget>,
        state: &ServerState,
    ) -> Result<()> {
        match state {
            ServerState::Task(task) => {
                if let Some(MutationTarget::Task(temporary)) = replacing {
                    if temporary != &task.id {
                        if self.store.column(&task.column_id).is_none() {
                            return Err(SyncError::unknown_column(&task.column_id));
                        }
                        self.store.remove_task(temporary);
                    }
                }
                self.store.upsert_task(task.clone())
            }
            ServerState::Column(column) => {
                if let Some(MutationTarget::Column(temporary)) = replacing {
                    if temporary != &column.id && self.store.column(temporary).is_some() {
                        return self.store.rekey_column(temporary, column.clone());
                    }
                }
                self.store.upsert_column(column.clone())
            }
            ServerState::TaskDeleted(id) => {
                self.store.remove_task(id);
                Ok(())
            }
            ServerState::ColumnDeleted(id) => {
                if let Some(removed) = self.store.remove_column(id) {
                    self.supersede_cascaded(&removed.tasks, MutationState::SupersededByRemote);
                }
                Ok(())
            }
        }
    }

    fn apply_event(&mut self, event: &RemoteEvent) -> Result<()> {
        debug!(
            "Applying remote {} at {}",
            event.payload.event_name(),
            event.server_timestamp
        );
        self.apply_server_state(None, &event.payload.server_state())
    }

    /// Resolve pending mutations on tasks removed by a column deletion,
    /// returning their snapshots
    fn supersede_cascaded(
        &mut self,
        tasks: &[Task],
        state: MutationState,
    ) -> Vec<(ClientMutationId, Snapshot)> {
        let mut snapshots = Vec::new();
        for task in tasks {
            let target = MutationTarget::Task(task.id.clone());
            if let Some(id) = self.by_target.remove(&target) {
                if let Some(entry) = self.entries.remove(&id) {
                    snapshots.push((id, entry.snapshot));
                }
                self.ledger.record(id, state);
                debug!("{} {} by column deletion", id, state);
            }
            if let Some(stale) = self.buffered.remove(&target) {
                debug!("Discarding {} buffered events for {}", stale.len(), target);
            }
        }
        snapshots
    }

    /// A task mutation swallowed by a pending column deletion was confirmed:
    /// the server's result becomes what rolling back the deletion restores.
    fn adopt_cascaded_result(&mut self, id: ClientMutationId, state: &ServerState) {
        let confirmed = match state {
            ServerState::Task(task) => Some(task.clone()),
            ServerState::TaskDeleted(_) => None,
            _ => return,
        };
        let swallowed = self
            .entries
            .values_mut()
            .flat_map(|entry| entry.cascaded.iter_mut())
            .find(|cascaded| cascaded.0 == id);
        if let Some((_, Snapshot::Task { prior, .. })) = swallowed {
            *prior = confirmed;
            debug!("Recorded confirmed result of {} for column rollback", id);
        }
    }

    /// Roll an entry back: its own snapshot first, then the tasks its column
    /// deletion swallowed, most recent first
    fn restore(&mut self, entry: MutationEntry) {
        self.restore_snapshot(entry.snapshot);
        for (_, snapshot) in entry.cascaded.into_iter().rev() {
            self.restore_snapshot(snapshot);
        }
    }

    fn restore_snapshot(&mut self, snapshot: Snapshot) {
        match snapshot {
            Snapshot::Task {
                task_id,
                prior: None,
            } => {
                self.store.remove_task(&task_id);
            }
            Snapshot::Task {
                task_id,
                prior: Some(task),
            } => {
                // A confirmed create carries the server's id
                if task.id != task_id {
                    self.store.remove_task(&task_id);
                }
                if let Err(e) = self.store.upsert_task(task) {
                    warn!("Could not restore task {}: {}; removing it", task_id, e);
                    self.store.remove_task(&task_id);
                }
            }
            Snapshot::Column {
                column_id,
                prior: None,
            } => {
                if let Some(removed) = self.store.remove_column(&column_id) {
                    self.supersede_cascaded(&removed.tasks, MutationState::SupersededByLocal);
                }
            }
            Snapshot::Column {
                column_id,
                prior: Some(removed),
            } => {
                let restored = if self.store.column(&column_id).is_some() {
                    self.store.upsert_column(removed.column)
                } else {
                    self.store.restore_column(removed)
                };
                if let Err(e) = restored {
                    warn!("Could not restore column {}: {}", column_id, e);
                }
            }
        }
    }

    /// Replay buffered events after a confirmation. Events no newer than the
    /// confirmed task's `updated_at` are stale; a confirmed deletion makes
    /// every buffered event stale.
    fn replay_after_confirm(
        &mut self,
        target: &MutationTarget,
        state: &ServerState,
    ) -> (usize, usize) {
        let Some(events) = self.buffered.remove(target) else {
            return (0, 0);
        };

        let deleted = matches!(
            state,
            ServerState::TaskDeleted(_) | ServerState::ColumnDeleted(_)
        );
        let cutoff = match state {
            ServerState::Task(task) => task.updated_at,
            _ => None,
        };

        let mut replayed = 0;
        let mut discarded = 0;
        for event in events {
            let stale = deleted || cutoff.is_some_and(|cutoff| event.server_timestamp <= cutoff);
            if stale {
                discarded += 1;
                continue;
            }
            match self.apply_event(&event) {
                Ok(()) => replayed += 1,
                Err(e) => {
                    warn!("Buffered {} failed to replay: {}", event.payload.event_name(), e);
                    discarded += 1;
                }
            }
        }
        (replayed, discarded)
    }

    fn replay_all(&mut self, target: &MutationTarget) -> usize {
        let Some(events) = self.buffered.remove(target) else {
            return 0;
        };
        let mut replayed = 0;
        for event in events {
            match self.apply_event(&event) {
                Ok(()) => replayed += 1,
                Err(e) => warn!("Buffered {} failed to replay: {}", event.payload.event_name(), e),
            }
        }
        replayed
    }
}

/// The first temporary id a mutation depends on, if any
fn unconfirmed_reference(mutation: &Mutation) -> Option<MutationTarget> {
    let task = |id: &TaskId| id.is_temporary().then(|| MutationTarget::Task(id.clone()));
    let column = |id: &ColumnId| id.is_temporary().then(|| MutationTarget::Column(id.clone()));

    match mutation {
        Mutation::MoveTask {
            task_id, column_id, ..
        } => task(task_id).or_else(|| column(column_id)),
        Mutation::CreateTask { task: created } => column(&created.column_id),
        Mutation::UpdateTask { task: updated } => {
            task(&updated.id).or_else(|| column(&updated.column_id))
        }
        Mutation::DeleteTask { task_id } => task(task_id),
        Mutation::CreateColumn { .. } => None,
        Mutation::UpdateColumn { column: updated } => column(&updated.id),
        Mutation::DeleteColumn { column_id } => column(column_id),
    }
}

/// Apply a mutation to the store, returning tasks removed by a column deletion
fn apply_mutation(store: &mut BoardStore, mutation: &Mutation) -> Result<Vec<Task>> {
    match mutation {
        Mutation::MoveTask {
            task_id,
            column_id,
            index,
        } => {
            let mut task = store
                .task(task_id)
                .cloned()
                .ok_or_else(|| SyncError::unknown_task(task_id))?;
            task.column_id = column_id.clone();
            task.order = *index;
            store.upsert_task(task)?;
        }
        Mutation::CreateTask { task } => {
            if store.task(&task.id).is_some() {
                return Err(SyncError::duplicate_item(&task.id));
            }
            store.upsert_task(task.clone())?;
        }
        Mutation::UpdateTask { task } => {
            if store.task(&task.id).is_none() {
                return Err(SyncError::unknown_task(&task.id));
            }
            store.upsert_task(task.clone())?;
        }
        Mutation::DeleteTask { task_id } => {
            store
                .remove_task(task_id)
                .ok_or_else(|| SyncError::unknown_task(task_id))?;
        }
        Mutation::CreateColumn { column } => {
            if store.column(&column.id).is_some() {
                return Err(SyncError::duplicate_item(&column.id));
            }
            store.upsert_column(column.clone())?;
        }
        Mutation::UpdateColumn { column } => {
            if store.column(&column.id).is_none() {
                return Err(SyncError::unknown_column(&column.id));
            }
            store.upsert_column(column.clone())?;
        }
        Mutation::DeleteColumn { column_id } => {
            let removed = store
                .remove_column(column_id)
                .ok_or_else(|| SyncError::unknown_column(column_id))?;
            return Ok(removed.tasks);
        }
    }
    Ok(Vec::new())
}
