//! Board scenarios driven straight through the reconciler

use chrono::{Duration, Utc};
use taskboard_config::ReconcilerConfig;
use taskboard_sync::test_support::{board, PROJECT};
use taskboard_sync::{
    AuthoritativeOutcome, BoardStore, ClientMutationId, Column, IgnoreReason, Mutation,
    MutationReconciler, MutationState, PendingMutation, RejectOutcome, RemoteEvent, RemoteOutcome,
    RemotePayload, ServerState, Task, TaskId,
};

fn reconciler(layout: &[(&str, &[&str])]) -> MutationReconciler {
    let snapshot = board(layout);
    let store = BoardStore::hydrate(PROJECT, snapshot.columns, snapshot.tasks).unwrap();
    MutationReconciler::new(store, ReconcilerConfig::default())
}

fn standard() -> MutationReconciler {
    reconciler(&[("a", &["t1", "t2", "t3"]), ("b", &["t4", "t5"])])
}

fn layout(r: &MutationReconciler) -> Vec<(String, Vec<String>)> {
    r.store().view().layout()
}

fn columns(pairs: &[(&str, &[&str])]) -> Vec<(String, Vec<String>)> {
    pairs
        .iter()
        .map(|(c, ts)| (c.to_string(), ts.iter().map(|t| t.to_string()).collect()))
        .collect()
}

fn drag(task: &str, column: &str, index: usize) -> PendingMutation {
    PendingMutation::new(Mutation::MoveTask {
        task_id: task.into(),
        column_id: column.into(),
        index,
    })
}

#[test_log::test]
fn drag_across_columns_then_confirm() {
    let mut r = standard();
    let pending = drag("t1", "b", 1);
    let id = pending.client_mutation_id;

    r.apply_optimistic(pending).unwrap();
    let optimistic = columns(&[("a", &["t2", "t3"]), ("b", &["t4", "t1", "t5"])]);
    assert_eq!(layout(&r), optimistic);

    let server = Task::new("t1", PROJECT, "b", 1, "T1").with_updated_at(Utc::now());
    let outcome = r.apply_authoritative(id, ServerState::Task(server)).unwrap();
    assert!(matches!(outcome, AuthoritativeOutcome::Confirmed { .. }));
    assert_eq!(layout(&r), optimistic);
    r.store().verify_invariants().unwrap();
}

#[test_log::test]
fn remote_move_of_other_task_survives_rollback() {
    let mut r = standard();
    let pending = drag("t1", "b", 1);
    let id = pending.client_mutation_id;
    r.apply_optimistic(pending).unwrap();

    let remote = RemoteEvent::new(
        RemotePayload::TaskMoved {
            task: Task::new("t2", PROJECT, "b", 0, "T2"),
        },
        Utc::now(),
    );
    assert_eq!(r.apply_remote(remote).unwrap(), RemoteOutcome::Applied);
    assert_eq!(
        layout(&r),
        columns(&[("a", &["t3"]), ("b", &["t2", "t4", "t1", "t5"])])
    );

    let outcome = r.reject_optimistic(id, "conflict").unwrap();
    assert_eq!(outcome, RejectOutcome::RolledBack { replayed: 0 });
    assert_eq!(
        layout(&r),
        columns(&[("a", &["t1", "t3"]), ("b", &["t2", "t4", "t5"])])
    );
    assert_eq!(r.store().task(&"t1".into()).unwrap().order, 0);
    r.store().verify_invariants().unwrap();
}

#[test_log::test]
fn deleting_a_column_removes_its_tasks() {
    let mut r = reconciler(&[("a", &["t1", "t2", "t3"]), ("b", &[])]);
    r.apply_optimistic(PendingMutation::new(Mutation::DeleteColumn {
        column_id: "a".into(),
    }))
    .unwrap();

    assert!(r.store().tasks().is_empty());
    for id in ["t1", "t2", "t3"] {
        assert!(r.store().task(&id.into()).is_none());
    }
    assert_eq!(layout(&r), columns(&[("b", &[])]));
    r.store().verify_invariants().unwrap();
}

#[test]
fn authoritative_result_is_idempotent() {
    let mut r = standard();
    let pending = drag("t3", "b", 0);
    let id = pending.client_mutation_id;
    r.apply_optimistic(pending).unwrap();

    let server = ServerState::Task(Task::new("t3", PROJECT, "b", 2, "T3"));
    r.apply_authoritative(id, server.clone()).unwrap();
    let once = r.store().view();

    let again = r.apply_authoritative(id, server).unwrap();
    assert_eq!(
        again,
        AuthoritativeOutcome::Ignored(IgnoreReason::AlreadyApplied)
    );
    assert_eq!(r.store().view(), once);
}

#[test]
fn rollback_returns_to_the_original_snapshot() {
    let mut r = standard();
    let before = r.store().view();

    let first = drag("t2", "b", 0);
    r.apply_optimistic(first).unwrap();
    let second = drag("t2", "b", 2);
    let second_id = second.client_mutation_id;
    r.apply_optimistic(second).unwrap();
    let third = drag("t2", "a", 0);
    let third_id = third.client_mutation_id;
    r.apply_optimistic(third).unwrap();
    assert_eq!(r.state(&second_id), Some(MutationState::SupersededByLocal));

    r.reject_optimistic(third_id, "network").unwrap();
    assert_eq!(r.store().view(), before);
    assert_eq!(r.pending_count(), 0);
}

#[test]
fn column_rollback_restores_tasks_in_order() {
    let mut r = standard();
    let before = r.store().view();

    let delete = PendingMutation::new(Mutation::DeleteColumn {
        column_id: "a".into(),
    });
    let id = delete.client_mutation_id;
    r.apply_optimistic(delete).unwrap();
    r.reject_optimistic(id, "forbidden").unwrap();

    assert_eq!(r.store().view(), before);
}

#[test]
fn own_drag_is_not_reverted_by_an_older_remote_event() {
    let mut r = standard();
    let issued = Utc::now();
    let pending = drag("t1", "b", 0).with_issued_at(issued);
    let id = pending.client_mutation_id;
    r.apply_optimistic(pending).unwrap();

    let stale = RemoteEvent::new(
        RemotePayload::TaskUpdated {
            task: Task::new("t1", PROJECT, "a", 0, "T1 renamed"),
        },
        issued - Duration::milliseconds(300),
    );
    assert_eq!(
        r.apply_remote(stale).unwrap(),
        RemoteOutcome::Buffered { depth: 1 }
    );
    assert_eq!(r.store().task(&"t1".into()).unwrap().column_id.as_str(), "b");

    let server = Task::new("t1", PROJECT, "b", 0, "T1").with_updated_at(issued);
    let outcome = r.apply_authoritative(id, ServerState::Task(server)).unwrap();
    assert_eq!(
        outcome,
        AuthoritativeOutcome::Confirmed {
            replayed: 0,
            discarded: 1
        }
    );
    assert_eq!(r.store().task(&"t1".into()).unwrap().title, "T1");
}

#[test]
fn newer_buffered_event_replays_after_confirmation() {
    let mut r = standard();
    let issued = Utc::now();
    let pending = drag("t1", "b", 0).with_issued_at(issued);
    let id = pending.client_mutation_id;
    r.apply_optimistic(pending).unwrap();

    // Older than the local gesture, newer than the server's confirmation
    let later = RemoteEvent::new(
        RemotePayload::TaskUpdated {
            task: Task::new("t1", PROJECT, "b", 1, "Renamed by a collaborator"),
        },
        issued - Duration::milliseconds(10),
    );
    r.apply_remote(later).unwrap();

    let server = Task::new("t1", PROJECT, "b", 0, "T1")
        .with_updated_at(issued - Duration::milliseconds(20));
    let outcome = r.apply_authoritative(id, ServerState::Task(server)).unwrap();
    assert_eq!(
        outcome,
        AuthoritativeOutcome::Confirmed {
            replayed: 1,
            discarded: 0
        }
    );
    let t1 = r.store().task(&"t1".into()).unwrap();
    assert_eq!(t1.title, "Renamed by a collaborator");
    assert_eq!(t1.order, 1);
}

#[test]
fn column_create_is_rekeyed_and_usable() {
    let mut r = standard();
    let draft = Column::draft(PROJECT, "Review", 1);
    let temporary = draft.id.clone();
    let pending = PendingMutation::new(Mutation::CreateColumn { column: draft });
    let id = pending.client_mutation_id;
    r.apply_optimistic(pending).unwrap();
    assert_eq!(r.store().columns_ordered()[1].id, temporary);

    r.apply_authoritative(
        id,
        ServerState::Column(Column::new("c", PROJECT, "Review", 1)),
    )
    .unwrap();
    assert!(r.store().column(&temporary).is_none());
    assert_eq!(r.store().columns_ordered()[1].id.as_str(), "c");

    r.apply_optimistic(drag("t1", "c", 0)).unwrap();
    assert_eq!(r.store().task_ids(&"c".into()), vec![TaskId::from("t1")]);
    r.store().verify_invariants().unwrap();
}

#[test]
fn echo_of_superseded_mutation_is_applied_as_history() {
    let mut r = standard();
    let first = drag("t1", "b", 0);
    let first_id = first.client_mutation_id;
    r.apply_optimistic(first).unwrap();

    let newer = RemoteEvent::new(
        RemotePayload::TaskMoved {
            task: Task::new("t1", PROJECT, "a", 2, "T1"),
        },
        Utc::now() + Duration::seconds(5),
    );
    r.apply_remote(newer).unwrap();
    assert_eq!(r.state(&first_id), Some(MutationState::SupersededByRemote));

    // The server processed our move after the collaborator's
    let echo = RemoteEvent::new(
        RemotePayload::TaskMoved {
            task: Task::new("t1", PROJECT, "b", 0, "T1"),
        },
        Utc::now() + Duration::seconds(6),
    )
    .echoing(first_id);
    assert_eq!(r.apply_remote(echo).unwrap(), RemoteOutcome::Applied);
    assert_eq!(r.store().task(&"t1".into()).unwrap().column_id.as_str(), "b");
}

#[test]
fn unknown_rejection_is_an_error() {
    let mut r = standard();
    let err = r
        .reject_optimistic(ClientMutationId::new(), "timeout")
        .unwrap_err();
    assert!(err.to_string().contains("unknown client mutation"));
}
