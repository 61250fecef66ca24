//! Board sessions and drag gestures against the scripted board server

use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};
use taskboard_config::{DragConfig, SyncConfig};
use taskboard_sync::test_support::{board, ScriptedBoardApi, PROJECT};
use taskboard_sync::{
    ApiError, BoardEvent, BoardSession, DispatchOutcome, DragController, DropGesture, DropIgnored,
    DropOutcome, DropTarget, IgnoreReason, Mutation, MutationState, PendingMutation,
    RemoteEvent, RemoteOutcome, RemotePayload, ServerState, SyncError, Task,
};
use tokio::sync::mpsc;

type Session = BoardSession<ScriptedBoardApi>;

async fn open() -> (Arc<ScriptedBoardApi>, Session) {
    let api = Arc::new(
        ScriptedBoardApi::new(board(&[("a", &["t1", "t2", "t3"]), ("b", &["t4", "t5"])]))
            .unwrap(),
    );
    let session = BoardSession::open(api.clone(), PROJECT.into(), &SyncConfig::default())
        .await
        .unwrap();
    (api, session)
}

fn columns(pairs: &[(&str, &[&str])]) -> Vec<(String, Vec<String>)> {
    pairs
        .iter()
        .map(|(c, ts)| (c.to_string(), ts.iter().map(|t| t.to_string()).collect()))
        .collect()
}

async fn wait_for_call(api: &ScriptedBoardApi, prefix: &str) {
    while !api.calls().iter().any(|c| c.starts_with(prefix)) {
        tokio::task::yield_now().await;
    }
}

#[test_log::test(tokio::test)]
async fn drop_moves_card_and_matches_server() {
    let (api, session) = open().await;
    let drag = DragController::new(session.clone(), DragConfig::default());

    let outcome = drag.on_drop("t1".into(), "b".into(), 1).await.unwrap();
    assert!(matches!(
        outcome,
        DropOutcome::Moved(DispatchOutcome::Confirmed(ServerState::Task(_)))
    ));

    let expected = columns(&[("a", &["t2", "t3"]), ("b", &["t4", "t1", "t5"])]);
    assert_eq!(session.view().await.layout(), expected);
    assert_eq!(api.server_view().layout(), expected);
    assert_eq!(api.calls().last().unwrap(), "move_task t1 -> b@1");
}

#[test_log::test(tokio::test)]
async fn failed_move_snaps_back() {
    let (api, session) = open().await;
    let drag = DragController::new(session.clone(), DragConfig::default());
    api.fail_next(ApiError::Forbidden("read-only board".into()));

    let err = drag.on_drop("t2".into(), "b".into(), 0).await.unwrap_err();
    assert!(err.is_rejection());
    match err {
        SyncError::MutationRejected {
            client_mutation_id,
            reason,
            ..
        } => {
            assert_eq!(reason, "forbidden: read-only board");
            assert_eq!(
                session.state(&client_mutation_id).await,
                Some(MutationState::Rejected)
            );
        }
        other => panic!("unexpected error {other}"),
    }

    assert_eq!(
        session.view().await.layout(),
        columns(&[("a", &["t1", "t2", "t3"]), ("b", &["t4", "t5"])])
    );
}

#[tokio::test]
async fn ignored_gestures_never_reach_the_server() {
    let (api, session) = open().await;
    let drag = DragController::new(session.clone(), DragConfig::default());

    let aborted = DropGesture {
        task_id: "t1".into(),
        target: None,
        travel_px: 120.0,
    };
    let click = DropGesture {
        task_id: "t1".into(),
        target: Some(DropTarget {
            column_id: "b".into(),
            index: 0,
        }),
        travel_px: 1.5,
    };
    let in_place = DropGesture {
        task_id: "t2".into(),
        target: Some(DropTarget {
            column_id: "a".into(),
            index: 1,
        }),
        travel_px: 40.0,
    };

    assert_eq!(
        drag.on_gesture(aborted).await.unwrap(),
        DropOutcome::Ignored(DropIgnored::Aborted)
    );
    assert_eq!(
        drag.on_gesture(click).await.unwrap(),
        DropOutcome::Ignored(DropIgnored::BelowThreshold)
    );
    assert_eq!(
        drag.on_gesture(in_place).await.unwrap(),
        DropOutcome::Ignored(DropIgnored::SamePosition)
    );
    assert_eq!(api.calls(), vec!["fetch_board p1".to_string()]);
}

#[test_log::test(tokio::test)]
async fn remote_event_racing_an_in_flight_drop_is_buffered() {
    let (api, session) = open().await;
    let drag = DragController::new(session.clone(), DragConfig::default());
    api.pause();

    let in_flight = tokio::spawn(async move { drag.on_drop("t1".into(), "b".into(), 0).await });
    wait_for_call(&api, "move_task").await;

    // A collaborator's edit that the server stamped before our drag was issued
    let stale = RemoteEvent::new(
        RemotePayload::TaskUpdated {
            task: Task::new("t1", PROJECT, "a", 0, "T1"),
        },
        Utc::now() - Duration::minutes(1),
    );
    assert_eq!(
        session.handle_remote(stale).await.unwrap(),
        RemoteOutcome::Buffered { depth: 1 }
    );
    assert_eq!(
        session.read(|s| s.task(&"t1".into()).map(|t| t.column_id.to_string())).await,
        Some("b".to_string())
    );

    api.resume();
    let outcome = in_flight.await.unwrap().unwrap();
    assert!(matches!(
        outcome,
        DropOutcome::Moved(DispatchOutcome::Confirmed(_))
    ));
    assert_eq!(
        session.view().await.layout(),
        columns(&[("a", &["t2", "t3"]), ("b", &["t1", "t4", "t5"])])
    );
}

#[tokio::test]
async fn superseded_drop_is_discarded() {
    let (api, session) = open().await;
    api.pause();

    let first = PendingMutation::new(Mutation::MoveTask {
        task_id: "t3".into(),
        column_id: "b".into(),
        index: 0,
    });
    let second = PendingMutation::new(Mutation::MoveTask {
        task_id: "t3".into(),
        column_id: "b".into(),
        index: 2,
    });

    let s1 = session.clone();
    let first_request = tokio::spawn(async move { s1.submit(first).await });
    wait_for_call(&api, "move_task t3 -> b@0").await;
    let s2 = session.clone();
    let second_request = tokio::spawn(async move { s2.submit(second).await });
    wait_for_call(&api, "move_task t3 -> b@2").await;

    api.resume();
    assert_eq!(
        first_request.await.unwrap().unwrap(),
        DispatchOutcome::Discarded
    );
    assert!(matches!(
        second_request.await.unwrap().unwrap(),
        DispatchOutcome::Confirmed(_)
    ));
}

#[tokio::test]
async fn echoes_of_confirmed_mutations_are_dropped() {
    let (api, session) = open().await;
    session
        .move_task("t5".into(), "a".into(), 0)
        .await
        .unwrap();

    let echo = api.events().pop().unwrap();
    assert!(echo.client_mutation_id.is_some());
    assert_eq!(
        session.handle_remote(echo).await.unwrap(),
        RemoteOutcome::Ignored(IgnoreReason::Echo)
    );
    assert_eq!(
        session.view().await.layout(),
        columns(&[("a", &["t5", "t1", "t2", "t3"]), ("b", &["t4"])])
    );
}

#[tokio::test]
async fn created_task_takes_the_server_id() {
    let (api, session) = open().await;
    let draft = Task::draft(PROJECT, "b", 1, "Write release notes");
    let temporary = draft.id.clone();

    let outcome = session.create_task(draft).await.unwrap();
    let DispatchOutcome::Confirmed(ServerState::Task(created)) = outcome else {
        panic!("unexpected outcome {outcome:?}");
    };
    assert_eq!(created.id.as_str(), "task-1");
    assert!(created.updated_at.is_some());

    let layout = session.view().await.layout();
    assert_eq!(layout[1].1, vec!["t4", "task-1", "t5"]);
    assert!(session.read(|s| s.task(&temporary).is_none()).await);
    assert_eq!(api.server_view().layout(), layout);
}

#[tokio::test]
async fn column_lifecycle_round_trips() {
    let (api, session) = open().await;

    let outcome = session
        .create_column(taskboard_sync::Column::draft(PROJECT, "Review", 2))
        .await
        .unwrap();
    let DispatchOutcome::Confirmed(ServerState::Column(column)) = outcome else {
        panic!("unexpected outcome {outcome:?}");
    };
    assert_eq!(column.id.as_str(), "column-1");

    session
        .move_task("t1".into(), column.id.clone(), 0)
        .await
        .unwrap();
    session.delete_column("a".into()).await.unwrap();

    let expected = columns(&[("b", &["t4", "t5"]), ("column-1", &["t1"])]);
    assert_eq!(session.view().await.layout(), expected);
    assert_eq!(api.server_view().layout(), expected);
}

#[tokio::test]
async fn listeners_see_cascaded_deletions() {
    let (_api, session) = open().await;
    let removed: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = removed.clone();
    session
        .add_listener(Arc::new(move |event: &BoardEvent| {
            if let BoardEvent::TaskRemoved(task) = event {
                sink.lock().unwrap().push(task.id.to_string());
            }
        }))
        .await;

    session.delete_column("b".into()).await.unwrap();
    assert_eq!(*removed.lock().unwrap(), vec!["t4", "t5"]);
}

#[test_log::test(tokio::test)]
async fn remote_channel_applies_collaborator_changes() {
    let (api, session) = open().await;
    let (tx, rx) = mpsc::channel(8);
    let runner = {
        let session = session.clone();
        tokio::spawn(async move { session.run_remote_events(rx).await })
    };

    tx.send(api.collaborator_move("t3", "b", 0).unwrap())
        .await
        .unwrap();
    drop(tx);
    runner.await.unwrap().unwrap();

    assert_eq!(
        session.view().await.layout(),
        columns(&[("a", &["t1", "t2"]), ("b", &["t3", "t4", "t5"])])
    );
}

#[tokio::test]
async fn unabsorbable_remote_event_triggers_resync() {
    let (api, session) = open().await;
    let (tx, rx) = mpsc::channel(8);

    let orphan = RemoteEvent::new(
        RemotePayload::TaskCreated {
            task: Task::new("t9", PROJECT, "missing", 0, "T9"),
        },
        Utc::now(),
    );
    tx.send(orphan).await.unwrap();
    drop(tx);
    session.run_remote_events(rx).await.unwrap();

    let fetches = api
        .calls()
        .iter()
        .filter(|c| c.starts_with("fetch_board"))
        .count();
    assert_eq!(fetches, 2);
    session.read(|s| s.verify_invariants()).await.unwrap();
}

#[test_log::test(tokio::test)]
async fn response_naming_a_missed_column_triggers_resync() {
    let (api, session) = open().await;
    // Neither change reaches this client
    api.collaborator_add_column("c", 2).unwrap();
    api.collaborator_move("t1", "c", 0).unwrap();

    let mut task = session
        .read(|s| s.task(&"t1".into()).cloned())
        .await
        .unwrap();
    task.title = "Renamed".into();
    let err = session.update_task(task).await.unwrap_err();
    assert!(matches!(err, SyncError::UnknownColumn { .. }));

    let fetches = api
        .calls()
        .iter()
        .filter(|c| c.starts_with("fetch_board"))
        .count();
    assert_eq!(fetches, 2);
    assert_eq!(session.view().await.layout(), api.server_view().layout());
    assert_eq!(
        session
            .read(|s| s.task(&"t1".into()).map(|t| t.title.clone()))
            .await,
        Some("Renamed".to_string())
    );
    session.read(|s| s.verify_invariants()).await.unwrap();
}

#[tokio::test]
async fn frames_are_parsed_and_applied() {
    let (_api, session) = open().await;
    let frame = r#"{
        "type": "task:deleted",
        "serverTimestamp": "2026-03-01T10:00:00Z",
        "taskId": "t2"
    }"#;
    assert_eq!(
        session.handle_frame(frame).await.unwrap(),
        RemoteOutcome::Applied
    );
    assert!(session.handle_frame("not json").await.is_err());
    assert_eq!(
        session.view().await.layout(),
        columns(&[("a", &["t1", "t3"]), ("b", &["t4", "t5"])])
    );
}
