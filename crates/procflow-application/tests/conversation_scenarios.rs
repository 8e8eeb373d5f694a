mod common;

use common::{
    GatedGenerator, GatedTranscriber, StaticGenerator, StaticTranscriber, flight_model, flight_response, service,
    service_with_transcriber,
};
use procflow_application::{GenerationOutcome, ProcessingStep};
use procflow_core::conversation::{Session, TurnSide, TurnStatus, VersionKind};
use procflow_core::error::ProcflowError;
use procflow_core::generation::AudioInput;
use procflow_core::history::{HistoryDocument, HistoryStore};
use procflow_core::process_model::AgentResponse;
use procflow_core::project::Project;
use procflow_execution::ControllerStatus;
use procflow_infrastructure::{InMemoryHistoryStore, JsonHistoryStore};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_submit_book_a_flight() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let (generator, mut calls) = GatedGenerator::new();
    let gate = generator.expect_call();
    let service = service(store.clone(), generator);

    let task = tokio::spawn({
        let service = service.clone();
        async move { service.submit_user_message("Book a flight").await }
    });

    assert_eq!(calls.recv().await.unwrap(), "Book a flight");
    {
        let session = service.current_session().await.unwrap();
        let turn = &session.turns[0];
        assert_eq!(turn.prompt(), Some("Book a flight"));
        assert_eq!(turn.user.len(), 1);
        assert_eq!(turn.status, TurnStatus::Generating);
        assert_eq!(turn.assistant.len(), 1);
        assert_eq!(turn.assistant.active_content(), Some(""));
        let status = service.processing_status().await;
        assert_eq!(status.step, ProcessingStep::Analyzing);
        assert_eq!(status.status, ControllerStatus::Generating);
    }

    gate.send(Ok(flight_response())).unwrap();
    let report = task.await.unwrap().unwrap();

    assert_eq!(report.outcome, GenerationOutcome::Done);
    let session = service.session(&report.session_id).await.unwrap();
    assert_eq!(session.title, "Book a flight");
    assert_eq!(session.transcript, "Book a flight");
    assert_eq!(session.model, Some(flight_model()));
    let turn = &session.turns[0];
    assert_eq!(turn.status, TurnStatus::Done);
    assert_eq!(turn.assistant.len(), 1);
    let answer = turn.assistant.active().unwrap();
    assert_eq!(answer.kind, VersionKind::Map);
    assert!(answer.duration_ms.is_some());
    assert!(turn.duration_ms.is_some());

    // turn creation, placeholder, result
    assert_eq!(store.write_count(), 3);
    let stored = store.snapshot().await;
    assert_eq!(stored.sessions[0].turns[0].status, TurnStatus::Done);
    assert_eq!(service.processing_status().await.status, ControllerStatus::Idle);
}

#[tokio::test]
async fn test_cancel_before_result_leaves_placeholder_untouched() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let (generator, mut calls) = GatedGenerator::new();
    let gate = generator.expect_call();
    let service = service(store.clone(), generator);

    let task = tokio::spawn({
        let service = service.clone();
        async move { service.submit_user_message("Book a flight").await }
    });
    calls.recv().await.unwrap();

    assert!(service.cancel_generation().await);
    // The superseded result arrives after cancellation.
    let _ = gate.send(Ok(AgentResponse::general("too late")));
    let report = task.await.unwrap().unwrap();

    assert_eq!(report.outcome, GenerationOutcome::Cancelled);
    let session = service.current_session().await.unwrap();
    let turn = &session.turns[0];
    assert_eq!(turn.status, TurnStatus::Generating);
    assert_eq!(turn.assistant.len(), 1);
    assert_eq!(turn.assistant.active_content(), Some(""));
    assert!(turn.assistant.versions().iter().all(|v| v.kind != VersionKind::Error));

    assert_eq!(store.write_count(), 2);
    let status = service.processing_status().await;
    assert_eq!(status.status, ControllerStatus::Cancelled);
    assert_eq!(status.step, ProcessingStep::Idle);

    assert!(!service.cancel_generation().await);
}

#[tokio::test]
async fn test_regenerate_twice_fills_only_the_second_placeholder() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let (generator, mut calls) = GatedGenerator::new();
    let service = service(store.clone(), generator.clone());

    generator
        .expect_call()
        .send(Ok(AgentResponse::general("first answer")))
        .unwrap();
    let report = service.submit_user_message("Explain refunds").await.unwrap();
    assert_eq!(report.outcome, GenerationOutcome::Done);
    calls.recv().await.unwrap();
    let turn_id = report.turn_id.clone();

    let first_gate = generator.expect_call();
    let second_gate = generator.expect_call();

    let first = tokio::spawn({
        let service = service.clone();
        let turn_id = turn_id.clone();
        async move { service.regenerate_turn(&turn_id).await }
    });
    calls.recv().await.unwrap();

    let second = tokio::spawn({
        let service = service.clone();
        let turn_id = turn_id.clone();
        async move { service.regenerate_turn(&turn_id).await }
    });
    calls.recv().await.unwrap();

    let _ = first_gate.send(Ok(AgentResponse::general("stale")));
    second_gate
        .send(Ok(AgentResponse::general("second answer")))
        .unwrap();

    assert_eq!(first.await.unwrap().unwrap().outcome, GenerationOutcome::Cancelled);
    assert_eq!(second.await.unwrap().unwrap().outcome, GenerationOutcome::Done);

    let session = service.current_session().await.unwrap();
    let turn = session.turn(&turn_id).unwrap();
    let contents: Vec<&str> = turn
        .assistant
        .versions()
        .iter()
        .map(|v| v.content.as_str())
        .collect();
    assert_eq!(contents, vec!["first answer", "", "second answer"]);
    assert_eq!(turn.assistant.active_index(), Some(2));
    assert_eq!(turn.status, TurnStatus::Done);
    assert!(contents.iter().all(|c| *c != "stale"));
}

#[tokio::test]
async fn test_generator_failure_records_error_version() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let generator = Arc::new(StaticGenerator(Err(ProcflowError::generation(
        "Quota exceeded",
    ))));
    let service = service(store.clone(), generator);

    let report = service.submit_user_message("Book a flight").await.unwrap();

    assert_eq!(
        report.outcome,
        GenerationOutcome::Failed {
            message: "Quota exceeded".to_string()
        }
    );
    let session = service.current_session().await.unwrap();
    let turn = &session.turns[0];
    assert_eq!(turn.status, TurnStatus::Error);
    assert_eq!(turn.assistant.len(), 1);
    let version = turn.assistant.active().unwrap();
    assert_eq!(version.kind, VersionKind::Error);
    assert_eq!(version.content, "Quota exceeded");
    assert!(session.model.is_none());

    assert_eq!(store.write_count(), 3);
    assert_eq!(service.processing_status().await.status, ControllerStatus::Error);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_reported_as_failure() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let (generator, _calls) = GatedGenerator::new();
    let service = service(store.clone(), generator);

    let report = service.submit_user_message("Book a flight").await.unwrap();

    match &report.outcome {
        GenerationOutcome::Failed { message } => assert!(message.contains("timed out")),
        other => panic!("expected failure, got {:?}", other),
    }
    let session = service.current_session().await.unwrap();
    let turn = &session.turns[0];
    assert_eq!(turn.status, TurnStatus::Error);
    assert_eq!(turn.assistant.active().unwrap().kind, VersionKind::Error);
    assert_eq!(store.write_count(), 3);
    assert_eq!(service.processing_status().await.status, ControllerStatus::Error);
}

#[tokio::test]
async fn test_edit_then_select_version_round_trips() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let generator = Arc::new(StaticGenerator(Ok(AgentResponse::general("ok"))));
    let service = service(store.clone(), generator);

    let report = service.submit_user_message("Book a flight").await.unwrap();
    let turn_id = report.turn_id;

    let edited = service.edit_turn(&turn_id, "Book a train").await.unwrap();
    assert_eq!(edited.outcome, GenerationOutcome::Done);

    service.set_turn_version(&turn_id, TurnSide::User, 0).await.unwrap();
    let session = service.current_session().await.unwrap();
    assert_eq!(session.turn(&turn_id).unwrap().prompt(), Some("Book a flight"));

    service.set_turn_version(&turn_id, TurnSide::User, 1).await.unwrap();
    let session = service.current_session().await.unwrap();
    let turn = session.turn(&turn_id).unwrap();
    assert_eq!(turn.prompt(), Some("Book a train"));
    assert_eq!(turn.user.len(), 2);
    assert_eq!(turn.assistant.len(), 2);

    let err = service
        .set_turn_version(&turn_id, TurnSide::Assistant, 5)
        .await
        .unwrap_err();
    assert_eq!(err, ProcflowError::OutOfRange { index: 5, len: 2 });
    assert_eq!(
        service.current_session().await.unwrap().turn(&turn_id).unwrap().assistant.len(),
        2
    );
}

#[tokio::test]
async fn test_turn_actions_require_a_current_session() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let generator = Arc::new(StaticGenerator(Ok(AgentResponse::general("ok"))));
    let service = service(store, generator);

    assert_eq!(
        service.regenerate_turn("t1").await.unwrap_err(),
        ProcflowError::NoActiveSession
    );

    service.submit_user_message("hello").await.unwrap();
    assert!(service.regenerate_turn("missing").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_load_legacy_document() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("chat_history.json");
    std::fs::write(
        &path,
        r#"[
            {"id": "a", "title": "First", "createdAt": 1700000000000, "turns": []},
            {"id": "b", "title": "Second", "createdAt": 1700000001000, "turns": []}
        ]"#,
    )
    .unwrap();

    let generator = Arc::new(StaticGenerator(Ok(AgentResponse::general("ok"))));
    let service = procflow_application::ConversationService::new(
        Arc::new(JsonHistoryStore::new(path)),
        generator,
        Arc::new(StaticTranscriber(Ok(String::new()))),
        std::time::Duration::from_secs(60),
    );
    service.load_history().await;

    let ids: Vec<String> = service.sessions().await.into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert!(service.projects().await.is_empty());
}

#[tokio::test]
async fn test_unreadable_store_loads_empty() {
    let store = Arc::new(InMemoryHistoryStore::new());
    store.set_fail_reads(true);
    let service = service(
        store,
        Arc::new(StaticGenerator(Ok(AgentResponse::general("ok")))),
    );

    service.load_history().await;

    assert!(service.sessions().await.is_empty());
    assert!(service.projects().await.is_empty());
}

#[tokio::test]
async fn test_load_history_writes_back_pruned_project_refs() {
    let project = Project::new("Ops", "green");
    let mut kept = Session::new();
    kept.project_id = Some(project.id.clone());
    let mut dangling = Session::new();
    dangling.project_id = Some("deleted-project".to_string());
    let store = Arc::new(InMemoryHistoryStore::with_document(HistoryDocument::new(
        vec![kept.clone(), dangling.clone()],
        vec![project.clone()],
    )));
    let service = service(
        store.clone(),
        Arc::new(StaticGenerator(Ok(AgentResponse::general("ok")))),
    );

    service.load_history().await;

    assert_eq!(store.write_count(), 1);
    let stored = store.snapshot().await;
    let refs: Vec<Option<String>> = stored.sessions.iter().map(|s| s.project_id.clone()).collect();
    assert_eq!(refs, vec![Some(project.id.clone()), None]);
    assert_eq!(stored.projects, vec![project]);
    assert_eq!(service.session(&dangling.id).await.unwrap().project_id, None);

    service.load_history().await;
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_corrupt_history_file_is_replaced_by_next_save() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("chat_history.json");
    std::fs::write(&path, "{ truncated").unwrap();

    let service = procflow_application::ConversationService::new(
        Arc::new(JsonHistoryStore::new(path.clone())),
        Arc::new(StaticGenerator(Ok(flight_response()))),
        Arc::new(StaticTranscriber(Ok(String::new()))),
        std::time::Duration::from_secs(60),
    );
    service.load_history().await;
    assert!(service.sessions().await.is_empty());

    let report = service.submit_user_message("Book a flight").await.unwrap();
    let project = service.create_project("Travel", "#00aaff").await;

    assert_eq!(report.outcome, GenerationOutcome::Done);
    assert_eq!(service.synchronizer().failed_writes(), 0);

    let stored = JsonHistoryStore::new(path).read().await.unwrap();
    assert_eq!(stored.sessions.len(), 1);
    assert_eq!(stored.sessions[0].id, report.session_id);
    assert_eq!(stored.sessions[0].turns[0].status, TurnStatus::Done);
    assert_eq!(stored.projects, vec![project]);

    let kept: Vec<String> = std::fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("chat_history.json.corrupt-"))
        .collect();
    assert_eq!(kept.len(), 1);
    let original = std::fs::read_to_string(temp_dir.path().join(&kept[0])).unwrap();
    assert_eq!(original, "{ truncated");
}

#[tokio::test]
async fn test_write_failures_do_not_block_generation() {
    let store = Arc::new(InMemoryHistoryStore::new());
    store.set_fail_writes(true);
    let service = service(
        store.clone(),
        Arc::new(StaticGenerator(Ok(AgentResponse::general("ok")))),
    );

    let report = service.submit_user_message("hello").await.unwrap();

    assert_eq!(report.outcome, GenerationOutcome::Done);
    assert_eq!(service.synchronizer().failed_writes(), 3);
    assert!(service.synchronizer().last_error().is_some());
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_delete_project_nulls_every_reference() {
    let project = Project::new("Ops", "#ff0000");
    let other = Project::new("Sales", "blue");
    let mut sessions = Vec::new();
    for project_id in [Some(&project.id), Some(&other.id), Some(&project.id), None, Some(&project.id)] {
        let mut session = Session::new();
        session.project_id = project_id.cloned();
        sessions.push(session);
    }
    let store = Arc::new(InMemoryHistoryStore::with_document(HistoryDocument::new(
        sessions,
        vec![project.clone(), other.clone()],
    )));
    let service = service(
        store.clone(),
        Arc::new(StaticGenerator(Ok(AgentResponse::general("ok")))),
    );
    service.load_history().await;

    let detached = service.delete_project(&project.id).await.unwrap();

    assert_eq!(detached, 3);
    let in_memory = service.sessions().await;
    assert!(in_memory
        .iter()
        .all(|s| s.project_id.as_deref() != Some(project.id.as_str())));
    assert_eq!(
        in_memory.iter().filter(|s| s.project_id.is_some()).count(),
        1
    );

    let stored = store.read().await.unwrap();
    assert_eq!(stored.projects, vec![other]);
    assert!(stored
        .sessions
        .iter()
        .all(|s| s.project_id.as_deref() != Some(project.id.as_str())));

    assert!(service.delete_project(&project.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_move_session_between_projects() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let service = service(
        store.clone(),
        Arc::new(StaticGenerator(Ok(AgentResponse::general("ok")))),
    );
    let report = service.submit_user_message("hello").await.unwrap();
    let project = service.create_project("Ops", "green").await;

    service
        .move_session_to_project(&report.session_id, Some(&project.id))
        .await
        .unwrap();
    let err = service
        .move_session_to_project(&report.session_id, Some("missing"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let stored = store.snapshot().await;
    assert_eq!(stored.sessions[0].project_id.as_deref(), Some(project.id.as_str()));
    assert_eq!(stored.projects.len(), 1);

    let renamed = service.rename_project(&project.id, "Operations").await.unwrap();
    assert_eq!(renamed.name, "Operations");
    assert_eq!(store.snapshot().await.projects[0].name, "Operations");

    service
        .move_session_to_project(&report.session_id, None)
        .await
        .unwrap();
    assert!(store.snapshot().await.sessions[0].project_id.is_none());
}

#[tokio::test]
async fn test_delete_session_cancels_its_attempt() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let (generator, mut calls) = GatedGenerator::new();
    let _gate = generator.expect_call();
    let service = service(store.clone(), generator);

    let task = tokio::spawn({
        let service = service.clone();
        async move { service.submit_user_message("hello").await }
    });
    calls.recv().await.unwrap();
    let session_id = service.current_session().await.unwrap().id;

    service.delete_session(&session_id).await.unwrap();

    assert_eq!(task.await.unwrap().unwrap().outcome, GenerationOutcome::Cancelled);
    assert!(service.sessions().await.is_empty());
    assert!(service.current_session().await.is_none());
    assert!(store.snapshot().await.sessions.is_empty());
    assert!(service.delete_session(&session_id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_session_management() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let service = service(
        store.clone(),
        Arc::new(StaticGenerator(Ok(AgentResponse::general("ok")))),
    );

    let first = service.submit_user_message("first").await.unwrap().session_id;
    service.start_new_session().await;
    assert!(service.current_session().await.is_none());
    let second = service.submit_user_message("second").await.unwrap().session_id;
    assert_ne!(first, second);

    let ids: Vec<String> = service.sessions().await.into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![second.clone(), first.clone()]);

    service.reorder_history(&[first.clone(), second.clone()]).await;
    let stored: Vec<String> = store.snapshot().await.sessions.into_iter().map(|s| s.id).collect();
    assert_eq!(stored, vec![first.clone(), second.clone()]);

    service.rename_session(&first, "Renamed").await.unwrap();
    let loaded = service.load_session(&first).await.unwrap();
    assert_eq!(loaded.title, "Renamed");
    assert_eq!(service.current_session().await.unwrap().id, first);

    let exported = service.export_session(&first).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&exported).unwrap();
    assert_eq!(value["title"], "Renamed");
    assert_eq!(value["turns"][0]["status"], "done");

    let project = service.create_project("Ops", "green").await;
    service.delete_all_sessions().await;
    assert!(service.sessions().await.is_empty());
    let stored = store.snapshot().await;
    assert!(stored.sessions.is_empty());
    assert_eq!(stored.projects, vec![project]);
}

#[tokio::test]
async fn test_upload_audio_submits_transcript() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let service = service_with_transcriber(
        store,
        Arc::new(StaticGenerator(Ok(flight_response()))),
        Arc::new(StaticTranscriber(Ok(" Book a flight \n".to_string()))),
    );

    let report = service
        .upload_audio(AudioInput::new("memo.mp3", None, vec![0, 1, 2]))
        .await
        .unwrap();

    assert_eq!(report.outcome, GenerationOutcome::Done);
    let session = service.current_session().await.unwrap();
    assert_eq!(session.turns[0].prompt(), Some("Book a flight"));
    assert_eq!(service.processing_status().await.step, ProcessingStep::Idle);
}

#[tokio::test]
async fn test_failed_transcription_creates_no_turn() {
    for result in [
        Err(ProcflowError::transcription("bad audio")),
        Ok("   ".to_string()),
    ] {
        let store = Arc::new(InMemoryHistoryStore::new());
        let service = service_with_transcriber(
            store.clone(),
            Arc::new(StaticGenerator(Ok(AgentResponse::general("ok")))),
            Arc::new(StaticTranscriber(result)),
        );

        let err = service
            .upload_audio(AudioInput::new("memo.mp3", None, Vec::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, ProcflowError::Transcription(_)));
        assert!(service.sessions().await.is_empty());
        let status = service.processing_status().await;
        assert_eq!(status.status, ControllerStatus::Error);
        assert_eq!(status.step, ProcessingStep::Idle);
        assert_eq!(store.write_count(), 0);
    }
}

#[tokio::test]
async fn test_cancel_during_transcription_submits_nothing() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let (transcriber, mut calls) = GatedTranscriber::new();
    let gate = transcriber.expect_call();
    let service = service_with_transcriber(
        store.clone(),
        Arc::new(StaticGenerator(Ok(flight_response()))),
        transcriber,
    );

    let upload = tokio::spawn({
        let service = service.clone();
        async move {
            service
                .upload_audio(AudioInput::new("memo.mp3", None, vec![1, 2, 3]))
                .await
        }
    });
    assert_eq!(calls.recv().await.as_deref(), Some("memo.mp3"));
    assert_eq!(service.processing_status().await.step, ProcessingStep::Transcribing);

    assert!(service.cancel_generation().await);
    let _ = gate.send(Ok("Book a flight".to_string()));

    let err = upload.await.unwrap().unwrap_err();
    assert!(err.is_cancelled());
    assert!(service.sessions().await.is_empty());
    assert_eq!(store.write_count(), 0);
    let status = service.processing_status().await;
    assert_eq!(status.status, ControllerStatus::Cancelled);
    assert_eq!(status.step, ProcessingStep::Idle);
}

#[tokio::test]
async fn test_typed_message_supersedes_pending_transcription() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let (transcriber, mut calls) = GatedTranscriber::new();
    let gate = transcriber.expect_call();
    let service = service_with_transcriber(
        store,
        Arc::new(StaticGenerator(Ok(flight_response()))),
        transcriber,
    );

    let upload = tokio::spawn({
        let service = service.clone();
        async move {
            service
                .upload_audio(AudioInput::new("memo.mp3", None, Vec::new()))
                .await
        }
    });
    calls.recv().await.unwrap();

    let typed = service.submit_user_message("Typed request").await.unwrap();
    assert_eq!(typed.outcome, GenerationOutcome::Done);
    let _ = gate.send(Ok("Stale transcript".to_string()));

    assert!(upload.await.unwrap().unwrap_err().is_cancelled());
    let session = service.current_session().await.unwrap();
    assert_eq!(session.turns.len(), 1);
    assert_eq!(session.turns[0].prompt(), Some("Typed request"));
    assert_eq!(service.processing_status().await.status, ControllerStatus::Idle);
}
