//! End-to-end pipeline test: capture speech, build the transcript, analyze
//! it, review the candidates, and materialize the approved set.

use std::path::PathBuf;
use std::sync::Arc;

use scrumscribe::analysis::{AnalysisEngine, KeywordProvider};
use scrumscribe::app::{RoomSession, SessionDeps};
use scrumscribe::backlog::{
    ActionItemPatch, BacklogStore, InMemoryBacklogStore, ItemType, Priority,
};
use scrumscribe::meeting::{InMemoryMeetingStore, MeetingStatus, MeetingStore, NewMeeting};
use scrumscribe::recognition::{RecognitionEvent, ScriptedRecognizer, SpeechRecognizer};

fn interim(text: &str) -> RecognitionEvent {
    RecognitionEvent::Result {
        transcript: text.to_string(),
        is_final: false,
    }
}

fn final_result(text: &str) -> RecognitionEvent {
    RecognitionEvent::Result {
        transcript: text.to_string(),
        is_final: true,
    }
}

struct Harness {
    deps: SessionDeps,
    backlog: Arc<InMemoryBacklogStore>,
    _export_dir: tempfile::TempDir,
}

fn harness(recognizer: Arc<dyn SpeechRecognizer>) -> Harness {
    let backlog = Arc::new(InMemoryBacklogStore::new());
    let export_dir = tempfile::TempDir::new().unwrap();

    let deps = SessionDeps {
        recognizer,
        engine: Arc::new(AnalysisEngine::from_provider(Box::new(
            KeywordProvider::new(),
        ))),
        meeting_store: Arc::new(InMemoryMeetingStore::new()),
        backlog_store: backlog.clone() as Arc<dyn BacklogStore>,
        export_dir: export_dir.path().to_path_buf(),
    };

    Harness {
        deps,
        backlog,
        _export_dir: export_dir,
    }
}

async fn create_meeting(deps: &SessionDeps) -> String {
    deps.meeting_store
        .create(NewMeeting {
            title: "Sprint Planning".to_string(),
            meeting_type: "sprint-planning".to_string(),
            project_id: Some("proj-42".to_string()),
            sprint_id: Some("sprint-3".to_string()),
            ..Default::default()
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_capture_analyze_review_materialize() {
    // First batch before the pause, second after resume.
    let recognizer = Arc::new(ScriptedRecognizer::new(vec![
        vec![
            interim("we need to fix"),
            final_result(
                "we need to fix the login flow urgently, assign it to alice@example.com.",
            ),
        ],
        vec![final_result(
            "the reporting feature must be ready by next week.",
        )],
    ]));

    let h = harness(recognizer);
    let meeting_id = create_meeting(&h.deps).await;

    let mut session = RoomSession::open(&meeting_id, &h.deps).await.unwrap();
    session.start_recording().await.unwrap();

    for _ in 0..2 {
        let event = session.next_event().await;
        session.handle_recognition_event(event);
    }

    session.tick();
    session.tick();
    session.pause_recording().unwrap();
    session.tick();
    session.resume_recording().unwrap();

    let event = session.next_event().await;
    session.handle_recognition_event(event);
    session.stop_recording().unwrap();

    let status = session.status();
    assert_eq!(status.state, "stopped");
    assert_eq!(status.elapsed_seconds, 2);

    // Two timestamped lines, interim text never appended.
    let transcript_lines: Vec<String> = session
        .meeting()
        .transcript
        .lines()
        .map(String::from)
        .collect();
    assert!(transcript_lines.is_empty()); // record not saved yet

    session.save_transcript().await.unwrap();
    let stored = h.deps.meeting_store.get(&meeting_id).await.unwrap().unwrap();
    let lines: Vec<&str> = stored.transcript.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('['));
    assert!(lines[0].ends_with("assign it to alice@example.com."));
    assert!(!stored.transcript.contains("we need to fix\n"));

    // Analysis extracts one candidate per sentence.
    let report = session.analyze().await.unwrap();
    assert_eq!(report.action_items.len(), 2);
    assert_eq!(
        report.mentioned_attendees,
        vec!["alice@example.com".to_string()]
    );

    let view = session.review_view().unwrap();
    assert_eq!(view.selected.len(), 2);

    let first = &view.items[0];
    assert_eq!(first.item_type, ItemType::Story);
    assert_eq!(first.priority, Priority::Critical);
    assert_eq!(first.assignee.as_deref(), Some("alice@example.com"));

    let second = &view.items[1];
    assert_eq!(second.item_type, ItemType::Feature);
    assert_eq!(second.due_date.as_deref(), Some("next week"));

    // Rework the second item before approving.
    let second_id = second.id;
    session
        .edit_item(
            second_id,
            ActionItemPatch {
                item_type: ItemType::Feature,
                title: "Reporting dashboard".to_string(),
                description: "Ship the reporting dashboard".to_string(),
                priority: Priority::High,
                assignee: None,
                due_date: Some("2026-09-01".to_string()),
            },
        )
        .unwrap();

    let response = session.approve_and_create().await.unwrap();
    assert!(!response.partial);
    assert_eq!(response.report.counts.stories, 1);
    assert_eq!(response.report.counts.features, 1);
    assert_eq!(
        response.summary,
        "Created: 1 Feature(s), 1 Story(ies)"
    );

    // Entities carry meeting provenance and inherit project/sprint.
    let created = h.backlog.created();
    assert_eq!(created.len(), 2);
    assert_eq!(created[0].item_type, ItemType::Story);
    assert_eq!(created[1].item_type, ItemType::Feature);
    assert_eq!(created[1].common.title, "Reporting dashboard");
    for entity in &created {
        assert_eq!(entity.common.created_from, "meeting");
        assert_eq!(entity.common.meeting_id, meeting_id);
        assert_eq!(entity.common.meeting_title, "Sprint Planning");
        assert_eq!(entity.common.project_id, "proj-42");
        assert_eq!(entity.common.sprint_id, "sprint-3");
    }

    // Meeting completed with the approved set.
    let completed = h.deps.meeting_store.get(&meeting_id).await.unwrap().unwrap();
    assert_eq!(completed.status, MeetingStatus::Completed);
    assert_eq!(completed.action_items.len(), 2);
    assert!(session.review_view().is_err());
}

#[tokio::test]
async fn test_partial_materialization_keeps_successes() {
    let recognizer = Arc::new(ScriptedRecognizer::new(vec![vec![
        final_result("we should update the billing task before the release."),
        final_result("we must also fix the urgent task in the exporter."),
    ]]));

    let h = harness(recognizer);
    let meeting_id = create_meeting(&h.deps).await;

    let mut session = RoomSession::open(&meeting_id, &h.deps).await.unwrap();
    session.start_recording().await.unwrap();
    for _ in 0..2 {
        let event = session.next_event().await;
        session.handle_recognition_event(event);
    }
    session.stop_recording().unwrap();

    session.analyze().await.unwrap();
    let view = session.review_view().unwrap();
    assert_eq!(view.items.len(), 2);

    h.backlog.fail_on(view.items[0].title.clone());

    let response = session.approve_and_create().await.unwrap();
    assert!(response.partial);
    assert_eq!(response.report.failed_count(), 1);
    assert_eq!(response.report.counts.total(), 1);
    assert_eq!(h.backlog.created().len(), 1);

    // The meeting still completes; partial success is reported, not lost.
    let completed = h.deps.meeting_store.get(&meeting_id).await.unwrap().unwrap();
    assert_eq!(completed.status, MeetingStatus::Completed);
}

#[tokio::test]
async fn test_download_of_idle_session_writes_empty_file() {
    let recognizer = Arc::new(ScriptedRecognizer::with_utterances(&[]));
    let h = harness(recognizer);
    let meeting_id = create_meeting(&h.deps).await;

    let session = RoomSession::open(&meeting_id, &h.deps).await.unwrap();
    let path: PathBuf = session.download_transcript().unwrap();

    assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    assert!(path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("meeting-transcript-Sprint-Planning-"));
}
