//! Integration tests for reading sessions driven through `ReaderService`.
//!
//! A `FakeSpeechEngine` stands in for the platform engine; the preferences
//! store and event emitter are mockall mocks so each test states exactly
//! which store calls and events it expects.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use readaloud_core::{
    BoundaryKind, ControlAction, ControlCommand, EngineInbox, MemoryPreferencesStore,
    NoopEmitter, PreferencesStore, PreferencesStoreError, ReaderError, ReaderEvent,
    ReaderEventEmitter, RemovalReason, SessionState, SpeechEngine, TabId, UserPreferences,
};
use readaloud_speech::{EngineCall, FakeSpeechEngine, ReaderService, ReaderServiceConfig};

// ── Mock ports ─────────────────────────────────────────────────────

mock! {
    Store {}

    #[async_trait]
    impl PreferencesStore for Store {
        async fn load(&self) -> Result<UserPreferences, PreferencesStoreError>;
        async fn save(&self, preferences: &UserPreferences) -> Result<(), PreferencesStoreError>;
    }
}

mock! {
    Emitter {}

    impl ReaderEventEmitter for Emitter {
        fn emit(&self, event: ReaderEvent);
        fn clone_box(&self) -> Box<dyn ReaderEventEmitter>;
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Emitter that keeps every event for later inspection.
#[derive(Clone, Default)]
struct RecordingEmitter {
    events: Arc<Mutex<Vec<ReaderEvent>>>,
}

impl RecordingEmitter {
    fn take(&self) -> Vec<ReaderEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl ReaderEventEmitter for RecordingEmitter {
    fn emit(&self, event: ReaderEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn clone_box(&self) -> Box<dyn ReaderEventEmitter> {
        Box::new(self.clone())
    }
}

fn service_with(
    engine: &Arc<FakeSpeechEngine>,
    store: Arc<dyn PreferencesStore>,
    emitter: Arc<dyn ReaderEventEmitter>,
) -> (ReaderService, EngineInbox) {
    ReaderService::new(engine.clone(), store, emitter, ReaderServiceConfig::default())
}

fn default_service() -> (ReaderService, EngineInbox, Arc<FakeSpeechEngine>, RecordingEmitter) {
    let engine = Arc::new(FakeSpeechEngine::new());
    let emitter = RecordingEmitter::default();
    let (service, inbox) = service_with(
        &engine,
        Arc::new(MemoryPreferencesStore::default()),
        Arc::new(emitter.clone()),
    );
    (service, inbox, engine, emitter)
}

// ── Engine focus ───────────────────────────────────────────────────

#[tokio::test]
async fn starting_b_cancels_a_once_and_ignores_stale_a_events() {
    let (service, mut inbox, engine, _events) = default_service();

    let a = service
        .start_reading_selection(TabId(1), "https://a.example/", "Alpha one. Alpha two.", None)
        .await
        .unwrap();
    let a_callbacks = engine.last_utterance().unwrap().callbacks;
    engine.clear_calls();

    let b = service
        .start_reading_selection(TabId(2), "https://b.example/", "Beta one. Beta two.", None)
        .await
        .unwrap();
    let b_utterance = engine.last_utterance().unwrap().id;

    assert_eq!(
        engine.calls(),
        vec![EngineCall::Cancel, EngineCall::Speak(b_utterance)]
    );
    assert_eq!(service.engine_focus(), Some(b.session_id));

    let a_before = service.session(a.session_id).unwrap();
    assert_eq!(a_before.state, SessionState::Paused);

    // The cancelled utterance keeps reporting.
    a_callbacks.on_boundary(6, BoundaryKind::Word);
    a_callbacks.on_error("interrupted");
    a_callbacks.on_end();
    service.drain_engine_events(&mut inbox);

    let a_after = service.session(a.session_id).unwrap();
    assert_eq!(a_after.state, a_before.state);
    assert_eq!(a_after.word_index, a_before.word_index);
    assert_eq!(a_after.last_error, None);

    let b_after = service.session(b.session_id).unwrap();
    assert_eq!(b_after.state, SessionState::Playing);
    assert_eq!(b_after.word_index, 0);
    assert_eq!(service.engine_focus(), Some(b.session_id));
}

#[tokio::test]
async fn play_on_preempted_session_takes_engine_back() {
    let (service, _inbox, engine, _events) = default_service();
    let a = service
        .start_reading_selection(TabId(1), "u", "First text to read.", None)
        .await
        .unwrap();
    let b = service
        .start_reading_selection(TabId(2), "u", "Second text to read.", None)
        .await
        .unwrap();

    let resumed = service
        .control(ControlCommand::new(ControlAction::Play, a.session_id))
        .unwrap();

    assert_eq!(resumed.state, SessionState::Playing);
    assert_eq!(service.engine_focus(), Some(a.session_id));
    assert_eq!(
        service.session(b.session_id).unwrap().state,
        SessionState::Paused
    );
    assert_eq!(engine.last_utterance().unwrap().text, "First text to read.");
    assert_eq!(engine.cancel_count(), 2);
}

// ── Registry limits ────────────────────────────────────────────────

#[tokio::test]
async fn eleventh_session_is_rejected() {
    let (service, _inbox, _engine, _events) = default_service();
    for tab in 1..=10 {
        service
            .start_reading_selection(TabId(tab), "u", "Some words to read.", None)
            .await
            .unwrap();
    }
    assert_eq!(service.sessions().len(), 10);

    let err = service
        .start_reading_selection(TabId(11), "u", "One more.", None)
        .await
        .unwrap_err();

    assert_eq!(err, ReaderError::SessionLimitExceeded { max: 10 });
    assert_eq!(service.sessions().len(), 10);
}

// ── Control commands ───────────────────────────────────────────────

#[tokio::test]
async fn out_of_range_speed_is_rejected_without_change() {
    let (service, _inbox, engine, _events) = default_service();
    let id = service
        .start_reading_selection(TabId(1), "u", "Some words to read.", None)
        .await
        .unwrap()
        .session_id;
    service.control(ControlCommand::speed(id, 1.5)).unwrap();
    let utterances = engine.utterances().len();

    let err = service.control(ControlCommand::speed(id, 2.5)).unwrap_err();

    assert!(matches!(err, ReaderError::InvalidParameter { .. }));
    assert!((service.session(id).unwrap().speed - 1.5).abs() < f32::EPSILON);
    assert_eq!(engine.utterances().len(), utterances);
}

#[tokio::test]
async fn speed_without_value_is_rejected() {
    let (service, _inbox, _engine, _events) = default_service();
    let id = service
        .start_reading_selection(TabId(1), "u", "Some words.", None)
        .await
        .unwrap()
        .session_id;

    let err = service
        .control(ControlCommand::new(ControlAction::Speed, id))
        .unwrap_err();
    assert!(matches!(err, ReaderError::InvalidParameter { .. }));
}

#[tokio::test]
async fn pause_is_idempotent_and_resume_needs_pause() {
    let (service, _inbox, engine, _events) = default_service();
    let id = service
        .start_reading_selection(TabId(1), "u", "Some words to read.", None)
        .await
        .unwrap()
        .session_id;

    let err = service
        .control(ControlCommand::new(ControlAction::Play, id))
        .unwrap_err();
    assert!(matches!(err, ReaderError::InvalidState { .. }));

    let once = service
        .control(ControlCommand::new(ControlAction::Pause, id))
        .unwrap();
    let twice = service
        .control(ControlCommand::new(ControlAction::Pause, id))
        .unwrap();
    assert_eq!(once.state, SessionState::Paused);
    assert_eq!(twice.state, SessionState::Paused);
    assert!(!twice.is_playing && twice.is_paused);
    assert!(engine.is_paused());

    let resumed = service
        .control(ControlCommand::new(ControlAction::Play, id))
        .unwrap();
    assert!(resumed.is_playing && !resumed.is_paused);
    assert!(engine.calls().contains(&EngineCall::Resume));
}

#[tokio::test]
async fn stop_removes_session_and_rejects_later_commands() {
    let (service, _inbox, engine, events) = default_service();
    let id = service
        .start_reading_selection(TabId(1), "u", "Some words.", None)
        .await
        .unwrap()
        .session_id;
    events.take();

    let last = service
        .control(ControlCommand::new(ControlAction::Stop, id))
        .unwrap();
    assert_eq!(last.state, SessionState::Stopped);
    assert!(service.session(id).is_none());
    assert_eq!(engine.cancel_count(), 1);
    assert_eq!(
        events.take(),
        vec![ReaderEvent::session_removed(id, RemovalReason::Stopped)]
    );

    let err = service
        .control(ControlCommand::new(ControlAction::Pause, id))
        .unwrap_err();
    assert!(matches!(err, ReaderError::SessionNotFound { .. }));
}

// ── Environment failures ───────────────────────────────────────────

#[tokio::test]
async fn unsupported_platform_reports_and_cleans_up() {
    let engine = Arc::new(FakeSpeechEngine::unsupported());
    let emitter = RecordingEmitter::default();
    let (service, _inbox) = service_with(
        &engine,
        Arc::new(MemoryPreferencesStore::default()),
        Arc::new(emitter.clone()),
    );

    let err = service
        .start_reading_selection(TabId(1), "u", "Some words.", None)
        .await
        .unwrap_err();

    assert_eq!(err, ReaderError::SpeechNotSupported);
    assert!(service.sessions().is_empty());
    let names: Vec<_> = emitter.take().iter().map(ReaderEvent::event_name).collect();
    assert_eq!(
        names,
        vec!["session:created", "session:error", "session:removed"]
    );
}

#[tokio::test]
async fn empty_selection_never_creates_a_session() {
    let mut emitter = MockEmitter::new();
    emitter.expect_emit().never();
    let engine = Arc::new(FakeSpeechEngine::new());
    let (service, _inbox) = service_with(
        &engine,
        Arc::new(MemoryPreferencesStore::default()),
        Arc::new(emitter),
    );

    let err = service
        .start_reading_selection(TabId(1), "u", "  \n ", None)
        .await
        .unwrap_err();
    assert_eq!(err, ReaderError::EmptySelection);
    assert!(engine.calls().is_empty());
}

// ── Preferences store ──────────────────────────────────────────────

#[tokio::test]
async fn store_failure_blocks_start() {
    let mut store = MockStore::new();
    store
        .expect_load()
        .times(1)
        .returning(|| Err(PreferencesStoreError::Unavailable("sync offline".into())));
    let engine = Arc::new(FakeSpeechEngine::new());
    let (service, _inbox) = service_with(&engine, Arc::new(store), Arc::new(NoopEmitter::new()));

    let err = service
        .start_reading_selection(TabId(1), "u", "Some words.", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ReaderError::Preferences { .. }));
    assert!(engine.utterances().is_empty());
}

#[tokio::test]
async fn set_enabled_persists_toggle() {
    let mut store = MockStore::new();
    store
        .expect_load()
        .times(1)
        .returning(|| Ok(UserPreferences::default()));
    store
        .expect_save()
        .withf(|preferences| !preferences.enabled)
        .times(1)
        .returning(|_| Ok(()));
    let engine = Arc::new(FakeSpeechEngine::new());
    let (service, _inbox) = service_with(&engine, Arc::new(store), Arc::new(NoopEmitter::new()));

    service.set_enabled(false).await.unwrap();
}

#[tokio::test]
async fn session_defaults_come_from_store() {
    let mut store = MockStore::new();
    store.expect_load().returning(|| {
        Ok(UserPreferences {
            default_speed: 0.75,
            default_volume: 0.4,
            voice: Some("fake-en-us".into()),
            ..UserPreferences::default()
        })
    });
    let engine = Arc::new(FakeSpeechEngine::new());
    let (service, _inbox) = service_with(&engine, Arc::new(store), Arc::new(NoopEmitter::new()));

    let snapshot = service
        .start_reading_selection(TabId(1), "u", "Some words.", None)
        .await
        .unwrap();

    let utterance = engine.last_utterance().unwrap();
    assert!((snapshot.speed - 0.75).abs() < f32::EPSILON);
    assert!((utterance.rate - 0.75).abs() < f32::EPSILON);
    assert!((utterance.volume - 0.4).abs() < f32::EPSILON);
    assert_eq!(utterance.voice.map(|v| v.id).as_deref(), Some("fake-en-us"));
}

// ── Event stream ───────────────────────────────────────────────────

#[tokio::test]
async fn full_read_emits_lifecycle_events() {
    let (service, inbox, engine, events) = default_service();
    let service = Arc::new(service);
    let pump = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.run_engine_events(inbox).await }
    });

    let id = service
        .start_reading_selection(TabId(1), "u", "Read me now.", None)
        .await
        .unwrap()
        .session_id;
    let callbacks = engine.last_utterance().unwrap().callbacks;
    callbacks.on_start();
    callbacks.on_boundary(5, BoundaryKind::Word);
    callbacks.on_end();

    tokio::time::timeout(Duration::from_secs(1), async {
        while service.session(id).is_some() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    pump.abort();

    let events = events.take();
    let last = events.last().unwrap();
    assert_eq!(
        *last,
        ReaderEvent::session_removed(id, RemovalReason::Completed)
    );
    let json = serde_json::to_value(last).unwrap();
    assert_eq!(json["type"], "session_removed");
    assert_eq!(json["reason"], "completed");

    let final_update = events
        .iter()
        .rev()
        .find_map(|event| match event {
            ReaderEvent::SessionUpdated { session } => Some(session.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(final_update.word_index, final_update.total_words);
    assert_eq!(final_update.state, SessionState::Stopped);
}
