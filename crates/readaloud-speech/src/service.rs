//! Reader service: the inbound command surface.
//!
//! Wires click resolution, the session registry and the speech adapter
//! together, and turns engine events into session updates.
//!
//! # Locking discipline
//!
//! Service state (registry and per-tab article cache) is protected by a
//! `std::sync::Mutex` that is never held across an `.await` point. The only
//! awaits are preference loads/saves and the adapter's bounded voice wait;
//! each happens between lock scopes, and every mutation completes inside a
//! single lock acquisition. Lock order is service before adapter.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use readaloud_core::{
    ArticleContent, ArticleExtractor, ArticleId, ClickResolver, ClickTarget, ControlAction,
    ControlCommand, DocumentTree, EngineEvent, EngineInbox, ExtractionConfig, PlaybackSession,
    PreferencesStore, PreferencesUpdate, ReaderError, ReaderEvent, ReaderEventEmitter,
    ReaderResult, RegistryConfig, RemovalReason, SessionId, SessionRegistry, SessionSnapshot,
    SpeechEngine, TabId, UserPreferences, engine_channel, extract_selection,
    validate_preferences,
};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::adapter::{SpeechAdapter, SpeechConfig, SpeechRequest, SpeechUpdate, StartFailure};
use crate::voices::VoicePreference;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Service settings.
#[derive(Debug, Clone)]
pub struct ReaderServiceConfig {
    pub registry: RegistryConfig,
    pub speech: SpeechConfig,
    pub extraction: ExtractionConfig,
    /// Period of the background idle sweep.
    pub sweep_interval: Duration,
}

impl Default for ReaderServiceConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            speech: SpeechConfig::default(),
            extraction: ExtractionConfig::default(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Article extracted for the page currently loaded in a tab.
#[derive(Debug)]
struct CachedPage {
    url: String,
    article: Arc<ArticleContent>,
}

#[derive(Debug)]
struct ServiceState {
    registry: SessionRegistry,
    pages: HashMap<TabId, CachedPage>,
}

/// Orchestrates reading sessions over one speech engine.
pub struct ReaderService {
    adapter: SpeechAdapter,
    extractor: ArticleExtractor,
    resolver: ClickResolver,
    store: Arc<dyn PreferencesStore>,
    emitter: Arc<dyn ReaderEventEmitter>,
    state: Mutex<ServiceState>,
    sweep_interval: Duration,
}

impl ReaderService {
    /// Create the service and the inbox its engine reports into.
    ///
    /// Engine events must be fed back through
    /// [`handle_engine_event`](Self::handle_engine_event), or by running
    /// [`run_engine_events`](Self::run_engine_events).
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        store: Arc<dyn PreferencesStore>,
        emitter: Arc<dyn ReaderEventEmitter>,
        config: ReaderServiceConfig,
    ) -> (Self, EngineInbox) {
        let (sender, inbox) = engine_channel();
        let service = Self {
            adapter: SpeechAdapter::new(engine, config.speech, sender),
            extractor: ArticleExtractor::new(config.extraction),
            resolver: ClickResolver::new(),
            store,
            emitter,
            state: Mutex::new(ServiceState {
                registry: SessionRegistry::new(config.registry),
                pages: HashMap::new(),
            }),
            sweep_interval: config.sweep_interval,
        };
        (service, inbox)
    }

    fn lock(&self) -> MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Starting ───────────────────────────────────────────────────

    /// Start reading the page in `tab` from the clicked position.
    ///
    /// The page's article is extracted on first use and cached per tab; a
    /// different `page_url` counts as navigation and replaces the cache.
    pub async fn start_reading_at(
        &self,
        tab: TabId,
        page_url: &str,
        tree: &dyn DocumentTree,
        target: ClickTarget,
    ) -> ReaderResult<SessionSnapshot> {
        let preferences = self.enabled_preferences().await?;
        let article = self.article_for(tab, page_url, tree)?;
        let resolved = self.resolver.resolve(tree, target, &article);
        tracing::info!(
            tab = tab.0,
            start_sentence = resolved.start_sentence_index,
            matched = resolved.matched,
            "Starting reading at click"
        );

        self.begin_session(
            tab,
            article.id,
            resolved.start_sentence_index,
            resolved.remaining_text,
            &preferences,
        )
        .await
    }

    /// Start reading a text selection. Selections are not cached.
    pub async fn start_reading_selection(
        &self,
        tab: TabId,
        page_url: &str,
        selection: &str,
        page_title: Option<&str>,
    ) -> ReaderResult<SessionSnapshot> {
        let preferences = self.enabled_preferences().await?;
        let article = extract_selection(selection, page_url, page_title)?;
        tracing::info!(tab = tab.0, words = article.word_count, "Starting reading of selection");

        self.begin_session(tab, article.id, 0, article.full_text, &preferences)
            .await
    }

    async fn enabled_preferences(&self) -> ReaderResult<UserPreferences> {
        let preferences = self.store.load().await?;
        if !preferences.enabled {
            return Err(ReaderError::Disabled);
        }
        Ok(preferences)
    }

    fn article_for(
        &self,
        tab: TabId,
        page_url: &str,
        tree: &dyn DocumentTree,
    ) -> ReaderResult<Arc<ArticleContent>> {
        if let Some(page) = self.lock().pages.get(&tab) {
            if page.url == page_url {
                return Ok(Arc::clone(&page.article));
            }
        }

        let article = Arc::new(self.extractor.extract(tree, page_url)?);
        let previous = self.lock().pages.insert(
            tab,
            CachedPage {
                url: page_url.to_string(),
                article: Arc::clone(&article),
            },
        );
        if let Some(previous) = previous.filter(|p| p.url != page_url) {
            tracing::debug!(tab = tab.0, old = %previous.url, new = page_url, "Tab navigated");
            self.unload_tab_sessions(tab);
        }
        Ok(article)
    }

    async fn begin_session(
        &self,
        tab: TabId,
        article_id: ArticleId,
        start_sentence_index: usize,
        text: String,
        preferences: &UserPreferences,
    ) -> ReaderResult<SessionSnapshot> {
        let mut session = PlaybackSession::new(article_id, tab, text, start_sentence_index);
        session.set_speed(preferences.default_speed)?;
        session.set_volume(preferences.default_volume)?;
        let voice = VoicePreference::new(preferences.voice.clone(), preferences.language.clone());
        let request = SpeechRequest::from_session(&session, voice);

        let session_id = {
            let mut state = self.lock();
            let snapshot = session.snapshot();
            let id = state.registry.register(session)?;
            self.emitter.emit(ReaderEvent::session_created(snapshot));
            id
        };

        let (rate, volume) = (request.rate, request.volume);
        match self.adapter.start_speech(request).await {
            Ok(start) => {
                let mut state = self.lock();
                self.release_preempted(&mut state, start.preempted);
                let Some(session) = state.registry.get_mut(session_id) else {
                    // Removed while the start was pending.
                    self.adapter.stop(session_id);
                    self.adapter.forget(session_id);
                    return Err(ReaderError::StartCancelled);
                };
                session.start()?;
                // Speed or volume commands may have landed during the voice wait.
                let resubmit = settings_changed(session, rate, volume)
                    .then(|| SpeechRequest::from_session(session, VoicePreference::default()));
                if let Some(request) = resubmit {
                    tracing::debug!(session_id = %session_id, "Settings changed while starting");
                    self.restart_locked(&mut state, session_id, request)?;
                }
                let snapshot = state
                    .registry
                    .get(session_id)
                    .map(PlaybackSession::snapshot)
                    .ok_or_else(|| ReaderError::session_not_found(session_id))?;
                self.emitter
                    .emit(ReaderEvent::session_updated(snapshot.clone()));
                Ok(snapshot)
            }
            Err(StartFailure {
                error: err,
                preempted,
            }) => {
                let removed = {
                    let mut state = self.lock();
                    self.release_preempted(&mut state, preempted);
                    state.registry.remove(session_id)
                };
                self.adapter.forget(session_id);
                if removed.is_some() {
                    tracing::warn!(session_id = %session_id, error = %err, "Session failed to start");
                    self.emitter
                        .emit(ReaderEvent::session_error(session_id, err.clone()));
                    self.emitter.emit(ReaderEvent::session_removed(
                        session_id,
                        RemovalReason::Stopped,
                    ));
                }
                Err(err)
            }
        }
    }

    /// Pause the session whose utterance was cancelled to make room for
    /// another, whether or not the new utterance went through.
    ///
    /// It stays registered at its position; `Play` takes the engine back.
    fn release_preempted(&self, state: &mut ServiceState, preempted: Option<SessionId>) {
        let Some(previous) = preempted else {
            return;
        };
        if let Some(session) = state.registry.get_mut(previous) {
            if session.is_playing() && session.pause().is_ok() {
                tracing::info!(session_id = %previous, "Session paused, engine taken over");
            }
            self.emitter
                .emit(ReaderEvent::session_updated(session.snapshot()));
        }
    }

    // ── Control ────────────────────────────────────────────────────

    /// Apply a UI control command.
    ///
    /// Returns the session's snapshot after the command; for `Stop` this is
    /// the final snapshot of the removed session.
    pub fn control(&self, command: ControlCommand) -> ReaderResult<SessionSnapshot> {
        let id = command.session_id;
        tracing::debug!(session_id = %id, action = command.action.as_str(), "Control command");
        let mut state = self.lock();

        match command.action {
            ControlAction::Play => {
                let session = state.registry.require_mut(id)?;
                session.resume()?;
                session.clear_error();
                if !self.adapter.resume(id) {
                    let request = SpeechRequest::from_session(session, VoicePreference::default());
                    self.restart_locked(&mut state, id, request)?;
                }
            }
            ControlAction::Pause => {
                state.registry.require_mut(id)?.pause()?;
                self.adapter.pause(id);
            }
            ControlAction::Stop => {
                let session = state.registry.require_mut(id)?;
                session.stop()?;
                let snapshot = session.snapshot();
                state.registry.remove(id);
                self.adapter.stop(id);
                self.adapter.forget(id);
                tracing::info!(session_id = %id, "Session stopped");
                self.emitter
                    .emit(ReaderEvent::session_removed(id, RemovalReason::Stopped));
                return Ok(snapshot);
            }
            ControlAction::Speed | ControlAction::Volume => {
                let value = command.required_value()?;
                let session = state.registry.require_mut(id)?;
                if command.action == ControlAction::Speed {
                    session.set_speed(value)?;
                } else {
                    session.set_volume(value)?;
                }
                if self.adapter.has_focus(id) {
                    if session.is_playing() {
                        let request =
                            SpeechRequest::from_session(session, VoicePreference::default());
                        self.restart_locked(&mut state, id, request)?;
                    } else {
                        // Paused: drop the utterance, `Play` resubmits at the new rate.
                        self.adapter.stop(id);
                    }
                }
            }
        }

        let snapshot = state
            .registry
            .get(id)
            .map(PlaybackSession::snapshot)
            .ok_or_else(|| ReaderError::session_not_found(id))?;
        self.emitter
            .emit(ReaderEvent::session_updated(snapshot.clone()));
        Ok(snapshot)
    }

    /// Resubmit `request`; on failure the session is marked failed.
    fn restart_locked(
        &self,
        state: &mut ServiceState,
        id: SessionId,
        request: SpeechRequest,
    ) -> ReaderResult<()> {
        match self.adapter.restart(request) {
            Ok(start) => {
                self.release_preempted(state, start.preempted);
                Ok(())
            }
            Err(StartFailure {
                error: err,
                preempted,
            }) => {
                self.release_preempted(state, preempted);
                if let Some(session) = state.registry.get_mut(id) {
                    session.mark_failed(err.to_string());
                    self.emitter
                        .emit(ReaderEvent::session_updated(session.snapshot()));
                }
                self.emitter.emit(ReaderEvent::session_error(id, err.clone()));
                Err(err)
            }
        }
    }

    // ── Engine events ──────────────────────────────────────────────

    /// Apply one engine event. Stale events are ignored.
    pub fn handle_engine_event(&self, event: &EngineEvent) {
        let Some(update) = self.adapter.handle_event(event) else {
            return;
        };
        let mut state = self.lock();

        match update {
            SpeechUpdate::Started { session_id } => {
                tracing::debug!(session_id = %session_id, "Engine started speaking");
            }
            SpeechUpdate::Position {
                session_id,
                word_index,
            } => {
                if let Some(session) = state.registry.get_mut(session_id) {
                    if session.update_position(word_index) {
                        self.emitter
                            .emit(ReaderEvent::session_updated(session.snapshot()));
                    }
                }
            }
            SpeechUpdate::Finished { session_id } => {
                if let Some(mut session) = state.registry.remove(session_id) {
                    session.mark_finished();
                    tracing::info!(session_id = %session_id, "Session finished reading");
                    self.emitter
                        .emit(ReaderEvent::session_updated(session.snapshot()));
                    self.emitter.emit(ReaderEvent::session_removed(
                        session_id,
                        RemovalReason::Completed,
                    ));
                }
                self.adapter.forget(session_id);
            }
            SpeechUpdate::Failed { session_id, reason } => {
                if let Some(session) = state.registry.get_mut(session_id) {
                    session.mark_failed(reason.clone());
                    self.emitter
                        .emit(ReaderEvent::session_updated(session.snapshot()));
                }
                self.emitter.emit(ReaderEvent::session_error(
                    session_id,
                    ReaderError::EngineFailure { reason },
                ));
            }
        }
    }

    /// Apply every event already queued in `inbox`. Returns how many were read.
    pub fn drain_engine_events(&self, inbox: &mut EngineInbox) -> usize {
        let mut count = 0;
        while let Some(event) = inbox.try_recv() {
            self.handle_engine_event(&event);
            count += 1;
        }
        count
    }

    /// Apply engine events until the inbox closes.
    pub async fn run_engine_events(&self, mut inbox: EngineInbox) {
        while let Some(event) = inbox.recv().await {
            self.handle_engine_event(&event);
        }
        tracing::debug!("Engine inbox closed");
    }

    // ── Page lifecycle ─────────────────────────────────────────────

    /// The tab was closed: forget its article and stop its sessions.
    pub fn page_closed(&self, tab: TabId) -> usize {
        self.lock().pages.remove(&tab);
        self.unload_tab_sessions(tab)
    }

    /// The tab loaded `url`: forget its article and stop its sessions.
    pub fn page_navigated(&self, tab: TabId, url: &str) -> usize {
        tracing::debug!(tab = tab.0, url, "Page navigated");
        self.page_closed(tab)
    }

    fn unload_tab_sessions(&self, tab: TabId) -> usize {
        let mut state = self.lock();
        let ids = state.registry.ids_for_tab(tab);
        for &id in &ids {
            state.registry.remove(id);
            self.adapter.stop(id);
            self.adapter.forget(id);
            self.emitter
                .emit(ReaderEvent::session_removed(id, RemovalReason::PageUnloaded));
        }
        if !ids.is_empty() {
            tracing::info!(tab = tab.0, stopped = ids.len(), "Stopped sessions of unloaded page");
        }
        ids.len()
    }

    // ── Maintenance ────────────────────────────────────────────────

    /// Remove sessions idle past the registry timeout.
    pub fn sweep_idle(&self) -> usize {
        let mut state = self.lock();
        let expired = state.registry.drain_expired(Utc::now());
        for session in &expired {
            let id = session.id();
            self.adapter.stop(id);
            self.adapter.forget(id);
            self.emitter
                .emit(ReaderEvent::session_removed(id, RemovalReason::Expired));
        }
        if !expired.is_empty() {
            tracing::info!(
                removed = expired.len(),
                remaining = state.registry.len(),
                "Swept idle sessions"
            );
        }
        expired.len()
    }

    /// Run [`sweep_idle`](Self::sweep_idle) every sweep interval until
    /// `cancel` fires.
    pub fn spawn_sweeper(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.sweep_idle();
                    }
                }
            }
            tracing::debug!("Session sweeper stopped");
        })
    }

    // ── Preferences ────────────────────────────────────────────────

    pub async fn preferences(&self) -> ReaderResult<UserPreferences> {
        Ok(self.store.load().await?)
    }

    /// Persist the master toggle. Turning it off stops every session.
    pub async fn set_enabled(&self, enabled: bool) -> ReaderResult<()> {
        let mut preferences = self.store.load().await?;
        preferences.enabled = enabled;
        self.store.save(&preferences).await?;
        tracing::info!(enabled, "Reader toggled");

        if !enabled {
            self.stop_all();
        }
        Ok(())
    }

    /// Merge, validate and persist a partial preferences update.
    pub async fn update_preferences(
        &self,
        update: PreferencesUpdate,
    ) -> ReaderResult<UserPreferences> {
        let mut preferences = self.store.load().await?;
        preferences.merge(&update);
        validate_preferences(&preferences)?;
        self.store.save(&preferences).await?;
        if !preferences.enabled {
            self.stop_all();
        }
        Ok(preferences)
    }

    fn stop_all(&self) {
        let mut state = self.lock();
        self.adapter.stop_all();
        let ids: Vec<SessionId> = state.registry.all().iter().map(|s| s.id()).collect();
        for id in ids {
            state.registry.remove(id);
            self.adapter.forget(id);
            self.emitter
                .emit(ReaderEvent::session_removed(id, RemovalReason::Stopped));
        }
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Snapshots of every live session, oldest first.
    pub fn sessions(&self) -> Vec<SessionSnapshot> {
        self.lock()
            .registry
            .all()
            .into_iter()
            .map(PlaybackSession::snapshot)
            .collect()
    }

    pub fn session(&self, id: SessionId) -> Option<SessionSnapshot> {
        self.lock().registry.get(id).map(PlaybackSession::snapshot)
    }

    /// Session currently driving the engine.
    pub fn engine_focus(&self) -> Option<SessionId> {
        self.adapter.focus_session()
    }

    /// Article cached for the tab's current page.
    pub fn cached_article(&self, tab: TabId) -> Option<Arc<ArticleContent>> {
        self.lock()
            .pages
            .get(&tab)
            .map(|page| Arc::clone(&page.article))
    }
}

/// Whether the session's rate or volume differs from what was submitted.
fn settings_changed(session: &PlaybackSession, rate: f32, volume: f32) -> bool {
    (session.speed() - rate).abs() > f32::EPSILON
        || (session.volume() - volume).abs() > f32::EPSILON
}

impl std::fmt::Debug for ReaderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderService")
            .field("adapter", &self.adapter)
            .field("sweep_interval", &self.sweep_interval)
            .finish_non_exhaustive()
    }
}
