//! Read command handler.
//!
//! Runs the full reader flow against the console engine: extract, resolve
//! the start position, create a session and pump engine events until the
//! session finishes. Ctrl-C stops the session.

use std::sync::Arc;

use anyhow::Result;
use readaloud_core::{
    ArticleExtractor, CaretPosition, ClickTarget, ControlAction, ControlCommand, DocumentTree,
    EngineInbox, MemoryDocument, MemoryPreferencesStore, ReaderError, ReaderEvent,
    ReaderEventEmitter, SessionId, SessionState, TabId, UserPreferences, validate_preferences,
};
use readaloud_speech::{ReaderService, ReaderServiceConfig};

use super::{file_url, load_document};
use crate::console_engine::ConsoleEngine;
use crate::error::CliError;
use crate::parser::ReadArgs;

const CONSOLE_TAB: TabId = TabId(1);

/// Logs reader events at debug level.
#[derive(Debug, Clone, Copy, Default)]
struct LogEmitter;

impl ReaderEventEmitter for LogEmitter {
    fn emit(&self, event: ReaderEvent) {
        match &event {
            ReaderEvent::SessionError { error, .. } => {
                tracing::warn!(session_id = %event.session_id(), %error, "Session error");
            }
            _ => tracing::debug!(
                event = event.event_name(),
                session_id = %event.session_id(),
                "Reader event"
            ),
        }
    }

    fn clone_box(&self) -> Box<dyn ReaderEventEmitter> {
        Box::new(*self)
    }
}

/// Execute the read command.
pub async fn execute(args: &ReadArgs) -> Result<()> {
    let doc = load_document(&args.file)?;
    let url = file_url(&args.file);

    let preferences = UserPreferences {
        default_speed: args.speed,
        default_volume: args.volume,
        ..UserPreferences::default()
    };
    validate_preferences(&preferences).map_err(CliError::from)?;
    let target = start_target(&doc, &url, args)?;

    let (service, mut inbox) = ReaderService::new(
        Arc::new(ConsoleEngine::new(args.wpm)),
        Arc::new(MemoryPreferencesStore::new(preferences)),
        Arc::new(LogEmitter),
        ReaderServiceConfig::default(),
    );

    let session = service
        .start_reading_at(CONSOLE_TAB, &url, &doc, target)
        .await
        .map_err(CliError::from)?;
    if let Some(article) = service.cached_article(CONSOLE_TAB) {
        println!(
            "{} ({} of {} sentences)\n",
            article.title,
            article.sentence_count() - session.start_sentence_index,
            article.sentence_count()
        );
    }

    follow(&service, &mut inbox, session.session_id).await?;
    Ok(())
}

/// Apply engine events until the session ends. Ctrl-C stops it.
///
/// A session that stops playing without finishing (an engine error leaves
/// it paused) is reported as an engine failure.
async fn follow(
    service: &ReaderService,
    inbox: &mut EngineInbox,
    id: SessionId,
) -> Result<(), CliError> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            event = inbox.recv() => {
                let Some(event) = event else { return Ok(()) };
                service.handle_engine_event(&event);
                match service.session(id) {
                    None => return Ok(()),
                    Some(snapshot) if snapshot.state != SessionState::Playing => {
                        let reason = snapshot
                            .last_error
                            .unwrap_or_else(|| format!("session is {:?}", snapshot.state));
                        println!();
                        return Err(ReaderError::EngineFailure { reason }.into());
                    }
                    Some(_) => {}
                }
            }
            _ = &mut ctrl_c => {
                println!();
                service.control(ControlCommand::new(ControlAction::Stop, id))?;
                return Ok(());
            }
        }
    }
}

/// Where to start: a phrase, an article sentence, or the top.
fn start_target(
    doc: &MemoryDocument,
    url: &str,
    args: &ReadArgs,
) -> Result<ClickTarget, CliError> {
    let phrase = match (&args.from, args.sentence) {
        (Some(phrase), _) => phrase.clone(),
        (None, Some(index)) => {
            let article = ArticleExtractor::default().extract(doc, url)?;
            let count = article.sentence_count();
            article
                .sentences
                .into_iter()
                .nth(index)
                .map(|span| span.text)
                .ok_or_else(|| {
                    CliError::Arguments(format!(
                        "sentence {index} is out of range, the article has {count}"
                    ))
                })?
        }
        (None, None) => return Ok(ClickTarget::Node { node: doc.root() }),
    };

    locate(doc, &phrase)
        .map(ClickTarget::Caret)
        .ok_or_else(|| CliError::Arguments(format!("phrase not found on page: {phrase}")))
}

/// Caret where the longest leading part of `phrase` starts on the page.
///
/// Text nodes are searched as one run so a phrase split by inline markup
/// (links, emphasis) is still found. The phrase is shortened word by word
/// when the page wraps it differently.
fn locate(doc: &MemoryDocument, phrase: &str) -> Option<CaretPosition> {
    let nodes: Vec<_> = doc
        .descendants(doc.root())
        .into_iter()
        .filter_map(|id| doc.text(id).map(|text| (id, text)))
        .collect();
    let flat: String = nodes.iter().map(|(_, text)| *text).collect();

    let words: Vec<&str> = phrase.split_whitespace().collect();
    let at = (1..=words.len())
        .rev()
        .find_map(|n| flat.find(&words[..n].join(" ")))?;

    let mut start = 0;
    for (node, text) in nodes {
        if at < start + text.len() {
            return Some(CaretPosition {
                node,
                offset: at - start,
            });
        }
        start += text.len();
    }
    None
}
