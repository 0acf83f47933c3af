//! Voice list loading and voice selection.
//!
//! Engines may populate their voice list asynchronously, so callers wait a
//! bounded amount of time for it before choosing.

use std::time::Duration;

use readaloud_core::{SpeechEngine, VoiceInfo};
use tokio::time::{Instant, sleep};

/// What the caller would like to hear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoicePreference {
    /// Exact voice id or name.
    pub voice_id: Option<String>,
    /// BCP 47 language tag.
    pub lang: Option<String>,
}

impl VoicePreference {
    pub fn new(voice_id: Option<String>, lang: Option<String>) -> Self {
        Self { voice_id, lang }
    }
}

/// Poll the engine until it reports at least one voice or `timeout` elapses.
///
/// Returns whatever the engine has at the deadline, possibly nothing.
pub async fn wait_for_voices(
    engine: &dyn SpeechEngine,
    timeout: Duration,
    poll_interval: Duration,
) -> Vec<VoiceInfo> {
    let deadline = Instant::now() + timeout;
    loop {
        let voices = engine.voices();
        if !voices.is_empty() {
            return voices;
        }
        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(timeout_ms = timeout.as_millis(), "Voice list still empty after wait");
            return voices;
        }
        sleep(poll_interval.min(deadline - now)).await;
    }
}

/// Pick a voice from `voices`.
///
/// Order of preference:
/// 1. the voice named by `preference.voice_id`
/// 2. voices whose language matches `preference.lang` (or `fallback_lang`),
///    exact tag first, then primary subtag (`en` matches `en-GB`)
/// 3. any voice
///
/// Within each group local voices beat remote ones, then the engine default
/// wins, then list order.
pub fn select_voice(
    voices: &[VoiceInfo],
    preference: &VoicePreference,
    fallback_lang: Option<&str>,
) -> Option<VoiceInfo> {
    if let Some(wanted) = preference.voice_id.as_deref() {
        if let Some(voice) = voices.iter().find(|v| v.id == wanted || v.name == wanted) {
            return Some(voice.clone());
        }
        tracing::debug!(voice = wanted, "Preferred voice not installed");
    }

    if let Some(lang) = preference.lang.as_deref().or(fallback_lang) {
        let exact: Vec<&VoiceInfo> = voices
            .iter()
            .filter(|v| v.lang.eq_ignore_ascii_case(lang))
            .collect();
        if let Some(voice) = best_of(&exact) {
            return Some(voice.clone());
        }

        let primary = primary_subtag(lang);
        let related: Vec<&VoiceInfo> = voices
            .iter()
            .filter(|v| primary_subtag(&v.lang).eq_ignore_ascii_case(primary))
            .collect();
        if let Some(voice) = best_of(&related) {
            return Some(voice.clone());
        }
    }

    let all: Vec<&VoiceInfo> = voices.iter().collect();
    best_of(&all).cloned()
}

fn best_of<'a>(voices: &[&'a VoiceInfo]) -> Option<&'a VoiceInfo> {
    voices
        .iter()
        .copied()
        .min_by_key(|v| (!v.local_service, !v.is_default))
}

fn primary_subtag(lang: &str) -> &str {
    lang.split(['-', '_']).next().unwrap_or(lang)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSpeechEngine;
    use std::sync::Arc;

    fn catalog() -> Vec<VoiceInfo> {
        vec![
            VoiceInfo::new("remote-en-us", "en-US", false).with_default(true),
            VoiceInfo::new("local-en-gb", "en-GB", true),
            VoiceInfo::new("local-en-us", "en-US", true),
            VoiceInfo::new("local-de", "de-DE", true),
        ]
    }

    fn pick(pref: &VoicePreference, fallback: Option<&str>) -> Option<String> {
        select_voice(&catalog(), pref, fallback).map(|v| v.id)
    }

    #[test]
    fn explicit_voice_wins() {
        let pref = VoicePreference::new(Some("remote-en-us".into()), Some("de-DE".into()));
        assert_eq!(pick(&pref, None).as_deref(), Some("remote-en-us"));
    }

    #[test]
    fn exact_language_prefers_local() {
        let pref = VoicePreference::new(None, Some("en-us".into()));
        assert_eq!(pick(&pref, None).as_deref(), Some("local-en-us"));
    }

    #[test]
    fn primary_subtag_match() {
        let pref = VoicePreference::new(None, Some("de".into()));
        assert_eq!(pick(&pref, None).as_deref(), Some("local-de"));
        assert_eq!(
            pick(&VoicePreference::default(), Some("en-AU")).as_deref(),
            Some("local-en-gb")
        );
    }

    #[test]
    fn unknown_language_falls_back_to_any_local() {
        let pref = VoicePreference::new(Some("missing".into()), Some("ja-JP".into()));
        assert_eq!(pick(&pref, None).as_deref(), Some("local-en-gb"));
    }

    #[test]
    fn default_breaks_ties_among_remote_voices() {
        let voices = vec![
            VoiceInfo::new("a", "fr-FR", false),
            VoiceInfo::new("b", "fr-FR", false).with_default(true),
        ];
        let chosen = select_voice(&voices, &VoicePreference::default(), None);
        assert_eq!(chosen.map(|v| v.id).as_deref(), Some("b"));
    }

    #[test]
    fn empty_list_selects_nothing() {
        assert!(select_voice(&[], &VoicePreference::default(), Some("en")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_late_voices() {
        let engine = Arc::new(FakeSpeechEngine::with_voices(Vec::new()));
        let loader = Arc::clone(&engine);
        tokio::spawn(async move {
            sleep(Duration::from_millis(120)).await;
            loader.set_voices(vec![VoiceInfo::new("late", "en-US", true)]);
        });

        let voices =
            wait_for_voices(engine.as_ref(), Duration::from_secs(2), Duration::from_millis(50))
                .await;
        assert_eq!(voices.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_timeout() {
        let engine = FakeSpeechEngine::with_voices(Vec::new());
        let started = Instant::now();
        let voices =
            wait_for_voices(&engine, Duration::from_millis(300), Duration::from_millis(50)).await;
        assert!(voices.is_empty());
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
