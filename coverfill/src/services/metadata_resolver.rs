//! Metadata resolver
//!
//! Ordered fallback chain over lookup providers. The first provider that
//! returns a match wins; a miss or a provider error moves on to the next
//! provider. No ranking or merging across providers.

use crate::models::{CanonicalMetadata, LookupOutcome};
use async_trait::async_trait;
use chrono::Utc;
use coverfill_common::events::{EnrichEvent, EventBus};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One external metadata lookup provider
///
/// A single network round trip per call. Transport and parse failures are
/// reported as `LookupOutcome::Error`, never as a Rust error.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Provider name for logs and events
    fn name(&self) -> &'static str;

    /// Best match for (artist?, title)
    async fn search(&self, artist: Option<&str>, title: &str) -> LookupOutcome;
}

/// Fallback chain over metadata providers
pub struct MetadataResolver {
    providers: Vec<Arc<dyn MetadataProvider>>,
    event_bus: EventBus,
}

impl MetadataResolver {
    /// Providers are tried in the given order
    pub fn new(providers: Vec<Arc<dyn MetadataProvider>>, event_bus: EventBus) -> Self {
        Self {
            providers,
            event_bus,
        }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Resolve canonical metadata from a filename guess
    ///
    /// `path` is only used to attribute log lines and events.
    pub async fn resolve(
        &self,
        artist: Option<&str>,
        title: &str,
        path: &Path,
    ) -> Option<CanonicalMetadata> {
        let title = title.trim();
        if title.is_empty() {
            debug!(path = %path.display(), "Empty title guess, lookup not attempted");
            return None;
        }
        let artist = artist.map(str::trim).filter(|a| !a.is_empty());

        for provider in &self.providers {
            let name = provider.name();

            info!(
                provider = name,
                "Searching {} for: {}{}",
                name,
                artist.map(|a| format!("{} - ", a)).unwrap_or_default(),
                title
            );

            match provider.search(artist, title).await {
                LookupOutcome::Match(metadata) => {
                    info!(
                        provider = name,
                        "Found metadata: {} - {} ({})",
                        metadata.artist,
                        metadata.title,
                        metadata.album.as_deref().unwrap_or("no album")
                    );
                    self.event_bus.emit_lossy(EnrichEvent::LookupMatched {
                        path: path.to_path_buf(),
                        provider: name.to_string(),
                        artist: metadata.artist.clone(),
                        title: metadata.title.clone(),
                        album: metadata.album.clone(),
                        timestamp: Utc::now(),
                    });
                    return Some(metadata);
                }
                LookupOutcome::NoMatch => {
                    info!(provider = name, "{} search found no match", name);
                    self.event_bus.emit_lossy(EnrichEvent::LookupMissed {
                        path: path.to_path_buf(),
                        provider: name.to_string(),
                        timestamp: Utc::now(),
                    });
                }
                LookupOutcome::Error(reason) => {
                    warn!(provider = name, error = %reason, "{} lookup failed", name);
                    self.event_bus.emit_lossy(EnrichEvent::LookupFailed {
                        path: path.to_path_buf(),
                        provider: name.to_string(),
                        reason,
                        timestamp: Utc::now(),
                    });
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        name: &'static str,
        outcome: LookupOutcome,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(name: &'static str, outcome: LookupOutcome) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MetadataProvider for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn search(&self, _artist: Option<&str>, _title: &str) -> LookupOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn discovery() -> CanonicalMetadata {
        CanonicalMetadata::new("Daft Punk", "One More Time", Some("Discovery")).unwrap()
    }

    fn chain_of(providers: &[&Arc<Scripted>]) -> Vec<Arc<dyn MetadataProvider>> {
        providers
            .iter()
            .map(|p| Arc::clone(p) as Arc<dyn MetadataProvider>)
            .collect()
    }

    fn resolver(providers: &[&Arc<Scripted>]) -> MetadataResolver {
        MetadataResolver::new(chain_of(providers), EventBus::new(16))
    }

    #[tokio::test]
    async fn test_primary_match_short_circuits() {
        let primary = Scripted::new("primary", LookupOutcome::Match(discovery()));
        let secondary = Scripted::new("secondary", LookupOutcome::NoMatch);
        let chain = resolver(&[&primary, &secondary]);

        let result = chain
            .resolve(Some("Daft Punk"), "One More Time", Path::new("a.mp3"))
            .await;

        assert_eq!(result, Some(discovery()));
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_error_falls_through_once() {
        let primary = Scripted::new("primary", LookupOutcome::Error("timeout".into()));
        let secondary = Scripted::new("secondary", LookupOutcome::Match(discovery()));
        let chain = resolver(&[&primary, &secondary]);

        let result = chain.resolve(None, "One More Time", Path::new("a.mp3")).await;

        assert_eq!(result, Some(discovery()));
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_miss_is_none() {
        let primary = Scripted::new("primary", LookupOutcome::NoMatch);
        let secondary = Scripted::new("secondary", LookupOutcome::Error("503".into()));
        let chain = resolver(&[&primary, &secondary]);

        let result = chain.resolve(None, "Unknown", Path::new("a.mp3")).await;

        assert_eq!(result, None);
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn test_blank_title_makes_no_calls() {
        let primary = Scripted::new("primary", LookupOutcome::Match(discovery()));
        let chain = resolver(&[&primary]);

        assert_eq!(chain.resolve(Some("X"), "  ", Path::new("a.mp3")).await, None);
        assert_eq!(primary.calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_and_error_are_distinct_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let primary = Scripted::new("primary", LookupOutcome::Error("boom".into()));
        let secondary = Scripted::new("secondary", LookupOutcome::NoMatch);
        let chain = MetadataResolver::new(chain_of(&[&primary, &secondary]), bus);

        chain.resolve(None, "Title", Path::new("a.mp3")).await;

        assert!(matches!(
            rx.try_recv().unwrap(),
            EnrichEvent::LookupFailed { ref provider, ref reason, .. }
                if provider == "primary" && reason == "boom"
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            EnrichEvent::LookupMissed { ref provider, .. } if provider == "secondary"
        ));
    }
}
