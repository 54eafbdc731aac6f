//! The page context: observes the current location, owns the transcript
//! cache and answers bridge requests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use crate::bridge::{Message, RequestHandler, TimeNotifier, TranscriptResponse};
use crate::cache::TranscriptCache;
use crate::extractors::{extract_video_id, VideoId};
use crate::transcribe::TranscriptSource;
use crate::ErrorCode;

/// Source of the page location the session is attached to
pub trait LocationSource: Send + Sync {
    fn current_location(&self) -> Option<String>;
}

/// Location that can be changed from outside, e.g. by a navigation driver
#[derive(Debug, Default)]
pub struct SharedLocation {
    location: RwLock<Option<String>>,
}

impl SharedLocation {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: RwLock::new(Some(location.into())),
        }
    }

    pub fn set(&self, location: impl Into<String>) {
        let mut current = self.location.write().unwrap_or_else(|e| e.into_inner());
        *current = Some(location.into());
    }

    pub fn clear(&self) {
        let mut current = self.location.write().unwrap_or_else(|e| e.into_inner());
        *current = None;
    }
}

impl LocationSource for SharedLocation {
    fn current_location(&self) -> Option<String> {
        self.location.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Video id change detected by [`PageSession::poll_navigation`]
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationChange {
    pub previous: Option<VideoId>,
    pub current: Option<VideoId>,
}

#[derive(Default)]
struct Observed {
    location: Option<String>,
    video_id: Option<VideoId>,
}

/// Page-context state: one cache, one observed video
pub struct PageSession {
    cache: TranscriptCache,
    location: Arc<dyn LocationSource>,
    preferred_languages: Vec<String>,
    observed: Mutex<Observed>,
}

impl PageSession {
    pub fn new(
        source: Arc<dyn TranscriptSource>,
        location: Arc<dyn LocationSource>,
        preferred_languages: Vec<String>,
    ) -> Self {
        Self {
            cache: TranscriptCache::new(source),
            location,
            preferred_languages,
            observed: Mutex::new(Observed::default()),
        }
    }

    pub fn cache(&self) -> &TranscriptCache {
        &self.cache
    }

    /// Video id of the current location, if it is a watch page
    pub fn current_video_id(&self) -> Option<VideoId> {
        self.location
            .current_location()
            .as_deref()
            .and_then(extract_video_id)
    }

    /// Answer a `getTranscript` request for whatever video is showing now
    pub async fn get_transcript(&self) -> TranscriptResponse {
        let Some(video_id) = self.current_video_id() else {
            return TranscriptResponse::error(ErrorCode::NotWatchPage);
        };

        match self
            .cache
            .get_or_fetch(&video_id, &self.preferred_languages)
            .await
        {
            Ok(transcript) => TranscriptResponse::Transcript {
                transcript: (*transcript).clone(),
            },
            Err(e) => TranscriptResponse::error(e.code()),
        }
    }

    /// Check the location once; on a video change drop the stale cache entry.
    pub fn poll_navigation(&self) -> Option<NavigationChange> {
        let location = self.location.current_location();
        let mut observed = self.observed.lock().unwrap_or_else(|e| e.into_inner());

        if observed.location == location {
            return None;
        }
        observed.location = location.clone();

        let video_id = location.as_deref().and_then(extract_video_id);
        if video_id == observed.video_id {
            return None;
        }

        self.cache.observe(video_id.as_ref());
        let previous = std::mem::replace(&mut observed.video_id, video_id.clone());

        tracing::info!(
            "Navigation: {} -> {}",
            previous.as_ref().map_or("none", |id| id.as_str()),
            video_id.as_ref().map_or("none", |id| id.as_str())
        );

        Some(NavigationChange {
            previous,
            current: video_id,
        })
    }

    /// Start fetching the transcript for `video_id` in the background
    pub fn prefetch(self: &Arc<Self>, video_id: VideoId) -> tokio::task::JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = session
                .cache
                .get_or_fetch(&video_id, &session.preferred_languages)
                .await
            {
                tracing::debug!("Prefetch for {} failed: {}", video_id, e);
            }
        })
    }

    /// Poll the location every `interval`, prefetching on each new video.
    /// Runs until the task is dropped.
    pub async fn watch(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Some(NavigationChange {
                current: Some(video_id),
                ..
            }) = self.poll_navigation()
            {
                self.prefetch(video_id);
            }
        }
    }
}

#[async_trait]
impl RequestHandler for PageSession {
    async fn handle(&self, message: Message) -> Option<TranscriptResponse> {
        match message {
            Message::GetTranscript => Some(self.get_transcript().await),
            Message::TimeUpdate { .. } => None,
        }
    }
}

/// Simulated player clock for driving `timeupdate` without a real video
#[derive(Debug, Clone, Copy)]
pub struct PlaybackClock {
    origin: Instant,
    start: f64,
    rate: f64,
}

impl PlaybackClock {
    pub fn new(start: f64, rate: f64) -> Self {
        Self {
            origin: Instant::now(),
            start,
            rate,
        }
    }

    /// Playback position in seconds
    pub fn position(&self) -> f64 {
        self.position_after(self.origin.elapsed())
    }

    pub fn position_after(&self, elapsed: Duration) -> f64 {
        self.start + elapsed.as_secs_f64() * self.rate
    }
}

/// Publish the clock position every `interval` until the display hangs up
/// or `until` seconds of playback are reached.
pub async fn publish_playback(
    notifier: TimeNotifier,
    clock: PlaybackClock,
    interval: Duration,
    until: Option<f64>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let time = clock.position();
        if !notifier.notify_time(time) {
            break;
        }
        if until.is_some_and(|end| time >= end) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::{MockTranscriptSource, Snippet, Transcript};

    fn transcript_for(id: &VideoId) -> Transcript {
        Transcript {
            snippets: vec![Snippet {
                text: id.to_string(),
                start: 0.0,
                duration: 1.0,
            }],
            language_code: "en".to_string(),
            language_name: "English".to_string(),
        }
    }

    fn session_with(source: MockTranscriptSource, location: Arc<SharedLocation>) -> PageSession {
        PageSession::new(Arc::new(source), location, vec!["en".to_string()])
    }

    #[tokio::test]
    async fn test_not_watch_page() {
        let mut source = MockTranscriptSource::new();
        source.expect_fetch_transcript().never();

        let location = Arc::new(SharedLocation::new("https://www.youtube.com/feed/trending"));
        let session = session_with(source, location.clone());
        assert_eq!(
            session.get_transcript().await,
            TranscriptResponse::error(ErrorCode::NotWatchPage)
        );

        location.clear();
        assert_eq!(
            session.get_transcript().await,
            TranscriptResponse::error(ErrorCode::NotWatchPage)
        );
    }

    #[tokio::test]
    async fn test_error_code_is_forwarded() {
        let mut source = MockTranscriptSource::new();
        source
            .expect_fetch_transcript()
            .returning(|_, _| Err(crate::TranscriptError::AgeRestricted("inappropriate".to_string())));

        let location = Arc::new(SharedLocation::new("https://youtu.be/dQw4w9WgXcQ"));
        let session = session_with(source, location);
        assert_eq!(
            session.get_transcript().await,
            TranscriptResponse::error(ErrorCode::AgeRestricted)
        );
    }

    #[tokio::test]
    async fn test_navigation_discards_previous_transcript() {
        let mut source = MockTranscriptSource::new();
        source
            .expect_fetch_transcript()
            .times(2)
            .returning(|id, _| Ok(transcript_for(id)));

        let location = Arc::new(SharedLocation::new("https://www.youtube.com/watch?v=AAAAAAAAAAA"));
        let session = session_with(source, location.clone());
        let a = VideoId::parse("AAAAAAAAAAA").unwrap();
        let b = VideoId::parse("BBBBBBBBBBB").unwrap();

        assert_eq!(
            session.poll_navigation(),
            Some(NavigationChange { previous: None, current: Some(a.clone()) })
        );
        session.get_transcript().await;
        assert!(session.cache().cached(&a).is_some());

        // Same video, different timestamp: not a navigation
        location.set("https://www.youtube.com/watch?v=AAAAAAAAAAA&t=30");
        assert_eq!(session.poll_navigation(), None);
        assert!(session.cache().cached(&a).is_some());

        location.set("https://www.youtube.com/watch?v=BBBBBBBBBBB");
        assert_eq!(
            session.poll_navigation(),
            Some(NavigationChange { previous: Some(a.clone()), current: Some(b.clone()) })
        );
        assert!(session.cache().cached(&a).is_none());

        match session.get_transcript().await {
            TranscriptResponse::Transcript { transcript } => {
                assert_eq!(transcript.snippets[0].text, "BBBBBBBBBBB");
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_prefetch_fills_cache() {
        let mut source = MockTranscriptSource::new();
        source
            .expect_fetch_transcript()
            .times(1)
            .returning(|id, _| Ok(transcript_for(id)));

        let location = Arc::new(SharedLocation::new("https://youtu.be/dQw4w9WgXcQ"));
        let session = Arc::new(session_with(source, location));
        let id = session.current_video_id().unwrap();

        session.prefetch(id.clone()).await.unwrap();
        assert!(session.cache().cached(&id).is_some());

        // Served from cache, the mock allows only one fetch
        assert!(matches!(
            session.get_transcript().await,
            TranscriptResponse::Transcript { .. }
        ));
    }

    #[test]
    fn test_playback_clock() {
        let clock = PlaybackClock::new(10.0, 2.0);
        assert_eq!(clock.position_after(Duration::from_millis(1500)), 13.0);
        assert!(clock.position() >= 10.0);
    }
}
