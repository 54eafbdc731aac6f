use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use transcript_sync::bridge::{self, TranscriptResponse};
use transcript_sync::extractors::VideoId;
use transcript_sync::session::{publish_playback, PageSession, PlaybackClock, SharedLocation};
use transcript_sync::sync::PlaybackTracker;
use transcript_sync::transcribe::{Snippet, Transcript, TranscriptSource};
use transcript_sync::{ErrorCode, TranscriptError};

/// Slow source that records how many pipeline runs were started
struct CountingSource {
    calls: AtomicUsize,
    delay: Duration,
}

#[async_trait]
impl TranscriptSource for CountingSource {
    async fn fetch_transcript(
        &self,
        video_id: &VideoId,
        preferred_languages: &[String],
    ) -> Result<Transcript, TranscriptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        if video_id.as_str() == "nocaptions1" {
            return Err(TranscriptError::NoCaptions);
        }

        Ok(Transcript {
            snippets: vec![
                Snippet { text: format!("{} line one", video_id), start: 0.0, duration: 0.1 },
                Snippet { text: format!("{} line two", video_id), start: 0.1, duration: 0.1 },
            ],
            language_code: preferred_languages.first().cloned().unwrap_or_default(),
            language_name: "English".to_string(),
        })
    }
}

fn setup(location: &str) -> (Arc<CountingSource>, Arc<SharedLocation>, Arc<PageSession>) {
    let source = Arc::new(CountingSource {
        calls: AtomicUsize::new(0),
        delay: Duration::from_millis(50),
    });
    let location = Arc::new(SharedLocation::new(location));
    let session = Arc::new(PageSession::new(
        source.clone(),
        location.clone(),
        vec!["en".to_string()],
    ));
    (source, location, session)
}

#[tokio::test]
async fn concurrent_requests_share_one_fetch() {
    let (source, _location, session) = setup("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    let (host, client) = bridge::channel(8);
    tokio::spawn(host.serve(session));

    let (first, second) = tokio::join!(client.get_transcript(), client.get_transcript());
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first, second);
    assert!(matches!(first, TranscriptResponse::Transcript { .. }));
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);

    // Later requests are served from the cache
    client.get_transcript().await.unwrap();
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn not_watch_page_sentinel() {
    let (source, _location, session) = setup("https://www.youtube.com/results?search_query=rust");
    let (host, client) = bridge::channel(8);
    tokio::spawn(host.serve(session));

    let response = client.get_transcript().await.unwrap();
    assert_eq!(response, TranscriptResponse::error(ErrorCode::NotWatchPage));
    assert_eq!(
        serde_json::to_string(&response).unwrap(),
        r#"{"error":"not_watch_page"}"#
    );
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failures_are_retried_on_next_request() {
    let (source, _location, session) = setup("https://youtu.be/nocaptions1");
    let (host, client) = bridge::channel(8);
    tokio::spawn(host.serve(session));

    for _ in 0..2 {
        let response = client.get_transcript().await.unwrap();
        assert_eq!(response, TranscriptResponse::error(ErrorCode::NoCaptions));
    }
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn navigation_serves_the_new_video() {
    let (source, location, session) = setup("https://www.youtube.com/watch?v=AAAAAAAAAAA");
    let (host, client) = bridge::channel(8);
    tokio::spawn(host.serve(session.clone()));
    let watcher = tokio::spawn(session.clone().watch(Duration::from_millis(10)));

    let first = client.get_transcript().await.unwrap();
    location.set("https://www.youtube.com/watch?v=BBBBBBBBBBB");
    tokio::time::sleep(Duration::from_millis(40)).await;
    let second = client.get_transcript().await.unwrap();
    watcher.abort();

    let text = |response: &TranscriptResponse| match response {
        TranscriptResponse::Transcript { transcript } => transcript.snippets[0].text.clone(),
        other => panic!("unexpected response: {:?}", other),
    };
    assert_eq!(text(&first), "AAAAAAAAAAA line one");
    assert_eq!(text(&second), "BBBBBBBBBBB line one");
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn display_follows_published_playback() {
    let (_source, _location, session) = setup("https://youtu.be/dQw4w9WgXcQ");
    let (host, mut client) = bridge::channel(64);
    let notifier = host.notifier();
    tokio::spawn(host.serve(session));

    let transcript = match client.get_transcript().await.unwrap() {
        TranscriptResponse::Transcript { transcript } => transcript,
        other => panic!("unexpected response: {:?}", other),
    };

    tokio::spawn(publish_playback(
        notifier,
        PlaybackClock::new(0.0, 1.0),
        Duration::from_millis(5),
        Some(0.2),
    ));

    let mut tracker = PlaybackTracker::new(transcript.snippets);
    let mut highlighted = Vec::new();
    while let Some(time) = client.next_time_update().await {
        if let Some(change) = tracker.update(time) {
            highlighted.push(change.current);
        }
        if time >= 0.2 {
            break;
        }
    }

    assert_eq!(highlighted.first(), Some(&Some(0)));
    assert!(highlighted.contains(&Some(1)));
}
