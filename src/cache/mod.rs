//! Per-video transcript cache with single-flight fetching.
//!
//! The cache holds at most one entry: the transcript (or pending fetch) for
//! the video currently being observed. Concurrent callers for the same video
//! share one pipeline run. Failures are handed to every waiter and then
//! forgotten, so the next call retries from scratch.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::extractors::VideoId;
use crate::transcribe::{Transcript, TranscriptSource};
use crate::TranscriptError;

type FetchResult = Result<Arc<Transcript>, TranscriptError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

enum EntryState {
    Pending(SharedFetch),
    Resolved(Arc<Transcript>),
}

struct CacheEntry {
    video_id: VideoId,
    /// Distinguishes fetches for the same id across invalidations
    generation: u64,
    state: EntryState,
}

/// What settling a finished fetch did to the slot
#[derive(Debug, Clone, Copy, PartialEq)]
enum Settled {
    Stored,
    Evicted,
    /// Already settled by another waiter, or the slot was cleared
    Unchanged,
    Superseded,
}

#[derive(Default)]
struct CacheSlot {
    entry: Option<CacheEntry>,
    next_generation: u64,
}

/// Memoized transcript for the observed video
pub struct TranscriptCache {
    source: Arc<dyn TranscriptSource>,
    slot: Mutex<CacheSlot>,
}

impl TranscriptCache {
    pub fn new(source: Arc<dyn TranscriptSource>) -> Self {
        Self {
            source,
            slot: Mutex::new(CacheSlot::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheSlot> {
        // The slot holds no invariant a panic could break halfway
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the transcript for `video_id`, fetching it at most once at a time.
    ///
    /// Asking for a different video than the cached one discards the old
    /// entry. A fetch whose entry was discarded while it ran still resolves
    /// for its own callers, but its result is not stored.
    pub async fn get_or_fetch(
        &self,
        video_id: &VideoId,
        preferred_languages: &[String],
    ) -> FetchResult {
        let (fetch, generation) = {
            let mut slot = self.lock();

            match slot.entry.as_ref() {
                Some(entry) if &entry.video_id == video_id => match &entry.state {
                    EntryState::Resolved(transcript) => {
                        tracing::debug!("Transcript cache hit for {}", video_id);
                        return Ok(Arc::clone(transcript));
                    }
                    EntryState::Pending(fetch) => {
                        tracing::debug!("Joining in-flight transcript fetch for {}", video_id);
                        (fetch.clone(), entry.generation)
                    }
                },
                _ => {
                    if let Some(previous) = &slot.entry {
                        tracing::debug!(
                            "Discarding cached transcript for {} in favour of {}",
                            previous.video_id,
                            video_id
                        );
                    }

                    let fetch = self.start_fetch(video_id, preferred_languages);
                    let generation = slot.next_generation;
                    slot.next_generation += 1;
                    slot.entry = Some(CacheEntry {
                        video_id: video_id.clone(),
                        generation,
                        state: EntryState::Pending(fetch.clone()),
                    });
                    (fetch, generation)
                }
            }
        };

        let result = fetch.await;
        let settled = self.settle(video_id, generation, &result);
        tracing::trace!("Settled fetch for {}: {:?}", video_id, settled);
        result
    }

    fn start_fetch(&self, video_id: &VideoId, preferred_languages: &[String]) -> SharedFetch {
        tracing::debug!("Starting transcript fetch for {}", video_id);

        let source = Arc::clone(&self.source);
        let video_id = video_id.clone();
        let preferred_languages = preferred_languages.to_vec();

        async move {
            source
                .fetch_transcript(&video_id, &preferred_languages)
                .await
                .map(Arc::new)
        }
        .boxed()
        .shared()
    }

    /// Record the outcome of a fetch if its entry is still the live one
    fn settle(&self, video_id: &VideoId, generation: u64, result: &FetchResult) -> Settled {
        let mut slot = self.lock();

        let entry = match slot.entry.as_mut() {
            None => return Settled::Unchanged,
            Some(entry) if entry.generation != generation => {
                tracing::debug!("Dropping superseded transcript result for {}", video_id);
                return Settled::Superseded;
            }
            Some(entry) => entry,
        };

        if matches!(entry.state, EntryState::Resolved(_)) {
            return Settled::Unchanged;
        }

        match result {
            Ok(transcript) => {
                entry.state = EntryState::Resolved(Arc::clone(transcript));
                Settled::Stored
            }
            Err(e) => {
                tracing::debug!("Not caching failed fetch for {}: {}", video_id, e.code());
                slot.entry = None;
                Settled::Evicted
            }
        }
    }

    /// React to the observed video changing.
    ///
    /// Any entry for a different id is discarded; `None` clears the cache.
    pub fn observe(&self, video_id: Option<&VideoId>) {
        let mut slot = self.lock();

        let keep = match (&slot.entry, video_id) {
            (Some(entry), Some(id)) => &entry.video_id == id,
            _ => false,
        };

        if !keep {
            if let Some(previous) = slot.entry.take() {
                tracing::debug!("Observed video changed; dropped entry for {}", previous.video_id);
            }
        }
    }

    /// Drop whatever the cache holds
    pub fn invalidate(&self) {
        self.lock().entry = None;
    }

    /// Resolved transcript for `video_id`, without fetching
    pub fn cached(&self, video_id: &VideoId) -> Option<Arc<Transcript>> {
        let slot = self.lock();
        match &slot.entry {
            Some(CacheEntry {
                video_id: cached_id,
                state: EntryState::Resolved(transcript),
                ..
            }) if cached_id == video_id => Some(Arc::clone(transcript)),
            _ => None,
        }
    }

    /// True while a fetch for `video_id` is in flight
    pub fn is_pending(&self, video_id: &VideoId) -> bool {
        let slot = self.lock();
        matches!(
            &slot.entry,
            Some(CacheEntry { video_id: cached_id, state: EntryState::Pending(_), .. })
                if cached_id == video_id
        )
    }
}
