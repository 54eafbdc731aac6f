//! Transcript Sync - fetch YouTube caption transcripts and follow playback
//!
//! This library reproduces the player's caption retrieval sequence (watch page,
//! embedded API key, player API, caption track list, timed-text document),
//! caches one transcript per observed video with single-flight fetching, and
//! maps playback time to the transcript line that should be highlighted.

pub mod bridge;
pub mod cache;
pub mod cli;
pub mod config;
pub mod extractors;
pub mod output;
pub mod session;
pub mod sync;
pub mod transcribe;
pub mod utils;

use serde::{Deserialize, Serialize};

pub use bridge::{BridgeClient, BridgeHost, Message, TranscriptResponse};
pub use cache::TranscriptCache;
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use extractors::{extract_video_id, CaptionTrack, VideoId};
pub use session::{LocationSource, PageSession};
pub use sync::{active_index, PlaybackTracker};
pub use transcribe::{Snippet, Transcript, TranscriptPipeline, TranscriptSource};

/// Result type used by the application layer
pub type Result<T> = anyhow::Result<T>;

/// Failures of the transcript retrieval sequence.
///
/// Each variant is classified at the stage that detected it and travels
/// unchanged through the cache to the bridge response. The type is `Clone`
/// because a single in-flight fetch hands its result to every waiter.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TranscriptError {
    #[error("Unable to load the video page: {0}")]
    PageLoad(String),

    #[error("Access was temporarily limited (human verification requested)")]
    AccessChallenge,

    #[error("Could not read video data: API key not found in watch page")]
    MalformedPage,

    #[error("Unable to load video data: {0}")]
    ApiRequest(String),

    #[error("YouTube is asking to verify you're not a bot: {0}")]
    BotCheck(String),

    #[error("This video is age-restricted: {0}")]
    AgeRestricted(String),

    #[error("This video is unavailable: {0}")]
    VideoUnavailable(String),

    #[error("This video can't be played (status {status}): {reason}")]
    PlaybackBlocked { status: String, reason: String },

    #[error("This video doesn't have captions available")]
    NoCaptions,

    #[error("Could not read video data: {0}")]
    MalformedApiResponse(String),

    #[error("No captions are available in your preferred languages")]
    NoPreferredLanguage,

    #[error("Could not load captions: {0}")]
    CaptionFetch(String),

    #[error("Could not parse caption document: {0}")]
    MalformedCaptions(String),
}

impl TranscriptError {
    /// Stable code used on the bridge wire and for hint lookup
    pub fn code(&self) -> ErrorCode {
        match self {
            TranscriptError::PageLoad(_) => ErrorCode::PageLoad,
            TranscriptError::AccessChallenge => ErrorCode::AccessChallenge,
            TranscriptError::MalformedPage => ErrorCode::MalformedPage,
            TranscriptError::ApiRequest(_) => ErrorCode::ApiRequest,
            TranscriptError::BotCheck(_) => ErrorCode::BotCheck,
            TranscriptError::AgeRestricted(_) => ErrorCode::AgeRestricted,
            TranscriptError::VideoUnavailable(_) => ErrorCode::VideoUnavailable,
            TranscriptError::PlaybackBlocked { .. } => ErrorCode::PlaybackBlocked,
            TranscriptError::NoCaptions => ErrorCode::NoCaptions,
            TranscriptError::MalformedApiResponse(_) => ErrorCode::MalformedApiResponse,
            TranscriptError::NoPreferredLanguage => ErrorCode::NoPreferredLanguage,
            TranscriptError::CaptionFetch(_) => ErrorCode::CaptionFetch,
            TranscriptError::MalformedCaptions(_) => ErrorCode::MalformedCaptions,
        }
    }
}

/// Wire-level error codes carried in `{ "error": ... }` bridge responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The observed location carries no video id
    NotWatchPage,
    PageLoad,
    AccessChallenge,
    MalformedPage,
    ApiRequest,
    BotCheck,
    AgeRestricted,
    VideoUnavailable,
    PlaybackBlocked,
    NoCaptions,
    MalformedApiResponse,
    NoPreferredLanguage,
    CaptionFetch,
    MalformedCaptions,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotWatchPage => "not_watch_page",
            ErrorCode::PageLoad => "page_load",
            ErrorCode::AccessChallenge => "access_challenge",
            ErrorCode::MalformedPage => "malformed_page",
            ErrorCode::ApiRequest => "api_request",
            ErrorCode::BotCheck => "bot_check",
            ErrorCode::AgeRestricted => "age_restricted",
            ErrorCode::VideoUnavailable => "video_unavailable",
            ErrorCode::PlaybackBlocked => "playback_blocked",
            ErrorCode::NoCaptions => "no_captions",
            ErrorCode::MalformedApiResponse => "malformed_api_response",
            ErrorCode::NoPreferredLanguage => "no_preferred_language",
            ErrorCode::CaptionFetch => "caption_fetch",
            ErrorCode::MalformedCaptions => "malformed_captions",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
