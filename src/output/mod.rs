use anyhow::Result;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::transcribe::Transcript;
use crate::ErrorCode;

pub mod formatters;

pub use formatters::*;

/// Hint shown when no specific advice applies
pub const DEFAULT_HINT: &str = "Please refresh the page and try again.";

fn render(
    transcript: &Transcript,
    format: &OutputFormat,
    include_timestamps: bool,
) -> Result<String> {
    let content = match format {
        OutputFormat::Text => format_as_text(transcript, include_timestamps),
        OutputFormat::Json => format_as_json(transcript)?,
        OutputFormat::Srt => format_as_srt(transcript),
        OutputFormat::Vtt => format_as_vtt(transcript),
    };
    Ok(content)
}

/// Save transcript to file
pub async fn save_to_file(
    transcript: &Transcript,
    path: &Path,
    format: &OutputFormat,
    include_timestamps: bool,
) -> Result<()> {
    let content = render(transcript, format, include_timestamps)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print transcript to console
pub fn print_to_console(
    transcript: &Transcript,
    format: &OutputFormat,
    include_timestamps: bool,
) -> Result<()> {
    let content = render(transcript, format, include_timestamps)?;
    println!("{}", content);
    Ok(())
}

/// Short user-facing sentence for an error code
pub fn error_message(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::NotWatchPage => "Open a YouTube video page.",
        ErrorCode::PageLoad => "Unable to load the video page. Please try again.",
        ErrorCode::AccessChallenge => "Access was temporarily limited. Please try again later.",
        ErrorCode::MalformedPage | ErrorCode::MalformedApiResponse => {
            "Could not read video data. Please refresh the page and try again."
        }
        ErrorCode::ApiRequest => "Unable to load video data. Please try again.",
        ErrorCode::BotCheck => {
            "YouTube is asking to verify you're not a bot. Try refreshing the page or signing in."
        }
        ErrorCode::AgeRestricted => {
            "This video is age-restricted. Captions aren't available for this video."
        }
        ErrorCode::VideoUnavailable => "This video is unavailable.",
        ErrorCode::PlaybackBlocked => {
            "This video can't be played. It may be private or restricted in your region."
        }
        ErrorCode::NoCaptions => "This video doesn't have captions available.",
        ErrorCode::NoPreferredLanguage => {
            "No captions are available in your preferred languages for this video."
        }
        ErrorCode::CaptionFetch => "Could not load captions. Please try again.",
        ErrorCode::MalformedCaptions => "Could not read the captions for this video.",
    }
}

/// What the user can do about an error code
pub fn error_hint(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::NoCaptions => {
            "The uploader may not have added or enabled captions for this video."
        }
        ErrorCode::AgeRestricted => "Sign in or check if the video is available in your region.",
        ErrorCode::VideoUnavailable => "The video may have been removed or made private.",
        ErrorCode::PlaybackBlocked => "The video may be private or restricted in your region.",
        ErrorCode::BotCheck => {
            "Refresh the YouTube page and open the transcript again, or try signing in."
        }
        ErrorCode::AccessChallenge => "Wait a few minutes and try again.",
        ErrorCode::MalformedPage | ErrorCode::MalformedApiResponse => {
            "Refresh the YouTube page and try again."
        }
        ErrorCode::PageLoad | ErrorCode::ApiRequest => "Check your connection and try again.",
        ErrorCode::NoPreferredLanguage => "This video may only have captions in other languages.",
        ErrorCode::NotWatchPage => "Navigate to a video, then ask for the transcript again.",
        ErrorCode::CaptionFetch | ErrorCode::MalformedCaptions => DEFAULT_HINT,
    }
}
