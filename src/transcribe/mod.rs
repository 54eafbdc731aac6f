use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::extractors::{select_track, VideoId, YoutubeExtractor};
use crate::TranscriptError;

pub mod processor;

/// One timed line of transcript text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    /// Line text with markup removed
    pub text: String,

    /// Start time in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

/// Ordered snippets plus the language they were sourced in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    /// Snippets in document order (not re-sorted)
    pub snippets: Vec<Snippet>,

    /// Language code of the chosen caption track
    pub language_code: String,

    /// Display name of the chosen caption track
    pub language_name: String,
}

impl Transcript {
    /// Text of every snippet, one per line, as used by the copy action
    pub fn plain_text(&self) -> String {
        self.snippets
            .iter()
            .map(|snippet| snippet.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Label shown above the transcript, e.g. `English (en)`
    pub fn language_label(&self) -> String {
        match (self.language_name.is_empty(), self.language_code.is_empty()) {
            (true, true) => "Transcript".to_string(),
            (false, true) => self.language_name.clone(),
            (true, false) => self.language_code.clone(),
            (false, false) => format!("{} ({})", self.language_name, self.language_code),
        }
    }
}

/// Anything that can produce a transcript for a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Run the full retrieval sequence for one video
    async fn fetch_transcript(
        &self,
        video_id: &VideoId,
        preferred_languages: &[String],
    ) -> Result<Transcript, TranscriptError>;
}

/// Main transcript pipeline
///
/// Stages: watch page, API key, player API, caption track list, track
/// selection, timed-text document, parse. No stage retries.
pub struct TranscriptPipeline {
    extractor: YoutubeExtractor,
}

impl TranscriptPipeline {
    /// Create a pipeline from the `youtube` section of the configuration
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            extractor: YoutubeExtractor::from_config(&config.youtube)?,
        })
    }

    pub fn with_extractor(extractor: YoutubeExtractor) -> Self {
        Self { extractor }
    }

    pub fn extractor(&self) -> &YoutubeExtractor {
        &self.extractor
    }

    /// Fetch a transcript for `video_id` honouring the language preference
    pub async fn fetch(
        &self,
        video_id: &VideoId,
        preferred_languages: &[String],
    ) -> Result<Transcript, TranscriptError> {
        tracing::info!("Fetching transcript for video: {}", video_id);

        let tracks = self.extractor.list_caption_tracks(video_id).await?;

        let track = select_track(&tracks, preferred_languages)
            .ok_or(TranscriptError::NoPreferredLanguage)?;

        tracing::debug!(
            "Selected caption track {} ({}), auto-generated: {}",
            track.language_code,
            track.name,
            track.is_auto_generated
        );

        let document = self.extractor.fetch_timed_text(track).await?;
        let snippets = processor::parse_timed_text(&document)?;

        tracing::info!(
            "Transcript ready for {}: {} snippets in {}",
            video_id,
            snippets.len(),
            track.language_code
        );

        Ok(Transcript {
            snippets,
            language_code: track.language_code.clone(),
            language_name: track.name.clone(),
        })
    }
}

#[async_trait]
impl TranscriptSource for TranscriptPipeline {
    async fn fetch_transcript(
        &self,
        video_id: &VideoId,
        preferred_languages: &[String],
    ) -> Result<Transcript, TranscriptError> {
        self.fetch(video_id, preferred_languages).await.map_err(|e| {
            tracing::warn!("Transcript fetch for {} failed ({}): {}", video_id, e.code(), e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(text: &str, start: f64) -> Snippet {
        Snippet {
            text: text.to_string(),
            start,
            duration: 1.0,
        }
    }

    #[test]
    fn test_plain_text_skips_blank_lines() {
        let transcript = Transcript {
            snippets: vec![snippet(" Hello ", 0.0), snippet("   ", 1.0), snippet("world", 2.0)],
            language_code: "en".to_string(),
            language_name: "English".to_string(),
        };
        assert_eq!(transcript.plain_text(), "Hello\nworld");
    }

    #[test]
    fn test_language_label() {
        let mut transcript = Transcript {
            snippets: Vec::new(),
            language_code: "en".to_string(),
            language_name: "English".to_string(),
        };
        assert_eq!(transcript.language_label(), "English (en)");

        transcript.language_name.clear();
        assert_eq!(transcript.language_label(), "en");

        transcript.language_code.clear();
        assert_eq!(transcript.language_label(), "Transcript");
    }

    #[test]
    fn test_transcript_wire_shape() {
        let transcript = Transcript {
            snippets: vec![snippet("Hi", 1.5)],
            language_code: "en".to_string(),
            language_name: "English".to_string(),
        };
        let value = serde_json::to_value(&transcript).unwrap();
        assert_eq!(value["languageCode"], "en");
        assert_eq!(value["languageName"], "English");
        assert_eq!(value["snippets"][0]["start"], 1.5);
        assert_eq!(value["snippets"][0]["duration"], 1.0);
    }
}
