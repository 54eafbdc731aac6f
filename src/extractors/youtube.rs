use regex::Regex;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use url::Url;

use super::{CaptionTrack, VideoId};
use crate::config::YoutubeConfig;
use crate::TranscriptError;

/// Marker present on the watch page when a reCAPTCHA challenge is served
const RECAPTCHA_MARKER: &str = "class=\"g-recaptcha\"";

/// `kind` value of speech-recognition caption tracks
const AUTO_GENERATED_KIND: &str = "asr";

/// Query parameter that switches timed text to the srv3 layout
const FORMAT_OVERRIDE: (&str, &str) = ("fmt", "srv3");

fn api_key_regex() -> &'static Regex {
    static API_KEY_REGEX: OnceLock<Regex> = OnceLock::new();
    API_KEY_REGEX.get_or_init(|| {
        Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#)
            .expect("Failed to compile API key regex")
    })
}

/// Player API response, only the parts the caption lookup reads
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<RawCaptionTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCaptionTrack {
    base_url: Option<String>,
    language_code: Option<String>,
    name: Option<TrackName>,
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackName {
    #[serde(default)]
    runs: Vec<TextRun>,
    simple_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: Option<String>,
}

/// YouTube caption extractor talking to the watch page and the player API
pub struct YoutubeExtractor {
    client: Client,
    watch_url: Url,
    player_url: Url,
    client_name: String,
    client_version: String,
}

impl YoutubeExtractor {
    /// Build an extractor with a cookie-aware HTTP client.
    ///
    /// Configured cookies seed the jar instead of a fixed header, so cookies
    /// set by the watch page are sent alongside them on later calls.
    pub fn from_config(config: &YoutubeConfig) -> anyhow::Result<Self> {
        let watch_url = Url::parse(&config.watch_url)?;
        let player_url = Url::parse(&config.player_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(&config.accept_language)?);
        if let Some(user_agent) = &config.user_agent {
            headers.insert(USER_AGENT, HeaderValue::from_str(user_agent)?);
        }

        let jar = Jar::default();
        if let Some(cookie) = &config.cookie {
            for pair in cookie.split(';').map(str::trim).filter(|pair| !pair.is_empty()) {
                jar.add_cookie_str(pair, &watch_url);
                if player_url.host_str() != watch_url.host_str() {
                    jar.add_cookie_str(pair, &player_url);
                }
            }
        }

        let client = Client::builder()
            .cookie_provider(Arc::new(jar))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            watch_url,
            player_url,
            client_name: config.client_name.clone(),
            client_version: config.client_version.clone(),
        })
    }

    /// Stages 1-5: watch page, API key, player API, track list
    pub async fn list_caption_tracks(
        &self,
        video_id: &VideoId,
    ) -> Result<Vec<CaptionTrack>, TranscriptError> {
        let html = self.fetch_video_html(video_id).await?;
        let api_key = extract_api_key(&html)?;
        let data = self.fetch_player_data(video_id, &api_key).await?;
        parse_caption_tracks(&data)
    }

    /// Download the watch page
    async fn fetch_video_html(&self, video_id: &VideoId) -> Result<String, TranscriptError> {
        let mut url = self.watch_url.clone();
        url.query_pairs_mut().append_pair("v", video_id.as_str());

        tracing::debug!("Fetching watch page: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TranscriptError::PageLoad(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranscriptError::PageLoad(format!("HTTP {}", response.status())));
        }

        response
            .text()
            .await
            .map_err(|e| TranscriptError::PageLoad(e.to_string()))
    }

    /// Query the player API as the configured client
    async fn fetch_player_data(
        &self,
        video_id: &VideoId,
        api_key: &str,
    ) -> Result<Value, TranscriptError> {
        let mut url = self.player_url.clone();
        url.query_pairs_mut().append_pair("key", api_key);

        let body = json!({
            "context": {
                "client": {
                    "clientName": self.client_name,
                    "clientVersion": self.client_version,
                }
            },
            "videoId": video_id.as_str(),
        });

        tracing::debug!(
            "Querying player API for {} as {} {}",
            video_id,
            self.client_name,
            self.client_version
        );

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TranscriptError::ApiRequest(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranscriptError::ApiRequest(format!("HTTP {}", response.status())));
        }

        let text = response
            .text()
            .await
            .map_err(|e| TranscriptError::ApiRequest(e.to_string()))?;

        serde_json::from_str(&text)
            .map_err(|e| TranscriptError::MalformedApiResponse(format!("invalid JSON: {}", e)))
    }

    /// Stage 7: download the timed-text document for the chosen track
    pub async fn fetch_timed_text(&self, track: &CaptionTrack) -> Result<String, TranscriptError> {
        tracing::debug!("Fetching timed text for {}: {}", track.language_code, track.source_url);

        let response = self
            .client
            .get(&track.source_url)
            .send()
            .await
            .map_err(|e| TranscriptError::CaptionFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranscriptError::CaptionFetch(format!("HTTP {}", response.status())));
        }

        response
            .text()
            .await
            .map_err(|e| TranscriptError::CaptionFetch(e.to_string()))
    }
}

/// Pull the player API key out of the watch page
pub fn extract_api_key(html: &str) -> Result<String, TranscriptError> {
    if let Some(caps) = api_key_regex().captures(html) {
        return Ok(caps[1].to_string());
    }

    if html.contains(RECAPTCHA_MARKER) {
        tracing::warn!("Watch page served a human verification challenge");
        return Err(TranscriptError::AccessChallenge);
    }

    Err(TranscriptError::MalformedPage)
}

/// Map a non-OK playability status onto the error taxonomy
pub fn classify_playability(status: &str, reason: &str) -> TranscriptError {
    let lowered = reason.to_lowercase();

    if lowered.contains("not a bot") {
        TranscriptError::BotCheck(reason.to_string())
    } else if lowered.contains("inappropriate") {
        TranscriptError::AgeRestricted(reason.to_string())
    } else if lowered.contains("unavailable") {
        TranscriptError::VideoUnavailable(reason.to_string())
    } else {
        TranscriptError::PlaybackBlocked {
            status: status.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Stages 4-5: check playability and build the caption track list
pub fn parse_caption_tracks(data: &Value) -> Result<Vec<CaptionTrack>, TranscriptError> {
    let response = PlayerResponse::deserialize(data)
        .map_err(|e| TranscriptError::MalformedApiResponse(e.to_string()))?;

    if let Some(playability) = &response.playability_status {
        let status = playability.status.as_deref().unwrap_or("");
        if !status.is_empty() && status != "OK" {
            let reason = playability.reason.as_deref().unwrap_or("");
            let error = classify_playability(status, reason);
            tracing::warn!("Video not playable ({}): {}", status, reason);
            return Err(error);
        }
    }

    let captions = response
        .captions
        .map(Captions::deserialize)
        .transpose()
        .map_err(|e| TranscriptError::MalformedApiResponse(e.to_string()))?;

    let raw_tracks = captions
        .and_then(|captions| captions.player_captions_tracklist_renderer)
        .map(|renderer| renderer.caption_tracks)
        .unwrap_or_default();

    let tracks: Vec<CaptionTrack> = raw_tracks.into_iter().filter_map(build_track).collect();
    if tracks.is_empty() {
        return Err(TranscriptError::NoCaptions);
    }

    Ok(tracks)
}

/// Unusable entries (no language or no URL) are skipped
fn build_track(raw: RawCaptionTrack) -> Option<CaptionTrack> {
    let Some(language_code) = raw.language_code.filter(|code| !code.is_empty()) else {
        tracing::warn!("Skipping caption track without languageCode");
        return None;
    };

    let Some(base_url) = raw.base_url.filter(|url| !url.is_empty()) else {
        tracing::warn!("Skipping caption track {} without baseUrl", language_code);
        return None;
    };

    let name = raw
        .name
        .and_then(|name| {
            name.runs
                .into_iter()
                .find_map(|run| run.text)
                .or(name.simple_text)
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| language_code.clone());

    Some(CaptionTrack {
        source_url: strip_format_override(&base_url),
        is_auto_generated: raw.kind.as_deref() == Some(AUTO_GENERATED_KIND),
        language_code,
        name,
    })
}

/// Remove `fmt=srv3` so the timed-text endpoint serves plain `<text>` elements
pub fn strip_format_override(source_url: &str) -> String {
    let (key, value) = FORMAT_OVERRIDE;

    let Ok(mut url) = Url::parse(source_url) else {
        return source_url.replace(&format!("&{}={}", key, value), "");
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, v)| !(k == key && v == value))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    url.to_string()
}
