use anyhow::Result;

use crate::sync::snippet_end;
use crate::transcribe::{Snippet, Transcript};

/// `m:ss` label used next to each line (minutes keep counting past an hour)
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 { seconds.floor() as u64 } else { 0 };
    format!("{}:{:02}", total / 60, total % 60)
}

fn format_clock(seconds: f64, separator: char) -> String {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02}{}{:03}", hours, minutes, secs, separator, millis)
}

/// Plain text, optionally prefixed with `m:ss` timestamps
pub fn format_as_text(transcript: &Transcript, include_timestamps: bool) -> String {
    if !include_timestamps {
        return transcript.plain_text();
    }

    transcript
        .snippets
        .iter()
        .map(|snippet| format!("[{}] {}", format_timestamp(snippet.start), snippet.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_as_json(transcript: &Transcript) -> Result<String> {
    Ok(serde_json::to_string_pretty(transcript)?)
}

fn cue_end(snippets: &[Snippet], index: usize) -> f64 {
    snippet_end(snippets, index).unwrap_or_default()
}

/// SubRip cues; each cue ends where the highlight would move on
pub fn format_as_srt(transcript: &Transcript) -> String {
    let snippets = &transcript.snippets;
    let mut out = String::new();

    for (index, snippet) in snippets.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_clock(snippet.start, ','),
            format_clock(cue_end(snippets, index), ','),
            snippet.text
        ));
    }

    out
}

pub fn format_as_vtt(transcript: &Transcript) -> String {
    let snippets = &transcript.snippets;
    let mut out = String::from("WEBVTT\n\n");

    for (index, snippet) in snippets.iter().enumerate() {
        out.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_clock(snippet.start, '.'),
            format_clock(cue_end(snippets, index), '.'),
            snippet.text
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transcript {
        Transcript {
            snippets: vec![
                Snippet { text: "Hello".to_string(), start: 0.0, duration: 2.0 },
                Snippet { text: "World".to_string(), start: 61.5, duration: 1.25 },
            ],
            language_code: "en".to_string(),
            language_name: "English".to_string(),
        }
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "0:00");
        assert_eq!(format_timestamp(61.9), "1:01");
        assert_eq!(format_timestamp(3725.0), "62:05");
        assert_eq!(format_timestamp(-3.0), "0:00");
    }

    #[test]
    fn test_text_output() {
        assert_eq!(format_as_text(&sample(), false), "Hello\nWorld");
        assert_eq!(format_as_text(&sample(), true), "[0:00] Hello\n[1:01] World");
    }

    #[test]
    fn test_srt_output() {
        let srt = format_as_srt(&sample());
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:01:01,500\nHello\n\n"));
        assert!(srt.contains("2\n00:01:01,500 --> 00:01:02,750\nWorld\n"));
    }

    #[test]
    fn test_vtt_output() {
        let vtt = format_as_vtt(&sample());
        assert!(vtt.starts_with("WEBVTT\n\n00:00:00.000 --> 00:01:01.500\nHello"));
    }

    #[test]
    fn test_json_output() {
        let json = format_as_json(&sample()).unwrap();
        assert!(json.contains("\"languageCode\": \"en\""));
    }
}
