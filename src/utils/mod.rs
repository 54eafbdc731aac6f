use crate::sync::snippet_end;
use crate::transcribe::Snippet;

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Time at which the last snippet stops being highlighted
pub fn transcript_span(snippets: &[Snippet]) -> f64 {
    (0..snippets.len())
        .filter_map(|index| snippet_end(snippets, index))
        .fold(0.0, f64::max)
}

/// Map a language name or code to the caption language code YouTube uses
pub fn normalize_language_code(lang: &str) -> String {
    let trimmed = lang.trim();
    let normalized = match trimmed.to_lowercase().as_str() {
        "english" => "en",
        "spanish" => "es",
        "french" => "fr",
        "german" => "de",
        "italian" => "it",
        "portuguese" => "pt",
        "japanese" => "ja",
        "korean" => "ko",
        "chinese" => "zh",
        "simplified chinese" | "zh-hans" | "zh-cn" => "zh-Hans",
        "traditional chinese" | "zh-hant" | "zh-tw" => "zh-Hant",
        "arabic" => "ar",
        "hindi" => "hi",
        "russian" => "ru",
        _ => trimmed, // Return as-is if no mapping found
    };

    normalized.to_string()
}
