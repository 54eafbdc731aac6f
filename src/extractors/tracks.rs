use serde::{Deserialize, Serialize};

/// One fetchable caption stream offered for a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    /// BCP-47-ish language code as reported by the player (`en`, `zh-Hans`)
    pub language_code: String,

    /// Localized display name
    pub name: String,

    /// Timed-text URL with the format override already removed
    pub source_url: String,

    /// True for speech-recognition (`kind == "asr"`) tracks
    pub is_auto_generated: bool,
}

/// Choose the caption track to fetch.
///
/// For each preferred language in order, a human-authored track wins over an
/// auto-generated one; the first language with any match ends the search.
/// With no match the first track in platform order is used. Returns `None`
/// only for an empty listing.
pub fn select_track<'a, S: AsRef<str>>(
    tracks: &'a [CaptionTrack],
    preferred_languages: &[S],
) -> Option<&'a CaptionTrack> {
    let (manual, generated): (Vec<&CaptionTrack>, Vec<&CaptionTrack>) =
        tracks.iter().partition(|track| !track.is_auto_generated);

    for code in preferred_languages {
        let code = code.as_ref();
        let found = manual
            .iter()
            .chain(generated.iter())
            .find(|track| track.language_code == code)
            .copied();

        if let Some(track) = found {
            return Some(track);
        }
    }

    tracks.first()
}
