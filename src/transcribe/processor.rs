use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::sync::OnceLock;

use super::Snippet;
use crate::TranscriptError;

const TEXT_ELEMENT: &[u8] = b"text";

fn html_tag_regex() -> &'static Regex {
    static HTML_TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    HTML_TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]*>").expect("Failed to compile HTML tag regex"))
}

fn char_reference_regex() -> &'static Regex {
    static CHAR_REFERENCE_REGEX: OnceLock<Regex> = OnceLock::new();
    CHAR_REFERENCE_REGEX.get_or_init(|| {
        Regex::new(r"&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);")
            .expect("Failed to compile character reference regex")
    })
}

/// HTML named entities seen in captions beyond the five XML ones
fn resolve_html_entity(name: &str) -> Option<&'static str> {
    let resolved = match name {
        "nbsp" | "ensp" | "emsp" | "thinsp" => " ",
        "hellip" => "\u{2026}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        "laquo" => "\u{AB}",
        "raquo" => "\u{BB}",
        "copy" => "\u{A9}",
        "reg" => "\u{AE}",
        "trade" => "\u{2122}",
        "deg" => "\u{B0}",
        "middot" => "\u{B7}",
        "bull" => "\u{2022}",
        "times" => "\u{D7}",
        "divide" => "\u{F7}",
        "iexcl" => "\u{A1}",
        "iquest" => "\u{BF}",
        "eacute" => "\u{E9}",
        "egrave" => "\u{E8}",
        "aacute" => "\u{E1}",
        "agrave" => "\u{E0}",
        "ntilde" => "\u{F1}",
        "ouml" => "\u{F6}",
        "uuml" => "\u{FC}",
        "auml" => "\u{E4}",
        "szlig" => "\u{DF}",
        "ccedil" => "\u{E7}",
        "sung" => "\u{266A}",
        _ => return None,
    };
    Some(resolved)
}

/// Decode each character reference on its own; unknown ones stay verbatim
fn decode_references(text: &str) -> String {
    char_reference_regex()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let reference = &caps[0];
            if let Ok(decoded) = quick_xml::escape::unescape(reference) {
                return decoded.into_owned();
            }
            let name = &reference[1..reference.len() - 1];
            resolve_html_entity(name)
                .map(str::to_string)
                .unwrap_or_else(|| reference.to_string())
        })
        .into_owned()
}

/// Parse a timed-text document into snippets.
///
/// Every `<text start=".." dur="..">` element becomes one snippet in document
/// order. Missing or non-numeric timing attributes read as `0`. Lines that are
/// empty once markup is stripped are dropped. A document that is not
/// well-formed markup, or has no root element at all, is an error rather than
/// an empty transcript.
pub fn parse_timed_text(document: &str) -> Result<Vec<Snippet>, TranscriptError> {
    let mut reader = Reader::from_str(document);
    let mut snippets = Vec::new();

    let mut depth = 0usize;
    let mut saw_root = false;
    // Depth of the open <text> element and its timing/content so far
    let mut current: Option<(usize, f64, f64, String)> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            TranscriptError::MalformedCaptions(format!(
                "invalid markup at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(element) => {
                depth += 1;
                saw_root = true;
                if current.is_none() && element.local_name().as_ref() == TEXT_ELEMENT {
                    let (start, duration) = read_timing(&element);
                    current = Some((depth, start, duration, String::new()));
                }
            }
            // A self-closing <text/> has no content, so it never yields a snippet
            Event::Empty(_) => saw_root = true,
            Event::End(_) => {
                if let Some((open_depth, start, duration, raw)) = current.take() {
                    if open_depth == depth {
                        if let Some(text) = clean_text(&raw) {
                            snippets.push(Snippet { text, start, duration });
                        }
                    } else {
                        current = Some((open_depth, start, duration, raw));
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(text) => {
                if let Some((_, _, _, raw)) = current.as_mut() {
                    match text.unescape() {
                        Ok(content) => raw.push_str(&content),
                        Err(_) => raw.push_str(&String::from_utf8_lossy(&text)),
                    }
                }
            }
            Event::CData(data) => {
                if let Some((_, _, _, raw)) = current.as_mut() {
                    raw.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(TranscriptError::MalformedCaptions(
            "document has no root element".to_string(),
        ));
    }
    if depth != 0 {
        return Err(TranscriptError::MalformedCaptions(format!(
            "document ended with {} unclosed element(s)",
            depth
        )));
    }

    Ok(snippets)
}

fn read_timing(element: &BytesStart<'_>) -> (f64, f64) {
    (
        numeric_attribute(element, "start"),
        numeric_attribute(element, "dur"),
    )
}

fn numeric_attribute(element: &BytesStart<'_>, name: &str) -> f64 {
    element
        .try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Trim, strip nested markup, decode character references, trim again
fn clean_text(raw: &str) -> Option<String> {
    let stripped = html_tag_regex().replace_all(raw.trim(), "");
    let decoded = decode_references(&stripped);

    let text = decoded.trim();
    (!text.is_empty()).then(|| text.to_string())
}
