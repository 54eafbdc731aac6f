use crate::transcribe::Snippet;

/// End of the interval in which snippet `index` is active.
///
/// The next snippet's start when there is one, otherwise start + duration.
/// `None` when `index` is out of range.
pub fn snippet_end(snippets: &[Snippet], index: usize) -> Option<f64> {
    let snippet = snippets.get(index)?;
    Some(match snippets.get(index + 1) {
        Some(next) => next.start,
        None => snippet.start + snippet.duration,
    })
}

fn is_active(snippets: &[Snippet], index: usize, time: f64) -> bool {
    match (snippets.get(index), snippet_end(snippets, index)) {
        (Some(snippet), Some(end)) => time >= snippet.start && time < end,
        _ => false,
    }
}

/// Index of the snippet active at `time`.
///
/// Snippet `i` covers `[start_i, end_i)`, so at a boundary the later snippet
/// wins. Out-of-order input is tolerated: if several intervals contain `time`
/// the last one in document order is returned.
pub fn active_index(snippets: &[Snippet], time: f64) -> Option<usize> {
    if time.is_nan() {
        return None;
    }

    (0..snippets.len())
        .rev()
        .find(|&index| is_active(snippets, index, time))
}

/// Highlight transition reported to the display surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightChange {
    pub previous: Option<usize>,
    pub current: Option<usize>,
}

/// Display-side playback follower.
///
/// Holds the transcript being shown and the highlighted line, and reports a
/// change only when a time sample moves the highlight.
#[derive(Debug, Default)]
pub struct PlaybackTracker {
    snippets: Vec<Snippet>,
    current: Option<usize>,
}

impl PlaybackTracker {
    pub fn new(snippets: Vec<Snippet>) -> Self {
        Self {
            snippets,
            current: None,
        }
    }

    /// Swap in a new transcript and clear the highlight
    pub fn reset(&mut self, snippets: Vec<Snippet>) {
        self.snippets = snippets;
        self.current = None;
    }

    pub fn snippets(&self) -> &[Snippet] {
        &self.snippets
    }

    /// Currently highlighted line ("go to current")
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn current_snippet(&self) -> Option<&Snippet> {
        self.current.and_then(|index| self.snippets.get(index))
    }

    /// Feed a playback time sample
    pub fn update(&mut self, time: f64) -> Option<HighlightChange> {
        let next = active_index(&self.snippets, time);
        if next == self.current {
            return None;
        }

        let change = HighlightChange {
            previous: self.current,
            current: next,
        };
        self.current = next;
        Some(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(start: f64, duration: f64) -> Snippet {
        Snippet {
            text: format!("at {}", start),
            start,
            duration,
        }
    }

    #[test]
    fn test_snippet_end() {
        let snippets = vec![snippet(0.0, 2.0), snippet(2.5, 3.0)];
        assert_eq!(snippet_end(&snippets, 0), Some(2.5));
        assert_eq!(snippet_end(&snippets, 1), Some(5.5));
        assert_eq!(snippet_end(&snippets, 2), None);
        assert_eq!(snippet_end(&[], 0), None);
    }

    #[test]
    fn test_boundary_goes_to_later_snippet() {
        let snippets = vec![snippet(0.0, 2.0), snippet(2.0, 3.0)];
        assert_eq!(active_index(&snippets, 1.999), Some(0));
        assert_eq!(active_index(&snippets, 2.0), Some(1));
        assert_eq!(active_index(&snippets, -1.0), None);
    }

    #[test]
    fn test_last_snippet_uses_its_duration() {
        let snippets = vec![snippet(0.0, 2.0), snippet(2.0, 3.0)];
        assert_eq!(active_index(&snippets, 4.999), Some(1));
        assert_eq!(active_index(&snippets, 5.0), None);
    }

    #[test]
    fn test_gap_extends_previous_snippet() {
        // The next start closes the interval, not the duration
        let snippets = vec![snippet(0.0, 1.0), snippet(5.0, 1.0)];
        assert_eq!(active_index(&snippets, 3.0), Some(0));
    }

    #[test]
    fn test_empty_and_nan() {
        assert_eq!(active_index(&[], 1.0), None);
        assert_eq!(active_index(&[snippet(0.0, 1.0)], f64::NAN), None);
    }

    #[test]
    fn test_out_of_order_input_is_tolerated() {
        let snippets = vec![snippet(0.0, 10.0), snippet(5.0, 1.0), snippet(3.0, 4.0)];
        // snippet 1 has an empty interval [5, 3); 0 and 2 overlap on [3, 5)
        assert_eq!(active_index(&snippets, 1.0), Some(0));
        assert_eq!(active_index(&snippets, 4.0), Some(2));
        assert_eq!(active_index(&snippets, 5.5), Some(2));
        assert_eq!(active_index(&snippets, 8.0), None);
    }

    #[test]
    fn test_tracker_reports_changes_only() {
        let mut tracker = PlaybackTracker::new(vec![snippet(1.0, 2.0), snippet(3.0, 3.0)]);

        assert_eq!(tracker.update(0.5), None);
        assert_eq!(
            tracker.update(1.0),
            Some(HighlightChange { previous: None, current: Some(0) })
        );
        assert_eq!(tracker.update(2.5), None);
        assert_eq!(
            tracker.update(3.0),
            Some(HighlightChange { previous: Some(0), current: Some(1) })
        );
        assert_eq!(tracker.current_snippet().unwrap().start, 3.0);

        // Seeking backwards moves the highlight back
        assert_eq!(
            tracker.update(1.2),
            Some(HighlightChange { previous: Some(1), current: Some(0) })
        );
        assert_eq!(
            tracker.update(10.0),
            Some(HighlightChange { previous: Some(0), current: None })
        );
    }

    #[test]
    fn test_tracker_reset() {
        let mut tracker = PlaybackTracker::new(vec![snippet(0.0, 2.0)]);
        tracker.update(1.0);
        assert_eq!(tracker.current(), Some(0));

        tracker.reset(vec![snippet(5.0, 1.0)]);
        assert_eq!(tracker.current(), None);
        assert_eq!(tracker.snippets().len(), 1);
    }
}
