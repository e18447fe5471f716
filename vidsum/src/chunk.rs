use std::str::SplitWhitespace;

/// Split `text` into ordered segments of at most `max_chars` characters,
/// breaking only between words.
///
/// Words are packed greedily. Each word costs its length plus one separator,
/// and a segment is closed once the next word would push it past `max_chars`.
/// A word longer than `max_chars` becomes a segment of its own rather than
/// being split or dropped. Empty or whitespace-only input yields no segments.
pub fn partition(text: &str, max_chars: usize) -> Vec<String> {
    segments(text, max_chars).collect()
}

/// Lazy form of [`partition`].
pub fn segments(text: &str, max_chars: usize) -> Segments<'_> {
    Segments {
        words: text.split_whitespace(),
        max_chars,
        pending: None,
    }
}

/// Iterator returned by [`segments`].
pub struct Segments<'a> {
    words: SplitWhitespace<'a>,
    max_chars: usize,
    /// Word that did not fit into the previous segment.
    pending: Option<&'a str>,
}

impl Iterator for Segments<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let first = self.pending.take().or_else(|| self.words.next())?;

        let mut segment = String::from(first);
        let mut length = first.chars().count() + 1;

        for word in self.words.by_ref() {
            let cost = word.chars().count() + 1;
            if length + cost > self.max_chars {
                self.pending = Some(word);
                break;
            }
            segment.push(' ');
            segment.push_str(word);
            length += cost;
        }

        Some(segment)
    }
}
