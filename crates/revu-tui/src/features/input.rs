//! Review input state.
//!
//! A single-line buffer with a live character counter. The counter is
//! cosmetic feedback only; the submission gates do the real checks.

use unicode_segmentation::UnicodeSegmentation;

use revu_core::review::MAX_REVIEW_CHARS;

/// User input state.
#[derive(Debug, Default)]
pub struct InputState {
    buffer: String,
}

impl InputState {
    /// Current input text.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Current length in Unicode scalar values.
    pub fn char_count(&self) -> usize {
        self.buffer.chars().count()
    }

    /// The counter shown beside the input, recomputed on every change.
    pub fn counter_label(&self) -> String {
        format!("{} / {MAX_REVIEW_CHARS}", self.char_count())
    }

    /// Inserts a typed character. Control characters are ignored; the
    /// input is a single line.
    pub fn insert_char(&mut self, ch: char) {
        if ch.is_control() {
            return;
        }
        self.buffer.push(ch);
    }

    /// Removes the last grapheme cluster.
    pub fn backspace(&mut self) {
        if let Some((offset, _)) = self.buffer.grapheme_indices(true).next_back() {
            self.buffer.truncate(offset);
        }
    }

    /// Clears the input and resets the counter display.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counter reflects every change.
    #[test]
    fn test_counter_tracks_input() {
        let mut input = InputState::default();
        assert_eq!(input.counter_label(), "0 / 200");

        for ch in "hello".chars() {
            input.insert_char(ch);
        }
        assert_eq!(input.counter_label(), "5 / 200");

        input.backspace();
        assert_eq!(input.counter_label(), "4 / 200");

        input.clear();
        assert_eq!(input.counter_label(), "0 / 200");
    }

    /// Counter counts characters, not bytes.
    #[test]
    fn test_counter_counts_chars() {
        let mut input = InputState::default();
        input.insert_char('é');
        input.insert_char('漢');
        assert_eq!(input.char_count(), 2);
    }

    /// Backspace removes a whole grapheme cluster.
    #[test]
    fn test_backspace_removes_grapheme() {
        let mut input = InputState::default();
        input.insert_char('a');
        input.insert_char('e');
        input.insert_char('\u{301}'); // combining acute on 'e'
        input.backspace();
        assert_eq!(input.text(), "a");
    }

    /// Control characters never land in the buffer.
    #[test]
    fn test_control_chars_ignored() {
        let mut input = InputState::default();
        input.insert_char('\n');
        input.insert_char('\t');
        assert_eq!(input.text(), "");
    }

    /// Typing past the limit is allowed; the gates reject it later.
    #[test]
    fn test_over_limit_typing_allowed() {
        let mut input = InputState::default();
        for _ in 0..(MAX_REVIEW_CHARS + 5) {
            input.insert_char('a');
        }
        assert_eq!(input.counter_label(), "205 / 200");
    }
}
