//! Profanity gate over the `censor` lexicon.

use censor::Censor;

/// Content filter consulted by the submission validator.
pub struct ProfanityFilter {
    censor: Censor,
}

impl ProfanityFilter {
    /// Creates a filter backed by the standard lexicon.
    pub fn new() -> Self {
        Self {
            censor: Censor::Standard,
        }
    }

    /// Returns true if the text contains a blocked word.
    pub fn is_profane(&self, text: &str) -> bool {
        self.censor.check(text)
    }
}

impl Default for ProfanityFilter {
    fn default() -> Self {
        Self::new()
    }
}
