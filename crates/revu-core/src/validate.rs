//! Submission gates.
//!
//! A candidate review passes four checks in fixed order, short-circuiting
//! on the first failure. Cheap local checks run before the lexicon scan,
//! and the bot check deliberately precedes content moderation.

use std::fmt;

use crate::moderation::ProfanityFilter;
use crate::review::MAX_REVIEW_CHARS;

/// A failed submission gate, with its user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Trimmed input was empty.
    Empty,
    /// Trimmed input exceeded [`MAX_REVIEW_CHARS`].
    TooLong,
    /// No bot-check response token present.
    CaptchaMissing,
    /// The content filter flagged the text.
    Profane,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Empty => write!(f, "Please leave your thoughts here."),
            ValidationError::TooLong => write!(
                f,
                "Sorry! You cannot exceed the {MAX_REVIEW_CHARS} character limit."
            ),
            ValidationError::CaptchaMissing => write!(f, "Please verify you are human."),
            ValidationError::Profane => write!(
                f,
                "Hold up! That review's got words we don't allow here. Be kind."
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Runs the four submission gates over a candidate review.
///
/// Returns the trimmed text ready for publication, or the first gate that
/// failed. Length is counted in Unicode scalar values.
pub fn validate_submission<'a>(
    text: &'a str,
    captcha_token: &str,
    filter: &ProfanityFilter,
) -> Result<&'a str, ValidationError> {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    if trimmed.chars().count() > MAX_REVIEW_CHARS {
        return Err(ValidationError::TooLong);
    }
    if captcha_token.is_empty() {
        return Err(ValidationError::CaptchaMissing);
    }
    if filter.is_profane(trimmed) {
        return Err(ValidationError::Profane);
    }

    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ProfanityFilter {
        ProfanityFilter::new()
    }

    /// Gate 1: trimmed-empty input fails regardless of other field states.
    #[test]
    fn test_empty_input_fails_first() {
        assert_eq!(
            validate_submission("", "token", &filter()),
            Err(ValidationError::Empty)
        );
        assert_eq!(
            validate_submission("   \n\t ", "token", &filter()),
            Err(ValidationError::Empty)
        );
        // Empty wins even when the bot check would also fail.
        assert_eq!(
            validate_submission("", "", &filter()),
            Err(ValidationError::Empty)
        );
    }

    /// Gate 2: over-long input fails with the length message even if the
    /// bot check and content filter would pass.
    #[test]
    fn test_too_long_fails_before_captcha() {
        let long = "a".repeat(MAX_REVIEW_CHARS + 1);
        assert_eq!(
            validate_submission(&long, "", &filter()),
            Err(ValidationError::TooLong)
        );
    }

    /// Length boundary: exactly 200 characters passes the length gate.
    #[test]
    fn test_exact_limit_passes_length_gate() {
        let exact = "a".repeat(MAX_REVIEW_CHARS);
        assert_eq!(
            validate_submission(&exact, "token", &filter()).unwrap(),
            exact.as_str()
        );
    }

    /// Length counts characters, not bytes.
    #[test]
    fn test_length_counts_chars_not_bytes() {
        let exact = "é".repeat(MAX_REVIEW_CHARS);
        assert!(exact.len() > MAX_REVIEW_CHARS);
        assert!(validate_submission(&exact, "token", &filter()).is_ok());
    }

    /// Gate 3: missing bot-check token is reported before the content scan.
    #[test]
    fn test_missing_captcha_fails_before_profanity() {
        assert_eq!(
            validate_submission("this is shit", "", &filter()),
            Err(ValidationError::CaptchaMissing)
        );
    }

    /// Gate 4: profane input with a verified bot check fails with the
    /// content message.
    #[test]
    fn test_profane_input_fails_last() {
        assert_eq!(
            validate_submission("this is shit", "token", &filter()),
            Err(ValidationError::Profane)
        );
    }

    /// A clean, verified submission passes and is trimmed.
    #[test]
    fn test_valid_submission_is_trimmed() {
        assert_eq!(
            validate_submission("  lovely wall  ", "token", &filter()),
            Ok("lovely wall")
        );
    }

    /// Each gate carries a distinct user-facing message.
    #[test]
    fn test_messages_are_distinct() {
        let messages = [
            ValidationError::Empty.to_string(),
            ValidationError::TooLong.to_string(),
            ValidationError::CaptchaMissing.to_string(),
            ValidationError::Profane.to_string(),
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
