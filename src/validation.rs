//! Local checks run on user input before anything is sent

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::SyncError;

static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap(/* this is a valid, constant pattern */)
});

/// Whether a question asks for an email address
pub fn asks_for_email(question: &str) -> bool {
    question.to_lowercase().contains("email")
}

pub fn looks_like_email(text: &str) -> bool {
    EMAIL_SHAPE.is_match(text)
}

/// Check an answer to a clarification question.
///
/// Questions about an email only accept answers that look like one. Anything goes for other questions.
pub fn validate_answer(question: &str, answer: &str) -> Result<(), SyncError> {
    if asks_for_email(question) && looks_like_email(answer) == false {
        return Err(SyncError::InvalidEmail{ answer: answer.to_string() });
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(looks_like_email("harsh@example.com"));
        assert!(looks_like_email("a.b+c@mail.example.org"));
        assert!(looks_like_email("not-an-email") == false);
        assert!(looks_like_email("two@@example.com") == false);
        assert!(looks_like_email("space in@example.com") == false);
        assert!(looks_like_email("nodot@example") == false);
    }

    #[test]
    fn only_email_questions_are_checked() {
        assert!(validate_answer("What's your email?", "not-an-email").is_err());
        assert!(validate_answer("Who is Harsh? Provide an Email/phone.", "555-1234").is_err());
        assert!(validate_answer("What's your email?", "harsh@example.com").is_ok());
        assert!(validate_answer("What's your email?", " harsh@example.com ").is_err());
        assert!(validate_answer("Which room?", "not-an-email").is_ok());
    }
}
