pub mod channels;
pub mod moderation;
pub mod settings;
pub mod stats;
pub mod tenants;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ActionError;

static ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// User ids arrive as free text; only digit strings are acceptable.
pub fn validate_user_id(input: &str) -> Result<&str, ActionError> {
    let trimmed = input.trim();
    if ID_RE.is_match(trimmed) {
        Ok(trimmed)
    } else {
        Err(ActionError::InvalidId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_digit_strings_only() {
        assert_eq!(validate_user_id("48213").unwrap(), "48213");
        assert_eq!(validate_user_id(" 7 ").unwrap(), "7");
        assert!(matches!(validate_user_id("abc"), Err(ActionError::InvalidId)));
        assert!(matches!(validate_user_id("12a"), Err(ActionError::InvalidId)));
        assert!(matches!(validate_user_id("-5"), Err(ActionError::InvalidId)));
        assert!(matches!(validate_user_id(""), Err(ActionError::InvalidId)));
    }
}
