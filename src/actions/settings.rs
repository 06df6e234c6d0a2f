use crate::actions::validate_user_id;
use crate::db::models::CreationMode;
use crate::db::Database;
use crate::error::ActionError;

/// Limits arrive as free text and must be whole non-negative numbers.
pub fn parse_non_negative(input: &str) -> Result<i64, ActionError> {
    input
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n >= 0)
        .ok_or(ActionError::InvalidNumber)
}

pub async fn set_creation_limit(db: &Database, input: &str) -> Result<i64, ActionError> {
    let limit = parse_non_negative(input)?;
    db.set_creation_limit(limit).await?;
    Ok(limit)
}

pub async fn set_referral_limit(db: &Database, input: &str) -> Result<i64, ActionError> {
    let limit = parse_non_negative(input)?;
    db.set_referral_limit(limit).await?;
    Ok(limit)
}

/// Mode arrives from an inline keyboard, so any unknown value degrades to
/// `normal` rather than failing.
pub async fn set_creation_mode(db: &Database, input: &str) -> Result<CreationMode, ActionError> {
    let mode = CreationMode::from_str_loose(input);
    db.set_creation_mode(mode.as_str()).await?;
    Ok(mode)
}

pub async fn add_vip(db: &Database, input: &str) -> Result<String, ActionError> {
    let target = validate_user_id(input)?;
    db.add_vip(target).await?;
    Ok(target.to_string())
}

pub async fn remove_vip(db: &Database, input: &str) -> Result<String, ActionError> {
    let target = validate_user_id(input)?;
    if !db.remove_vip(target).await? {
        return Err(ActionError::NotFound);
    }
    Ok(target.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_non_negative_integers() {
        assert_eq!(parse_non_negative("0").unwrap(), 0);
        assert_eq!(parse_non_negative(" 25 ").unwrap(), 25);
        assert!(matches!(parse_non_negative("-1"), Err(ActionError::InvalidNumber)));
        assert!(matches!(parse_non_negative("ten"), Err(ActionError::InvalidNumber)));
        assert!(matches!(parse_non_negative("2.5"), Err(ActionError::InvalidNumber)));
        assert!(matches!(parse_non_negative(""), Err(ActionError::InvalidNumber)));
    }
}
