use uuid::Uuid;

use crate::actions::validate_user_id;
use crate::db::Database;
use crate::error::ActionError;

/// Input checks shared by block and unblock. Blocking yourself is refused;
/// unblocking yourself is harmless and allowed.
pub fn validate_target<'a>(
    admin_id: &str,
    input: &'a str,
    forbid_self: bool,
) -> Result<&'a str, ActionError> {
    let target = validate_user_id(input)?;
    if forbid_self && target == admin_id {
        return Err(ActionError::SelfTargetForbidden);
    }
    Ok(target)
}

/// Blocks a user within the tenant's scope. Maker-scope moderation is
/// performed by the platform owner and applies globally.
pub async fn block(
    db: &Database,
    tenant_id: Option<Uuid>,
    admin_id: &str,
    input: &str,
) -> Result<String, ActionError> {
    let target = validate_target(admin_id, input, true)?;

    if db.get_session(tenant_id, target).await?.is_none() {
        return Err(ActionError::NotFound);
    }

    if tenant_id.is_none() {
        db.set_blocked_global(target, true).await?;
    } else {
        db.set_blocked(tenant_id, target, true).await?;
    }

    Ok(target.to_string())
}

pub async fn unblock(
    db: &Database,
    tenant_id: Option<Uuid>,
    admin_id: &str,
    input: &str,
) -> Result<String, ActionError> {
    let target = validate_target(admin_id, input, false)?;

    if db.get_session(tenant_id, target).await?.is_none() {
        return Err(ActionError::NotFound);
    }

    if tenant_id.is_none() {
        db.set_blocked_global(target, false).await?;
    } else {
        db.set_blocked(tenant_id, target, false).await?;
    }

    Ok(target.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_numeric_targets() {
        assert!(matches!(
            validate_target("7", "abc", true),
            Err(ActionError::InvalidId)
        ));
        assert!(matches!(
            validate_target("7", "12 34", true),
            Err(ActionError::InvalidId)
        ));
    }

    #[test]
    fn blocking_yourself_is_refused() {
        assert!(matches!(
            validate_target("7", "7", true),
            Err(ActionError::SelfTargetForbidden)
        ));
        // Unblock has no self restriction.
        assert_eq!(validate_target("7", "7", false).unwrap(), "7");
    }

    #[test]
    fn valid_targets_pass_through_trimmed() {
        assert_eq!(validate_target("7", " 42 ", true).unwrap(), "42");
    }
}
