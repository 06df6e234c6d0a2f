use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::bot::AppState;
use crate::db::models::{CreationMode, PlatformSettings, Tenant};
use crate::db::Database;
use crate::error::ActionError;

/// The only template shipped today: join the channels, then unlock the menu.
pub const DEFAULT_TEMPLATE: &str = "join-gate";

/// BotFather credential shape: numeric bot id, colon, secret.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+:[A-Za-z0-9_-]{30,}$").unwrap());

/// The creation gate, as a pure decision. Order matters: VIPs skip the mode
/// checks but still honor the per-creator limit; `lock` refuses everyone
/// else; `referral` requires the threshold.
pub fn gate_decision(
    settings: &PlatformSettings,
    is_vip: bool,
    referral_count: i64,
    owned_bots: i64,
) -> Result<(), ActionError> {
    if !is_vip {
        match settings.mode() {
            CreationMode::Lock => return Err(ActionError::CreationLocked),
            CreationMode::Referral => {
                if referral_count < settings.referral_limit {
                    return Err(ActionError::ReferralsRequired {
                        required: settings.referral_limit,
                        have: referral_count,
                    });
                }
            }
            CreationMode::Normal => {}
        }
    }

    if settings.creation_limit > 0 && owned_bots >= settings.creation_limit {
        return Err(ActionError::LimitReached {
            limit: settings.creation_limit,
        });
    }

    Ok(())
}

/// Loads the gate's inputs and evaluates it for one would-be creator.
pub async fn check_gate(db: &Database, user_id: &str) -> Result<(), ActionError> {
    let settings = db.get_settings().await?;
    let is_vip = db.is_vip(user_id).await?;
    let referral_count = db
        .get_session(None, user_id)
        .await?
        .map(|s| s.referral_count)
        .unwrap_or(0);
    let owned_bots = db.count_tenants_by_creator(user_id).await?;

    gate_decision(&settings, is_vip, referral_count, owned_bots)
}

/// Registers a new tenant bot from a pasted credential.
///
/// Shape check, duplicate check and the creation gate run before the
/// control-API round trip; activation (webhook teardown + dispatcher spawn)
/// runs last, and a failed activation removes the fresh record again.
pub async fn create(
    state: &Arc<AppState>,
    token: &str,
    creator_id: &str,
) -> Result<Tenant, ActionError> {
    let token = token.trim();
    if !TOKEN_RE.is_match(token) {
        return Err(ActionError::InvalidCredential);
    }

    if state.db.get_tenant_by_token(token).await?.is_some() {
        return Err(ActionError::DuplicateCredential);
    }

    check_gate(&state.db, creator_id).await?;

    let identity = state
        .control
        .verify_credential(token)
        .await
        .map_err(|e| {
            tracing::info!("credential rejected by getMe: {}", e);
            ActionError::InvalidCredential
        })?;
    let username = identity.username.unwrap_or(identity.first_name);

    let tenant = state
        .db
        .create_tenant(token, &username, creator_id, DEFAULT_TEMPLATE)
        .await?;

    if let Err(e) = state.registry.activate(state, &tenant).await {
        tracing::error!("activation of @{} failed: {}", tenant.username, e);
        if let Err(e) = state.db.delete_tenant(tenant.id).await {
            tracing::error!("rollback of tenant {} failed: {}", tenant.id, e);
        }
        return Err(ActionError::ActivationFailed(e.to_string()));
    }

    tracing::info!("tenant @{} created by {}", tenant.username, creator_id);
    Ok(tenant)
}

/// Removes a tenant bot by credential. Only the creator or the platform
/// owner may delete; everyone else sees the same NotFound as for an unknown
/// token. Record deletion cascades sessions and channel config.
pub async fn delete(
    state: &Arc<AppState>,
    token: &str,
    actor_id: &str,
    is_owner: bool,
) -> Result<String, ActionError> {
    let token = token.trim();
    let tenant = state
        .db
        .get_tenant_by_token(token)
        .await?
        .ok_or(ActionError::NotFound)?;

    if tenant.creator_id != actor_id && !is_owner {
        return Err(ActionError::NotFound);
    }

    state.registry.deactivate(&tenant).await;
    state.db.delete_tenant(tenant.id).await?;

    tracing::info!("tenant @{} deleted by {}", tenant.username, actor_id);
    Ok(tenant.username)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(mode: &str, creation_limit: i64, referral_limit: i64) -> PlatformSettings {
        PlatformSettings {
            creation_mode: mode.to_string(),
            creation_limit,
            referral_limit,
        }
    }

    #[test]
    fn token_shape_is_checked() {
        assert!(TOKEN_RE.is_match("123456789:AAF0abcDEFghiJKLmnoPQRstuVWxyz012_-"));
        assert!(!TOKEN_RE.is_match("not a token"));
        assert!(!TOKEN_RE.is_match("123456789"));
        assert!(!TOKEN_RE.is_match(":AAF0abcDEFghiJKLmnoPQRstuVWxyz012"));
        assert!(!TOKEN_RE.is_match("abc:AAF0abcDEFghiJKLmnoPQRstuVWxyz012"));
    }

    #[test]
    fn referral_threshold_is_a_strict_boundary() {
        let s = settings("referral", 0, 5);

        // One short of the threshold: rejected.
        let err = gate_decision(&s, false, 4, 0).unwrap_err();
        assert!(matches!(
            err,
            ActionError::ReferralsRequired { required: 5, have: 4 }
        ));

        // Exactly at the threshold: permitted.
        assert!(gate_decision(&s, false, 5, 0).is_ok());
    }

    #[test]
    fn lock_mode_rejects_everyone_but_vips() {
        let s = settings("lock", 0, 5);
        assert!(matches!(
            gate_decision(&s, false, 100, 0),
            Err(ActionError::CreationLocked)
        ));
        assert!(gate_decision(&s, true, 0, 0).is_ok());
    }

    #[test]
    fn vips_still_honor_the_creation_limit() {
        let s = settings("lock", 2, 5);
        assert!(gate_decision(&s, true, 0, 1).is_ok());
        assert!(matches!(
            gate_decision(&s, true, 0, 2),
            Err(ActionError::LimitReached { limit: 2 })
        ));
    }

    #[test]
    fn zero_limit_means_unlimited() {
        let s = settings("normal", 0, 5);
        assert!(gate_decision(&s, false, 0, 10_000).is_ok());
    }
}
