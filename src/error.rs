use thiserror::Error;

/// Failures an action handler can report back to the chat.
///
/// Each variant maps to one localized message; `kind()` groups them into the
/// three classes that drive the post-action state policy.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("invalid bot credential")]
    InvalidCredential,
    #[error("credential already registered")]
    DuplicateCredential,
    #[error("bot verified but activation failed: {0}")]
    ActivationFailed(String),
    #[error("target id is not numeric")]
    InvalidId,
    #[error("admins cannot target themselves")]
    SelfTargetForbidden,
    #[error("no matching record")]
    NotFound,
    #[error("url failed host validation")]
    InvalidUrl,
    #[error("input is not a non-negative integer")]
    InvalidNumber,
    #[error("bot creation is locked")]
    CreationLocked,
    #[error("{required} referrals required, user has {have}")]
    ReferralsRequired { required: i64, have: i64 },
    #[error("creation limit of {limit} reached")]
    LimitReached { limit: i64 },
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

/// Error class, used to decide what happens to the session state afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or rejected input: report, keep state so the user retries.
    Validation,
    /// Unknown tenant/session/credential: report, reset admin flow to its parent.
    NotFound,
    /// Outbound or control-API failure: log, generic notice, keep state.
    Upstream,
}

impl ActionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::NotFound => ErrorKind::NotFound,
            ActionError::Upstream(_) | ActionError::ActivationFailed(_) => ErrorKind::Upstream,
            _ => ErrorKind::Validation,
        }
    }

    /// Locale key for the user-facing report.
    pub fn message_key(&self) -> &'static str {
        match self {
            ActionError::InvalidCredential => "err-invalid-credential",
            ActionError::DuplicateCredential => "err-duplicate-credential",
            ActionError::ActivationFailed(_) => "err-activation-failed",
            ActionError::InvalidId => "err-invalid-id",
            ActionError::SelfTargetForbidden => "err-self-target",
            ActionError::NotFound => "err-not-found",
            ActionError::InvalidUrl => "err-invalid-url",
            ActionError::InvalidNumber => "err-invalid-number",
            ActionError::CreationLocked => "err-creation-locked",
            ActionError::ReferralsRequired { .. } => "err-referrals-required",
            ActionError::LimitReached { .. } => "err-limit-reached",
            ActionError::Upstream(_) => "err-generic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_drive_state_policy() {
        assert_eq!(ActionError::InvalidId.kind(), ErrorKind::Validation);
        assert_eq!(ActionError::SelfTargetForbidden.kind(), ErrorKind::Validation);
        assert_eq!(ActionError::NotFound.kind(), ErrorKind::NotFound);
        assert_eq!(
            ActionError::Upstream(anyhow::anyhow!("boom")).kind(),
            ErrorKind::Upstream
        );
        assert_eq!(
            ActionError::ActivationFailed("spawn".into()).kind(),
            ErrorKind::Upstream
        );
    }
}
