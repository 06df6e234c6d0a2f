/// Position within the ordinary (non-admin) menu flow.
///
/// Persisted as its token string; unknown tokens decode to `None` so a
/// schema-drifted row degrades to the terminal state instead of wedging the
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    None,
    AwaitingToken,
    AwaitingDeleteToken,
    AwaitingLanguage,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::None => "none",
            Step::AwaitingToken => "awaiting_token",
            Step::AwaitingDeleteToken => "awaiting_delete_token",
            Step::AwaitingLanguage => "awaiting_language",
        }
    }

    pub fn from_str_loose(s: &str) -> Self {
        match s {
            "awaiting_token" => Step::AwaitingToken,
            "awaiting_delete_token" => Step::AwaitingDeleteToken,
            "awaiting_language" => Step::AwaitingLanguage,
            "none" => Step::None,
            other => {
                if !other.is_empty() {
                    tracing::warn!("unknown step token '{}', treating as none", other);
                }
                Step::None
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Step::None)
    }
}

/// Position within the owner/creator-only administrative flow.
/// Independent axis from [`Step`]: a session can be mid-admin-flow while its
/// ordinary step stays terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminState {
    None,
    Panel,
    AwaitingBroadcast,
    AwaitingGlobalBroadcast,
    AwaitingBlockId,
    AwaitingUnblockId,
    AwaitingFirstChannel,
    AwaitingSecondChannel,
    AwaitingCustomUrl,
    AwaitingLimit,
    AwaitingReferralLimit,
    AwaitingVipAdd,
    AwaitingVipRemove,
}

impl AdminState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminState::None => "none",
            AdminState::Panel => "admin_panel",
            AdminState::AwaitingBroadcast => "awaiting_broadcast",
            AdminState::AwaitingGlobalBroadcast => "awaiting_global_broadcast",
            AdminState::AwaitingBlockId => "awaiting_block",
            AdminState::AwaitingUnblockId => "awaiting_unblock",
            AdminState::AwaitingFirstChannel => "awaiting_first_channel",
            AdminState::AwaitingSecondChannel => "awaiting_second_channel",
            AdminState::AwaitingCustomUrl => "awaiting_custom_url",
            AdminState::AwaitingLimit => "awaiting_limit",
            AdminState::AwaitingReferralLimit => "awaiting_referral_limit",
            AdminState::AwaitingVipAdd => "awaiting_vip_add",
            AdminState::AwaitingVipRemove => "awaiting_vip_remove",
        }
    }

    pub fn from_str_loose(s: &str) -> Self {
        match s {
            "admin_panel" => AdminState::Panel,
            "awaiting_broadcast" => AdminState::AwaitingBroadcast,
            "awaiting_global_broadcast" => AdminState::AwaitingGlobalBroadcast,
            "awaiting_block" => AdminState::AwaitingBlockId,
            "awaiting_unblock" => AdminState::AwaitingUnblockId,
            "awaiting_first_channel" => AdminState::AwaitingFirstChannel,
            "awaiting_second_channel" => AdminState::AwaitingSecondChannel,
            "awaiting_custom_url" => AdminState::AwaitingCustomUrl,
            "awaiting_limit" => AdminState::AwaitingLimit,
            "awaiting_referral_limit" => AdminState::AwaitingReferralLimit,
            "awaiting_vip_add" => AdminState::AwaitingVipAdd,
            "awaiting_vip_remove" => AdminState::AwaitingVipRemove,
            "none" => AdminState::None,
            other => {
                if !other.is_empty() {
                    tracing::warn!("unknown admin state token '{}', treating as none", other);
                }
                AdminState::None
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AdminState::None)
    }

    /// Prompt shown when entering this state.
    pub fn prompt_key(&self) -> Option<&'static str> {
        match self {
            AdminState::AwaitingBroadcast => Some("ask-broadcast"),
            AdminState::AwaitingGlobalBroadcast => Some("ask-broadcast-all"),
            AdminState::AwaitingBlockId => Some("ask-block-id"),
            AdminState::AwaitingUnblockId => Some("ask-unblock-id"),
            AdminState::AwaitingFirstChannel => Some("ask-first-channel"),
            AdminState::AwaitingSecondChannel => Some("ask-second-channel"),
            AdminState::AwaitingCustomUrl => Some("ask-custom-url"),
            AdminState::AwaitingLimit => Some("ask-limit"),
            AdminState::AwaitingReferralLimit => Some("ask-referral-limit"),
            AdminState::AwaitingVipAdd => Some("ask-vip-add"),
            AdminState::AwaitingVipRemove => Some("ask-vip-remove"),
            AdminState::None | AdminState::Panel => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_tokens_round_trip() {
        for step in [
            Step::None,
            Step::AwaitingToken,
            Step::AwaitingDeleteToken,
            Step::AwaitingLanguage,
        ] {
            assert_eq!(Step::from_str_loose(step.as_str()), step);
        }
    }

    #[test]
    fn admin_tokens_round_trip() {
        for state in [
            AdminState::None,
            AdminState::Panel,
            AdminState::AwaitingBroadcast,
            AdminState::AwaitingGlobalBroadcast,
            AdminState::AwaitingBlockId,
            AdminState::AwaitingUnblockId,
            AdminState::AwaitingFirstChannel,
            AdminState::AwaitingSecondChannel,
            AdminState::AwaitingCustomUrl,
            AdminState::AwaitingLimit,
            AdminState::AwaitingReferralLimit,
            AdminState::AwaitingVipAdd,
            AdminState::AwaitingVipRemove,
        ] {
            assert_eq!(AdminState::from_str_loose(state.as_str()), state);
        }
    }

    #[test]
    fn unknown_tokens_degrade_to_terminal() {
        assert_eq!(Step::from_str_loose("legacy_step"), Step::None);
        assert_eq!(AdminState::from_str_loose("legacy_state"), AdminState::None);
    }
}
