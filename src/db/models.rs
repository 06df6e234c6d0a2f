use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Conversational state for one (tenant, participant) pair.
/// `tenant_id` is NULL for the maker bot's own sessions.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Session {
    pub tenant_id: Option<Uuid>,
    pub user_id: String,
    pub step: String,
    pub admin_state: String,
    pub is_blocked: bool,
    pub has_joined: bool,
    pub is_first_start: bool,
    pub language: Option<String>,
    pub referred_by: Option<String>,
    pub referral_count: i64,
    pub last_interaction: DateTime<Utc>,
}

/// One end-user-registered bot.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub token: String,
    pub username: String,
    pub creator_id: String,
    pub template: String,
    pub created_at: DateTime<Utc>,
}

/// Join-channel configuration; NULL tenant is the maker bot's global row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub tenant_id: Option<Uuid>,
    pub first_url: Option<String>,
    pub second_url: Option<String>,
    pub custom_url: Option<String>,
}

/// Which of the three configurable URLs an admin flow is editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSlot {
    First,
    Second,
    Custom,
}

/// Platform-wide singleton settings.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PlatformSettings {
    pub creation_mode: String,
    pub creation_limit: i64,
    pub referral_limit: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationMode {
    Normal,
    Referral,
    Lock,
}

impl CreationMode {
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "referral" => CreationMode::Referral,
            "lock" | "locked" => CreationMode::Lock,
            _ => CreationMode::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CreationMode::Normal => "normal",
            CreationMode::Referral => "referral",
            CreationMode::Lock => "lock",
        }
    }

    /// Locale key of the human-readable mode name.
    pub fn display_key(&self) -> &'static str {
        match self {
            CreationMode::Normal => "mode-normal",
            CreationMode::Referral => "mode-referral",
            CreationMode::Lock => "mode-lock",
        }
    }
}

impl PlatformSettings {
    pub fn mode(&self) -> CreationMode {
        CreationMode::from_str_loose(&self.creation_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_mode_round_trips() {
        for mode in [CreationMode::Normal, CreationMode::Referral, CreationMode::Lock] {
            assert_eq!(CreationMode::from_str_loose(mode.as_str()), mode);
        }
        assert_eq!(CreationMode::from_str_loose("LOCKED"), CreationMode::Lock);
        assert_eq!(CreationMode::from_str_loose("garbage"), CreationMode::Normal);
    }
}
