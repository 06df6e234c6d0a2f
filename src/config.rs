use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Credential of the maker bot itself.
    pub bot_token: String,
    pub database_url: String,

    /// Telegram user id of the platform owner.
    pub owner_id: String,

    /// Shown as the join target when a tenant has no channels configured.
    pub fallback_channel_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let owner_id = std::env::var("OWNER_ID")?;
        if owner_id.is_empty() || !owner_id.chars().all(|c| c.is_ascii_digit()) {
            anyhow::bail!("OWNER_ID must be a numeric Telegram user id");
        }

        Ok(Self {
            bot_token: std::env::var("BOT_TOKEN")?,
            database_url: std::env::var("DATABASE_URL")?,
            owner_id,
            fallback_channel_url: std::env::var("FALLBACK_CHANNEL_URL")
                .unwrap_or_else(|_| "https://t.me/botsmith_news".to_string()),
        })
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            bot_token: "42:token".into(),
            database_url: "postgres://localhost/botsmith".into(),
            owner_id: "777".into(),
            fallback_channel_url: "https://t.me/botsmith_news".into(),
        }
    }

    #[test]
    fn owner_check_is_exact() {
        let cfg = config();
        assert!(cfg.is_owner("777"));
        assert!(!cfg.is_owner("778"));
        assert!(!cfg.is_owner(""));
    }
}
