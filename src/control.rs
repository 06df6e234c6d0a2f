use reqwest::Client;
use serde::Deserialize;

/// `getMe` / `deleteWebhook` envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: String,
}

/// Thin client for the Bot API control surface: credential validation and
/// webhook teardown before long polling takes over.
#[derive(Debug, Clone)]
pub struct ControlApi {
    client: Client,
}

impl ControlApi {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Confirms a credential with `getMe`; the returned identity carries the
    /// bot's username for display.
    pub async fn verify_credential(&self, token: &str) -> anyhow::Result<BotIdentity> {
        let resp = self
            .client
            .get(format!("https://api.telegram.org/bot{}/getMe", token))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err_body = resp.text().await.unwrap_or_default();
            anyhow::bail!("getMe failed ({}): {}", status, err_body);
        }

        let body: ApiResponse<BotIdentity> = resp.json().await?;
        if !body.ok {
            anyhow::bail!(
                "getMe rejected: {}",
                body.description.unwrap_or_else(|| "no description".to_string())
            );
        }

        body.result
            .ok_or_else(|| anyhow::anyhow!("getMe returned ok without a result"))
    }

    /// Drops any webhook registered for the credential so the dispatcher can
    /// poll. Telegram refuses getUpdates while a webhook is set.
    pub async fn drop_webhook(&self, token: &str) -> anyhow::Result<()> {
        let resp = self
            .client
            .get(format!("https://api.telegram.org/bot{}/deleteWebhook", token))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err_body = resp.text().await.unwrap_or_default();
            anyhow::bail!("deleteWebhook failed ({}): {}", status, err_body);
        }

        let body: ApiResponse<bool> = resp.json().await?;
        if !body.ok {
            anyhow::bail!(
                "deleteWebhook rejected: {}",
                body.description.unwrap_or_else(|| "no description".to_string())
            );
        }

        Ok(())
    }
}

impl Default for ControlApi {
    fn default() -> Self {
        Self::new()
    }
}
