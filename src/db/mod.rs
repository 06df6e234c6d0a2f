pub mod models;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use models::{ChannelConfig, ChannelSlot, PlatformSettings, Session, Tenant};

#[derive(Debug, Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        // Each CREATE TABLE must be a separate query (Postgres doesn't allow
        // multiple commands in a single prepared statement).

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS tenants (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                token TEXT NOT NULL UNIQUE,
                username TEXT NOT NULL,
                creator_id TEXT NOT NULL,
                template TEXT NOT NULL DEFAULT 'join-gate',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(&self.pool)
        .await?;

        // NULLS NOT DISTINCT: the maker bot's sessions share tenant_id = NULL
        // and must still be unique per user.
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS sessions (
                tenant_id UUID REFERENCES tenants(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL,
                step TEXT NOT NULL DEFAULT 'none',
                admin_state TEXT NOT NULL DEFAULT 'none',
                is_blocked BOOLEAN NOT NULL DEFAULT FALSE,
                has_joined BOOLEAN NOT NULL DEFAULT FALSE,
                is_first_start BOOLEAN NOT NULL DEFAULT TRUE,
                language TEXT,
                referred_by TEXT,
                referral_count BIGINT NOT NULL DEFAULT 0,
                last_interaction TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE NULLS NOT DISTINCT (tenant_id, user_id)
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS channel_configs (
                tenant_id UUID REFERENCES tenants(id) ON DELETE CASCADE,
                first_url TEXT,
                second_url TEXT,
                custom_url TEXT,
                UNIQUE NULLS NOT DISTINCT (tenant_id)
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS platform_settings (
                id BOOLEAN PRIMARY KEY DEFAULT TRUE CHECK (id),
                creation_mode TEXT NOT NULL DEFAULT 'normal',
                creation_limit BIGINT NOT NULL DEFAULT 0,
                referral_limit BIGINT NOT NULL DEFAULT 5
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS vips (
                user_id TEXT PRIMARY KEY
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_tenant ON sessions(tenant_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tenants_creator ON tenants(creator_id)")
            .execute(&self.pool)
            .await?;

        // The settings singleton always exists.
        sqlx::query("INSERT INTO platform_settings (id) VALUES (TRUE) ON CONFLICT DO NOTHING")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ── Session Operations ─────────────────────────────────────────

    pub async fn get_or_create_session(
        &self,
        tenant_id: Option<Uuid>,
        user_id: &str,
    ) -> anyhow::Result<Session> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (tenant_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (tenant_id, user_id)
            DO UPDATE SET last_interaction = NOW()
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    pub async fn get_session(
        &self,
        tenant_id: Option<Uuid>,
        user_id: &str,
    ) -> anyhow::Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE tenant_id IS NOT DISTINCT FROM $1 AND user_id = $2",
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    pub async fn set_step(
        &self,
        tenant_id: Option<Uuid>,
        user_id: &str,
        step: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE sessions SET step = $3 WHERE tenant_id IS NOT DISTINCT FROM $1 AND user_id = $2",
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(step)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_admin_state(
        &self,
        tenant_id: Option<Uuid>,
        user_id: &str,
        admin_state: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE sessions SET admin_state = $3 WHERE tenant_id IS NOT DISTINCT FROM $1 AND user_id = $2",
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(admin_state)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Resets both state axes, as `/start` re-entry does.
    pub async fn reset_states(
        &self,
        tenant_id: Option<Uuid>,
        user_id: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"UPDATE sessions SET step = 'none', admin_state = 'none'
               WHERE tenant_id IS NOT DISTINCT FROM $1 AND user_id = $2"#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_blocked(
        &self,
        tenant_id: Option<Uuid>,
        user_id: &str,
        blocked: bool,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE sessions SET is_blocked = $3 WHERE tenant_id IS NOT DISTINCT FROM $1 AND user_id = $2",
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(blocked)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Platform-owner moderation applies to every session of the user.
    pub async fn set_blocked_global(&self, user_id: &str, blocked: bool) -> anyhow::Result<()> {
        sqlx::query("UPDATE sessions SET is_blocked = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(blocked)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_language(
        &self,
        tenant_id: Option<Uuid>,
        user_id: &str,
        language: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE sessions SET language = $3 WHERE tenant_id IS NOT DISTINCT FROM $1 AND user_id = $2",
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(language)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_joined(&self, tenant_id: Option<Uuid>, user_id: &str) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE sessions SET has_joined = TRUE WHERE tenant_id IS NOT DISTINCT FROM $1 AND user_id = $2",
        )
        .bind(tenant_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn clear_first_start(
        &self,
        tenant_id: Option<Uuid>,
        user_id: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE sessions SET is_first_start = FALSE WHERE tenant_id IS NOT DISTINCT FROM $1 AND user_id = $2",
        )
        .bind(tenant_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Records the referral link once per user; self-referrals never stick.
    /// Returns true when the linkage was actually written.
    pub async fn set_referred_by(&self, user_id: &str, referrer: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"UPDATE sessions SET referred_by = $2
               WHERE tenant_id IS NULL AND user_id = $1
                 AND referred_by IS NULL AND user_id <> $2"#,
        )
        .bind(user_id)
        .bind(referrer)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Bumps the referrer's count and returns the new total, or None when the
    /// referrer has no maker session to credit.
    pub async fn increment_referral_count(&self, user_id: &str) -> anyhow::Result<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"UPDATE sessions SET referral_count = referral_count + 1
               WHERE tenant_id IS NULL AND user_id = $1
               RETURNING referral_count"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    pub async fn sessions_for_tenant(
        &self,
        tenant_id: Option<Uuid>,
    ) -> anyhow::Result<Vec<Session>> {
        let sessions = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE tenant_id IS NOT DISTINCT FROM $1 ORDER BY user_id",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    pub async fn count_sessions(&self, tenant_id: Option<Uuid>) -> anyhow::Result<i64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sessions WHERE tenant_id IS NOT DISTINCT FROM $1",
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    pub async fn count_joined(&self, tenant_id: Option<Uuid>) -> anyhow::Result<i64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sessions WHERE tenant_id IS NOT DISTINCT FROM $1 AND has_joined",
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    pub async fn count_distinct_users(&self) -> anyhow::Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(DISTINCT user_id) FROM sessions")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    // ── Tenant Operations ──────────────────────────────────────────

    pub async fn create_tenant(
        &self,
        token: &str,
        username: &str,
        creator_id: &str,
        template: &str,
    ) -> anyhow::Result<Tenant> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (token, username, creator_id, template)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(token)
        .bind(username)
        .bind(creator_id)
        .bind(template)
        .fetch_one(&self.pool)
        .await?;
        Ok(tenant)
    }

    pub async fn get_tenant_by_token(&self, token: &str) -> anyhow::Result<Option<Tenant>> {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    /// Cascades to sessions and channel config via foreign keys.
    pub async fn delete_tenant(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_tenants(&self) -> anyhow::Result<Vec<Tenant>> {
        let tenants = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(tenants)
    }

    pub async fn list_tenants_by_creator(&self, creator_id: &str) -> anyhow::Result<Vec<Tenant>> {
        let tenants = sqlx::query_as::<_, Tenant>(
            "SELECT * FROM tenants WHERE creator_id = $1 ORDER BY created_at",
        )
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tenants)
    }

    pub async fn count_tenants_by_creator(&self, creator_id: &str) -> anyhow::Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tenants WHERE creator_id = $1")
            .bind(creator_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    pub async fn count_tenants(&self) -> anyhow::Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tenants")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    // ── Channel Configuration ──────────────────────────────────────

    pub async fn get_channel_config(
        &self,
        tenant_id: Option<Uuid>,
    ) -> anyhow::Result<Option<ChannelConfig>> {
        let config = sqlx::query_as::<_, ChannelConfig>(
            "SELECT * FROM channel_configs WHERE tenant_id IS NOT DISTINCT FROM $1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(config)
    }

    pub async fn set_channel_url(
        &self,
        tenant_id: Option<Uuid>,
        slot: ChannelSlot,
        url: &str,
    ) -> anyhow::Result<()> {
        let query = match slot {
            ChannelSlot::First => {
                r#"INSERT INTO channel_configs (tenant_id, first_url) VALUES ($1, $2)
                   ON CONFLICT (tenant_id) DO UPDATE SET first_url = $2"#
            }
            ChannelSlot::Second => {
                r#"INSERT INTO channel_configs (tenant_id, second_url) VALUES ($1, $2)
                   ON CONFLICT (tenant_id) DO UPDATE SET second_url = $2"#
            }
            ChannelSlot::Custom => {
                r#"INSERT INTO channel_configs (tenant_id, custom_url) VALUES ($1, $2)
                   ON CONFLICT (tenant_id) DO UPDATE SET custom_url = $2"#
            }
        };
        sqlx::query(query)
            .bind(tenant_id)
            .bind(url)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ── Platform Settings ──────────────────────────────────────────

    pub async fn get_settings(&self) -> anyhow::Result<PlatformSettings> {
        let settings = sqlx::query_as::<_, PlatformSettings>(
            "SELECT creation_mode, creation_limit, referral_limit FROM platform_settings WHERE id",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(settings)
    }

    pub async fn set_creation_mode(&self, mode: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE platform_settings SET creation_mode = $1 WHERE id")
            .bind(mode)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_creation_limit(&self, limit: i64) -> anyhow::Result<()> {
        sqlx::query("UPDATE platform_settings SET creation_limit = $1 WHERE id")
            .bind(limit)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_referral_limit(&self, limit: i64) -> anyhow::Result<()> {
        sqlx::query("UPDATE platform_settings SET referral_limit = $1 WHERE id")
            .bind(limit)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ── VIP Set ────────────────────────────────────────────────────

    pub async fn add_vip(&self, user_id: &str) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO vips (user_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Returns false when the user was not a VIP.
    pub async fn remove_vip(&self, user_id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM vips WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn is_vip(&self, user_id: &str) -> anyhow::Result<bool> {
        let row: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM vips WHERE user_id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    pub async fn count_vips(&self) -> anyhow::Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vips")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}
