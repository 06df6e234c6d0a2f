use chrono::Utc;

use crate::db::models::{CreationMode, Tenant};
use crate::db::Database;

/// Read-only per-tenant aggregation for the tenant admin panel.
#[derive(Debug)]
pub struct TenantStats {
    pub total: i64,
    pub joined: i64,
    pub age_days: i64,
    pub first_url: Option<String>,
    pub second_url: Option<String>,
    pub custom_url: Option<String>,
}

pub async fn tenant_stats(db: &Database, tenant: &Tenant) -> anyhow::Result<TenantStats> {
    let tenant_id = Some(tenant.id);
    let config = db.get_channel_config(tenant_id).await?;

    Ok(TenantStats {
        total: db.count_sessions(tenant_id).await?,
        joined: db.count_joined(tenant_id).await?,
        age_days: (Utc::now() - tenant.created_at).num_days().max(0),
        first_url: config.as_ref().and_then(|c| c.first_url.clone()),
        second_url: config.as_ref().and_then(|c| c.second_url.clone()),
        custom_url: config.and_then(|c| c.custom_url),
    })
}

/// Platform-wide aggregation for the owner's panel.
#[derive(Debug)]
pub struct PlatformStats {
    pub users: i64,
    pub tenants: i64,
    pub vips: i64,
    pub mode: CreationMode,
    pub creation_limit: i64,
    pub referral_limit: i64,
}

pub async fn platform_stats(db: &Database) -> anyhow::Result<PlatformStats> {
    let settings = db.get_settings().await?;

    Ok(PlatformStats {
        users: db.count_distinct_users().await?,
        tenants: db.count_tenants().await?,
        vips: db.count_vips().await?,
        mode: settings.mode(),
        creation_limit: settings.creation_limit,
        referral_limit: settings.referral_limit,
    })
}
