use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::db::models::ChannelSlot;
use crate::db::Database;
use crate::error::ActionError;

/// Canonical channel link shape after normalization.
static HOST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^t\.me/[A-Za-z0-9_+][A-Za-z0-9_+/-]*$").unwrap());
/// A bare channel slug (what users paste after copying from @mentions).
static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[A-Za-z0-9_]+$").unwrap());

/// Normalizes free-form channel input into `https://t.me/<slug>`.
///
/// Accepts `@name`, `name`, `t.me/name`, `https://t.me/name/` and the like;
/// anything that does not reduce to the t.me host is rejected. Idempotent:
/// normalizing an already-normalized link returns it unchanged.
pub fn normalize_channel_url(input: &str) -> Result<String, ActionError> {
    let s = input.trim();
    let s = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .unwrap_or(s);
    let s = s.trim_start_matches('@');
    let s = s.trim_end_matches('/');

    let candidate = if let Some(rest) = s.strip_prefix("t.me/") {
        format!("t.me/{}", rest)
    } else if SLUG_RE.is_match(s) {
        format!("t.me/{}", s)
    } else {
        return Err(ActionError::InvalidUrl);
    };

    if !HOST_RE.is_match(&candidate) {
        return Err(ActionError::InvalidUrl);
    }

    Ok(format!("https://{}", candidate))
}

/// Validates and stores one of the tenant's configurable URLs.
/// Returns the canonical form that was saved.
pub async fn set_channel(
    db: &Database,
    tenant_id: Option<Uuid>,
    slot: ChannelSlot,
    input: &str,
) -> Result<String, ActionError> {
    let url = normalize_channel_url(input)?;
    db.set_channel_url(tenant_id, slot, &url).await?;
    Ok(url)
}

/// The join targets shown by the subscription gate: the configured channels,
/// or the platform fallback when none are set.
pub async fn join_targets(
    db: &Database,
    tenant_id: Option<Uuid>,
    fallback_url: &str,
) -> anyhow::Result<Vec<String>> {
    let config = db.get_channel_config(tenant_id).await?;
    let mut targets = Vec::new();
    if let Some(config) = config {
        if let Some(url) = config.first_url {
            targets.push(url);
        }
        if let Some(url) = config.second_url {
            targets.push(url);
        }
    }
    if targets.is_empty() {
        targets.push(fallback_url.to_string());
    }
    Ok(targets)
}

/// The tenant's optional custom link for the unlocked menu.
pub async fn custom_url(db: &Database, tenant_id: Option<Uuid>) -> anyhow::Result<Option<String>> {
    Ok(db
        .get_channel_config(tenant_id)
        .await?
        .and_then(|c| c.custom_url))
}

/// Extracts the `@username` of a `t.me` channel link, for membership checks.
/// Private invite links (`t.me/+hash`) cannot be checked and return None.
pub fn channel_username(url: &str) -> Option<String> {
    let slug = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
        .strip_prefix("t.me/")?;
    let slug = slug.trim_end_matches('/');
    if slug.is_empty() || slug.starts_with('+') || slug.contains('/') {
        return None;
    }
    Some(format!("@{}", slug))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalizes_the_usual_shapes() {
        assert_eq!(normalize_channel_url("t.me/foo/").unwrap(), "https://t.me/foo");
        assert_eq!(normalize_channel_url("@foo").unwrap(), "https://t.me/foo");
        assert_eq!(normalize_channel_url("foo").unwrap(), "https://t.me/foo");
        assert_eq!(
            normalize_channel_url("https://t.me/foo").unwrap(),
            "https://t.me/foo"
        );
        assert_eq!(
            normalize_channel_url("http://t.me/foo").unwrap(),
            "https://t.me/foo"
        );
        assert_eq!(
            normalize_channel_url("t.me/+AbCdEf").unwrap(),
            "https://t.me/+AbCdEf"
        );
    }

    #[test]
    fn rejects_foreign_hosts() {
        assert!(matches!(
            normalize_channel_url("http://example.com"),
            Err(ActionError::InvalidUrl)
        ));
        assert!(matches!(
            normalize_channel_url("https://example.com/foo"),
            Err(ActionError::InvalidUrl)
        ));
        assert!(matches!(
            normalize_channel_url("www.t.me/foo"),
            Err(ActionError::InvalidUrl)
        ));
        assert!(matches!(normalize_channel_url(""), Err(ActionError::InvalidUrl)));
        assert!(matches!(
            normalize_channel_url("t.me/"),
            Err(ActionError::InvalidUrl)
        ));
    }

    #[test]
    fn normalization_is_idempotent() {
        for input in ["t.me/foo/", "@foo", "foo", "https://t.me/foo", "t.me/+AbCdEf"] {
            let once = normalize_channel_url(input).unwrap();
            let twice = normalize_channel_url(&once).unwrap();
            assert_eq!(once, twice, "input {}", input);
        }
    }

    #[test]
    fn normalized_urls_match_the_host_pattern() {
        for input in ["t.me/foo/", "@bar_baz", "under_score", "https://t.me/qux"] {
            let url = normalize_channel_url(input).unwrap();
            assert!(url.starts_with("https://t.me/"), "url {}", url);
        }
    }

    #[test]
    fn extracts_checkable_usernames() {
        assert_eq!(channel_username("https://t.me/foo"), Some("@foo".into()));
        assert_eq!(channel_username("t.me/foo"), Some("@foo".into()));
        // Private invite links have no public username.
        assert_eq!(channel_username("https://t.me/+AbCdEf"), None);
        assert_eq!(channel_username("https://example.com/foo"), None);
    }
}
