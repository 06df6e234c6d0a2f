use std::sync::Arc;
use std::time::Duration;

use crate::db::models::Session;
use crate::outbound::{Outbound, OutboundPayload};

/// Pause between two sends, to stay under the flood limits.
pub const SEND_PACE: Duration = Duration::from_millis(35);
/// Extra pause between tenants in a cross-tenant broadcast.
pub const TENANT_PACE: Duration = Duration::from_millis(500);

/// Per-recipient outcome of one fan-out. Failures keep the id and the error
/// text so a misbehaving broadcast can be diagnosed, not just counted.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub delivered: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl BroadcastReport {
    pub fn success_count(&self) -> usize {
        self.delivered.len()
    }

    pub fn fail_count(&self) -> usize {
        self.failed.len()
    }

    fn absorb(&mut self, other: BroadcastReport) {
        self.delivered.extend(other.delivered);
        self.failed.extend(other.failed);
    }
}

/// Sends one payload to every target session except the initiator.
///
/// Each delivery is isolated: a failure is recorded and logged, and the loop
/// carries on with the remaining recipients.
pub async fn fan_out(
    outbound: &dyn Outbound,
    payload: &OutboundPayload,
    targets: &[Session],
    exclude_user: &str,
    pace: Duration,
) -> BroadcastReport {
    let mut report = BroadcastReport::default();

    for session in targets {
        if session.user_id == exclude_user {
            continue;
        }

        match outbound.deliver(session, payload).await {
            Ok(()) => report.delivered.push(session.user_id.clone()),
            Err(e) => {
                tracing::warn!("broadcast to {} failed: {}", session.user_id, e);
                report.failed.push((session.user_id.clone(), e.to_string()));
            }
        }

        if !pace.is_zero() {
            tokio::time::sleep(pace).await;
        }
    }

    report
}

/// Cross-tenant broadcast: one fan-out per tenant, longer pause between
/// tenants, and recipients already reached under another tenant are skipped.
pub async fn fan_out_all(
    groups: &[(Arc<dyn Outbound>, Vec<Session>)],
    payload: &OutboundPayload,
    exclude_user: &str,
    pace: Duration,
    tenant_pace: Duration,
) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
    seen.insert(exclude_user.to_string());

    for (i, (outbound, sessions)) in groups.iter().enumerate() {
        let fresh: Vec<Session> = sessions
            .iter()
            .filter(|s| !seen.contains(&s.user_id))
            .cloned()
            .collect();
        for s in &fresh {
            seen.insert(s.user_id.clone());
        }

        let partial = fan_out(outbound.as_ref(), payload, &fresh, exclude_user, pace).await;
        report.absorb(partial);

        if i + 1 < groups.len() && !tenant_pace.is_zero() {
            tokio::time::sleep(tenant_pace).await;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn session(user_id: &str) -> Session {
        Session {
            tenant_id: None,
            user_id: user_id.to_string(),
            step: "none".into(),
            admin_state: "none".into(),
            is_blocked: false,
            has_joined: true,
            is_first_start: false,
            language: None,
            referred_by: None,
            referral_count: 0,
            last_interaction: Utc::now(),
        }
    }

    /// Records every delivery attempt; fails for configured recipients.
    struct MockOutbound {
        attempted: Mutex<Vec<String>>,
        failing: Vec<String>,
    }

    impl MockOutbound {
        fn new(failing: &[&str]) -> Self {
            Self {
                attempted: Mutex::new(Vec::new()),
                failing: failing.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl Outbound for MockOutbound {
        async fn deliver(
            &self,
            recipient: &Session,
            _payload: &OutboundPayload,
        ) -> anyhow::Result<()> {
            self.attempted.lock().unwrap().push(recipient.user_id.clone());
            if self.failing.contains(&recipient.user_id) {
                anyhow::bail!("recipient unavailable");
            }
            Ok(())
        }
    }

    fn payload() -> OutboundPayload {
        OutboundPayload::Text("hello".into())
    }

    #[tokio::test]
    async fn all_sends_succeeding_counts_everyone() {
        let outbound = MockOutbound::new(&[]);
        let targets: Vec<Session> = ["1", "2", "3", "4"].iter().map(|u| session(u)).collect();

        let report = fan_out(&outbound, &payload(), &targets, "99", Duration::ZERO).await;

        assert_eq!(report.success_count(), 4);
        assert_eq!(report.fail_count(), 0);
    }

    #[tokio::test]
    async fn failures_are_isolated_and_do_not_abort() {
        let outbound = MockOutbound::new(&["2", "3"]);
        let targets: Vec<Session> = ["1", "2", "3", "4", "5"].iter().map(|u| session(u)).collect();

        let report = fan_out(&outbound, &payload(), &targets, "99", Duration::ZERO).await;

        assert_eq!(report.success_count(), 3);
        assert_eq!(report.fail_count(), 2);
        // Every recipient after a failure was still attempted.
        let attempted = outbound.attempted.lock().unwrap().clone();
        assert_eq!(attempted, vec!["1", "2", "3", "4", "5"]);
        // Failures keep enough context to debug.
        assert_eq!(report.failed[0].0, "2");
        assert!(report.failed[0].1.contains("unavailable"));
    }

    #[tokio::test]
    async fn initiating_admin_is_excluded() {
        let outbound = MockOutbound::new(&[]);
        let targets: Vec<Session> = ["1", "7", "2"].iter().map(|u| session(u)).collect();

        let report = fan_out(&outbound, &payload(), &targets, "7", Duration::ZERO).await;

        assert_eq!(report.success_count(), 2);
        let attempted = outbound.attempted.lock().unwrap().clone();
        assert!(!attempted.contains(&"7".to_string()));
    }

    fn tenant_session(tenant_id: uuid::Uuid, user_id: &str) -> Session {
        Session {
            tenant_id: Some(tenant_id),
            ..session(user_id)
        }
    }

    #[tokio::test]
    async fn cross_tenant_broadcast_dedupes_recipients() {
        let (first, second) = (uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
        let a = Arc::new(MockOutbound::new(&[]));
        let b = Arc::new(MockOutbound::new(&[]));
        let groups: Vec<(Arc<dyn Outbound>, Vec<Session>)> = vec![
            (
                a.clone(),
                vec![tenant_session(first, "1"), tenant_session(first, "2")],
            ),
            // "2" already reached under the first tenant, "9" is the admin.
            (
                b.clone(),
                vec![
                    tenant_session(second, "2"),
                    tenant_session(second, "3"),
                    tenant_session(second, "9"),
                ],
            ),
        ];

        let report =
            fan_out_all(&groups, &payload(), "9", Duration::ZERO, Duration::ZERO).await;

        assert_eq!(report.success_count(), 3);
        assert_eq!(report.fail_count(), 0);
        assert_eq!(b.attempted.lock().unwrap().clone(), vec!["3"]);
    }
}
