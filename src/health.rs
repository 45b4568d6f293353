use crate::access::AdminGuard;
use crate::services::{ContentStore, ServiceResult};
use chrono::{Duration, Utc};
use serde::Serialize;

/// Smoke-test snapshot of near-term activity and data integrity. These are
/// signals for an operator, not alerts.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub database_connected: bool,
    pub active_last_24h: i64,
    pub questions_last_24h: i64,
    pub answers_last_24h: i64,
    pub active_users_last_7d: i64,
    pub total_users: i64,
    pub total_questions: i64,
    pub total_answers: i64,
    pub orphaned_answers: i64,
    pub users_without_email: i64,
}

pub fn system_health<S: ContentStore>(
    store: &S,
    guard: &AdminGuard,
    auth_id: &str,
) -> ServiceResult<SystemHealth> {
    guard.ensure_admin(store, auth_id)?;

    let now = Utc::now();
    let one_day_ago = now - Duration::hours(24);
    let one_week_ago = now - Duration::days(7);

    Ok(SystemHealth {
        database_connected: true,
        active_last_24h: store.count_interactions(Some(one_day_ago))?,
        questions_last_24h: store.count_questions(Some(one_day_ago))?,
        answers_last_24h: store.count_answers(Some(one_day_ago))?,
        active_users_last_7d: store.count_active_users(one_week_ago)?,
        total_users: store.count_users(None)?,
        total_questions: store.count_questions(None)?,
        total_answers: store.count_answers(None)?,
        orphaned_answers: store.count_orphan_answers()?,
        users_without_email: store.count_users_missing_email()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryStore;

    #[test]
    fn snapshot_reports_recent_activity() {
        let store = InMemoryStore::default();
        let guard = AdminGuard::new(["admin@stackit.com"]);
        let health = system_health(&store, &guard, "idp_dana").unwrap();
        assert!(health.database_connected);
        // The sample holds a view and an upvote inside the last 24 hours,
        // both by the same user.
        assert_eq!(health.active_last_24h, 2);
        assert_eq!(health.active_users_last_7d, 1);
        assert_eq!(health.orphaned_answers, 0);
        assert_eq!(health.users_without_email, 0);
    }

    #[test]
    fn guard_is_checked_first() {
        let store = InMemoryStore::default();
        let guard = AdminGuard::new(["admin@stackit.com"]);
        assert!(system_health(&store, &guard, "idp_bruno").is_err());
    }
}
