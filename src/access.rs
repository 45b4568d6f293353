use crate::services::{AdminError, ContentStore, ServiceResult, UserRecord};
use std::collections::HashSet;
use std::env;

/// Allow-list based admin authorization.
///
/// The list of administrator email addresses is injected at construction so
/// tests can run against fake admin sets. Membership in the list is the sole
/// authorization mechanism; there is no role hierarchy.
#[derive(Clone, Debug)]
pub struct AdminGuard {
    admins: HashSet<String>,
}

impl AdminGuard {
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admins: admins
                .into_iter()
                .map(|email| email.into().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Build the guard from `ADMIN_EMAILS` (comma separated). Falls back to
    /// the default platform admin address when unset.
    pub fn from_env() -> Self {
        let raw = env::var("ADMIN_EMAILS").unwrap_or_else(|_| "admin@stackit.com".into());
        Self::new(
            raw.split(',')
                .map(|email| email.trim().to_string())
                .filter(|email| !email.is_empty()),
        )
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admins.contains(&email.to_ascii_lowercase())
    }

    /// Resolve the caller and check the allow-list.
    ///
    /// An unknown identity fails with `NotFound`; a resolved user whose email
    /// is not on the list fails with `Unauthorized`. Callers surface both the
    /// same way, but the causes stay distinct here.
    pub fn ensure_admin<S: ContentStore>(
        &self,
        store: &S,
        auth_id: &str,
    ) -> ServiceResult<UserRecord> {
        let user = store
            .find_user_by_auth(auth_id)?
            .ok_or_else(|| AdminError::NotFound(format!("no user for identity {auth_id}")))?;
        if !self.is_admin_email(&user.email) {
            return Err(AdminError::Unauthorized("admin access required".into()));
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryStore;

    #[test]
    fn admin_passes_guard() {
        let store = InMemoryStore::default();
        let guard = AdminGuard::new(["admin@stackit.com"]);
        let user = guard.ensure_admin(&store, "idp_dana").unwrap();
        assert_eq!(user.name, "Dana Moss");
    }

    #[test]
    fn non_admin_is_unauthorized() {
        let store = InMemoryStore::default();
        let guard = AdminGuard::new(["admin@stackit.com"]);
        let result = guard.ensure_admin(&store, "idp_alice");
        assert!(matches!(result, Err(AdminError::Unauthorized(_))));
    }

    #[test]
    fn unknown_identity_is_not_found() {
        let store = InMemoryStore::default();
        let guard = AdminGuard::new(["admin@stackit.com"]);
        let result = guard.ensure_admin(&store, "idp_ghost");
        assert!(matches!(result, Err(AdminError::NotFound(_))));
    }

    #[test]
    fn email_check_ignores_case() {
        let guard = AdminGuard::new(["Admin@StackIt.com"]);
        assert!(guard.is_admin_email("admin@stackit.com"));
        assert!(!guard.is_admin_email("bruno@example.com"));
    }
}
