//! User approval records
//!
//! One record per (user, client, scope). Approvals only decide whether the
//! consent page can be skipped; they are never consulted for anything else.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use oauth2_token::Scopes;
use serde::{Deserialize, Serialize};

use crate::storage::{Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Approved,
    Denied,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub user_id: String,
    pub client_id: String,
    pub scope: String,
    pub status: ApprovalStatus,
    pub expires_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl Approval {
    pub fn new(
        user_id: &str,
        client_id: &str,
        scope: &str,
        status: ApprovalStatus,
        lifetime: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            client_id: client_id.to_string(),
            scope: scope.to_string(),
            status,
            expires_at: now + lifetime,
            last_updated_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

fn approval_key(user_id: &str, client_id: &str, scope: &str) -> String {
    // Unit separator keeps the key unambiguous for any printable id.
    format!("{user_id}\u{1f}{client_id}\u{1f}{scope}")
}

pub struct ApprovalStore {
    store: Arc<dyn Store<Approval>>,
}

impl ApprovalStore {
    pub fn new(store: Arc<dyn Store<Approval>>) -> Self {
        Self { store }
    }

    /// Unexpired approval or denial for this scope; expired records read as absent.
    pub async fn get(
        &self,
        user_id: &str,
        client_id: &str,
        scope: &str,
    ) -> Result<Option<Approval>, StoreError> {
        let approval = self
            .store
            .get(&approval_key(user_id, client_id, scope))
            .await?;
        Ok(approval.filter(|a| !a.is_expired(Utc::now())))
    }

    pub async fn put(&self, approval: Approval) -> Result<(), StoreError> {
        let key = approval_key(&approval.user_id, &approval.client_id, &approval.scope);
        self.store.put(&key, approval).await
    }

    /// Record the same decision for every scope in `scopes`.
    pub async fn record(
        &self,
        user_id: &str,
        client_id: &str,
        scopes: &Scopes,
        status: ApprovalStatus,
        lifetime: Duration,
    ) -> Result<(), StoreError> {
        for scope in scopes.iter() {
            self.put(Approval::new(user_id, client_id, scope, status, lifetime))
                .await?;
        }
        tracing::info!(
            "Recorded {:?} for user {} / client {} on scopes '{}'",
            status,
            user_id,
            client_id,
            scopes
        );
        Ok(())
    }

    /// True when every requested scope has an unexpired approval.
    pub async fn covers(
        &self,
        user_id: &str,
        client_id: &str,
        scopes: &Scopes,
    ) -> Result<bool, StoreError> {
        if scopes.is_empty() {
            return Ok(false);
        }
        for scope in scopes.iter() {
            match self.get(user_id, client_id, scope).await? {
                Some(approval) if approval.status == ApprovalStatus::Approved => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store() -> ApprovalStore {
        ApprovalStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let approvals = store();
        approvals
            .put(Approval::new("user", "demo", "read", ApprovalStatus::Approved, Duration::days(1)))
            .await
            .unwrap();

        let approval = approvals.get("user", "demo", "read").await.unwrap().unwrap();
        assert_eq!(approval.status, ApprovalStatus::Approved);
        assert!(approvals.get("user", "demo", "write").await.unwrap().is_none());
        assert!(approvals.get("other", "demo", "read").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_covers_requires_every_scope_approved() {
        let approvals = store();
        approvals
            .record("user", "demo", &Scopes::parse("read"), ApprovalStatus::Approved, Duration::days(1))
            .await
            .unwrap();
        approvals
            .record("user", "demo", &Scopes::parse("write"), ApprovalStatus::Denied, Duration::days(1))
            .await
            .unwrap();

        assert!(approvals.covers("user", "demo", &Scopes::parse("read")).await.unwrap());
        assert!(!approvals.covers("user", "demo", &Scopes::parse("read write")).await.unwrap());
        assert!(!approvals.covers("user", "demo", &Scopes::parse("")).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_approvals_read_as_absent() {
        let approvals = store();
        approvals
            .put(Approval::new("user", "demo", "read", ApprovalStatus::Approved, Duration::seconds(-1)))
            .await
            .unwrap();

        assert!(approvals.get("user", "demo", "read").await.unwrap().is_none());
        assert!(!approvals.covers("user", "demo", &Scopes::parse("read")).await.unwrap());
    }

    #[tokio::test]
    async fn test_later_decision_replaces_earlier() {
        let approvals = store();
        let scopes = Scopes::parse("read");
        approvals
            .record("user", "demo", &scopes, ApprovalStatus::Approved, Duration::days(1))
            .await
            .unwrap();
        approvals
            .record("user", "demo", &scopes, ApprovalStatus::Denied, Duration::days(1))
            .await
            .unwrap();

        assert!(!approvals.covers("user", "demo", &scopes).await.unwrap());
    }
}
