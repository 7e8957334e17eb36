use chrono::Utc;
use common::PayoutStatus;
use docstore::DocumentRepository;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument};

use super::error::{ServiceError, require_non_empty};
use crate::entity::Payout;

#[derive(Serialize)]
struct StatusPatch {
    status: PayoutStatus,
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("Payout {id} not found"))
}

#[derive(Clone)]
pub struct PayoutStore {
    repo: DocumentRepository<Payout>,
}

impl PayoutStore {
    pub fn new(repo: DocumentRepository<Payout>) -> Self {
        Self { repo }
    }

    /// Record a new pending payout dated now.
    #[instrument(skip(self))]
    pub async fn create(&self, amount: Decimal, method: &str) -> Result<Payout, ServiceError> {
        if amount <= Decimal::ZERO {
            return Err(ServiceError::Validation("Amount must be positive".into()));
        }
        require_non_empty(method, "Payment method")?;

        let mut payout = Payout {
            id: String::new(),
            date: Utc::now(),
            amount,
            method: method.trim().to_string(),
            status: PayoutStatus::Pending,
        };
        payout.id = self.repo.create(&payout).await?;
        info!(payout_id = %payout.id, "Payout created");
        Ok(payout)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Payout>, ServiceError> {
        Ok(self.repo.get(id).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Payout>, ServiceError> {
        Ok(self.repo.list().await?)
    }

    pub async fn get_by_status(&self, status: PayoutStatus) -> Result<Vec<Payout>, ServiceError> {
        Ok(self.repo.where_equal("status", status.as_str()).await?)
    }

    /// Move a payout forward to `status`.
    ///
    /// Re-applying the current status succeeds without writing. Moving
    /// backwards, or out of a final status, is a `Conflict`.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: &str,
        status: PayoutStatus,
    ) -> Result<Payout, ServiceError> {
        let repo = &self.repo;
        repo.run_transaction(|tx| async move {
            let mut payout = repo.get_in(&tx, id).await?.ok_or_else(|| not_found(id))?;
            if payout.status == status {
                return Ok(payout);
            }
            if !payout.status.can_transition_to(status) {
                return Err(ServiceError::Conflict(format!(
                    "Payout cannot move from {} to {}",
                    payout.status, status
                )));
            }

            repo.update_in(&tx, id, &StatusPatch { status }).await?;
            payout.status = status;
            Ok(payout)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        Ok(self.repo.delete(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use docstore::MemoryDocumentStore;

    use super::*;

    fn store() -> PayoutStore {
        PayoutStore::new(DocumentRepository::new(Arc::new(MemoryDocumentStore::new())))
    }

    fn amount() -> Decimal {
        Decimal::new(4250, 2)
    }

    #[tokio::test]
    async fn test_create_defaults() {
        let store = store();
        let payout = store.create(amount(), "bank_transfer").await.unwrap();
        assert!(!payout.id.is_empty());
        assert_eq!(payout.status, PayoutStatus::Pending);

        let loaded = store.get_by_id(&payout.id).await.unwrap().unwrap();
        assert_eq!(loaded, payout);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let store = store();
        assert!(matches!(
            store.create(Decimal::ZERO, "paypal").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            store.create(amount(), " ").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_keeps_other_fields() {
        let store = store();
        let created = store.create(amount(), "paypal").await.unwrap();

        let updated = store
            .update_status(&created.id, PayoutStatus::Completed)
            .await
            .unwrap();
        assert_eq!(updated.status, PayoutStatus::Completed);

        let loaded = store.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, PayoutStatus::Completed);
        assert_eq!(loaded.amount, created.amount);
        assert_eq!(loaded.date, created.date);
        assert_eq!(loaded.method, created.method);
    }

    #[tokio::test]
    async fn test_status_never_moves_backwards() {
        let store = store();
        let created = store.create(amount(), "paypal").await.unwrap();
        store
            .update_status(&created.id, PayoutStatus::Completed)
            .await
            .unwrap();

        assert!(matches!(
            store.update_status(&created.id, PayoutStatus::Pending).await,
            Err(ServiceError::Conflict(_))
        ));
        let same = store
            .update_status(&created.id, PayoutStatus::Completed)
            .await
            .unwrap();
        assert_eq!(same.status, PayoutStatus::Completed);
    }

    #[tokio::test]
    async fn test_update_status_unknown_payout() {
        assert!(matches!(
            store().update_status("missing", PayoutStatus::Completed).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_transitions_have_one_winner() {
        let store = store();
        let created = store.create(amount(), "paypal").await.unwrap();

        let first = tokio::spawn({
            let store = store.clone();
            let id = created.id.clone();
            async move { store.update_status(&id, PayoutStatus::Completed).await }
        });
        let second = tokio::spawn({
            let store = store.clone();
            let id = created.id.clone();
            async move { store.update_status(&id, PayoutStatus::Failed).await }
        });
        let outcomes = [first.await.unwrap(), second.await.unwrap()];

        let winners: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert!(
            outcomes
                .iter()
                .any(|r| matches!(r, Err(ServiceError::Conflict(_))))
        );

        let loaded = store.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, winners[0].status);
    }

    #[tokio::test]
    async fn test_by_status_and_delete() {
        let store = store();
        let a = store.create(amount(), "paypal").await.unwrap();
        let b = store.create(amount(), "paypal").await.unwrap();
        store
            .update_status(&b.id, PayoutStatus::Processing)
            .await
            .unwrap();

        let pending = store.get_by_status(PayoutStatus::Pending).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, a.id);

        store.delete(&a.id).await.unwrap();
        store.delete(&a.id).await.unwrap();
        assert!(store.get_by_id(&a.id).await.unwrap().is_none());
    }
}
