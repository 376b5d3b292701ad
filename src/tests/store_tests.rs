//! tests/store_tests.rs
//! In-memory `RequestStore` behaviour.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_rt::test;
    use serde_json::json;
    use uuid::Uuid;

    use crate::errors::StoreError;
    use crate::models::request_model::{RequestStatus, StatusChange};
    use crate::services::request_store::{InMemoryRequestStore, RequestStore};

    #[test]
    async fn create_then_get_returns_pending_record() {
        let store = InMemoryRequestStore::new();
        let id = store.create(json!({"text": "hi"})).await.unwrap();

        let rec = store.get(id).await.unwrap();
        assert_eq!(rec.local_id, id);
        assert_eq!(rec.status, RequestStatus::Pending);
        assert_eq!(rec.payload, json!({"text": "hi"}));
        assert!(rec.provider_id.is_none());
    }

    #[test]
    async fn create_generates_unique_ids() {
        let store = InMemoryRequestStore::new();
        let a = store.create(json!({})).await.unwrap();
        let b = store.create(json!({})).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[test]
    async fn get_unknown_id_is_not_found() {
        let store = InMemoryRequestStore::new();
        assert!(matches!(
            store.get(Uuid::new_v4()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    async fn attach_sets_provider_id_and_sent_together() {
        let store = InMemoryRequestStore::new();
        let id = store.create(json!({})).await.unwrap();
        let created = store.get(id).await.unwrap();

        let rec = store.attach_provider_id(id, "abc123").await.unwrap();
        assert_eq!(rec.provider_id.as_deref(), Some("abc123"));
        assert_eq!(rec.status, RequestStatus::Sent);
        assert!(rec.updated_at >= created.updated_at);
    }

    #[test]
    async fn attach_to_unknown_record_is_not_found() {
        let store = InMemoryRequestStore::new();
        assert!(matches!(
            store.attach_provider_id(Uuid::new_v4(), "abc123").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    async fn provider_id_is_immutable_once_set() {
        let store = InMemoryRequestStore::new();
        let id = store.create(json!({})).await.unwrap();
        store.attach_provider_id(id, "abc123").await.unwrap();

        assert!(matches!(
            store.attach_provider_id(id, "other").await,
            Err(StoreError::InvalidTransition { .. })
        ));
        assert_eq!(
            store.get(id).await.unwrap().provider_id.as_deref(),
            Some("abc123")
        );
    }

    #[test]
    async fn provider_id_is_unique_among_live_records() {
        let store = InMemoryRequestStore::new();
        let first = store.create(json!({})).await.unwrap();
        let second = store.create(json!({})).await.unwrap();
        store.attach_provider_id(first, "abc123").await.unwrap();

        assert!(matches!(
            store.attach_provider_id(second, "abc123").await,
            Err(StoreError::DuplicateProviderId(_))
        ));
        assert_eq!(
            store.get(second).await.unwrap().status,
            RequestStatus::Pending
        );
    }

    #[test]
    async fn provider_id_can_be_reused_after_failure() {
        let store = InMemoryRequestStore::new();
        let first = store.create(json!({})).await.unwrap();
        let second = store.create(json!({})).await.unwrap();
        store.attach_provider_id(first, "abc123").await.unwrap();
        store
            .update_status("abc123", StatusChange::new(RequestStatus::Failed))
            .await
            .unwrap();

        let rec = store.attach_provider_id(second, "abc123").await.unwrap();
        assert_eq!(rec.status, RequestStatus::Sent);

        // Callbacks now route to the live holder.
        let rec = store
            .update_status("abc123", StatusChange::new(RequestStatus::Delivered))
            .await
            .unwrap();
        assert_eq!(rec.local_id, second);
        assert_eq!(store.get(first).await.unwrap().status, RequestStatus::Failed);
    }

    #[test]
    async fn update_status_by_provider_id() {
        let store = InMemoryRequestStore::new();
        let id = store.create(json!({})).await.unwrap();
        store.attach_provider_id(id, "abc123").await.unwrap();

        let rec = store
            .update_status(
                "abc123",
                StatusChange::new(RequestStatus::Delivered).with_provider_status("delivered"),
            )
            .await
            .unwrap();
        assert_eq!(rec.local_id, id);
        assert_eq!(rec.status, RequestStatus::Delivered);
        assert_eq!(rec.provider_status.as_deref(), Some("delivered"));
    }

    #[test]
    async fn update_status_for_unknown_provider_id_is_not_found() {
        let store = InMemoryRequestStore::new();
        store.create(json!({})).await.unwrap();

        assert!(matches!(
            store
                .update_status("nope", StatusChange::new(RequestStatus::Delivered))
                .await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    async fn terminal_status_never_regresses() {
        let store = InMemoryRequestStore::new();
        let id = store.create(json!({})).await.unwrap();
        store.attach_provider_id(id, "abc123").await.unwrap();
        store
            .update_status("abc123", StatusChange::new(RequestStatus::Delivered))
            .await
            .unwrap();
        let settled = store.get(id).await.unwrap();

        for status in [
            RequestStatus::Sent,
            RequestStatus::Unknown,
            RequestStatus::Failed,
            RequestStatus::Delivered,
        ] {
            let result = store
                .update_status("abc123", StatusChange::new(status))
                .await;
            assert!(
                matches!(result, Err(StoreError::InvalidTransition { .. })),
                "{status} was accepted"
            );
        }
        assert_eq!(store.get(id).await.unwrap(), settled);
    }

    #[test]
    async fn mark_failed_records_reason() {
        let store = InMemoryRequestStore::new();
        let id = store.create(json!({})).await.unwrap();

        let rec = store.mark_failed(id, "connection refused").await.unwrap();
        assert_eq!(rec.status, RequestStatus::Failed);
        assert_eq!(rec.error_message.as_deref(), Some("connection refused"));
        assert!(rec.provider_id.is_none());

        assert!(matches!(
            store.attach_provider_id(id, "late").await,
            Err(StoreError::InvalidTransition { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_callbacks_settle_on_exactly_one_terminal_state() {
        let store: Arc<dyn RequestStore> = Arc::new(InMemoryRequestStore::new());
        let id = store.create(json!({})).await.unwrap();
        store.attach_provider_id(id, "abc123").await.unwrap();

        let mut tasks = Vec::new();
        for n in 0..20 {
            let store = store.clone();
            let status = if n % 2 == 0 {
                RequestStatus::Delivered
            } else {
                RequestStatus::Failed
            };
            tasks.push(tokio::spawn(async move {
                store
                    .update_status("abc123", StatusChange::new(status))
                    .await
                    .is_ok()
            }));
        }

        let mut applied = 0;
        for task in tasks {
            if task.await.unwrap() {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
        assert!(store.get(id).await.unwrap().status.is_terminal());
    }
}
