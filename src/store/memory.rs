use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Collection, Document, Order, RecordQuery, RecordStore, StoreError};

/// In-process store with the same ownership and uniqueness rules as the
/// PostgreSQL adapter. Used by tests and `STORE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryRecordStore {
    docs: RwLock<HashMap<(Collection, Uuid), Document>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, collection: Collection, owner_id: Uuid, id: Uuid) -> Result<Document, StoreError> {
        let docs = self.docs.read().await;
        docs.get(&(collection, id))
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .ok_or(StoreError::NotFound { collection, id })
    }

    async fn put(&self, doc: Document) -> Result<Document, StoreError> {
        let mut docs = self.docs.write().await;
        let key = (doc.collection, doc.id);

        if let Some(existing) = docs.get(&key) {
            if existing.owner_id != doc.owner_id {
                return Err(StoreError::NotFound {
                    collection: doc.collection,
                    id: doc.id,
                });
            }
        }

        if let Some(field) = doc.collection.unique_field() {
            if let Some(value) = doc.body.get(field) {
                let taken = docs.values().any(|other| {
                    other.collection == doc.collection
                        && other.id != doc.id
                        && other.body.get(field) == Some(value)
                });
                if taken {
                    return Err(StoreError::Conflict(format!(
                        "{} {field} already in use",
                        doc.collection
                    )));
                }
            }
        }

        docs.insert(key, doc.clone());
        Ok(doc)
    }

    async fn query(&self, collection: Collection, query: &RecordQuery) -> Result<Vec<Document>, StoreError> {
        let docs = self.docs.read().await;
        let mut found: Vec<Document> = docs
            .values()
            .filter(|d| d.collection == collection && query.admits(d))
            .cloned()
            .collect();

        found.sort_by(|a, b| (a.sort_at, a.id).cmp(&(b.sort_at, b.id)));
        if query.order == Order::Descending {
            found.reverse();
        }
        if let Some(limit) = query.limit {
            found.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        }
        Ok(found)
    }

    async fn delete(&self, collection: Collection, owner_id: Uuid, id: Uuid) -> Result<(), StoreError> {
        let mut docs = self.docs.write().await;
        match docs.get(&(collection, id)) {
            Some(d) if d.owner_id == owner_id => {
                docs.remove(&(collection, id));
                Ok(())
            }
            _ => Err(StoreError::NotFound { collection, id }),
        }
    }

    async fn delete_owned(&self, owner_id: Uuid) -> Result<u64, StoreError> {
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|_, d| d.owner_id != owner_id);
        Ok((before - docs.len()) as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::{macros::datetime, OffsetDateTime};

    fn doc(collection: Collection, owner: Uuid, at: OffsetDateTime, body: serde_json::Value) -> Document {
        Document {
            collection,
            id: Uuid::new_v4(),
            owner_id: owner,
            sort_at: at,
            body,
        }
    }

    #[tokio::test]
    async fn get_is_scoped_to_owner() {
        let store = MemoryRecordStore::new();
        let owner = Uuid::new_v4();
        let d = store
            .put(doc(Collection::Medications, owner, datetime!(2024-01-01 0:00 UTC), json!({})))
            .await
            .unwrap();

        assert_eq!(store.get(Collection::Medications, owner, d.id).await.unwrap(), d);
        let err = store
            .get(Collection::Medications, Uuid::new_v4(), d.id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn put_refuses_to_overwrite_foreign_record() {
        let store = MemoryRecordStore::new();
        let d = store
            .put(doc(Collection::Appointments, Uuid::new_v4(), datetime!(2024-01-01 0:00 UTC), json!({})))
            .await
            .unwrap();

        let mut hijack = d.clone();
        hijack.owner_id = Uuid::new_v4();
        assert!(matches!(store.put(hijack).await, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn put_enforces_unique_email() {
        let store = MemoryRecordStore::new();
        let a = Uuid::new_v4();
        let mut first = doc(Collection::Users, a, datetime!(2024-01-01 0:00 UTC), json!({"email": "a@b.io"}));
        first.id = a;
        store.put(first.clone()).await.unwrap();
        // re-saving the same user is fine
        store.put(first).await.unwrap();

        let b = Uuid::new_v4();
        let mut second = doc(Collection::Users, b, datetime!(2024-01-01 0:00 UTC), json!({"email": "a@b.io"}));
        second.id = b;
        assert!(matches!(store.put(second).await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn query_orders_and_limits() {
        let store = MemoryRecordStore::new();
        let owner = Uuid::new_v4();
        for day in 1..=5u8 {
            let at = datetime!(2024-01-01 0:00 UTC) + time::Duration::days(i64::from(day));
            store
                .put(doc(Collection::Measurements, owner, at, json!({"type": "weight", "day": day})))
                .await
                .unwrap();
        }

        let newest = store
            .query(Collection::Measurements, &RecordQuery::owned_by(owner).newest_first().limit(2))
            .await
            .unwrap();
        let days: Vec<_> = newest.iter().map(|d| d.body["day"].as_u64().unwrap()).collect();
        assert_eq!(days, vec![5, 4]);

        let oldest = store
            .query(Collection::Measurements, &RecordQuery::owned_by(owner).limit(1))
            .await
            .unwrap();
        assert_eq!(oldest[0].body["day"], 1);
    }

    #[tokio::test]
    async fn delete_owned_removes_only_that_owner() {
        let store = MemoryRecordStore::new();
        let gone = Uuid::new_v4();
        let kept = Uuid::new_v4();
        let at = datetime!(2024-01-01 0:00 UTC);
        store.put(doc(Collection::Medications, gone, at, json!({}))).await.unwrap();
        store.put(doc(Collection::Measurements, gone, at, json!({}))).await.unwrap();
        store.put(doc(Collection::Medications, kept, at, json!({}))).await.unwrap();

        assert_eq!(store.delete_owned(gone).await.unwrap(), 2);
        let left = store
            .query(Collection::Medications, &RecordQuery::default())
            .await
            .unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].owner_id, kept);
    }
}
