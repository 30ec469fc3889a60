//! Document store for user-owned health records.
//!
//! Every document belongs to exactly one owner and lives in one
//! [`Collection`]. Adapters implement [`RecordStore`] over raw
//! [`Document`]s; handlers use the typed helpers on `dyn RecordStore`.

use std::{fmt, str::FromStr};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Users,
    Medications,
    Appointments,
    Measurements,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Medications => "medications",
            Collection::Appointments => "appointments",
            Collection::Measurements => "measurements",
        }
    }

    /// Body field that must be unique across the collection.
    pub fn unique_field(self) -> Option<&'static str> {
        match self {
            Collection::Users => Some("email"),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "users" => Ok(Collection::Users),
            "medications" => Ok(Collection::Medications),
            "appointments" => Ok(Collection::Appointments),
            "measurements" => Ok(Collection::Measurements),
            other => Err(StoreError::Malformed(format!("unknown collection {other}"))),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection} record {id} not found")]
    NotFound { collection: Collection, id: Uuid },
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("record conflicts with an existing one: {0}")]
    Conflict(String),
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("record store failure: {0}")]
    Backend(String),
}

/// A stored document plus the envelope the store indexes on.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub collection: Collection,
    pub id: Uuid,
    pub owner_id: Uuid,
    pub sort_at: OffsetDateTime,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Ascending,
    Descending,
}

/// Filters for [`RecordStore::query`].
///
/// `from`/`until` bound the sort timestamp as a half-open range.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    pub owner_id: Option<Uuid>,
    pub matches: serde_json::Map<String, serde_json::Value>,
    pub from: Option<OffsetDateTime>,
    pub until: Option<OffsetDateTime>,
    pub order: Order,
    pub limit: Option<i64>,
}

impl RecordQuery {
    pub fn owned_by(owner_id: Uuid) -> Self {
        Self {
            owner_id: Some(owner_id),
            ..Self::default()
        }
    }

    pub fn matching(mut self, field: &str, value: impl Into<serde_json::Value>) -> Self {
        self.matches.insert(field.to_string(), value.into());
        self
    }

    pub fn since(mut self, at: OffsetDateTime) -> Self {
        self.from = Some(at);
        self
    }

    pub fn before(mut self, at: OffsetDateTime) -> Self {
        self.until = Some(at);
        self
    }

    pub fn newest_first(mut self) -> Self {
        self.order = Order::Descending;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when `doc` satisfies every filter except ordering and limit.
    pub(crate) fn admits(&self, doc: &Document) -> bool {
        if self.owner_id.is_some_and(|owner| owner != doc.owner_id) {
            return false;
        }
        if self.from.is_some_and(|from| doc.sort_at < from) {
            return false;
        }
        if self.until.is_some_and(|until| doc.sort_at >= until) {
            return false;
        }
        self.matches
            .iter()
            .all(|(field, value)| doc.body.get(field) == Some(value))
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, collection: Collection, owner_id: Uuid, id: Uuid) -> Result<Document, StoreError>;
    async fn put(&self, doc: Document) -> Result<Document, StoreError>;
    async fn query(&self, collection: Collection, query: &RecordQuery) -> Result<Vec<Document>, StoreError>;
    async fn delete(&self, collection: Collection, owner_id: Uuid, id: Uuid) -> Result<(), StoreError>;
    /// Removes every document owned by `owner_id`, returning how many went.
    async fn delete_owned(&self, owner_id: Uuid) -> Result<u64, StoreError>;
    async fn ping(&self) -> Result<(), StoreError>;
}

/// A domain entity persisted as a document.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    fn id(&self) -> Uuid;
    fn owner_id(&self) -> Uuid;
    fn sort_at(&self) -> OffsetDateTime;

    fn to_document(&self) -> Result<Document, StoreError> {
        let body = serde_json::to_value(self).map_err(|e| StoreError::Malformed(e.to_string()))?;
        Ok(Document {
            collection: Self::COLLECTION,
            id: self.id(),
            owner_id: self.owner_id(),
            sort_at: self.sort_at(),
            body,
        })
    }

    fn from_document(doc: Document) -> Result<Self, StoreError> {
        if doc.collection != Self::COLLECTION {
            return Err(StoreError::Malformed(format!(
                "expected {} document, got {}",
                Self::COLLECTION,
                doc.collection
            )));
        }
        serde_json::from_value(doc.body).map_err(|e| StoreError::Malformed(e.to_string()))
    }
}

impl<'s> dyn RecordStore + 's {
    pub async fn fetch<R: Record>(&self, owner_id: Uuid, id: Uuid) -> Result<R, StoreError> {
        R::from_document(self.get(R::COLLECTION, owner_id, id).await?)
    }

    pub async fn save<R: Record>(&self, record: &R) -> Result<R, StoreError> {
        R::from_document(self.put(record.to_document()?).await?)
    }

    pub async fn find<R: Record>(&self, query: &RecordQuery) -> Result<Vec<R>, StoreError> {
        self.query(R::COLLECTION, query)
            .await?
            .into_iter()
            .map(R::from_document)
            .collect()
    }

    pub async fn find_one<R: Record>(&self, query: RecordQuery) -> Result<Option<R>, StoreError> {
        Ok(self.find::<R>(&query.limit(1)).await?.into_iter().next())
    }

    pub async fn remove<R: Record>(&self, owner_id: Uuid, id: Uuid) -> Result<(), StoreError> {
        self.delete(R::COLLECTION, owner_id, id).await
    }
}
