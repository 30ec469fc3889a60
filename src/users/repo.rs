use uuid::Uuid;

use super::repo_types::UserRecord;
use crate::store::{RecordQuery, RecordStore, StoreError};

impl UserRecord {
    /// Find a user by (already normalised) email.
    pub async fn find_by_email(store: &dyn RecordStore, email: &str) -> Result<Option<UserRecord>, StoreError> {
        store
            .find_one::<UserRecord>(RecordQuery::default().matching("email", email))
            .await
    }

    pub async fn find_by_id(store: &dyn RecordStore, id: Uuid) -> Result<UserRecord, StoreError> {
        store.fetch::<UserRecord>(id, id).await
    }

    /// Delete the user together with every record it owns.
    pub async fn delete_cascade(store: &dyn RecordStore, id: Uuid) -> Result<u64, StoreError> {
        // confirm the user exists so a stale token gets a 404
        store.fetch::<UserRecord>(id, id).await?;
        store.delete_owned(id).await
    }
}
