use crate::breaker::{OutageStore, StoreError};
use crate::entities::outage_flag;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue, DatabaseConnection, EntityTrait};
use std::time::Duration;

/// [`OutageStore`] shared by every bot process pointed at the same database.
pub struct DatabaseOutageStore {
    db: DatabaseConnection,
}

impl DatabaseOutageStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OutageStore for DatabaseOutageStore {
    #[tracing::instrument(skip(self))]
    async fn set_with_ttl(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StoreError::Unavailable(format!("TTL out of range: {e}")))?;
        let flag = outage_flag::ActiveModel {
            key: ActiveValue::Set(key.to_string()),
            expires_at: ActiveValue::Set(Utc::now() + ttl),
        };
        outage_flag::Entity::insert(flag)
            .on_conflict(
                OnConflict::column(outage_flag::Column::Key)
                    .update_column(outage_flag::Column::ExpiresAt)
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn remaining_ttl(&self, key: &str) -> Result<Option<u64>, StoreError> {
        let Some(flag) = outage_flag::Entity::find_by_id(key.to_string())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        let remaining = flag.expires_at - Utc::now();
        match remaining.to_std() {
            Ok(remaining) if !remaining.is_zero() => {
                Ok(Some(super::memory::whole_seconds(remaining)))
            }
            _ => Ok(None),
        }
    }
}
