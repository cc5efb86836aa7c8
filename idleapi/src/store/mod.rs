//! Per-user protected item ids, one `protected_items` row per user.
//!
//! Set updates happen in a single statement on the server, so two `protect`
//! commands from the same user cannot overwrite each other.

use crate::entities::protected_items;
use async_trait::async_trait;
use mockall::automock;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait, QueryFilter,
    Statement,
};

const UNION_SQL: &str = r#"UPDATE protected_items
SET protected = ARRAY(SELECT DISTINCT id FROM unnest(protected || $1::bigint[]) AS t(id) ORDER BY id)
WHERE user_id = $2
RETURNING user_id, protected"#;

const DIFFERENCE_SQL: &str = r#"UPDATE protected_items
SET protected = ARRAY(SELECT id FROM unnest(protected) AS t(id) WHERE id <> ALL($1::bigint[]) ORDER BY id)
WHERE user_id = $2
RETURNING user_id, protected"#;

#[automock]
#[async_trait]
pub trait ProtectedItemsRepository: Send + Sync {
    /// Creates an empty row for the user unless one exists.
    async fn ensure_row(&self, user_id: u64) -> Result<(), DbErr>;
    async fn load(&self, user_id: u64) -> Result<Vec<i64>, DbErr>;
    /// Adds `ids` and returns the resulting set, sorted.
    async fn add(&self, user_id: u64, ids: &[i64]) -> Result<Vec<i64>, DbErr>;
    /// Removes `ids` and returns the resulting set, sorted.
    async fn remove(&self, user_id: u64, ids: &[i64]) -> Result<Vec<i64>, DbErr>;
    async fn clear(&self, user_id: u64) -> Result<(), DbErr>;
}

pub struct SeaOrmProtectedItemsRepository {
    db: DatabaseConnection,
}

impl SeaOrmProtectedItemsRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn update_returning(&self, sql: &str, user_id: u64, ids: &[i64]) -> Result<Vec<i64>, DbErr> {
        self.ensure_row(user_id).await?;
        let row = protected_items::Entity::find()
            .from_raw_sql(Statement::from_sql_and_values(
                DbBackend::Postgres,
                sql,
                [ids.to_vec().into(), (user_id as i64).into()],
            ))
            .one(&self.db)
            .await?;
        Ok(row.map(|row| row.protected).unwrap_or_default())
    }
}

#[async_trait]
impl ProtectedItemsRepository for SeaOrmProtectedItemsRepository {
    #[tracing::instrument(skip(self))]
    async fn ensure_row(&self, user_id: u64) -> Result<(), DbErr> {
        let row = protected_items::ActiveModel {
            user_id: ActiveValue::Set(user_id as i64),
            protected: ActiveValue::Set(Vec::new()),
        };
        protected_items::Entity::insert(row)
            .on_conflict(
                OnConflict::column(protected_items::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn load(&self, user_id: u64) -> Result<Vec<i64>, DbErr> {
        let row = protected_items::Entity::find_by_id(user_id as i64)
            .one(&self.db)
            .await?;
        Ok(row.map(|row| row.protected).unwrap_or_default())
    }

    #[tracing::instrument(skip(self))]
    async fn add(&self, user_id: u64, ids: &[i64]) -> Result<Vec<i64>, DbErr> {
        self.update_returning(UNION_SQL, user_id, ids).await
    }

    #[tracing::instrument(skip(self))]
    async fn remove(&self, user_id: u64, ids: &[i64]) -> Result<Vec<i64>, DbErr> {
        self.update_returning(DIFFERENCE_SQL, user_id, ids).await
    }

    #[tracing::instrument(skip(self))]
    async fn clear(&self, user_id: u64) -> Result<(), DbErr> {
        protected_items::Entity::update_many()
            .col_expr(
                protected_items::Column::Protected,
                Expr::cust("'{}'::bigint[]"),
            )
            .filter(protected_items::Column::UserId.eq(user_id as i64))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
