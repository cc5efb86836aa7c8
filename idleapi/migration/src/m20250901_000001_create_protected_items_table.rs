use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProtectedItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProtectedItems::UserId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProtectedItems::Protected)
                            .array(ColumnType::BigInteger)
                            .not_null()
                            .default(Expr::cust("'{}'::bigint[]")),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProtectedItems::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProtectedItems {
    Table,
    UserId,
    Protected,
}
