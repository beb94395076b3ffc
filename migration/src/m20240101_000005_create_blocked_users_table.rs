use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BlockedUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BlockedUsers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BlockedUsers::BlockerId).uuid().not_null())
                    .col(ColumnDef::new(BlockedUsers::BlockedId).uuid().not_null())
                    .col(
                        ColumnDef::new(BlockedUsers::BlockedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blocked_users_pair")
                    .table(BlockedUsers::Table)
                    .col(BlockedUsers::BlockerId)
                    .col(BlockedUsers::BlockedId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blocked_users_blocked")
                    .table(BlockedUsers::Table)
                    .col(BlockedUsers::BlockedId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BlockedUsers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BlockedUsers {
    Table,
    Id,
    BlockerId,
    BlockedId,
    BlockedAt,
}
