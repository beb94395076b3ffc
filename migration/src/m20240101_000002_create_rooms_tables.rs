use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Rooms::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Rooms::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Rooms::Code)
                            .string_len(8)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Rooms::Name).string().not_null())
                    .col(ColumnDef::new(Rooms::OwnerId).uuid().not_null())
                    .col(
                        ColumnDef::new(Rooms::MaxPlayers)
                            .integer()
                            .not_null()
                            .default(2),
                    )
                    .col(
                        ColumnDef::new(Rooms::Status)
                            .string()
                            .not_null()
                            .default("waiting"),
                    )
                    .col(ColumnDef::new(Rooms::ActiveGameId).uuid().null())
                    .col(
                        ColumnDef::new(Rooms::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RoomParticipants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RoomParticipants::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RoomParticipants::RoomId).uuid().not_null())
                    .col(ColumnDef::new(RoomParticipants::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(RoomParticipants::Role)
                            .string()
                            .not_null()
                            .default("player"),
                    )
                    .col(
                        ColumnDef::new(RoomParticipants::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_room_participants_room")
                            .from(RoomParticipants::Table, RoomParticipants::RoomId)
                            .to(Rooms::Table, Rooms::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_room_participants_room_user")
                    .table(RoomParticipants::Table)
                    .col(RoomParticipants::RoomId)
                    .col(RoomParticipants::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RoomParticipants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rooms::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Rooms {
    Table,
    Id,
    Code,
    Name,
    OwnerId,
    MaxPlayers,
    Status,
    ActiveGameId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RoomParticipants {
    Table,
    Id,
    RoomId,
    UserId,
    Role,
    JoinedAt,
}
