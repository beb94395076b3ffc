use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Games::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Games::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Games::RoomId).uuid().null())
                    .col(ColumnDef::new(Games::PlayerXId).uuid().not_null())
                    .col(ColumnDef::new(Games::PlayerOId).uuid().not_null())
                    .col(ColumnDef::new(Games::GameMode).string().not_null())
                    .col(
                        ColumnDef::new(Games::CurrentPlayer)
                            .string()
                            .not_null()
                            .default("X"),
                    )
                    .col(
                        ColumnDef::new(Games::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Games::Board).text().not_null())
                    .col(ColumnDef::new(Games::WinnerId).uuid().null())
                    .col(ColumnDef::new(Games::WinCondition).string().null())
                    .col(
                        ColumnDef::new(Games::MoveCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Games::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Games::FinishedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // History and streak lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_games_player_x")
                    .table(Games::Table)
                    .col(Games::PlayerXId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_games_player_o")
                    .table(Games::Table)
                    .col(Games::PlayerOId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Moves::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Moves::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Moves::GameId).uuid().not_null())
                    .col(ColumnDef::new(Moves::PlayerId).uuid().not_null())
                    .col(ColumnDef::new(Moves::Position).integer().not_null())
                    .col(ColumnDef::new(Moves::Symbol).string_len(1).not_null())
                    .col(ColumnDef::new(Moves::MoveNumber).integer().not_null())
                    .col(
                        ColumnDef::new(Moves::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_moves_game")
                            .from(Moves::Table, Moves::GameId)
                            .to(Games::Table, Games::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A retried flush must not duplicate a move
        manager
            .create_index(
                Index::create()
                    .name("idx_moves_game_move_number")
                    .table(Moves::Table)
                    .col(Moves::GameId)
                    .col(Moves::MoveNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Moves::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Games::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Games {
    Table,
    Id,
    RoomId,
    PlayerXId,
    PlayerOId,
    GameMode,
    CurrentPlayer,
    Status,
    Board,
    WinnerId,
    WinCondition,
    MoveCount,
    CreatedAt,
    FinishedAt,
}

#[derive(DeriveIden)]
enum Moves {
    Table,
    Id,
    GameId,
    PlayerId,
    Position,
    Symbol,
    MoveNumber,
    CreatedAt,
}
