use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Achievements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Achievements::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Achievements::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Achievements::AchievementType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Achievements::Name).string().not_null())
                    .col(ColumnDef::new(Achievements::Description).string().not_null())
                    .col(ColumnDef::new(Achievements::Icon).string().not_null())
                    .col(
                        ColumnDef::new(Achievements::Metadata)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(Achievements::UnlockedAt)
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
                    .name("idx_achievements_user_type")
                    .table(Achievements::Table)
                    .col(Achievements::UserId)
                    .col(Achievements::AchievementType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserThemes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserThemes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserThemes::UserId).uuid().not_null())
                    .col(ColumnDef::new(UserThemes::ThemeName).string().not_null())
                    .col(
                        ColumnDef::new(UserThemes::UnlockedAt)
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
                    .name("idx_user_themes_user_theme")
                    .table(UserThemes::Table)
                    .col(UserThemes::UserId)
                    .col(UserThemes::ThemeName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserThemes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Achievements::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Achievements {
    Table,
    Id,
    UserId,
    AchievementType,
    Name,
    Description,
    Icon,
    Metadata,
    UnlockedAt,
}

#[derive(DeriveIden)]
enum UserThemes {
    Table,
    Id,
    UserId,
    ThemeName,
    UnlockedAt,
}
