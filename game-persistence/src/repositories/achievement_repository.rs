use anyhow::Result;
use sea_orm::{
    sea_query::OnConflict, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder,
};

use super::{format_timestamp, parse_timestamp};
use crate::entities::{achievements, prelude::*, user_themes};
use game_types::{AchievementRecord, AchievementType, Theme, ThemeUnlock, UserId};

pub struct AchievementRepository {
    db: DatabaseConnection,
}

impl AchievementRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_record(model: achievements::Model) -> Result<AchievementRecord> {
        Ok(AchievementRecord {
            user_id: model.user_id,
            achievement_type: model.achievement_type.parse().map_err(anyhow::Error::msg)?,
            name: model.name,
            description: model.description,
            icon: model.icon,
            unlocked_at: format_timestamp(&model.unlocked_at),
            metadata: serde_json::from_str(&model.metadata)?,
        })
    }

    /// Insert-or-ignore on `(user_id, achievement_type)`. `true` only when
    /// this call created the row.
    pub async fn grant(&self, record: &AchievementRecord) -> Result<bool> {
        let row = achievements::ActiveModel {
            user_id: Set(record.user_id),
            achievement_type: Set(record.achievement_type.as_str().to_string()),
            name: Set(record.name.clone()),
            description: Set(record.description.clone()),
            icon: Set(record.icon.clone()),
            metadata: Set(serde_json::to_string(&record.metadata)?),
            unlocked_at: Set(parse_timestamp(&record.unlocked_at)),
            ..Default::default()
        };

        let inserted = Achievements::insert(row)
            .on_conflict(
                OnConflict::columns([
                    achievements::Column::UserId,
                    achievements::Column::AchievementType,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(inserted > 0)
    }

    pub async fn unlock_theme(&self, user_id: UserId, theme: Theme) -> Result<bool> {
        let row = user_themes::ActiveModel {
            user_id: Set(user_id),
            theme_name: Set(theme.as_str().to_string()),
            unlocked_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        let inserted = UserThemes::insert(row)
            .on_conflict(
                OnConflict::columns([user_themes::Column::UserId, user_themes::Column::ThemeName])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(inserted > 0)
    }

    /// Newest first.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<AchievementRecord>> {
        Achievements::find()
            .filter(achievements::Column::UserId.eq(user_id))
            .order_by_desc(achievements::Column::UnlockedAt)
            .order_by_desc(achievements::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Self::model_to_record)
            .collect()
    }

    pub async fn granted_types(&self, user_id: UserId) -> Result<Vec<AchievementType>> {
        Ok(self
            .list_for_user(user_id)
            .await?
            .into_iter()
            .map(|r| r.achievement_type)
            .collect())
    }

    pub async fn themes_for_user(&self, user_id: UserId) -> Result<Vec<ThemeUnlock>> {
        UserThemes::find()
            .filter(user_themes::Column::UserId.eq(user_id))
            .order_by_desc(user_themes::Column::UnlockedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| {
                Ok(ThemeUnlock {
                    user_id: m.user_id,
                    theme: m.theme_name.parse().map_err(anyhow::Error::msg)?,
                    unlocked_at: format_timestamp(&m.unlocked_at),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use game_types::{AchievementMetadata, GameResult, WinCondition};
    use migration::{Migrator, MigratorTrait};
    use uuid::Uuid;

    async fn setup_test_db() -> AchievementRepository {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        AchievementRepository::new(db)
    }

    #[tokio::test]
    async fn test_grant_is_idempotent() {
        let repo = setup_test_db().await;
        let user_id = Uuid::new_v4();
        let metadata = AchievementMetadata {
            game_id: Some(Uuid::new_v4()),
            win_condition: Some(WinCondition::Diagonal),
            result: Some(GameResult::Win),
        };
        let record = AchievementRecord::new(
            user_id,
            AchievementType::FirstWin,
            chrono::Utc::now().to_rfc3339(),
            metadata.clone(),
        );

        assert!(repo.grant(&record).await.unwrap());
        assert!(!repo.grant(&record).await.unwrap());

        let listed = repo.list_for_user(user_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, AchievementType::FirstWin.display_name());
        assert_eq!(listed[0].metadata, metadata);
        assert_eq!(repo.granted_types(user_id).await.unwrap(), vec![AchievementType::FirstWin]);
    }

    #[tokio::test]
    async fn test_theme_unlock_once_per_pair() {
        let repo = setup_test_db().await;
        let user_id = Uuid::new_v4();
        assert!(repo.unlock_theme(user_id, Theme::Halloween).await.unwrap());
        assert!(!repo.unlock_theme(user_id, Theme::Halloween).await.unwrap());
        assert!(repo.unlock_theme(user_id, Theme::Summer).await.unwrap());
        // Another user is unaffected by the first user's unlocks.
        assert!(repo.unlock_theme(Uuid::new_v4(), Theme::Halloween).await.unwrap());

        let themes = repo.themes_for_user(user_id).await.unwrap();
        assert_eq!(themes.len(), 2);
    }
}
