use anyhow::Result;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveValue::Set,
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::entities::{prelude::*, users};
use game_types::{GameResult, UserId, UserProfile, UserStatCounters};

pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_profile(model: &users::Model) -> UserProfile {
        UserProfile {
            id: model.id,
            display_name: model.display_name.clone(),
            username: model.username.clone(),
            email: model.email.clone(),
        }
    }

    pub(crate) fn model_to_counters(model: &users::Model) -> UserStatCounters {
        UserStatCounters {
            user_id: model.id,
            wins: model.wins.max(0) as u32,
            losses: model.losses.max(0) as u32,
            draws: model.draws.max(0) as u32,
        }
    }

    fn blank_row(id: UserId) -> users::ActiveModel {
        let now = chrono::Utc::now().into();
        users::ActiveModel {
            id: Set(id),
            display_name: Set(None),
            username: Set(None),
            email: Set(None),
            wins: Set(0),
            losses: Set(0),
            draws: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserProfile>> {
        let model = Users::find_by_id(id).one(&self.db).await?;
        Ok(model.as_ref().map(Self::model_to_profile))
    }

    /// Inserts the profile or refreshes its identity fields; counters are untouched.
    pub async fn upsert_profile(&self, profile: &UserProfile) -> Result<()> {
        let mut row = Self::blank_row(profile.id);
        row.display_name = Set(profile.display_name.clone());
        row.username = Set(profile.username.clone());
        row.email = Set(profile.email.clone());

        Users::insert(row)
            .on_conflict(
                OnConflict::column(users::Column::Id)
                    .update_columns([
                        users::Column::DisplayName,
                        users::Column::Username,
                        users::Column::Email,
                        users::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    /// Adds one to the counter for `result` in a single UPDATE so that
    /// concurrent finishes never lose an increment.
    pub async fn increment_result(&self, user_id: UserId, result: GameResult) -> Result<()> {
        Users::insert(Self::blank_row(user_id))
            .on_conflict(OnConflict::column(users::Column::Id).do_nothing().to_owned())
            .exec_without_returning(&self.db)
            .await?;

        let column = match result {
            GameResult::Win => users::Column::Wins,
            GameResult::Loss => users::Column::Losses,
            GameResult::Draw => users::Column::Draws,
        };

        let updated = Users::update_many()
            .col_expr(column, Expr::col(column).add(1))
            .col_expr(
                users::Column::UpdatedAt,
                Expr::value(chrono::DateTime::<chrono::FixedOffset>::from(chrono::Utc::now())),
            )
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.db)
            .await?;

        if updated.rows_affected != 1 {
            anyhow::bail!("counter update for user {} touched {} rows", user_id, updated.rows_affected);
        }
        Ok(())
    }

    pub async fn get_counters(&self, user_id: UserId) -> Result<UserStatCounters> {
        let model = Users::find_by_id(user_id).one(&self.db).await?;
        Ok(model
            .as_ref()
            .map(Self::model_to_counters)
            .unwrap_or_else(|| UserStatCounters::zeroed(user_id)))
    }

    /// Users with at least one counted game.
    pub async fn find_ranked(&self) -> Result<Vec<(UserProfile, UserStatCounters)>> {
        let models = Users::find()
            .filter(Expr::cust("wins + losses + draws > 0"))
            .order_by_desc(users::Column::Wins)
            .all(&self.db)
            .await?;

        Ok(models
            .iter()
            .map(|m| (Self::model_to_profile(m), Self::model_to_counters(m)))
            .collect())
    }
}
