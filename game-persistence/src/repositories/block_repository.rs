use anyhow::Result;
use sea_orm::{
    sea_query::OnConflict, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder,
};

use super::format_timestamp;
use crate::entities::{blocked_users, prelude::*};
use game_types::{BlockedUser, UserId};

pub struct BlockRepository {
    db: DatabaseConnection,
}

impl BlockRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_block(model: blocked_users::Model) -> BlockedUser {
        BlockedUser {
            blocker_id: model.blocker_id,
            blocked_id: model.blocked_id,
            blocked_at: format_timestamp(&model.blocked_at),
        }
    }

    /// Returns `false` when the block already existed.
    pub async fn block(&self, blocker_id: UserId, blocked_id: UserId) -> Result<bool> {
        let row = blocked_users::ActiveModel {
            blocker_id: Set(blocker_id),
            blocked_id: Set(blocked_id),
            blocked_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        let inserted = BlockedUsers::insert(row)
            .on_conflict(
                OnConflict::columns([
                    blocked_users::Column::BlockerId,
                    blocked_users::Column::BlockedId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(inserted > 0)
    }

    /// Returns `false` when there was no block to lift.
    pub async fn unblock(&self, blocker_id: UserId, blocked_id: UserId) -> Result<bool> {
        let deleted = BlockedUsers::delete_many()
            .filter(blocked_users::Column::BlockerId.eq(blocker_id))
            .filter(blocked_users::Column::BlockedId.eq(blocked_id))
            .exec(&self.db)
            .await?;
        Ok(deleted.rows_affected > 0)
    }

    /// Blocks placed by `blocker_id`, newest first.
    pub async fn list_for(&self, blocker_id: UserId) -> Result<Vec<BlockedUser>> {
        Ok(BlockedUsers::find()
            .filter(blocked_users::Column::BlockerId.eq(blocker_id))
            .order_by_desc(blocked_users::Column::BlockedAt)
            .order_by_desc(blocked_users::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Self::model_to_block)
            .collect())
    }
}
