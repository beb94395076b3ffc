use anyhow::Result;
use sea_orm::{
    sea_query::OnConflict, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};

use super::{format_timestamp, parse_timestamp};
use crate::entities::{prelude::*, room_participants, rooms};
use game_types::{Participant, Room, RoomId};

pub struct RoomRepository {
    db: DatabaseConnection,
}

impl RoomRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn models_to_room(model: rooms::Model, participants: Vec<room_participants::Model>) -> Result<Room> {
        let participants = participants
            .into_iter()
            .map(|p| {
                Ok(Participant {
                    user_id: p.user_id,
                    role: p.role.parse().map_err(anyhow::Error::msg)?,
                    joined_at: format_timestamp(&p.joined_at),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Room {
            id: model.id,
            code: model.code,
            name: model.name,
            owner_id: model.owner_id,
            max_players: model.max_players.clamp(0, u8::MAX as i32) as u8,
            status: model.status.parse().map_err(anyhow::Error::msg)?,
            participants,
            active_game_id: model.active_game_id,
            created_at: format_timestamp(&model.created_at),
        })
    }

    /// Writes the room row and replaces its participant list.
    pub async fn save(&self, room: &Room) -> Result<()> {
        let row = rooms::ActiveModel {
            id: Set(room.id),
            code: Set(room.code.clone()),
            name: Set(room.name.clone()),
            owner_id: Set(room.owner_id),
            max_players: Set(room.max_players as i32),
            status: Set(room.status.as_str().to_string()),
            active_game_id: Set(room.active_game_id),
            created_at: Set(parse_timestamp(&room.created_at)),
        };

        let txn = self.db.begin().await?;

        Rooms::insert(row)
            .on_conflict(
                OnConflict::column(rooms::Column::Id)
                    .update_columns([
                        rooms::Column::Name,
                        rooms::Column::Status,
                        rooms::Column::ActiveGameId,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        RoomParticipants::delete_many()
            .filter(room_participants::Column::RoomId.eq(room.id))
            .exec(&txn)
            .await?;

        if !room.participants.is_empty() {
            let rows = room.participants.iter().map(|p| room_participants::ActiveModel {
                room_id: Set(room.id),
                user_id: Set(p.user_id),
                role: Set(p.role.as_str().to_string()),
                joined_at: Set(parse_timestamp(&p.joined_at)),
                ..Default::default()
            });
            RoomParticipants::insert_many(rows)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>> {
        match Rooms::find_by_id(id).one(&self.db).await? {
            Some(model) => self.with_participants(model).await.map(Some),
            None => Ok(None),
        }
    }

    /// `code` must already be normalised.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Room>> {
        let model = Rooms::find()
            .filter(rooms::Column::Code.eq(code))
            .one(&self.db)
            .await?;
        match model {
            Some(model) => self.with_participants(model).await.map(Some),
            None => Ok(None),
        }
    }

    async fn with_participants(&self, model: rooms::Model) -> Result<Room> {
        let participants = RoomParticipants::find()
            .filter(room_participants::Column::RoomId.eq(model.id))
            .order_by_asc(room_participants::Column::Id)
            .all(&self.db)
            .await?;
        Self::models_to_room(model, participants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use game_types::{Role, RoomStatus};
    use migration::{Migrator, MigratorTrait};
    use uuid::Uuid;

    async fn setup_test_db() -> RoomRepository {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        RoomRepository::new(db)
    }

    fn sample_room(code: &str) -> Room {
        let owner = Uuid::new_v4();
        let now = chrono::Utc::now().to_rfc3339();
        Room {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: "Lobby".to_string(),
            owner_id: owner,
            max_players: 2,
            status: RoomStatus::Waiting,
            participants: vec![Participant {
                user_id: owner,
                role: Role::Player,
                joined_at: now.clone(),
            }],
            active_game_id: None,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_save_and_find_by_code() {
        let repo = setup_test_db().await;
        let room = sample_room("ABC234");
        repo.save(&room).await.unwrap();

        let found = repo.find_by_code("ABC234").await.unwrap().unwrap();
        assert_eq!(found.id, room.id);
        assert_eq!(found.participants.len(), 1);
        assert_eq!(found.participants[0].role, Role::Player);
        assert!(repo.find_by_code("ZZZZZZ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resave_replaces_participants() {
        let repo = setup_test_db().await;
        let mut room = sample_room("QWE789");
        repo.save(&room).await.unwrap();

        let guest = Uuid::new_v4();
        let watcher = Uuid::new_v4();
        let now = chrono::Utc::now().to_rfc3339();
        room.participants.push(Participant {
            user_id: guest,
            role: Role::Player,
            joined_at: now.clone(),
        });
        room.participants.push(Participant {
            user_id: watcher,
            role: Role::Spectator,
            joined_at: now,
        });
        room.status = RoomStatus::Playing;
        repo.save(&room).await.unwrap();

        room.participants.retain(|p| p.user_id != guest);
        repo.save(&room).await.unwrap();

        let found = repo.find_by_id(room.id).await.unwrap().unwrap();
        assert_eq!(found.status, RoomStatus::Playing);
        assert_eq!(found.member_ids(), vec![room.owner_id, watcher]);
    }

    #[tokio::test]
    async fn test_codes_are_unique() {
        let repo = setup_test_db().await;
        repo.save(&sample_room("DUP222")).await.unwrap();
        assert!(repo.save(&sample_room("DUP222")).await.is_err());
    }
}
