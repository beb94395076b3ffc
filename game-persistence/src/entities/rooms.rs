use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "rooms")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub owner_id: Uuid,
    pub max_players: i32,
    pub status: String,
    pub active_game_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::room_participants::Entity")]
    RoomParticipants,
}

impl Related<super::room_participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RoomParticipants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
