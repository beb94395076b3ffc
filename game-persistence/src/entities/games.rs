use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "games")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub room_id: Option<Uuid>,
    pub player_x_id: Uuid,
    pub player_o_id: Uuid,
    pub game_mode: String,
    pub current_player: String,
    pub status: String,
    /// Serialized `Board`.
    #[sea_orm(column_type = "Text")]
    pub board: String,
    pub winner_id: Option<Uuid>,
    pub win_condition: Option<String>,
    pub move_count: i32,
    pub created_at: DateTimeWithTimeZone,
    pub finished_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::moves::Entity")]
    Moves,
}

impl Related<super::moves::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Moves.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
