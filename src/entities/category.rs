use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::poll_category::Entity")]
    PollCategory,
}

impl Related<super::poll::Entity> for Entity {
    fn to() -> RelationDef {
        super::poll_category::Relation::Poll.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::poll_category::Relation::Category.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
