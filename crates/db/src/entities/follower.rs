//! Follower entity (accounts following a local owner).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "follower")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The local account being followed
    pub account_id: String,

    /// The account doing the following
    pub follower_account_id: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Account,

    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::FollowerAccountId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    FollowerAccount,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FollowerAccount.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
