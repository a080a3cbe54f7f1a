//! Bookmark entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookmark")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning account ID
    #[sea_orm(indexed)]
    pub account_id: String,

    /// The bookmarked URL
    pub url: String,

    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Tag slugs
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Json,

    /// Preview image URL
    #[sea_orm(nullable)]
    pub main_image: Option<String>,

    /// Public bookmarks federate and appear in collections
    #[sea_orm(default_value = true)]
    pub is_public: bool,

    /// `ActivityPub` id of the remote Note this row was unbundled from
    #[sea_orm(unique, nullable)]
    pub source_uri: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Tag slugs as a string list.
    #[must_use]
    pub fn tag_list(&self) -> Vec<String> {
        serde_json::from_value(self.tags.clone()).unwrap_or_default()
    }
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
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
