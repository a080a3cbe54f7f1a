//! Account entity (federated actors, local and remote).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "account")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub username: String,

    pub username_lower: String,

    /// NULL = local account, Some(host) = remote account
    #[sea_orm(nullable)]
    pub host: Option<String>,

    /// Canonical `ActivityPub` URI (immutable, primary identity)
    #[sea_orm(unique)]
    pub uri: String,

    /// Display name
    #[sea_orm(nullable)]
    pub display_name: Option<String>,

    /// Profile summary
    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,

    /// `ActivityPub` inbox URL
    pub inbox: String,

    /// `ActivityPub` shared inbox URL
    #[sea_orm(nullable)]
    pub shared_inbox: Option<String>,

    /// `ActivityPub` outbox URL
    #[sea_orm(nullable)]
    pub outbox: Option<String>,

    /// `ActivityPub` followers collection URL
    #[sea_orm(nullable)]
    pub followers_url: Option<String>,

    /// `ActivityPub` following collection URL
    #[sea_orm(nullable)]
    pub following_url: Option<String>,

    /// Public key in PEM format (always present)
    #[sea_orm(column_type = "Text")]
    pub public_key_pem: String,

    /// Private key in PEM format (local accounts only)
    #[sea_orm(column_type = "Text", nullable)]
    pub private_key_pem: Option<String>,

    /// Last time this remote account was fetched
    #[sea_orm(nullable)]
    pub last_fetched_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether this account lives on this instance.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        self.host.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bookmark::Entity")]
    Bookmarks,
}

impl Related<super::bookmark::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookmarks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
