//! Create account table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Account::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Account::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Account::Username).string_len(128).not_null())
                    .col(ColumnDef::new(Account::UsernameLower).string_len(128).not_null())
                    .col(ColumnDef::new(Account::Host).string_len(256))
                    .col(ColumnDef::new(Account::Uri).string_len(1024).not_null())
                    .col(ColumnDef::new(Account::DisplayName).string_len(256))
                    .col(ColumnDef::new(Account::Summary).text())
                    .col(ColumnDef::new(Account::Inbox).string_len(1024).not_null())
                    .col(ColumnDef::new(Account::SharedInbox).string_len(1024))
                    .col(ColumnDef::new(Account::Outbox).string_len(1024))
                    .col(ColumnDef::new(Account::FollowersUrl).string_len(1024))
                    .col(ColumnDef::new(Account::FollowingUrl).string_len(1024))
                    .col(ColumnDef::new(Account::PublicKeyPem).text().not_null())
                    .col(ColumnDef::new(Account::PrivateKeyPem).text())
                    .col(ColumnDef::new(Account::LastFetchedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Account::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Account::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Unique index: (username_lower, host) - NULL host means local account.
        // Remote resolution races on this; inserts hitting it are treated as
        // "already exists, re-fetch".
        manager
            .create_index(
                Index::create()
                    .name("idx_account_username_lower_host")
                    .table(Account::Table)
                    .col(Account::UsernameLower)
                    .col(Account::Host)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: uri (canonical ActivityPub identity)
        manager
            .create_index(
                Index::create()
                    .name("idx_account_uri")
                    .table(Account::Table)
                    .col(Account::Uri)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: host (for filtering local/remote accounts)
        manager
            .create_index(
                Index::create()
                    .name("idx_account_host")
                    .table(Account::Table)
                    .col(Account::Host)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Account::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Account {
    Table,
    Id,
    Username,
    UsernameLower,
    Host,
    Uri,
    DisplayName,
    Summary,
    Inbox,
    SharedInbox,
    Outbox,
    FollowersUrl,
    FollowingUrl,
    PublicKeyPem,
    PrivateKeyPem,
    LastFetchedAt,
    CreatedAt,
    UpdatedAt,
}
