//! Create bookmark table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookmark::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Bookmark::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Bookmark::AccountId).string_len(32).not_null())
                    .col(ColumnDef::new(Bookmark::Url).string_len(2048).not_null())
                    .col(ColumnDef::new(Bookmark::Title).string_len(512).not_null())
                    .col(ColumnDef::new(Bookmark::Description).text())
                    .col(
                        ColumnDef::new(Bookmark::Tags)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(ColumnDef::new(Bookmark::MainImage).string_len(1024))
                    .col(
                        ColumnDef::new(Bookmark::IsPublic)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Bookmark::SourceUri).string_len(1024))
                    .col(
                        ColumnDef::new(Bookmark::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Bookmark::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookmark_account")
                            .from(Bookmark::Table, Bookmark::AccountId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (account_id, is_public) - outbox queries are owner-scoped
        manager
            .create_index(
                Index::create()
                    .name("idx_bookmark_account_public")
                    .table(Bookmark::Table)
                    .col(Bookmark::AccountId)
                    .col(Bookmark::IsPublic)
                    .to_owned(),
            )
            .await?;

        // Unique index: source_uri - duplicate inbound Create detection
        manager
            .create_index(
                Index::create()
                    .name("idx_bookmark_source_uri")
                    .table(Bookmark::Table)
                    .col(Bookmark::SourceUri)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bookmark::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Bookmark {
    Table,
    Id,
    AccountId,
    Url,
    Title,
    Description,
    Tags,
    MainImage,
    IsPublic,
    SourceUri,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Account {
    Table,
    Id,
}
