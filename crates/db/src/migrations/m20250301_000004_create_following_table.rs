//! Create following table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Following::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Following::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Following::AccountId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Following::TargetAccountId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Following::Confirmed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Following::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_following_account")
                            .from(Following::Table, Following::AccountId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_following_target_account")
                            .from(Following::Table, Following::TargetAccountId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (account_id, target_account_id) - prevent duplicate follows
        manager
            .create_index(
                Index::create()
                    .name("idx_following_account_pair")
                    .table(Following::Table)
                    .col(Following::AccountId)
                    .col(Following::TargetAccountId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: target_account_id (matching inbound Accept/Undo senders)
        manager
            .create_index(
                Index::create()
                    .name("idx_following_target_account_id")
                    .table(Following::Table)
                    .col(Following::TargetAccountId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Following::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Following {
    Table,
    Id,
    AccountId,
    TargetAccountId,
    Confirmed,
    CreatedAt,
}

#[derive(Iden)]
enum Account {
    Table,
    Id,
}
