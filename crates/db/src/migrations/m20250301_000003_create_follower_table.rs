//! Create follower table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Follower::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Follower::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Follower::AccountId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Follower::FollowerAccountId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Follower::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_follower_account")
                            .from(Follower::Table, Follower::AccountId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_follower_follower_account")
                            .from(Follower::Table, Follower::FollowerAccountId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (account_id, follower_account_id) - prevent duplicate edges
        manager
            .create_index(
                Index::create()
                    .name("idx_follower_account_pair")
                    .table(Follower::Table)
                    .col(Follower::AccountId)
                    .col(Follower::FollowerAccountId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: follower_account_id (reverse lookups from the sender side)
        manager
            .create_index(
                Index::create()
                    .name("idx_follower_follower_account_id")
                    .table(Follower::Table)
                    .col(Follower::FollowerAccountId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Follower::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Follower {
    Table,
    Id,
    AccountId,
    FollowerAccountId,
    CreatedAt,
}

#[derive(Iden)]
enum Account {
    Table,
    Id,
}
