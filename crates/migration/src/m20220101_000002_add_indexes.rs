use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Users: admin listing orders by join date
        manager
            .create_index(
                Index::create()
                    .name("idx_user_date_joined")
                    .table(User::Table)
                    .col(User::DateJoined)
                    .to_owned(),
            )
            .await?;

        // TokenBlacklist: per-user lookups and expiry sweeps
        manager
            .create_index(
                Index::create()
                    .name("idx_token_blacklist_user")
                    .table(TokenBlacklist::Table)
                    .col(TokenBlacklist::UserId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_token_blacklist_expires")
                    .table(TokenBlacklist::Table)
                    .col(TokenBlacklist::ExpiresAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_user_date_joined").table(User::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_token_blacklist_user").table(TokenBlacklist::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_token_blacklist_expires").table(TokenBlacklist::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum User { Table, DateJoined }

#[derive(DeriveIden)]
enum TokenBlacklist { Table, UserId, ExpiresAt }
