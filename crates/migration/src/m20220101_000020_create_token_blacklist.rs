//! Create `token_blacklist` table.
//!
//! Holds the `jti` of refresh tokens revoked by logout until they expire.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TokenBlacklist::Table)
                    .if_not_exists()
                    .col(uuid(TokenBlacklist::Id).primary_key())
                    .col(uuid(TokenBlacklist::Jti).unique_key().not_null())
                    .col(uuid(TokenBlacklist::UserId).not_null())
                    .col(timestamp_with_time_zone(TokenBlacklist::ExpiresAt).not_null())
                    .col(timestamp_with_time_zone(TokenBlacklist::BlacklistedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_token_blacklist_user")
                            .from(TokenBlacklist::Table, TokenBlacklist::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TokenBlacklist::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TokenBlacklist {
    Table,
    Id,
    Jti,
    UserId,
    ExpiresAt,
    BlacklistedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }
