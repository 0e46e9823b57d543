//! `user_credentials`: the argon2 PHC string for each user, kept out of the
//! `user` row so profile queries never load it. Cascades with the user.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(Credentials::Table)
            .if_not_exists()
            .col(pk_uuid(Credentials::Id))
            .col(uuid_uniq(Credentials::UserId))
            .col(text(Credentials::PasswordHash))
            .col(string_len(Credentials::PasswordAlgorithm, 32).default("argon2"))
            .col(timestamp_with_time_zone(Credentials::CreatedAt))
            .col(timestamp_with_time_zone(Credentials::UpdatedAt))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_user_credentials_user_id")
                    .from(Credentials::Table, Credentials::UserId)
                    .to(Users::Table, Users::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Credentials::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Credentials {
    #[sea_orm(iden = "user_credentials")]
    Table,
    Id,
    UserId,
    PasswordHash,
    PasswordAlgorithm,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    #[sea_orm(iden = "user")]
    Table,
    Id,
}
