//! Create `user` table.
//!
//! Email is the login identifier and carries the unique key that settles
//! concurrent duplicate registrations.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len(User::Email, 254).unique_key().not_null())
                    .col(string_len(User::FirstName, 150).not_null())
                    .col(string_len(User::LastName, 150).not_null())
                    .col(
                        ColumnDef::new(User::PhoneNumber)
                            .string_len(20)
                            .null(),
                    )
                    .col(boolean(User::IsVerified).default(false).not_null())
                    .col(boolean(User::IsActive).default(true).not_null())
                    .col(boolean(User::IsStaff).default(false).not_null())
                    .col(timestamp_with_time_zone(User::DateJoined).not_null())
                    .col(timestamp_with_time_zone(User::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(User::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
    Email,
    FirstName,
    LastName,
    PhoneNumber,
    IsVerified,
    IsActive,
    IsStaff,
    DateJoined,
    UpdatedAt,
}
