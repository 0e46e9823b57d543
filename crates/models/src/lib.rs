//! SeaORM entities and thin persistence helpers for users, their password
//! credentials and revoked refresh tokens.

pub mod errors;
pub mod db;
pub mod user;
pub mod user_credentials;
pub mod token_blacklist;
