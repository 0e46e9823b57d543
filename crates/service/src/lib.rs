//! Service layer providing the business operations behind the HTTP API.
//! - Separates business logic from data access.
//! - Reuses validation helpers and entity definitions in the `models` crate.
//! - Provides clear error types and documented interfaces.

pub mod errors;
pub mod auth;
pub mod runtime;
pub mod pagination;
pub mod maintenance;
#[cfg(test)]
pub mod test_support;
