//! Auth module: three-layer architecture (domain, repository, service).
//!
//! This module centralizes registration, login, token and profile logic
//! under the service crate, independent of the web framework.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod repo;
pub mod tokens;
pub mod validation;

pub use service::{AuthConfig, AuthService};
