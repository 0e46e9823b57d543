//! Shared building blocks for the Msitiri workspace: wire types, logging
//! setup and startup environment checks.

pub mod types;
pub mod utils;
pub mod env;
