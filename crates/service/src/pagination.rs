//! Pagination utilities for service layer
//!
//! `page`/`per_page` arrive as query parameters on the admin listing and are
//! normalized here before reaching a repository.

use serde::Deserialize;

pub const MAX_PER_PAGE: u32 = 100;

/// Pagination parameters
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct Pagination {
    /// 1-based page index
    pub page: u32,
    /// items per page
    pub per_page: u32,
}

impl Pagination {
    /// Clamp to sane defaults and return the 0-based page index and page size.
    pub fn normalize(self) -> (u64, u64) {
        let page = if self.page == 0 { 1 } else { self.page };
        let per_page = self.per_page.clamp(1, MAX_PER_PAGE);
        ((page - 1) as u64, per_page as u64)
    }
}

impl Default for Pagination {
    fn default() -> Self { Self { page: 1, per_page: 20 } }
}
