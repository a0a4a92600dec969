//! HTTP route table.

pub mod admin;
pub mod app;
pub mod auth;
pub mod health;
pub mod reset_password;

use farmdesk_core::repository::Pagination;
use serde::Deserialize;

const MAX_PAGE_SIZE: u64 = 200;

/// `?offset=&limit=` query parameters shared by list routes.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl From<PageQuery> for Pagination {
    fn from(query: PageQuery) -> Self {
        let defaults = Pagination::default();
        Self {
            offset: query.offset.unwrap_or(defaults.offset),
            limit: query.limit.unwrap_or(defaults.limit).clamp(1, MAX_PAGE_SIZE),
        }
    }
}
