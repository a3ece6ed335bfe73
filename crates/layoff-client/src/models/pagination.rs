use serde::{Deserialize, Serialize};

/// Page cursor. `page` is 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit,
            total: 0,
            total_pages: 0,
        }
    }

    /// Cursor for a response that carried no paging metadata: everything
    /// returned is treated as the final page.
    pub fn single_page(page: u32, limit: u32, count: usize) -> Self {
        Self {
            page,
            limit,
            total: count as u64,
            total_pages: page,
        }
    }

    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(20)
    }
}
