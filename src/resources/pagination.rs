use serde::{Deserialize, Serialize};

use crate::store::{Resource, ResourceStore};

pub const MAX_LIMIT: u32 = 100;

/// A validated `page`/`limit` pair. Always `page >= 1` and `1 <= limit <= MAX_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Lenient parse of the raw query values. Anything that is not a positive
    /// integer falls back to the default; oversized limits are clamped.
    pub fn parse(page: Option<&str>, limit: Option<&str>, default_limit: u32) -> Self {
        let page = positive(page).unwrap_or(1);
        let limit = positive(limit).unwrap_or(default_limit);
        Self::new(page, limit)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

fn positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .map(|v| v.min(u64::from(u32::MAX)) as u32)
}

/// Raw list query string. Everything stays a string so that bad values are
/// ignored rather than rejected.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub featured: Option<String>,
}

impl ListQuery {
    pub fn page_request(&self, default_limit: u32) -> PageRequest {
        PageRequest::parse(self.page.as_deref(), self.limit.as_deref(), default_limit)
    }

    /// `featured=true` narrows; anything else leaves the list unfiltered.
    pub fn featured_only(&self) -> bool {
        self.featured
            .as_deref()
            .map_or(false, |v| v.trim().eq_ignore_ascii_case("true"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, req: PageRequest) -> Self {
        let limit = u64::from(req.limit());
        Self {
            items,
            pagination: Pagination {
                page: req.page(),
                limit: req.limit(),
                total,
                pages: total.div_ceil(limit),
            },
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

/// Runs the list and count queries for the same filter concurrently.
pub async fn paginate<R: Resource>(
    store: &dyn ResourceStore<R>,
    filter: &R::Filter,
    req: PageRequest,
) -> anyhow::Result<Page<R>> {
    let (items, total) = tokio::try_join!(store.list(filter, &req), store.count(filter))?;
    Ok(Page::new(items, total, req))
}
