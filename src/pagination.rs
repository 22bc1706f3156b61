use serde::{Deserialize, Serialize};

pub const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}
fn default_per_page() -> i64 {
    10
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PageQuery {
    /// Out-of-range values fall back to sane bounds rather than erroring.
    pub fn clamped(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub page: i64,
    pub per_page: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(query: &PageQuery, total_items: i64) -> Self {
        Self {
            page: query.page,
            per_page: query.per_page,
            total_items,
            total_pages: (total_items + query.per_page - 1) / query.per_page,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PageMeta,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, query: &PageQuery, total_items: i64) -> Self {
        Self {
            items,
            pagination: PageMeta::new(query, total_items),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_values() {
        let q = PageQuery {
            page: 0,
            per_page: 5000,
        }
        .clamped();
        assert_eq!(q.page, 1);
        assert_eq!(q.per_page, MAX_PER_PAGE);
    }

    #[test]
    fn offset_follows_page() {
        let q = PageQuery {
            page: 3,
            per_page: 10,
        };
        assert_eq!(q.offset(), 20);
        assert_eq!(q.limit(), 10);
    }

    #[test]
    fn meta_rounds_total_pages_up() {
        let q = PageQuery {
            page: 1,
            per_page: 10,
        };
        assert_eq!(PageMeta::new(&q, 0).total_pages, 0);
        assert_eq!(PageMeta::new(&q, 10).total_pages, 1);
        assert_eq!(PageMeta::new(&q, 11).total_pages, 2);
    }

    #[test]
    fn defaults_apply_when_params_missing() {
        let q: PageQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.per_page, 10);
    }
}
