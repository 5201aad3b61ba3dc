use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PAGE_SIZE;

/// `limit`/`offset` query parameters shared by every paginated listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    pub fn limit(&self) -> i64 {
        match self.limit {
            Some(limit) if limit > 0 => limit,
            _ => DEFAULT_PAGE_SIZE,
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Serialize, Debug)]
pub struct PageContext<T> {
    pub rows: Vec<T>,
    pub total_rows: i64,
    pub next_offset: Option<i64>,
    pub prev_offset: Option<i64>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, current_offset: i64) -> Self {
        if rows.is_empty() {
            return Self::no_rows();
        }
        let next_offset = if current_offset + page_size < total_rows {
            Some(current_offset + page_size)
        } else {
            None
        };
        let prev_offset = if current_offset > 0 {
            Some((current_offset - page_size).max(0))
        } else {
            None
        };

        Self {
            rows,
            total_rows,
            next_offset,
            prev_offset,
        }
    }

    pub fn no_rows() -> Self {
        Self {
            rows: vec![],
            total_rows: 0,
            next_offset: None,
            prev_offset: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_to_page_size_six() {
        let page = Pagination::default();
        assert_eq!(page.limit(), 6);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn zero_or_negative_limit_falls_back_to_default() {
        let page = Pagination {
            limit: Some(0),
            offset: Some(-3),
        };
        assert_eq!(page.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn middle_page_links_both_ways() {
        let ctx = PageContext::from_rows(vec![1, 2, 3], 20, 3, 6);
        assert_eq!(ctx.total_rows, 20);
        assert_eq!(ctx.next_offset, Some(9));
        assert_eq!(ctx.prev_offset, Some(3));
    }

    #[test]
    fn first_and_last_pages_have_open_ends() {
        let first = PageContext::from_rows(vec![1, 2, 3], 5, 3, 0);
        assert_eq!(first.prev_offset, None);
        assert_eq!(first.next_offset, Some(3));

        let last = PageContext::from_rows(vec![4, 5], 5, 3, 3);
        assert_eq!(last.prev_offset, Some(0));
        assert_eq!(last.next_offset, None);
    }

    #[test]
    fn empty_result_is_a_bare_page() {
        let ctx: PageContext<i32> = PageContext::from_rows(vec![], 0, 6, 0);
        assert_eq!(ctx.total_rows, 0);
        assert!(ctx.rows.is_empty());
        assert_eq!(ctx.next_offset, None);
    }
}
