//! 分页参数与分页结果
//! Pagination request and paged result

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_PAGE_NUMBER: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// 已规范化的分页请求 / Normalized page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_number: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// 页码至少为 1，页大小限制在 1..=100
    /// Page number is at least 1, page size is clamped to 1..=100
    pub fn new(page_number: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            page_number: page_number.unwrap_or(DEFAULT_PAGE_NUMBER).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page_number as u64 - 1) * self.page_size as u64
    }

    pub fn limit(&self) -> u64 {
        self.page_size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// 分页元数据 / Pagination metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMetadata {
    pub current_page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

/// 一页数据 / One page of items
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        Self {
            items,
            total_count,
            request,
        }
    }

    /// 对已按顺序排列的完整结果集切页
    /// Slice one page out of a fully ordered result set
    pub fn from_ordered(all: Vec<T>, request: PageRequest) -> Self {
        let total_count = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.page_size as usize)
            .collect();
        Self::new(items, total_count, request)
    }

    pub fn metadata(&self) -> PaginationMetadata {
        let size = self.request.page_size as u64;
        let total_pages = self.total_count.div_ceil(size);
        let current = self.request.page_number as u64;
        PaginationMetadata {
            current_page: self.request.page_number,
            page_size: self.request.page_size,
            total_count: self.total_count,
            total_pages,
            has_previous: current > 1,
            has_next: current < total_pages,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            request: self.request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults_and_clamp() {
        let req = PageRequest::new(None, None);
        assert_eq!(req.page_number, 1);
        assert_eq!(req.page_size, 10);

        let req = PageRequest::new(Some(0), Some(1000));
        assert_eq!(req.page_number, 1);
        assert_eq!(req.page_size, MAX_PAGE_SIZE);

        let req = PageRequest::new(Some(3), Some(0));
        assert_eq!(req.page_size, 1);
        assert_eq!(req.offset(), 2);
    }

    #[test]
    fn test_metadata() {
        let page = Page::from_ordered((1..=25).collect::<Vec<_>>(), PageRequest::new(Some(2), Some(10)));
        assert_eq!(page.items, (11..=20).collect::<Vec<_>>());
        let meta = page.metadata();
        assert_eq!(meta.total_count, 25);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_previous);
        assert!(meta.has_next);

        let empty: Page<i32> = Page::from_ordered(vec![], PageRequest::default());
        let meta = empty.metadata();
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_previous);
        assert!(!meta.has_next);
    }
}
