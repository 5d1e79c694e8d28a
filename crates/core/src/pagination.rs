//! Offset pagination for list endpoints.

use serde::Deserialize;

use crate::error::DomainError;

/// Fixed number of records returned per page.
pub const PAGE_SIZE: u32 = 20;

/// A validated, 1-based page request.
///
/// Pages start at 1; the offset of page `n` is `(n - 1) * PAGE_SIZE`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
}

impl PageRequest {
    pub fn new(page: u32) -> Result<Self, DomainError> {
        if page == 0 {
            return Err(DomainError::validation("page must be >= 1"));
        }
        Ok(Self { page })
    }

    pub fn first() -> Self {
        Self { page: 1 }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        PAGE_SIZE
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(PAGE_SIZE)
    }

    /// Slice an already-sorted collection down to this page.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        items
            .into_iter()
            .skip(offset)
            .take(PAGE_SIZE as usize)
            .collect()
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// Raw `?page=N` query string.
///
/// Kept as a string so a non-numeric value becomes a domain validation error
/// rather than an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn into_request(self) -> Result<PageRequest, DomainError> {
        match self.page.as_deref().map(str::trim) {
            None | Some("") => Ok(PageRequest::first()),
            Some(raw) => {
                let page = raw
                    .parse::<u32>()
                    .map_err(|_| DomainError::validation(format!("invalid page '{raw}'")))?;
                PageRequest::new(page)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn page_zero_is_rejected() {
        assert!(matches!(PageRequest::new(0), Err(DomainError::Validation(_))));
    }

    #[test]
    fn missing_page_defaults_to_first() {
        let req = PageQuery { page: None }.into_request().unwrap();
        assert_eq!(req, PageRequest::first());
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn non_numeric_page_is_rejected() {
        let err = PageQuery { page: Some("two".to_string()) }
            .into_request()
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn slice_takes_the_second_page() {
        let items: Vec<u32> = (0..45).collect();
        let page = PageRequest::new(2).unwrap().slice(items);
        assert_eq!(page.len(), 20);
        assert_eq!(page[0], 20);
        assert_eq!(page[19], 39);
    }

    #[test]
    fn slice_past_the_end_is_empty() {
        let items: Vec<u32> = (0..5).collect();
        assert!(PageRequest::new(3).unwrap().slice(items).is_empty());
    }

    proptest! {
        #[test]
        fn consecutive_pages_are_offset_by_page_size(page in 1u32..10_000) {
            let current = PageRequest::new(page).unwrap();
            let next = PageRequest::new(page + 1).unwrap();
            prop_assert_eq!(next.offset() - current.offset(), u64::from(PAGE_SIZE));
            prop_assert_eq!(current.limit(), PAGE_SIZE);
        }
    }
}
