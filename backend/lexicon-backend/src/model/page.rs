use crate::{
    configuration::Configuration,
    error::{LexiconResult, UserError},
};

/// A validated one-based page of a word listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    page_size: i64,
}

impl PageRequest {
    /// Pages start at 1. Page sizes above the configured maximum are reduced to the maximum.
    pub fn new(
        page: Option<i64>,
        page_size: Option<i64>,
        configuration: &Configuration,
    ) -> LexiconResult<Self> {
        let page = page.unwrap_or(1);
        let page_size = page_size.unwrap_or(configuration.default_page_size);

        if page < 1 {
            return Err(UserError::InvalidPage { page }.into());
        }
        if page_size < 1 {
            return Err(UserError::InvalidPageSize { page_size }.into());
        }

        Ok(Self {
            page,
            page_size: page_size.min(configuration.maximum_page_size),
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::PageRequest;
    use crate::{
        configuration::Configuration,
        error::{LexiconError, UserError},
    };

    #[rstest]
    #[case(1, 10, 0, 10)]
    #[case(2, 10, 10, 10)]
    #[case(3, 25, 50, 25)]
    #[case(2, 1000, 100, 100)]
    fn test_page_arithmetic(
        #[case] page: i64,
        #[case] page_size: i64,
        #[case] offset: i64,
        #[case] limit: i64,
    ) {
        let page_request =
            PageRequest::new(Some(page), Some(page_size), &Configuration::test_configuration())
                .unwrap();
        assert_eq!(page_request.offset(), offset);
        assert_eq!(page_request.limit(), limit);
    }

    #[test]
    fn test_page_defaults() {
        let page_request =
            PageRequest::new(None, None, &Configuration::test_configuration()).unwrap();
        assert_eq!(page_request.offset(), 0);
        assert_eq!(page_request.limit(), 10);
    }

    #[rstest]
    #[case(0, 10)]
    #[case(-1, 10)]
    #[case(1, 0)]
    #[case(1, -5)]
    fn test_invalid_pages(#[case] page: i64, #[case] page_size: i64) {
        assert!(matches!(
            PageRequest::new(Some(page), Some(page_size), &Configuration::test_configuration()),
            Err(LexiconError::UserError(
                UserError::InvalidPage { .. } | UserError::InvalidPageSize { .. }
            ))
        ));
    }
}
