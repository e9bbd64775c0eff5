use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
};
use serde::Serialize;

const DEFAULT_PAGE_SIZE: u64 = 10;
/// Larger `limit` values are clamped to this.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Requested page, taken from the `page` and `limit` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u64,
    limit: u64,
}

impl Pagination {
    /// `None` for a zero page or limit, or a page too far out to skip to.
    pub fn new(page: u64, limit: u64) -> Option<Self> {
        if page == 0 || limit == 0 {
            return None;
        }
        let limit = limit.min(MAX_PAGE_SIZE);
        let skip = (page - 1).checked_mul(limit)?;
        i64::try_from(skip).ok()?;
        Some(Self { page, limit })
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Number of items before the requested page.
    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.limit
    }

    pub fn result(self, total: u64) -> PaginationResult {
        PaginationResult {
            total,
            pages: total / self.limit + u64::from(total % self.limit != 0),
            page: self.page,
            limit: self.limit,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Pagination {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let page = match req.query_value::<u64>("page").unwrap_or(Ok(1)) {
            Ok(page) => page,
            Err(_) => return request::Outcome::Failure((Status::BadRequest, ())),
        };
        let limit = match req
            .query_value::<u64>("limit")
            .unwrap_or(Ok(DEFAULT_PAGE_SIZE))
        {
            Ok(limit) => limit,
            Err(_) => return request::Outcome::Failure((Status::BadRequest, ())),
        };
        match Self::new(page, limit) {
            Some(pagination) => request::Outcome::Success(pagination),
            None => request::Outcome::Failure((Status::BadRequest, ())),
        }
    }
}

/// Pagination details returned alongside a page of results.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct PaginationResult {
    pub total: u64,
    pub pages: u64,
    pub page: u64,
    pub limit: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_round_up() {
        let pagination = Pagination::new(2, 10).unwrap();
        assert_eq!(pagination.skip(), 10);
        assert_eq!(
            pagination.result(21),
            PaginationResult {
                total: 21,
                pages: 3,
                page: 2,
                limit: 10
            }
        );
        assert_eq!(Pagination::default().result(0).pages, 0);
    }

    #[test]
    fn zero_is_rejected() {
        assert_eq!(Pagination::new(0, 10), None);
        assert_eq!(Pagination::new(1, 0), None);
    }

    #[test]
    fn huge_values_stay_in_range() {
        let pagination = Pagination::new(1, u64::MAX).unwrap();
        assert_eq!(pagination.limit(), MAX_PAGE_SIZE);
        assert_eq!(pagination.result(u64::MAX).pages, u64::MAX / MAX_PAGE_SIZE + 1);
        assert_eq!(pagination.result(2).pages, 1);

        assert_eq!(Pagination::new(u64::MAX, 10), None);
        let far = i64::MAX as u64 / MAX_PAGE_SIZE;
        assert!(Pagination::new(far, MAX_PAGE_SIZE).is_some());
        assert_eq!(Pagination::new(far + 2, MAX_PAGE_SIZE), None);
    }
}
