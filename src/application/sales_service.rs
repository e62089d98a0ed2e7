use bigdecimal::BigDecimal;

use crate::domain::errors::DomainError;
use crate::domain::ports::OrderRepository;
use crate::domain::reports::{self, MonthlyBucket, ProductSales};

pub const DEFAULT_TOP_PRODUCTS_LIMIT: usize = 5;

/// Read-only reporting over the order history. May run concurrently with
/// writes; a report lagging the latest order by one write is acceptable.
pub struct SalesService<R> {
    repo: R,
}

impl<R: OrderRepository> SalesService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn total_sales(&self) -> Result<BigDecimal, DomainError> {
        let orders = self.repo.list_all()?;
        Ok(reports::total_sales(&orders))
    }

    pub fn top_products(&self, limit: usize) -> Result<Vec<ProductSales>, DomainError> {
        let orders = self.repo.list_all()?;
        Ok(reports::top_products(&orders, limit))
    }

    pub fn monthly_sales(&self) -> Result<Vec<MonthlyBucket>, DomainError> {
        let orders = self.repo.list_all()?;
        Ok(reports::monthly_sales(&orders))
    }
}
