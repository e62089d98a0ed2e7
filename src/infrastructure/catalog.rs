use std::collections::HashMap;

use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::PricedProduct;
use crate::domain::ports::ProductCatalog;
use crate::schema::products;

use super::models::ProductRow;

/// Reads `{id, name, price}` snapshots from the catalog tables. This service
/// never writes them; catalog management lives elsewhere.
pub struct DieselProductCatalog {
    pool: DbPool,
}

impl DieselProductCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ProductCatalog for DieselProductCatalog {
    fn products_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, PricedProduct>, DomainError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.pool.get()?;

        let rows = products::table
            .filter(products::id.eq_any(ids))
            .select(ProductRow::as_select())
            .load(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.id,
                    PricedProduct {
                        id: row.id,
                        name: row.name,
                        price: row.price,
                    },
                )
            })
            .collect())
    }
}
