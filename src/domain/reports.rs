//! Read-side sales aggregation.
//!
//! Pure computations over the persisted order history; callers load the
//! history and hand it in. All monetary results are rounded to 2 decimal
//! places at this boundary so floating drift can never accumulate into
//! reports (money stays `BigDecimal` end to end regardless).

use std::collections::{BTreeMap, HashMap};

use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::order::{round_money, OrderView};

#[derive(Debug, Clone, PartialEq)]
pub struct ProductSales {
    pub product_id: Uuid,
    pub product_name: String,
    pub total_sold: i64,
    pub total_revenue: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyBucket {
    /// Calendar month in `YYYY-MM` form.
    pub period: String,
    pub total_sales: BigDecimal,
    pub count: i64,
}

/// Sum of `total` across all orders; zero when there are none.
pub fn total_sales(orders: &[OrderView]) -> BigDecimal {
    let sum = orders
        .iter()
        .fold(BigDecimal::from(0), |acc, order| acc + &order.total);
    round_money(&sum)
}

/// Groups order lines by product, sorted descending by units sold and
/// truncated to `limit`. The sort is stable: products tied on units keep
/// their first-appearance order in the history.
pub fn top_products(orders: &[OrderView], limit: usize) -> Vec<ProductSales> {
    let mut ranked: Vec<ProductSales> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for order in orders {
        for item in &order.items {
            let revenue = BigDecimal::from(item.quantity) * &item.unit_price;
            match index.get(&item.product_id) {
                Some(&i) => {
                    ranked[i].total_sold += i64::from(item.quantity);
                    ranked[i].total_revenue += revenue;
                }
                None => {
                    index.insert(item.product_id, ranked.len());
                    ranked.push(ProductSales {
                        product_id: item.product_id,
                        product_name: item.product_name.clone(),
                        total_sold: i64::from(item.quantity),
                        total_revenue: revenue,
                    });
                }
            }
        }
    }

    ranked.sort_by(|a, b| b.total_sold.cmp(&a.total_sold));
    ranked.truncate(limit);
    for entry in &mut ranked {
        entry.total_revenue = round_money(&entry.total_revenue);
    }
    ranked
}

/// Buckets orders by the calendar month of `created_at`, ascending by period.
pub fn monthly_sales(orders: &[OrderView]) -> Vec<MonthlyBucket> {
    let mut buckets: BTreeMap<String, (BigDecimal, i64)> = BTreeMap::new();

    for order in orders {
        let period = order.created_at.format("%Y-%m").to_string();
        let entry = buckets
            .entry(period)
            .or_insert_with(|| (BigDecimal::from(0), 0));
        entry.0 += &order.total;
        entry.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(period, (total, count))| MonthlyBucket {
            period,
            total_sales: round_money(&total),
            count,
        })
        .collect()
}
