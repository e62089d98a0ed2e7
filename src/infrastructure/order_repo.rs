use std::collections::HashMap;

use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::{Cart, CartItem};
use crate::domain::errors::DomainError;
use crate::domain::order::{
    checkout, OrderItemView, OrderStatus, OrderView, PricedProduct, ShippingAddress,
};
use crate::domain::ports::OrderRepository;
use crate::schema::{cart_items, carts, order_events, order_items, orders, products};

use super::models::{
    CartItemRow, CartRow, NewOrderEventRow, NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow,
    ProductRow,
};

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    /// The one multi-step write in the system. Everything happens inside a
    /// single transaction:
    ///
    /// 1. lock the user's cart row (`FOR UPDATE`) so concurrent checkouts
    ///    for the same user serialize instead of double-ordering,
    /// 2. resolve price snapshots for every line (a missing product aborts),
    /// 3. insert the order, its items, and an `OrderPlaced` event,
    /// 4. clear the cart.
    ///
    /// A failure at any step rolls the whole thing back; the loser of a
    /// concurrent race re-reads an already-emptied cart and gets `EmptyCart`.
    fn place_order(
        &self,
        user_id: Uuid,
        shipping_address: ShippingAddress,
    ) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let cart_row = carts::table
                .filter(carts::user_id.eq(user_id))
                .select(CartRow::as_select())
                .for_update()
                .first(conn)
                .optional()?;

            // No cart yet means nothing was ever added.
            let Some(cart_row) = cart_row else {
                return Err(DomainError::EmptyCart);
            };

            let item_rows = cart_items::table
                .filter(cart_items::cart_id.eq(cart_row.id))
                .order(cart_items::position.asc())
                .select(CartItemRow::as_select())
                .load(conn)?;

            let cart = Cart::with_items(
                cart_row.id,
                cart_row.user_id,
                item_rows
                    .into_iter()
                    .map(|row| CartItem {
                        id: row.id,
                        product_id: row.product_id,
                        quantity: row.quantity,
                        selected_size: row.selected_size,
                        selected_color: row.selected_color,
                    })
                    .collect(),
            );

            let products = load_price_snapshots(conn, &cart)?;
            let new_order = checkout(user_id, &cart, &products, shipping_address)?;

            let shipping_json = serde_json::to_value(&new_order.shipping_address)
                .map_err(|e| DomainError::Internal(e.to_string()))?;
            let order_row: OrderRow = diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: new_order.id,
                    user_id: new_order.user_id,
                    status: new_order.status.as_str().to_string(),
                    total: new_order.total.clone(),
                    shipping_address: shipping_json,
                })
                .returning(OrderRow::as_returning())
                .get_result(conn)?;

            let new_items: Vec<NewOrderItemRow> = new_order
                .items
                .iter()
                .map(|item| NewOrderItemRow {
                    id: item.id,
                    order_id: new_order.id,
                    product_id: item.product_id,
                    product_name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price.clone(),
                    selected_size: item.selected_size.clone(),
                    selected_color: item.selected_color.clone(),
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&new_items)
                .execute(conn)?;

            record_event(
                conn,
                new_order.id,
                "OrderPlaced",
                json!({
                    "orderId": new_order.id,
                    "userId": new_order.user_id,
                    "status": new_order.status.as_str(),
                    "total": new_order.total.to_string(),
                    "items": new_order
                        .items
                        .iter()
                        .map(|item| json!({
                            "productId": item.product_id,
                            "quantity": item.quantity,
                            "unitPrice": item.unit_price.to_string(),
                        }))
                        .collect::<Vec<_>>(),
                }),
            )?;

            diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id)))
                .execute(conn)?;
            diesel::update(carts::table.find(cart.id))
                .set(carts::updated_at.eq(diesel::dsl::now))
                .execute(conn)?;

            Ok(OrderView {
                id: order_row.id,
                user_id: order_row.user_id,
                status: new_order.status,
                total: new_order.total,
                shipping_address: new_order.shipping_address,
                created_at: order_row.created_at,
                items: new_order
                    .items
                    .into_iter()
                    .map(|item| OrderItemView {
                        id: item.id,
                        product_id: item.product_id,
                        product_name: item.product_name,
                        quantity: item.quantity,
                        unit_price: item.unit_price,
                        selected_size: item.selected_size,
                        selected_color: item.selected_color,
                    })
                    .collect(),
            })
        })
    }

    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = orders::table
            .filter(orders::user_id.eq(user_id))
            .order(orders::created_at.asc())
            .then_order_by(orders::id.asc())
            .select(OrderRow::as_select())
            .load(&mut conn)?;
        attach_items(&mut conn, rows)
    }

    fn list_all(&self) -> Result<Vec<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = orders::table
            .order(orders::created_at.asc())
            .then_order_by(orders::id.asc())
            .select(OrderRow::as_select())
            .load(&mut conn)?;
        attach_items(&mut conn, rows)
    }

    fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row = orders::table
                .find(order_id)
                .select(OrderRow::as_select())
                .for_update()
                .first(conn)
                .optional()?;

            let Some(row) = row else {
                return Err(DomainError::NotFound("Order"));
            };

            let current = parse_stored_status(&row.status)?;
            let next = current.transition_to(new_status)?;

            let updated: OrderRow = diesel::update(orders::table.find(order_id))
                .set((
                    orders::status.eq(next.as_str()),
                    orders::updated_at.eq(diesel::dsl::now),
                ))
                .returning(OrderRow::as_returning())
                .get_result(conn)?;

            record_event(
                conn,
                order_id,
                "OrderStatusChanged",
                json!({
                    "orderId": order_id,
                    "from": current.as_str(),
                    "to": next.as_str(),
                }),
            )?;

            let mut views = attach_items(conn, vec![updated])?;
            views
                .pop()
                .ok_or_else(|| DomainError::Internal("updated order vanished".to_string()))
        })
    }
}

fn load_price_snapshots(
    conn: &mut PgConnection,
    cart: &Cart,
) -> Result<HashMap<Uuid, PricedProduct>, DomainError> {
    let ids: Vec<Uuid> = cart.items().iter().map(|i| i.product_id).collect();
    let rows: Vec<ProductRow> = products::table
        .filter(products::id.eq_any(&ids))
        .select(ProductRow::as_select())
        .load(conn)?;
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

fn record_event(
    conn: &mut PgConnection,
    order_id: Uuid,
    event_type: &str,
    payload: serde_json::Value,
) -> Result<(), DomainError> {
    diesel::insert_into(order_events::table)
        .values(&NewOrderEventRow {
            id: Uuid::new_v4(),
            aggregate_type: "Order".to_string(),
            aggregate_id: order_id.to_string(),
            event_type: event_type.to_string(),
            payload,
        })
        .execute(conn)?;
    Ok(())
}

fn attach_items(
    conn: &mut PgConnection,
    rows: Vec<OrderRow>,
) -> Result<Vec<OrderView>, DomainError> {
    let items: Vec<OrderItemRow> = OrderItemRow::belonging_to(&rows)
        .select(OrderItemRow::as_select())
        .load(conn)?;
    let grouped = items.grouped_by(&rows);

    rows.into_iter()
        .zip(grouped)
        .map(|(row, items)| {
            let status = parse_stored_status(&row.status)?;
            let shipping_address: ShippingAddress = serde_json::from_value(row.shipping_address)
                .map_err(|e| DomainError::Internal(e.to_string()))?;
            Ok(OrderView {
                id: row.id,
                user_id: row.user_id,
                status,
                total: row.total,
                shipping_address,
                created_at: row.created_at,
                items: items
                    .into_iter()
                    .map(|item| OrderItemView {
                        id: item.id,
                        product_id: item.product_id,
                        product_name: item.product_name,
                        quantity: item.quantity,
                        unit_price: item.unit_price,
                        selected_size: item.selected_size,
                        selected_color: item.selected_color,
                    })
                    .collect(),
            })
        })
        .collect()
}

fn parse_stored_status(value: &str) -> Result<OrderStatus, DomainError> {
    OrderStatus::parse(value)
        .map_err(|_| DomainError::Internal(format!("corrupt order status '{value}' in store")))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use diesel::prelude::*;
    use uuid::Uuid;

    use super::DieselOrderRepository;
    use crate::domain::cart::Cart;
    use crate::domain::errors::DomainError;
    use crate::domain::order::{OrderStatus, ShippingAddress};
    use crate::domain::ports::{CartRepository, OrderRepository};
    use crate::infrastructure::cart_repo::DieselCartRepository;
    use crate::infrastructure::models::OrderEventRow;
    use crate::infrastructure::testutil::{seed_product, setup_db};
    use crate::schema::{order_events, products};

    fn fill_cart(pool: &crate::db::DbPool, user_id: Uuid, lines: &[(Uuid, i32)]) {
        let carts = DieselCartRepository::new(pool.clone());
        let mut cart = carts
            .find_by_user(user_id)
            .expect("find failed")
            .unwrap_or_else(|| Cart::new(user_id));
        for (product_id, quantity) in lines {
            cart.add_item(*product_id, *quantity, None, None)
                .expect("add failed");
        }
        carts.save(&cart).expect("save failed");
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: "Ada Lovelace".to_string(),
            street: "12 Analytical Way".to_string(),
            city: "London".to_string(),
            zip: "N1 9GU".to_string(),
            country: "UK".to_string(),
            ..ShippingAddress::default()
        }
    }

    #[tokio::test]
    async fn place_order_totals_snapshots_and_clears_cart() {
        let (_container, pool) = setup_db().await;
        let user_id = Uuid::new_v4();
        let shirt = seed_product(&pool, "Shirt", "19.99");
        let cap = seed_product(&pool, "Cap", "7.50");
        fill_cart(&pool, user_id, &[(shirt, 2), (cap, 1)]);

        let repo = DieselOrderRepository::new(pool.clone());
        let order = repo.place_order(user_id, address()).expect("place failed");

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, BigDecimal::from_str("47.48").unwrap());
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.shipping_address.city, "London");

        // The cart survives the checkout, empty.
        let carts = DieselCartRepository::new(pool);
        let cart = carts
            .find_by_user(user_id)
            .expect("find failed")
            .expect("cart row should survive checkout");
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn place_order_with_empty_cart_creates_nothing() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());

        let result = repo.place_order(Uuid::new_v4(), address());
        assert!(matches!(result, Err(DomainError::EmptyCart)));

        assert!(repo.list_all().expect("list failed").is_empty());
    }

    #[tokio::test]
    async fn second_checkout_of_the_same_cart_is_empty_cart() {
        let (_container, pool) = setup_db().await;
        let user_id = Uuid::new_v4();
        let shirt = seed_product(&pool, "Shirt", "19.99");
        fill_cart(&pool, user_id, &[(shirt, 1)]);

        let repo = DieselOrderRepository::new(pool);
        repo.place_order(user_id, address()).expect("place failed");

        let retry = repo.place_order(user_id, address());
        assert!(matches!(retry, Err(DomainError::EmptyCart)));
        assert_eq!(repo.list_for_user(user_id).expect("list failed").len(), 1);
    }

    #[tokio::test]
    async fn concurrent_checkouts_for_one_user_yield_a_single_order() {
        let (_container, pool) = setup_db().await;
        let user_id = Uuid::new_v4();
        let shirt = seed_product(&pool, "Shirt", "19.99");
        fill_cart(&pool, user_id, &[(shirt, 2)]);

        // Two checkouts race on separate connections. The cart row lock
        // serializes them: whoever wins empties the cart, the other must
        // see it empty.
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    DieselOrderRepository::new(pool).place_order(user_id, address())
                })
            })
            .collect();
        let results: Vec<Result<_, DomainError>> = handles
            .into_iter()
            .map(|h| h.join().expect("checkout thread panicked"))
            .collect();

        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1, "exactly one checkout may succeed");
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(DomainError::EmptyCart))),
            "the loser must see an empty cart, got {results:?}"
        );

        let repo = DieselOrderRepository::new(pool);
        assert_eq!(
            repo.list_for_user(user_id).expect("list failed").len(),
            1,
            "never two orders from one cart"
        );
    }

    #[tokio::test]
    async fn unresolvable_product_rolls_back_and_keeps_cart() {
        let (_container, pool) = setup_db().await;
        let user_id = Uuid::new_v4();
        // Never seeded into the catalog.
        fill_cart(&pool, user_id, &[(Uuid::new_v4(), 1)]);

        let repo = DieselOrderRepository::new(pool.clone());
        let result = repo.place_order(user_id, address());
        assert!(matches!(result, Err(DomainError::NotFound("Product"))));

        assert!(repo.list_all().expect("list failed").is_empty());
        let cart = DieselCartRepository::new(pool)
            .find_by_user(user_id)
            .expect("find failed")
            .expect("cart should exist");
        assert_eq!(cart.items().len(), 1, "cart must survive the rollback");
    }

    #[tokio::test]
    async fn later_price_changes_do_not_alter_historical_orders() {
        let (_container, pool) = setup_db().await;
        let user_id = Uuid::new_v4();
        let shirt = seed_product(&pool, "Shirt", "19.99");
        fill_cart(&pool, user_id, &[(shirt, 1)]);

        let repo = DieselOrderRepository::new(pool.clone());
        let placed = repo.place_order(user_id, address()).expect("place failed");

        {
            let mut conn = pool.get().expect("Failed to get connection");
            diesel::update(products::table.find(shirt))
                .set(products::price.eq(BigDecimal::from_str("99.99").unwrap()))
                .execute(&mut conn)
                .expect("price update failed");
        }

        let reread = &repo.list_for_user(user_id).expect("list failed")[0];
        assert_eq!(reread.total, placed.total);
        assert_eq!(
            reread.items[0].unit_price,
            BigDecimal::from_str("19.99").unwrap()
        );
    }

    #[tokio::test]
    async fn place_order_records_an_event_in_the_same_transaction() {
        let (_container, pool) = setup_db().await;
        let user_id = Uuid::new_v4();
        let shirt = seed_product(&pool, "Shirt", "4.50");
        fill_cart(&pool, user_id, &[(shirt, 2)]);

        let repo = DieselOrderRepository::new(pool.clone());
        let order = repo.place_order(user_id, address()).expect("place failed");

        let mut conn = pool.get().expect("Failed to get connection");
        let events: Vec<OrderEventRow> = order_events::table
            .filter(order_events::aggregate_id.eq(order.id.to_string()))
            .select(OrderEventRow::as_select())
            .load(&mut conn)
            .expect("query failed");

        assert_eq!(events.len(), 1, "exactly one event per placement");
        assert_eq!(events[0].aggregate_type, "Order");
        assert_eq!(events[0].event_type, "OrderPlaced");
    }

    #[tokio::test]
    async fn status_walks_the_happy_path_and_rejects_shortcuts() {
        let (_container, pool) = setup_db().await;
        let user_id = Uuid::new_v4();
        let shirt = seed_product(&pool, "Shirt", "19.99");
        fill_cart(&pool, user_id, &[(shirt, 1)]);

        let repo = DieselOrderRepository::new(pool);
        let order = repo.place_order(user_id, address()).expect("place failed");

        // Pending cannot jump straight to Shipped.
        let shortcut = repo.update_status(order.id, OrderStatus::Shipped);
        assert!(matches!(
            shortcut,
            Err(DomainError::InvalidTransition { .. })
        ));

        for next in [
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            let updated = repo.update_status(order.id, next).expect("update failed");
            assert_eq!(updated.status, next);
        }

        // Delivered is terminal.
        let after_terminal = repo.update_status(order.id, OrderStatus::Cancelled);
        assert!(matches!(
            after_terminal,
            Err(DomainError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn update_status_of_unknown_order_is_not_found() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool);

        let result = repo.update_status(Uuid::new_v4(), OrderStatus::Processing);
        assert!(matches!(result, Err(DomainError::NotFound("Order"))));
    }

    #[tokio::test]
    async fn listings_are_scoped_to_the_user() {
        let (_container, pool) = setup_db().await;
        let shirt = seed_product(&pool, "Shirt", "19.99");
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        fill_cart(&pool, alice, &[(shirt, 1)]);
        fill_cart(&pool, bob, &[(shirt, 3)]);

        let repo = DieselOrderRepository::new(pool);
        repo.place_order(alice, address()).expect("place failed");
        repo.place_order(bob, address()).expect("place failed");

        assert_eq!(repo.list_for_user(alice).expect("list failed").len(), 1);
        assert_eq!(repo.list_for_user(bob).expect("list failed").len(), 1);
        assert_eq!(repo.list_all().expect("list failed").len(), 2);
    }

    #[tokio::test]
    async fn listing_order_is_stable_when_timestamps_collide() {
        let (_container, pool) = setup_db().await;
        let user_id = Uuid::new_v4();
        let shirt = seed_product(&pool, "Shirt", "19.99");

        for _ in 0..3 {
            fill_cart(&pool, user_id, &[(shirt, 1)]);
            DieselOrderRepository::new(pool.clone())
                .place_order(user_id, address())
                .expect("place failed");
        }

        // Collapse all creation timestamps onto one instant; the id
        // tiebreaker must keep the listing deterministic.
        {
            let mut conn = pool.get().expect("Failed to get connection");
            diesel::update(crate::schema::orders::table)
                .set(crate::schema::orders::created_at.eq(chrono::Utc::now()))
                .execute(&mut conn)
                .expect("timestamp update failed");
        }

        let repo = DieselOrderRepository::new(pool);
        let first: Vec<Uuid> = repo
            .list_all()
            .expect("list failed")
            .iter()
            .map(|o| o.id)
            .collect();
        let second: Vec<Uuid> = repo
            .list_all()
            .expect("list failed")
            .iter()
            .map(|o| o.id)
            .collect();

        assert_eq!(first, second);
        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(first, sorted, "ties fall back to ascending id");
    }
}
