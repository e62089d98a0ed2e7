use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::{Cart, CartItem};
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;
use crate::schema::{cart_items, carts};

use super::models::{CartItemRow, CartRow, NewCartItemRow, NewCartRow};

pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CartRepository for DieselCartRepository {
    fn find_by_user(&self, user_id: Uuid) -> Result<Option<Cart>, DomainError> {
        let mut conn = self.pool.get()?;

        let cart = carts::table
            .filter(carts::user_id.eq(user_id))
            .select(CartRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(cart) = cart else {
            return Ok(None);
        };

        let rows = cart_items::table
            .filter(cart_items::cart_id.eq(cart.id))
            .order(cart_items::position.asc())
            .select(CartItemRow::as_select())
            .load(&mut conn)?;

        Ok(Some(Cart::with_items(
            cart.id,
            cart.user_id,
            rows.into_iter()
                .map(|row| CartItem {
                    id: row.id,
                    product_id: row.product_id,
                    quantity: row.quantity,
                    selected_size: row.selected_size,
                    selected_color: row.selected_color,
                })
                .collect(),
        )))
    }

    /// Rewrites the cart document: upsert the cart row, then replace its
    /// items wholesale. Item ids come from the aggregate, so references held
    /// by clients stay valid across saves.
    fn save(&self, cart: &Cart) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::insert_into(carts::table)
                .values(&NewCartRow {
                    id: cart.id,
                    user_id: cart.user_id,
                })
                .on_conflict(carts::user_id)
                .do_nothing()
                .execute(conn)?;

            // Two racing first-adds build aggregates with different cart ids;
            // whichever row is stored wins, and the items attach to it.
            let cart_id: Uuid = carts::table
                .filter(carts::user_id.eq(cart.user_id))
                .select(carts::id)
                .first(conn)?;

            diesel::update(carts::table.find(cart_id))
                .set(carts::updated_at.eq(diesel::dsl::now))
                .execute(conn)?;

            diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart_id)))
                .execute(conn)?;

            let rows: Vec<NewCartItemRow> = cart
                .items()
                .iter()
                .enumerate()
                .map(|(position, item)| NewCartItemRow {
                    id: item.id,
                    cart_id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    position: position as i32,
                    selected_size: item.selected_size.clone(),
                    selected_color: item.selected_color.clone(),
                })
                .collect();
            diesel::insert_into(cart_items::table)
                .values(&rows)
                .execute(conn)?;

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::domain::cart::Cart;
    use crate::domain::ports::CartRepository;
    use crate::infrastructure::testutil::{seed_product, setup_db};

    use super::DieselCartRepository;

    #[tokio::test]
    async fn save_and_find_round_trip_preserves_line_order_and_ids() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool.clone());
        let user_id = Uuid::new_v4();
        let shirt = seed_product(&pool, "Shirt", "19.99");
        let cap = seed_product(&pool, "Cap", "7.50");

        let mut cart = Cart::new(user_id);
        cart.add_item(shirt, 2, Some("M".into()), None).unwrap();
        cart.add_item(cap, 1, None, None).unwrap();
        repo.save(&cart).expect("save failed");

        let loaded = repo
            .find_by_user(user_id)
            .expect("find failed")
            .expect("cart missing");
        assert_eq!(loaded.id, cart.id);
        assert_eq!(loaded.items(), cart.items());

        // A second save must keep the item ids clients already hold.
        let mut cart = loaded;
        cart.add_item(cap, 3, None, None).unwrap();
        repo.save(&cart).expect("save failed");

        let reloaded = repo
            .find_by_user(user_id)
            .expect("find failed")
            .expect("cart missing");
        assert_eq!(reloaded.items(), cart.items());
    }

    #[tokio::test]
    async fn racing_first_adds_converge_on_the_stored_cart_row() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool.clone());
        let user_id = Uuid::new_v4();
        let shirt = seed_product(&pool, "Shirt", "19.99");
        let cap = seed_product(&pool, "Cap", "7.50");

        // Two callers who each saw no cart build fresh aggregates with
        // different cart ids. Both saves must succeed and land on the one
        // stored row.
        let mut first = Cart::new(user_id);
        first.add_item(shirt, 1, None, None).unwrap();
        let mut second = Cart::new(user_id);
        second.add_item(cap, 2, None, None).unwrap();
        assert_ne!(first.id, second.id);

        repo.save(&first).expect("first save failed");
        repo.save(&second).expect("second save failed");

        let loaded = repo
            .find_by_user(user_id)
            .expect("find failed")
            .expect("cart missing");
        assert_eq!(loaded.id, first.id, "the first stored cart id wins");
        assert_eq!(loaded.items(), second.items());
    }
}
