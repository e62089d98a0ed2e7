use uuid::Uuid;

use super::errors::DomainError;

/// One line of a cart: a quantity of a specific product variant.
///
/// Two additions refer to the same line when their identity key
/// `(product_id, selected_size, selected_color)` matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub selected_size: Option<String>,
    pub selected_color: Option<String>,
}

/// A user's mutable cart. Owned by exactly one user, created lazily on the
/// first add, and kept (empty) after an order is placed.
#[derive(Debug, Clone)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            items: Vec::new(),
        }
    }

    pub fn with_items(id: Uuid, user_id: Uuid, items: Vec<CartItem>) -> Self {
        Self { id, user_id, items }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds `quantity` of a product variant, merging into an existing line
    /// with the same identity key if one exists.
    pub fn add_item(
        &mut self,
        product_id: Uuid,
        quantity: i32,
        selected_size: Option<String>,
        selected_color: Option<String>,
    ) -> Result<(), DomainError> {
        validate_quantity(quantity)?;

        let existing = self.items.iter_mut().find(|item| {
            item.product_id == product_id
                && item.selected_size == selected_size
                && item.selected_color == selected_color
        });

        match existing {
            Some(item) => {
                item.quantity = item.quantity.checked_add(quantity).ok_or_else(|| {
                    DomainError::Validation("quantity overflow".to_string())
                })?;
            }
            None => self.items.push(CartItem {
                id: Uuid::new_v4(),
                product_id,
                quantity,
                selected_size,
                selected_color,
            }),
        }
        Ok(())
    }

    /// Sets the quantity of the line identified by `item_id`.
    pub fn update_quantity(&mut self, item_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        validate_quantity(quantity)?;
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or(DomainError::NotFound("Cart item"))?;
        item.quantity = quantity;
        Ok(())
    }

    /// Removes the line identified by `item_id`.
    pub fn remove_item(&mut self, item_id: Uuid) -> Result<(), DomainError> {
        let pos = self
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or(DomainError::NotFound("Cart item"))?;
        self.items.remove(pos);
        Ok(())
    }

    /// Empties the cart. The cart itself survives (lazily created, never
    /// deleted).
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

fn validate_quantity(quantity: i32) -> Result<(), DomainError> {
    if quantity < 1 {
        return Err(DomainError::Validation(
            "quantity must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn add_merges_lines_with_same_identity_key() {
        let mut cart = Cart::new(Uuid::new_v4());
        let product = Uuid::new_v4();

        cart.add_item(product, 1, size("M"), None).unwrap();
        cart.add_item(product, 2, size("M"), None).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn add_keeps_separate_lines_for_different_variants() {
        let mut cart = Cart::new(Uuid::new_v4());
        let product = Uuid::new_v4();

        cart.add_item(product, 1, size("M"), None).unwrap();
        cart.add_item(product, 1, size("L"), None).unwrap();
        cart.add_item(product, 1, size("M"), Some("red".to_string()))
            .unwrap();

        assert_eq!(cart.items().len(), 3);
    }

    #[test]
    fn add_rejects_non_positive_quantity() {
        let mut cart = Cart::new(Uuid::new_v4());
        let product = Uuid::new_v4();

        assert!(matches!(
            cart.add_item(product, 0, None, None),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            cart.add_item(product, -3, None, None),
            Err(DomainError::Validation(_))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn update_sets_quantity() {
        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_item(Uuid::new_v4(), 1, None, None).unwrap();
        let item_id = cart.items()[0].id;

        cart.update_quantity(item_id, 5).unwrap();

        assert_eq!(cart.items()[0].quantity, 5);
    }

    #[test]
    fn update_rejects_quantity_below_one() {
        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_item(Uuid::new_v4(), 2, None, None).unwrap();
        let item_id = cart.items()[0].id;

        assert!(matches!(
            cart.update_quantity(item_id, 0),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn update_unknown_item_is_not_found() {
        let mut cart = Cart::new(Uuid::new_v4());
        assert!(matches!(
            cart.update_quantity(Uuid::new_v4(), 1),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn remove_is_not_found_on_repeat() {
        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_item(Uuid::new_v4(), 1, None, None).unwrap();
        let item_id = cart.items()[0].id;

        cart.remove_item(item_id).unwrap();
        assert!(cart.is_empty());

        // A second removal must report NotFound, never silently succeed.
        assert!(matches!(
            cart.remove_item(item_id),
            Err(DomainError::NotFound(_))
        ));
    }
}
