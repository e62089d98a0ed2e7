use uuid::Uuid;

use crate::domain::cart::{Cart, CartItem};
use crate::domain::errors::DomainError;
use crate::domain::order::PricedProduct;
use crate::domain::ports::{CartRepository, ProductCatalog};

/// A cart line joined with its current product snapshot for display. The
/// snapshot is `None` when the product has disappeared from the catalog;
/// the line itself is kept (checkout will reject it, display won't).
#[derive(Debug, Clone)]
pub struct CartLine {
    pub item: CartItem,
    pub product: Option<PricedProduct>,
}

pub struct CartService<R, C> {
    repo: R,
    catalog: C,
}

impl<R: CartRepository, C: ProductCatalog> CartService<R, C> {
    pub fn new(repo: R, catalog: C) -> Self {
        Self { repo, catalog }
    }

    /// Never errors for a missing cart; a user without one simply has no
    /// items yet.
    pub fn get_cart(&self, user_id: Uuid) -> Result<Vec<CartLine>, DomainError> {
        match self.repo.find_by_user(user_id)? {
            Some(cart) => self.joined(&cart),
            None => Ok(Vec::new()),
        }
    }

    /// Adds to the user's cart, creating it lazily, merging by identity key.
    pub fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        selected_size: Option<String>,
        selected_color: Option<String>,
    ) -> Result<Vec<CartLine>, DomainError> {
        let mut cart = self
            .repo
            .find_by_user(user_id)?
            .unwrap_or_else(|| Cart::new(user_id));
        cart.add_item(product_id, quantity, selected_size, selected_color)?;
        self.repo.save(&cart)?;
        self.joined(&cart)
    }

    pub fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<Vec<CartLine>, DomainError> {
        let mut cart = self
            .repo
            .find_by_user(user_id)?
            .ok_or(DomainError::NotFound("Cart"))?;
        cart.update_quantity(item_id, quantity)?;
        self.repo.save(&cart)?;
        self.joined(&cart)
    }

    pub fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<Vec<CartLine>, DomainError> {
        let mut cart = self
            .repo
            .find_by_user(user_id)?
            .ok_or(DomainError::NotFound("Cart"))?;
        cart.remove_item(item_id)?;
        self.repo.save(&cart)?;
        self.joined(&cart)
    }

    fn joined(&self, cart: &Cart) -> Result<Vec<CartLine>, DomainError> {
        let ids: Vec<Uuid> = cart.items().iter().map(|i| i.product_id).collect();
        let products = self.catalog.products_by_ids(&ids)?;
        Ok(cart
            .items()
            .iter()
            .map(|item| CartLine {
                item: item.clone(),
                // Same product can appear on several lines (different
                // variants); every line gets the snapshot.
                product: products.get(&item.product_id).cloned(),
            })
            .collect())
    }
}
