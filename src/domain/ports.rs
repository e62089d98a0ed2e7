use std::collections::HashMap;

use uuid::Uuid;

use super::cart::Cart;
use super::errors::DomainError;
use super::order::{OrderStatus, OrderView, PricedProduct, ShippingAddress};

pub trait CartRepository: Send + Sync + 'static {
    fn find_by_user(&self, user_id: Uuid) -> Result<Option<Cart>, DomainError>;
    /// Persists the aggregate as written, preserving item ids.
    fn save(&self, cart: &Cart) -> Result<(), DomainError>;
}

/// Read-only view of the external catalog collaborator.
pub trait ProductCatalog: Send + Sync + 'static {
    fn products_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, PricedProduct>, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Atomically converts the user's cart into an order: price snapshots,
    /// order + items written, cart cleared. Either all of it commits or none
    /// of it is visible, including under concurrent calls for the same user.
    fn place_order(
        &self,
        user_id: Uuid,
        shipping_address: ShippingAddress,
    ) -> Result<OrderView, DomainError>;

    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError>;

    /// Full history, oldest first.
    fn list_all(&self) -> Result<Vec<OrderView>, DomainError>;

    fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderView, DomainError>;
}
