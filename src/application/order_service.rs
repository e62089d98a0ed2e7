use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{OrderStatus, OrderView, ShippingAddress};
use crate::domain::ports::OrderRepository;

pub struct OrderService<R> {
    repo: R,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Converts the user's cart into a `Pending` order. The repository owns
    /// the transaction boundary; see `OrderRepository::place_order`.
    pub fn place_order(
        &self,
        user_id: Uuid,
        shipping_address: ShippingAddress,
    ) -> Result<OrderView, DomainError> {
        self.repo.place_order(user_id, shipping_address)
    }

    pub fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError> {
        self.repo.list_for_user(user_id)
    }

    pub fn list_all(&self) -> Result<Vec<OrderView>, DomainError> {
        self.repo.list_all()
    }

    pub fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderView, DomainError> {
        self.repo.update_status(order_id, new_status)
    }
}
