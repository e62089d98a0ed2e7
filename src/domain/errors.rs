use thiserror::Error;

use super::order::OrderStatus;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The named entity ("cart item", "order", "product") does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Admin access required")]
    Forbidden,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Internal error: {0}")]
    Internal(String),
}
