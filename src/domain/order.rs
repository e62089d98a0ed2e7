use std::collections::HashMap;
use std::fmt;

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cart::Cart;
use super::errors::DomainError;

/// Order lifecycle. `Delivered` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "PENDING" => Ok(OrderStatus::Pending),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::Validation(format!(
                "unknown order status '{other}'"
            ))),
        }
    }

    /// The directed transition table. Anything not listed is rejected.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
        )
    }

    /// Checks the transition table, returning the error the caller surfaces.
    pub fn transition_to(self, next: OrderStatus) -> Result<OrderStatus, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination captured on the order. Every field is optional free text;
/// address validation belongs to the address-book collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub phone: String,
}

/// `{id, name, price}` snapshot read from the external catalog collaborator.
#[derive(Debug, Clone)]
pub struct PricedProduct {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
}

/// An order line with its price captured at creation time.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub selected_size: Option<String>,
    pub selected_color: Option<String>,
}

/// A fully priced order ready to be persisted, status `Pending`.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total: BigDecimal,
    pub shipping_address: ShippingAddress,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub selected_size: Option<String>,
    pub selected_color: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total: BigDecimal,
    pub shipping_address: ShippingAddress,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
}

/// Monetary values leave the domain rounded to 2 decimal places.
pub fn round_money(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfUp)
}

/// Converts a cart into a priced order.
///
/// Every line's unit price and product name are captured from the supplied
/// snapshots so later catalog changes cannot retroactively alter the order.
/// A product missing from `products` fails the whole checkout; prices are
/// never defaulted.
pub fn checkout(
    user_id: Uuid,
    cart: &Cart,
    products: &HashMap<Uuid, PricedProduct>,
    shipping_address: ShippingAddress,
) -> Result<NewOrder, DomainError> {
    if cart.is_empty() {
        return Err(DomainError::EmptyCart);
    }

    let mut items = Vec::with_capacity(cart.items().len());
    let mut total = BigDecimal::from(0);

    for line in cart.items() {
        let product = products
            .get(&line.product_id)
            .ok_or(DomainError::NotFound("Product"))?;
        let unit_price = round_money(&product.price);
        total += BigDecimal::from(line.quantity) * &unit_price;
        items.push(NewOrderItem {
            id: Uuid::new_v4(),
            product_id: line.product_id,
            product_name: product.name.clone(),
            quantity: line.quantity,
            unit_price,
            selected_size: line.selected_size.clone(),
            selected_color: line.selected_color.clone(),
        });
    }

    Ok(NewOrder {
        id: Uuid::new_v4(),
        user_id,
        status: OrderStatus::Pending,
        total: round_money(&total),
        shipping_address,
        items,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn priced(name: &str, price: &str) -> PricedProduct {
        PricedProduct {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price: BigDecimal::from_str(price).expect("valid decimal"),
        }
    }

    fn catalog(products: &[&PricedProduct]) -> HashMap<Uuid, PricedProduct> {
        products.iter().map(|p| (p.id, (*p).clone())).collect()
    }

    #[test]
    fn checkout_totals_sum_of_quantity_times_unit_price() {
        let user_id = Uuid::new_v4();
        let shirt = priced("Shirt", "19.99");
        let cap = priced("Cap", "7.50");

        let mut cart = Cart::new(user_id);
        cart.add_item(shirt.id, 2, None, None).unwrap();
        cart.add_item(cap.id, 1, None, None).unwrap();

        let order = checkout(
            user_id,
            &cart,
            &catalog(&[&shirt, &cap]),
            ShippingAddress::default(),
        )
        .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, BigDecimal::from_str("47.48").unwrap());
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].product_name, "Shirt");
        assert_eq!(
            order.items[0].unit_price,
            BigDecimal::from_str("19.99").unwrap()
        );
    }

    #[test]
    fn checkout_rounds_captured_prices_to_two_decimals() {
        let user_id = Uuid::new_v4();
        let widget = priced("Widget", "9.995");

        let mut cart = Cart::new(user_id);
        cart.add_item(widget.id, 1, None, None).unwrap();

        let order = checkout(
            user_id,
            &cart,
            &catalog(&[&widget]),
            ShippingAddress::default(),
        )
        .unwrap();

        assert_eq!(
            order.items[0].unit_price,
            BigDecimal::from_str("10.00").unwrap()
        );
        assert_eq!(order.total, BigDecimal::from_str("10.00").unwrap());
    }

    #[test]
    fn checkout_of_empty_cart_is_rejected() {
        let user_id = Uuid::new_v4();
        let cart = Cart::new(user_id);

        let result = checkout(user_id, &cart, &HashMap::new(), ShippingAddress::default());

        assert!(matches!(result, Err(DomainError::EmptyCart)));
    }

    #[test]
    fn checkout_fails_when_a_product_cannot_be_resolved() {
        let user_id = Uuid::new_v4();
        let mut cart = Cart::new(user_id);
        cart.add_item(Uuid::new_v4(), 1, None, None).unwrap();

        let result = checkout(user_id, &cart, &HashMap::new(), ShippingAddress::default());

        assert!(matches!(result, Err(DomainError::NotFound("Product"))));
    }

    #[test]
    fn allowed_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(Shipped.can_transition_to(Delivered));
    }

    #[test]
    fn pending_cannot_skip_to_shipped() {
        let result = OrderStatus::Pending.transition_to(OrderStatus::Shipped);
        assert!(matches!(
            result,
            Err(DomainError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Shipped,
            })
        ));
    }

    #[test]
    fn terminal_states_reject_every_transition() {
        use OrderStatus::*;
        for terminal in [Delivered, Cancelled] {
            for next in [Pending, Processing, Shipped, Delivered, Cancelled] {
                assert!(
                    !terminal.can_transition_to(next),
                    "{terminal} -> {next} must be rejected"
                );
            }
        }
    }

    #[test]
    fn stepwise_happy_path_succeeds() {
        use OrderStatus::*;
        let mut status = Pending;
        for next in [Processing, Shipped, Delivered] {
            status = status.transition_to(next).unwrap();
        }
        assert_eq!(status, Delivered);
    }

    #[test]
    fn status_round_trips_through_strings() {
        use OrderStatus::*;
        for status in [Pending, Processing, Shipped, Delivered, Cancelled] {
            assert_eq!(OrderStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(matches!(
            OrderStatus::parse("REFUNDED"),
            Err(DomainError::Validation(_))
        ));
    }
}
