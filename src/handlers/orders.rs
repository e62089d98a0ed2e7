use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::order::{OrderView, ShippingAddress};
use crate::domain::principal::Principal;
use crate::errors::AppError;
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressDto {
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

impl From<ShippingAddressDto> for ShippingAddress {
    fn from(dto: ShippingAddressDto) -> Self {
        ShippingAddress {
            name: dto.name,
            street: dto.street,
            city: dto.city,
            state: dto.state,
            zip: dto.zip,
            country: dto.country,
            phone: dto.phone,
        }
    }
}

impl From<ShippingAddress> for ShippingAddressDto {
    fn from(addr: ShippingAddress) -> Self {
        ShippingAddressDto {
            name: addr.name,
            street: addr.street,
            city: addr.city,
            state: addr.state,
            zip: addr.zip,
            country: addr.country,
            phone: addr.phone,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub shipping_address: ShippingAddressDto,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    /// Name captured at order creation; immune to later catalog edits.
    pub product_name: String,
    pub quantity: i32,
    /// Unit price captured at order creation, as a decimal string.
    pub unit_price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_color: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub total: String,
    pub shipping_address: ShippingAddressDto,
    pub created_at: String,
    pub items: Vec<OrderItemResponse>,
}

impl From<OrderView> for OrderResponse {
    fn from(order: OrderView) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            status: order.status.as_str().to_string(),
            total: order.total.to_string(),
            shipping_address: order.shipping_address.into(),
            created_at: order.created_at.to_rfc3339(),
            items: order
                .items
                .into_iter()
                .map(|item| OrderItemResponse {
                    id: item.id,
                    product_id: item.product_id,
                    product_name: item.product_name,
                    quantity: item.quantity,
                    unit_price: item.unit_price.to_string(),
                    selected_size: item.selected_size,
                    selected_color: item.selected_color,
                })
                .collect(),
        }
    }
}

pub(super) fn to_responses(orders: Vec<OrderView>) -> Vec<OrderResponse> {
    orders.into_iter().map(OrderResponse::from).collect()
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Converts the caller's cart into a `PENDING` order and empties the cart.
/// Order creation and cart clearing commit together or not at all.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Cart is empty"),
        (status = 404, description = "A cart product no longer exists in the catalog"),
        (status = 401, description = "Missing or invalid identity headers"),
    ),
    tag = "orders"
)]
pub async fn place_order(
    state: web::Data<AppState>,
    principal: Principal,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let shipping: ShippingAddress = body.into_inner().shipping_address.into();
    let order = web::block(move || state.orders.place_order(principal.id, shipping))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// The caller's own order history, oldest first.
#[utoipa::path(
    get,
    path = "/orders",
    responses(
        (status = 200, description = "Caller's orders", body = [OrderResponse]),
        (status = 401, description = "Missing or invalid identity headers"),
    ),
    tag = "orders"
)]
pub async fn list_my_orders(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<HttpResponse, AppError> {
    let orders = web::block(move || state.orders.list_for_user(principal.id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(to_responses(orders)))
}
