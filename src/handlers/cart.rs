use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::cart_service::CartLine;
use crate::domain::principal::Principal;
use crate::errors::AppError;
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(default)]
    pub selected_size: Option<String>,
    #[serde(default)]
    pub selected_color: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshotResponse {
    pub id: Uuid,
    pub name: String,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub price: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_color: Option<String>,
    /// Live catalog snapshot; `null` when the product no longer exists.
    pub product: Option<ProductSnapshotResponse>,
}

impl From<CartLine> for CartItemResponse {
    fn from(line: CartLine) -> Self {
        Self {
            id: line.item.id,
            product_id: line.item.product_id,
            quantity: line.item.quantity,
            selected_size: line.item.selected_size,
            selected_color: line.item.selected_color,
            product: line.product.map(|p| ProductSnapshotResponse {
                id: p.id,
                name: p.name,
                price: p.price.to_string(),
            }),
        }
    }
}

fn to_response(lines: Vec<CartLine>) -> Vec<CartItemResponse> {
    lines.into_iter().map(CartItemResponse::from).collect()
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /cart
///
/// A user without a cart gets an empty list, never an error.
#[utoipa::path(
    get,
    path = "/cart",
    responses(
        (status = 200, description = "Current cart contents", body = [CartItemResponse]),
        (status = 401, description = "Missing or invalid identity headers"),
    ),
    tag = "cart"
)]
pub async fn get_cart(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<HttpResponse, AppError> {
    let lines = web::block(move || state.cart.get_cart(principal.id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(to_response(lines)))
}

/// POST /cart
///
/// Adds a product variant, merging quantities into an existing line with the
/// same `(product, size, color)` identity key.
#[utoipa::path(
    post,
    path = "/cart",
    request_body = AddItemRequest,
    responses(
        (status = 201, description = "Updated cart contents", body = [CartItemResponse]),
        (status = 400, description = "Non-positive quantity"),
        (status = 401, description = "Missing or invalid identity headers"),
    ),
    tag = "cart"
)]
pub async fn add_item(
    state: web::Data<AppState>,
    principal: Principal,
    body: web::Json<AddItemRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let lines = web::block(move || {
        state.cart.add_item(
            principal.id,
            body.product_id,
            body.quantity,
            body.selected_size,
            body.selected_color,
        )
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Created().json(to_response(lines)))
}

/// PUT /cart/{itemId}
#[utoipa::path(
    put,
    path = "/cart/{item_id}",
    params(("item_id" = Uuid, Path, description = "Cart item UUID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Updated cart contents", body = [CartItemResponse]),
        (status = 400, description = "Quantity below 1"),
        (status = 404, description = "Cart or item not found"),
    ),
    tag = "cart"
)]
pub async fn update_item(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
    body: web::Json<UpdateItemRequest>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let quantity = body.quantity;
    let lines = web::block(move || state.cart.update_item(principal.id, item_id, quantity))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(to_response(lines)))
}

/// DELETE /cart/{itemId}
///
/// Removing an id that is not present reports 404, also on repeats.
#[utoipa::path(
    delete,
    path = "/cart/{item_id}",
    params(("item_id" = Uuid, Path, description = "Cart item UUID")),
    responses(
        (status = 200, description = "Updated cart contents", body = [CartItemResponse]),
        (status = 404, description = "Cart or item not found"),
    ),
    tag = "cart"
)]
pub async fn remove_item(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let lines = web::block(move || state.cart.remove_item(principal.id, item_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(to_response(lines)))
}
