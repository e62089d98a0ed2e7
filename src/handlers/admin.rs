use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::sales_service::DEFAULT_TOP_PRODUCTS_LIMIT;
use crate::domain::order::OrderStatus;
use crate::domain::principal::Principal;
use crate::domain::reports::{MonthlyBucket, ProductSales};
use crate::errors::AppError;
use crate::AppState;

use super::orders::{to_responses, OrderResponse};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// One of PENDING, PROCESSING, SHIPPED, DELIVERED, CANCELLED.
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TotalSalesResponse {
    pub total_sales: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopProductResponse {
    pub product_id: Uuid,
    pub product_name: String,
    pub total_sold: i64,
    pub total_revenue: String,
}

impl From<ProductSales> for TopProductResponse {
    fn from(p: ProductSales) -> Self {
        Self {
            product_id: p.product_id,
            product_name: p.product_name,
            total_sold: p.total_sold,
            total_revenue: p.total_revenue.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySalesResponse {
    pub period: String,
    pub total_sales: String,
    pub count: i64,
}

impl From<MonthlyBucket> for MonthlySalesResponse {
    fn from(b: MonthlyBucket) -> Self {
        Self {
            period: b.period,
            total_sales: b.total_sales.to_string(),
            count: b.count,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TopProductsParams {
    /// Number of products to return. Defaults to 5.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_TOP_PRODUCTS_LIMIT
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /orders/admin/all
#[utoipa::path(
    get,
    path = "/orders/admin/all",
    responses(
        (status = 200, description = "All orders", body = [OrderResponse]),
        (status = 403, description = "Caller is not an admin"),
    ),
    tag = "admin"
)]
pub async fn list_all_orders(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<HttpResponse, AppError> {
    principal.require_admin()?;
    let orders = web::block(move || state.orders.list_all())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(to_responses(orders)))
}

/// PUT /orders/admin/{id}
///
/// Drives the status state machine; anything outside the transition table is
/// rejected and the order is left untouched.
#[utoipa::path(
    put,
    path = "/orders/admin/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Updated order", body = OrderResponse),
        (status = 400, description = "Unknown status or transition not allowed"),
        (status = 404, description = "Order not found"),
        (status = 403, description = "Caller is not an admin"),
    ),
    tag = "admin"
)]
pub async fn update_status(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    principal.require_admin()?;
    let order_id = path.into_inner();
    let new_status = OrderStatus::parse(&body.status)?;
    let order = web::block(move || state.orders.update_status(order_id, new_status))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders/admin/total-sales
#[utoipa::path(
    get,
    path = "/orders/admin/total-sales",
    responses(
        (status = 200, description = "Sum of all order totals", body = TotalSalesResponse),
        (status = 403, description = "Caller is not an admin"),
    ),
    tag = "admin"
)]
pub async fn total_sales(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<HttpResponse, AppError> {
    principal.require_admin()?;
    let total = web::block(move || state.sales.total_sales())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(TotalSalesResponse {
        total_sales: total.to_string(),
    }))
}

/// GET /orders/admin/top-products
#[utoipa::path(
    get,
    path = "/orders/admin/top-products",
    params(("limit" = Option<usize>, Query, description = "Number of products (default 5)")),
    responses(
        (status = 200, description = "Best sellers by units sold", body = [TopProductResponse]),
        (status = 403, description = "Caller is not an admin"),
    ),
    tag = "admin"
)]
pub async fn top_products(
    state: web::Data<AppState>,
    principal: Principal,
    query: web::Query<TopProductsParams>,
) -> Result<HttpResponse, AppError> {
    principal.require_admin()?;
    let limit = query.into_inner().limit;
    let top = web::block(move || state.sales.top_products(limit))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    let body: Vec<TopProductResponse> = top.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /orders/admin/monthly-sales
#[utoipa::path(
    get,
    path = "/orders/admin/monthly-sales",
    responses(
        (status = 200, description = "Per-month sales, ascending by period", body = [MonthlySalesResponse]),
        (status = 403, description = "Caller is not an admin"),
    ),
    tag = "admin"
)]
pub async fn monthly_sales(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<HttpResponse, AppError> {
    principal.require_admin()?;
    let buckets = web::block(move || state.sales.monthly_sales())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    let body: Vec<MonthlySalesResponse> = buckets.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}
