pub mod application;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::cart_service::CartService;
use application::order_service::OrderService;
use application::sales_service::SalesService;
use infrastructure::cart_repo::DieselCartRepository;
use infrastructure::catalog::DieselProductCatalog;
use infrastructure::order_repo::DieselOrderRepository;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

/// The services handlers dispatch into, wired to their Diesel adapters.
pub struct AppState {
    pub cart: CartService<DieselCartRepository, DieselProductCatalog>,
    pub orders: OrderService<DieselOrderRepository>,
    pub sales: SalesService<DieselOrderRepository>,
}

impl AppState {
    pub fn new(pool: DbPool) -> Self {
        Self {
            cart: CartService::new(
                DieselCartRepository::new(pool.clone()),
                DieselProductCatalog::new(pool.clone()),
            ),
            orders: OrderService::new(DieselOrderRepository::new(pool.clone())),
            sales: SalesService::new(DieselOrderRepository::new(pool)),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::cart::get_cart,
        handlers::cart::add_item,
        handlers::cart::update_item,
        handlers::cart::remove_item,
        handlers::orders::place_order,
        handlers::orders::list_my_orders,
        handlers::admin::list_all_orders,
        handlers::admin::update_status,
        handlers::admin::total_sales,
        handlers::admin::top_products,
        handlers::admin::monthly_sales,
    ),
    components(schemas(
        handlers::cart::AddItemRequest,
        handlers::cart::UpdateItemRequest,
        handlers::cart::CartItemResponse,
        handlers::cart::ProductSnapshotResponse,
        handlers::orders::PlaceOrderRequest,
        handlers::orders::ShippingAddressDto,
        handlers::orders::OrderResponse,
        handlers::orders::OrderItemResponse,
        handlers::admin::UpdateStatusRequest,
        handlers::admin::TotalSalesResponse,
        handlers::admin::TopProductResponse,
        handlers::admin::MonthlySalesResponse,
    )),
    tags(
        (name = "cart", description = "Per-user shopping cart"),
        (name = "orders", description = "Order placement and history"),
        (name = "admin", description = "Privileged order management and sales reporting"),
    )
)]
struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let state = web::Data::new(AppState::new(pool));
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
            .service(
                web::scope("/cart")
                    .route("", web::get().to(handlers::cart::get_cart))
                    .route("", web::post().to(handlers::cart::add_item))
                    .route("/{item_id}", web::put().to(handlers::cart::update_item))
                    .route("/{item_id}", web::delete().to(handlers::cart::remove_item)),
            )
            .service(
                web::scope("/orders")
                    // Literal admin routes must register before the scope's
                    // own routes so "/orders/admin/..." never falls through.
                    .service(
                        web::scope("/admin")
                            .route("/all", web::get().to(handlers::admin::list_all_orders))
                            .route("/total-sales", web::get().to(handlers::admin::total_sales))
                            .route("/top-products", web::get().to(handlers::admin::top_products))
                            .route(
                                "/monthly-sales",
                                web::get().to(handlers::admin::monthly_sales),
                            )
                            .route("/{id}", web::put().to(handlers::admin::update_status)),
                    )
                    .route("", web::post().to(handlers::orders::place_order))
                    .route("", web::get().to(handlers::orders::list_my_orders)),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
