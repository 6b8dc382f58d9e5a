pub mod auth;
pub mod clock;
pub mod config;
pub mod coupons;
pub mod db;
pub mod error;
pub mod models;
pub mod offers;
pub mod reservations;
pub mod settings;
pub mod store;
pub mod sweeper;

use axum::{
    extract::FromRef,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use auth::TokenService;
use clock::Clock;
use coupons::CouponService;
use reservations::ReservationService;
use settings::PolicySource;
use store::Store;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        reservations::create_reservation_handler,
        reservations::list_reservations_handler,
        reservations::get_reservation_handler,
        reservations::purchase_reservation_handler,
        reservations::cancel_reservation_handler,
        coupons::list_coupons_handler,
        settings::get_policy_handler,
    ),
    components(
        schemas(
            reservations::CreateReservationRequest,
            reservations::ReservationView,
            reservations::ReservationStatus,
            reservations::PurchaseResponse,
            coupons::Coupon,
            coupons::CouponStatus,
            settings::Policy,
            error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "reservations", description = "Coupon holds, purchase and cancellation"),
        (name = "coupons", description = "Purchased coupons"),
        (name = "settings", description = "Platform policy")
    ),
    info(
        title = "Discount Marketplace API",
        version = "0.1.0",
        description = "Reservation and settlement core of the discount coupon marketplace"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub reservations: ReservationService,
    pub coupons: CouponService,
    pub policy: Arc<dyn PolicySource>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    /// Wire the services over one store, policy source and clock
    pub fn new(
        store: Arc<dyn Store>,
        policy: Arc<dyn PolicySource>,
        clock: Arc<dyn Clock>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            reservations: ReservationService::new(store.clone(), policy.clone(), clock),
            coupons: CouponService::new(store),
            policy,
            tokens,
        }
    }
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

/// Handler for GET /health
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS and tracing middleware
pub fn create_router(state: AppState) -> Router {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        // Reservation routes
        .route(
            "/api/reservations",
            post(reservations::create_reservation_handler)
                .get(reservations::list_reservations_handler),
        )
        .route("/api/reservations/:id", get(reservations::get_reservation_handler))
        .route(
            "/api/reservations/:id/purchase",
            post(reservations::purchase_reservation_handler),
        )
        .route(
            "/api/reservations/:id/cancel",
            post(reservations::cancel_reservation_handler),
        )
        // Coupon and policy routes
        .route("/api/coupons", get(coupons::list_coupons_handler))
        .route("/api/settings/policy", get(settings::get_policy_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
