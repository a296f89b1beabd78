use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers;
use crate::AppState;

pub fn create_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/users", post(handlers::users::register))
        .route("/users/me", get(handlers::users::me))
        .route(
            "/tours",
            post(handlers::tours::create_tour).get(handlers::tours::list_tours),
        )
        .route("/tours/:id", get(handlers::tours::get_tour))
        .route("/plans", post(handlers::plans::create_plan))
        .route("/plans/:id", get(handlers::plans::get_plan))
        .route(
            "/tour-bookings",
            post(handlers::bookings::create_booking).get(handlers::bookings::list_bookings),
        )
        .route(
            "/tour-bookings/:id",
            get(handlers::bookings::get_booking)
                .patch(handlers::bookings::update_booking)
                .delete(handlers::bookings::cancel_booking),
        )
        .route(
            "/tour-bookings/:id/approve",
            post(handlers::bookings::approve_booking),
        )
        .route(
            "/tour-bookings/:id/reject",
            post(handlers::bookings::reject_booking),
        )
        .route(
            "/payments",
            post(handlers::payments::create_payment).get(handlers::payments::list_payments),
        )
        .route(
            "/payments/bulk-approve",
            post(handlers::payments::bulk_approve),
        )
        .route(
            "/payments/:id",
            get(handlers::payments::get_payment).delete(handlers::payments::delete_payment),
        )
        .route(
            "/payments/:id/approve",
            post(handlers::payments::approve_payment),
        )
        .route(
            "/payments/:id/reject",
            post(handlers::payments::reject_payment),
        )
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::{PgStore, ReceiptStore};

    // A conflicting route table panics when the router is built, so
    // constructing it is the whole test. The lazy pool never connects.
    #[tokio::test]
    async fn router_builds_with_the_full_route_table() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/voyago_test")
            .unwrap();

        let state = Arc::new(AppState {
            store: PgStore::new(pool),
            receipts: ReceiptStore::new("data/receipts"),
            config: Config {
                database_url: "postgres://localhost/voyago_test".into(),
                port: 0,
                receipt_store_root: "data/receipts".into(),
            },
        });

        let _router = create_routes(state);
    }
}
