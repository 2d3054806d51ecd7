//! Router construction for the lender server.

use std::sync::Arc;

use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Extension, Router,
};
use lender_core::LenderService;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::jwt::{jwt_auth, JwtConfig};

/// Build the full router. Everything except `/ping` requires a bearer token.
pub fn build_router(service: Arc<LenderService>, jwt_config: JwtConfig) -> Router {
    let protected = Router::new()
        // Staff
        .route("/users", get(handlers::users::list_users))
        .route("/users/auth", get(handlers::users::authenticated_user))
        .route("/users/:uid", get(handlers::users::get_user))
        // Customers
        .route(
            "/customers",
            post(handlers::customers::create_customer)
                .put(handlers::customers::update_customer)
                .get(handlers::customers::list_customers),
        )
        .route("/customers/:uid", get(handlers::customers::get_customer))
        .route(
            "/customers/:uid/contacts",
            get(handlers::customers::customer_contacts),
        )
        .route(
            "/customers/:uid/guarantors",
            get(handlers::customers::customer_guarantors),
        )
        .route(
            "/customers/:uid/referees",
            get(handlers::customers::customer_referees),
        )
        // Contacts
        .route(
            "/contacts",
            post(handlers::contacts::create_contact).put(handlers::contacts::update_contact),
        )
        .route("/contacts/:uid", get(handlers::contacts::get_contact))
        // Guarantors
        .route(
            "/guarantors",
            post(handlers::guarantors::create_guarantor)
                .put(handlers::guarantors::update_guarantor),
        )
        .route("/guarantors/:uid", get(handlers::guarantors::get_guarantor))
        // Referees
        .route(
            "/referees",
            post(handlers::referees::create_referee).put(handlers::referees::update_referee),
        )
        .route("/referees/:uid", get(handlers::referees::get_referee))
        // Interactions
        .route("/interactions", get(handlers::interactions::list_interactions))
        .layer(axum_mw::from_fn(jwt_auth))
        .layer(Extension(jwt_config));

    let public = Router::new().route("/ping", get(handlers::health::ping));

    public
        .merge(protected)
        .layer(Extension(service))
        .layer(TraceLayer::new_for_http())
}
