// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // Availability is public so patients can browse before signing in.
    let public_routes = Router::new()
        .route("/available-slots", get(handlers::get_available_slots));

    // Everything that reads or mutates appointments requires a caller.
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/my-appointments", get(handlers::my_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/reschedule", put(handlers::reschedule_appointment))
        .route("/{appointment_id}/assign-service", post(handlers::assign_service))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
