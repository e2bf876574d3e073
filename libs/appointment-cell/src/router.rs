use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::SlotService;

pub fn appointment_routes(config: Arc<AppConfig>, slots: Arc<SlotService>) -> Router {
    // Every route needs a principal; role checks happen in the handlers
    let protected_routes = Router::new()
        .route("/available", get(handlers::available_slots))
        .route("/slots", post(handlers::create_slots))
        .route("/slots/mine", get(handlers::list_my_slots))
        .route("/bookings/mine", get(handlers::list_my_bookings))
        .route(
            "/slots/{slot_id}",
            get(handlers::get_slot)
                .patch(handlers::update_slot)
                .delete(handlers::delete_slot),
        )
        .route("/slots/{slot_id}/book", post(handlers::book_slot))
        .route("/slots/{slot_id}/cancel", post(handlers::cancel_slot))
        .route(
            "/slots/{slot_id}/reserve",
            post(handlers::reserve_slot).delete(handlers::release_reservation),
        )
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(slots)
}
