use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{dashboard, events, health_check, registrations, users};
use crate::state::AppState;

fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(events::list_events).post(events::create_event))
        .route("/search", get(events::search_events))
        .route("/categories", get(events::list_categories))
        .route("/category/:category", get(events::list_events_by_category))
        .route("/organizer/:organizer_id", get(events::list_events_by_organizer))
        .route(
            "/:event_id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/:event_id/status", patch(events::update_event_status))
}

fn registration_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(registrations::register))
        .route("/me", get(registrations::my_registrations))
        .route("/me/confirmed", get(registrations::my_confirmed_registrations))
        .route(
            "/me/confirmed-with-events",
            get(registrations::my_confirmed_with_events),
        )
        .route(
            "/me/active-with-events",
            get(registrations::my_active_with_events),
        )
        .route("/me/events", get(registrations::my_events))
        .route("/event/:event_id", get(registrations::event_registrations))
        .route(
            "/:registration_id",
            put(registrations::update_registration).delete(registrations::cancel_registration),
        )
        .route(
            "/:registration_id/attendance",
            patch(registrations::mark_attendance),
        )
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users))
        .route("/me", get(users::my_profile))
        .route(
            "/:user_id",
            get(users::get_user).delete(users::deactivate_user),
        )
}

pub fn create_routes(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/dashboard/attendee", get(dashboard::attendee_dashboard))
        .nest("/api/events", event_routes())
        .nest("/api/registrations", registration_routes())
        .nest("/api/users", user_routes())
        .with_state(state);

    create_security_headers_layer()
        .apply(router)
        .layer(create_cors_layer())
        .layer(TraceLayer::new_for_http())
}
