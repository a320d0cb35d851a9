//! Route definitions for the Harvest Hub API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Protected routes - profiles and directory
        .nest("/users", user_routes(state))
        .route(
            "/directory/:role",
            get(handlers::get_directory).route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Protected routes - factory/HHM invitations
        .nest("/invitations", invitation_routes(state))
        // Protected routes - farmer/HHM contracts
        .nest("/contracts", contract_routes(state))
        // Listings: browse is public, changes are protected
        .nest("/listings", listing_routes(state))
        // Protected routes - orders
        .nest("/orders", order_routes(state))
        // Protected routes - schedules and applications
        .nest("/schedules", schedule_routes(state))
        .nest("/applications", application_routes(state))
        // Protected routes - notifications
        .nest("/notifications", notification_routes(state))
        .route(
            "/dashboard",
            get(handlers::get_dashboard).route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(handlers::signup))
        .route("/register", post(handlers::signup))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
}

/// Profile routes (protected)
fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::get_me).put(handlers::update_me))
        .route("/:user_id", get(handlers::get_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Invitation routes (protected)
fn invitation_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_invitations).post(handlers::create_invitation),
        )
        .route("/associations", get(handlers::list_associations))
        .route(
            "/:invitation_id",
            get(handlers::get_invitation).delete(handlers::withdraw_invitation),
        )
        .route("/:invitation_id/respond", put(handlers::respond_invitation))
        .route("/:invitation_id/resend", post(handlers::resend_invitation))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Contract routes (protected)
fn contract_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_contracts).post(handlers::create_contract),
        )
        .route("/:contract_id", get(handlers::get_contract))
        .route("/:contract_id/respond", put(handlers::respond_contract))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Listing routes
fn listing_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(handlers::list_listings))
        .route("/:listing_id", get(handlers::get_listing));

    let protected = Router::new()
        .route("/", post(handlers::create_listing))
        .route("/mine", get(handlers::my_listings))
        .route(
            "/:listing_id",
            put(handlers::update_listing).delete(handlers::delete_listing),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    public.merge(protected)
}

/// Order routes (protected)
fn order_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_order))
        .route("/sent", get(handlers::sent_orders))
        .route("/received", get(handlers::received_orders))
        .route("/received/export", get(handlers::export_received_orders))
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/respond", put(handlers::respond_order))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Schedule routes (protected)
fn schedule_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_schedules).post(handlers::create_schedule),
        )
        .route("/mine", get(handlers::my_schedules))
        .route("/:schedule_id/close", put(handlers::close_schedule))
        .route(
            "/:schedule_id/applications",
            get(handlers::schedule_applications).post(handlers::apply_to_schedule),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Application routes (protected)
fn application_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/mine", get(handlers::my_applications))
        .route("/:application_id/respond", put(handlers::respond_application))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Notification routes (protected)
fn notification_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_notifications))
        .route("/unread-count", get(handlers::get_unread_count))
        .route("/read-all", put(handlers::mark_all_as_read))
        .route("/:notification_id/read", put(handlers::mark_as_read))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}
