use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/contests", contest_routes())
        .route(
            "/users/me/applications",
            get(handlers::application::list_my_applications),
        )
}

fn contest_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::contest::create_contest))
        .route(
            "/{id}",
            get(handlers::contest::get_contest).patch(handlers::contest::update_contest),
        )
        .route("/{id}/start", post(handlers::contest::start_contest))
        .route("/{id}/stop", post(handlers::contest::stop_contest))
        .route("/{id}/cancel", post(handlers::contest::cancel_contest))
        .nest("/{id}/applications", application_routes())
        .nest("/{id}/members", member_routes())
}

fn application_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::application::list_pending_applications)
                .post(handlers::application::request_participate)
                .delete(handlers::application::cancel_application),
        )
        .route(
            "/{user_id}/accept",
            post(handlers::application::accept_application),
        )
        .route(
            "/{user_id}/reject",
            post(handlers::application::reject_application),
        )
}

fn member_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::member::list_members))
        .route("/me", delete(handlers::member::withdraw_from_contest))
        .route("/{user_id}", patch(handlers::member::change_member_role))
}
