use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod auth;
mod briefs;
mod health;
mod notifications;
mod settings;
mod team;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth routes
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/accept-invitation", post(auth::accept_invitation))
        // Briefs
        .route("/briefs", post(briefs::submit_brief))
        .route("/briefs/mine", get(briefs::my_briefs))
        .route("/briefs/:id/review", post(briefs::review_brief))
        // Admin dashboard
        .route("/team/members", get(team::list_members))
        .route("/team/briefs", get(briefs::team_briefs))
        .route("/team/briefs/stats", get(briefs::team_stats))
        // Invitations
        .route(
            "/team/invitations",
            get(team::list_invitations).post(team::create_invitation),
        )
        .route("/team/invitations/:id", delete(team::delete_invitation))
        // Reminders
        .route("/team/reminders", post(team::send_team_reminders))
        .route("/team/reminders/:member_id", post(team::send_member_reminder))
        // Workspace settings
        .route(
            "/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .route("/settings/reminder-test", post(settings::reminder_test))
        // Notifications
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route("/notifications/:id/read", post(notifications::mark_read))
        .route("/ws/notifications", get(notifications::ws_handler))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
