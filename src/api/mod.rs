/// API routes and handlers, mounted under `/api/v1`
pub mod admin;
pub mod attendance;
pub mod auth;
pub mod batches;
pub mod dsu;
pub mod interns;
pub mod mentors;
pub mod middleware;
pub mod projects;
pub mod pto;
pub mod tasks;
pub mod users;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(admin::routes())
        .merge(interns::routes())
        .merge(dsu::routes())
        .merge(tasks::routes())
        .merge(pto::routes())
        .merge(batches::routes())
        .merge(projects::routes())
        .merge(mentors::routes())
        .merge(attendance::routes())
}
