//! Defines routes for the public portfolio API and the admin panel.
//!
//! ## Structure
//! - **Public**
//!   - `GET /api/projects?page=N`, `GET /api/certificates`, `GET /api/skills`
//!   - `GET /media/{bucket}/{*key}`: public image URLs
//! - **Auth**
//!   - `POST /auth/sign-in`, `POST /auth/sign-out`
//! - **Admin** (bearer token required)
//!   - `GET /admin/dashboard`
//!   - `POST /admin/{kind}`, `PUT|DELETE /admin/{kind}/{id}`
//!   - `GET /admin/{kind}/notification`
//!
//! where `{kind}` is `projects`, `certificates` or `skills`.

use crate::{
    handlers::{
        admin_handlers::{
            create_resource, current_notification, dashboard, delete_resource, update_resource,
        },
        auth_handlers::{sign_in, sign_out},
        content_handlers::{list_certificates, list_projects, list_skills},
        health_handlers::{healthz, readyz},
        media_handlers::get_media,
    },
    models::{certificate::Certificate, project::Project, resource::Resource, skill::Skill},
    state::{AppState, PipelineFor},
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Build and return the router; handlers share `AppState`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/projects", get(list_projects))
        .route("/api/certificates", get(list_certificates))
        .route("/api/skills", get(list_skills))
        .route("/media/{bucket}/{*key}", get(get_media))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
        .route("/admin/dashboard", get(dashboard))
        .merge(admin_routes::<Project>())
        .merge(admin_routes::<Certificate>())
        .merge(admin_routes::<Skill>())
}

/// CRUD routes for one resource, mounted under `/admin/{table}`.
fn admin_routes<T>() -> Router<AppState>
where
    T: Resource,
    AppState: PipelineFor<T>,
{
    let base = format!("/admin/{}", T::KIND.table());
    Router::new()
        .route(&base, post(create_resource::<T>))
        .route(
            &format!("{}/{{id}}", base),
            put(update_resource::<T>).delete(delete_resource::<T>),
        )
        .route(
            &format!("{}/notification", base),
            get(current_notification::<T>),
        )
}
