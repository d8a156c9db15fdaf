//! Public, read-only listings consumed by the portfolio page.

use crate::{
    errors::AppError,
    models::{
        certificate::Certificate,
        project::Project,
        skill::{Skill, SkillGroup, group_by_category},
    },
    services::records::{Filter, Page, total_pages},
    state::AppState,
};
use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ProjectsQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SkillsQuery {
    pub category: Option<String>,
    #[serde(default)]
    pub grouped: bool,
}

/// `GET /api/projects?page=N`: one page, 1-based; pages outside
/// `[1, total_pages]` are rejected before the page query runs.
pub async fn list_projects(
    State(state): State<AppState>,
    Query(q): Query<ProjectsQuery>,
) -> Result<Json<Page<Project>>, AppError> {
    let records = state.projects.records();
    let per_page = state.config.projects_per_page;
    let page = q.page.unwrap_or(1);

    let pages = total_pages(records.count().await?, per_page);
    if page < 1 || page > pages {
        return Err(AppError::bad_request(format!(
            "page {} is out of range 1..={}",
            page, pages
        )));
    }

    Ok(Json(records.list_page(page, per_page).await?))
}

/// `GET /api/certificates`: newest first.
pub async fn list_certificates(
    State(state): State<AppState>,
) -> Result<Json<Vec<Certificate>>, AppError> {
    Ok(Json(state.certificates.records().list(None).await?))
}

/// `GET /api/skills[?category=..][&grouped=true]`: oldest first.
pub async fn list_skills(
    State(state): State<AppState>,
    Query(q): Query<SkillsQuery>,
) -> Result<Response, AppError> {
    let filter = q.category.map(|value| Filter {
        column: "category",
        value,
    });
    let skills: Vec<Skill> = state.skills.records().list(filter.as_ref()).await?;

    if q.grouped {
        let groups: Vec<SkillGroup> = group_by_category(skills);
        Ok(Json(groups).into_response())
    } else {
        Ok(Json(skills).into_response())
    }
}
