//! Authenticated CRUD endpoints. Each handler is generic over the resource
//! and is routed once per resource type.
//!
//! Create and update take a multipart body: a `fields` part holding the
//! JSON form payload and an optional `file` part with the selected image.

use crate::{
    errors::AppError,
    handlers::auth_handlers::RequireAdmin,
    models::{media::MediaAsset, resource::Resource},
    services::{notifier::Notification, pipeline::PipelineOutcome},
    state::{AppState, PipelineFor},
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use serde::{Serialize, de::DeserializeOwned};

/// Body returned by every successful mutation.
#[derive(Debug, Serialize)]
pub struct MutationResponse<T> {
    pub status: &'static str,
    #[serde(flatten)]
    pub outcome: PipelineOutcome<T>,
}

impl<T> From<PipelineOutcome<T>> for MutationResponse<T> {
    fn from(outcome: PipelineOutcome<T>) -> Self {
        Self {
            status: "succeeded",
            outcome,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub projects: i64,
    pub certificates: i64,
    pub skills: i64,
}

/// `POST /admin/{kind}`
pub async fn create_resource<T>(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    multipart: Multipart,
) -> Result<Json<MutationResponse<T>>, AppError>
where
    T: Resource,
    AppState: PipelineFor<T>,
{
    let (fields, file) = read_submission::<T::Fields>(multipart).await?;
    let outcome = state.pipeline().create(fields, file).await?;
    Ok(Json(outcome.into()))
}

/// `PUT /admin/{kind}/{id}`
pub async fn update_resource<T>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    _admin: RequireAdmin,
    multipart: Multipart,
) -> Result<Json<MutationResponse<T>>, AppError>
where
    T: Resource,
    AppState: PipelineFor<T>,
{
    let (fields, file) = read_submission::<T::Fields>(multipart).await?;
    let outcome = state.pipeline().update(id, fields, file).await?;
    Ok(Json(outcome.into()))
}

/// `DELETE /admin/{kind}/{id}`
pub async fn delete_resource<T>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    _admin: RequireAdmin,
) -> Result<Json<MutationResponse<T>>, AppError>
where
    T: Resource,
    AppState: PipelineFor<T>,
{
    let outcome = state.pipeline().delete(id).await?;
    Ok(Json(outcome.into()))
}

/// `GET /admin/{kind}/notification`: the current transient message, if any.
pub async fn current_notification<T>(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Json<Option<Notification>>
where
    T: Resource,
    AppState: PipelineFor<T>,
{
    Json(state.pipeline().notifier().current())
}

/// `GET /admin/dashboard`
pub async fn dashboard(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<DashboardStats>, AppError> {
    Ok(Json(DashboardStats {
        projects: state.projects.records().count().await?,
        certificates: state.certificates.records().count().await?,
        skills: state.skills.records().count().await?,
    }))
}

async fn read_submission<F: DeserializeOwned>(
    mut multipart: Multipart,
) -> Result<(F, Option<MediaAsset>), AppError> {
    let mut fields = None;
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(err.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "fields" => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(err.to_string()))?;
                let parsed = serde_json::from_str::<F>(&text)
                    .map_err(|err| AppError::bad_request(format!("invalid fields: {}", err)))?;
                fields = Some(parsed);
            }
            "file" => {
                let filename = field.file_name().map(str::to_string);
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::bad_request(err.to_string()))?;
                if !data.is_empty() {
                    let mut asset = MediaAsset::new(data, mime_type);
                    asset.filename = filename;
                    file = Some(asset);
                }
            }
            other => tracing::debug!("ignoring multipart field `{}`", other),
        }
    }

    let fields = fields.ok_or_else(|| AppError::bad_request("missing `fields` part"))?;
    Ok((fields, file))
}
