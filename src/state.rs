//! Shared application state injected into every handler.

use crate::{
    config::AppConfig,
    models::{certificate::Certificate, project::Project, resource::Resource, skill::Skill},
    services::{
        notifier::Notifier,
        object_storage::{LocalObjectStorage, ObjectStorage},
        pipeline::ResourcePipeline,
        session::{AdminCredentials, SessionStore},
    },
};
use axum::extract::FromRef;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<SqlitePool>,
    pub storage: LocalObjectStorage,
    pub sessions: SessionStore,
    pub projects: ResourcePipeline<Project>,
    pub certificates: ResourcePipeline<Certificate>,
    pub skills: ResourcePipeline<Skill>,
}

impl AppState {
    pub fn new(config: AppConfig, db: Arc<SqlitePool>) -> Self {
        let storage = LocalObjectStorage::new(
            db.clone(),
            config.storage_dir.clone(),
            config.public_base_url.clone(),
        );
        let shared: Arc<dyn ObjectStorage> = Arc::new(storage.clone());
        let ttl = config.notification_ttl;

        let credentials = match (&config.admin_email, &config.admin_password) {
            (Some(email), Some(password)) => Some(AdminCredentials {
                email: email.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        Self {
            projects: ResourcePipeline::new(db.clone(), shared.clone(), Notifier::new(ttl)),
            certificates: ResourcePipeline::new(db.clone(), shared.clone(), Notifier::new(ttl)),
            skills: ResourcePipeline::new(db.clone(), shared, Notifier::new(ttl)),
            sessions: SessionStore::new(credentials),
            storage,
            config: Arc::new(config),
            db,
        }
    }
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

/// Selects the pipeline for one resource type, so admin handlers can be
/// written once and routed per resource.
pub trait PipelineFor<T: Resource> {
    fn pipeline(&self) -> &ResourcePipeline<T>;
}

impl PipelineFor<Project> for AppState {
    fn pipeline(&self) -> &ResourcePipeline<Project> {
        &self.projects
    }
}

impl PipelineFor<Certificate> for AppState {
    fn pipeline(&self) -> &ResourcePipeline<Certificate> {
        &self.certificates
    }
}

impl PipelineFor<Skill> for AppState {
    fn pipeline(&self) -> &ResourcePipeline<Skill> {
        &self.skills
    }
}
