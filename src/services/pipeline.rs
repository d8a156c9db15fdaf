//! Orchestrates compress → upload → persist for create/update and
//! reclaim → delete for deletions, one generic pipeline per resource.
//!
//! Stages run strictly one after another. The first failing stage ends the
//! run in [`PipelineState::Failed`]; nothing is retried. While a run is in
//! flight the pipeline rejects further invocations with
//! [`PipelineError::Busy`] before any I/O happens.

use crate::{
    models::{
        media::MediaAsset,
        resource::{Resource, ResourceKind, ValidationError},
    },
    services::{
        compressor::{self, CompressionError, CompressionPolicy},
        notifier::{NotificationKind, Notifier},
        object_storage::ObjectStorage,
        reclaimer::{ReclaimError, Reclaimer},
        records::{PersistenceError, RecordStore},
        uploader::{UploadError, Uploader},
    },
};
use serde::Serialize;
use sqlx::SqlitePool;
use std::{
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    fn past_tense(&self) -> &'static str {
        match self {
            Operation::Create => "added",
            Operation::Update => "updated",
            Operation::Delete => "deleted",
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            Operation::Create => "add",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Validating,
    Compressing,
    Uploading,
    Reclaiming,
    Persisting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PipelineState {
    Idle,
    Validating,
    Compressing,
    Uploading,
    Reclaiming,
    Persisting,
    Succeeded,
    Failed { stage: Stage, error: String },
}

impl From<Stage> for PipelineState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Validating => PipelineState::Validating,
            Stage::Compressing => PipelineState::Compressing,
            Stage::Uploading => PipelineState::Uploading,
            Stage::Reclaiming => PipelineState::Reclaiming,
            Stage::Persisting => PipelineState::Persisting,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("another {0} operation is already in progress")]
    Busy(ResourceKind),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{kind} {id} not found")]
    NotFound { kind: ResourceKind, id: i64 },
    #[error(transparent)]
    Compression(#[from] CompressionError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Reclaim(#[from] ReclaimError),
}

/// Terminal result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome<T> {
    pub operation: Operation,
    /// The stored record after create/update; `None` for delete.
    pub record: Option<T>,
    /// The whole collection, re-listed after the mutation.
    pub items: Vec<T>,
}

#[derive(Debug)]
struct RunLog {
    transitions: Vec<PipelineState>,
}

/// Tracks the stage of the run in progress and mirrors every transition
/// into the pipeline's shared log.
struct Run {
    log: Arc<Mutex<RunLog>>,
    kind: ResourceKind,
    operation: Operation,
    stage: Stage,
}

impl Run {
    fn start(log: Arc<Mutex<RunLog>>, kind: ResourceKind, operation: Operation) -> Self {
        if let Ok(mut log) = log.lock() {
            log.transitions = vec![PipelineState::Idle];
        }
        Self {
            log,
            kind,
            operation,
            stage: Stage::Validating,
        }
    }

    fn record(&self, state: PipelineState) {
        debug!("{} {}: {:?}", self.kind, self.operation, state);
        if let Ok(mut log) = self.log.lock() {
            log.transitions.push(state);
        }
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        self.record(stage.into());
    }

    fn succeed(&self) {
        self.record(PipelineState::Succeeded);
    }

    fn fail(&self, error: &PipelineError) {
        self.record(PipelineState::Failed {
            stage: self.stage,
            error: error.to_string(),
        });
    }
}

/// Clears the in-flight flag when the run ends, however it ends.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ResourcePipeline<T: Resource> {
    records: RecordStore<T>,
    uploader: Uploader,
    reclaimer: Reclaimer,
    policy: CompressionPolicy,
    notifier: Notifier,
    in_flight: Arc<AtomicBool>,
    log: Arc<Mutex<RunLog>>,
}

impl<T: Resource> Clone for ResourcePipeline<T> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
            uploader: self.uploader.clone(),
            reclaimer: self.reclaimer.clone(),
            policy: self.policy,
            notifier: self.notifier.clone(),
            in_flight: self.in_flight.clone(),
            log: self.log.clone(),
        }
    }
}

impl<T: Resource> ResourcePipeline<T> {
    pub fn new(db: Arc<SqlitePool>, storage: Arc<dyn ObjectStorage>, notifier: Notifier) -> Self {
        Self {
            records: RecordStore::new(db),
            uploader: Uploader::new(storage.clone()),
            reclaimer: Reclaimer::new(storage),
            policy: CompressionPolicy::for_kind(T::KIND),
            notifier,
            in_flight: Arc::new(AtomicBool::new(false)),
            log: Arc::new(Mutex::new(RunLog {
                transitions: vec![PipelineState::Idle],
            })),
        }
    }

    pub fn with_policy(mut self, policy: CompressionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn records(&self) -> &RecordStore<T> {
        &self.records
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// State the most recent run is in (or ended in).
    pub fn status(&self) -> PipelineState {
        self.transitions()
            .pop()
            .unwrap_or(PipelineState::Idle)
    }

    /// Every state the most recent run passed through, starting at `Idle`.
    pub fn transitions(&self) -> Vec<PipelineState> {
        self.log
            .lock()
            .map(|log| log.transitions.clone())
            .unwrap_or_default()
    }

    fn begin(&self) -> Result<InFlight, PipelineError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(self.in_flight.clone()))
            .map_err(|_| PipelineError::Busy(T::KIND))
    }

    /// Validate, optionally compress and upload `file`, then insert the row.
    ///
    /// Without a file the image URL already in `fields` is stored as is.
    pub async fn create(
        &self,
        fields: T::Fields,
        file: Option<MediaAsset>,
    ) -> Result<PipelineOutcome<T>, PipelineError> {
        let _in_flight = self.begin()?;
        let mut run = Run::start(self.log.clone(), T::KIND, Operation::Create);
        let result = self.run_create(&mut run, fields, file).await;
        self.finish(run, result.map(Some)).await
    }

    /// Like [`create`](Self::create) but overwrites row `id`. When a new file
    /// replaces an existing image, the old object is reclaimed after the row
    /// is saved.
    pub async fn update(
        &self,
        id: i64,
        fields: T::Fields,
        file: Option<MediaAsset>,
    ) -> Result<PipelineOutcome<T>, PipelineError> {
        let _in_flight = self.begin()?;
        let mut run = Run::start(self.log.clone(), T::KIND, Operation::Update);
        let result = self.run_update(&mut run, id, fields, file).await;
        self.finish(run, result.map(Some)).await
    }

    /// Reclaim the record's stored image, then delete the row. A failed
    /// reclaim leaves the row in place.
    pub async fn delete(&self, id: i64) -> Result<PipelineOutcome<T>, PipelineError> {
        let _in_flight = self.begin()?;
        let mut run = Run::start(self.log.clone(), T::KIND, Operation::Delete);
        let result = self.run_delete(&mut run, id).await;
        self.finish(run, result.map(|_| None)).await
    }

    async fn run_create(
        &self,
        run: &mut Run,
        mut fields: T::Fields,
        file: Option<MediaAsset>,
    ) -> Result<T, PipelineError> {
        run.enter(Stage::Validating);
        T::validate(&fields)?;

        let uploaded = match file {
            Some(asset) => Some(self.ingest(run, &mut fields, &asset).await?),
            None => None,
        };

        run.enter(Stage::Persisting);
        match self.records.create(&fields).await {
            Ok(record) => Ok(record),
            Err(err) => {
                if let Some(url) = uploaded {
                    self.discard_upload(&url).await;
                }
                Err(err.into())
            }
        }
    }

    async fn run_update(
        &self,
        run: &mut Run,
        id: i64,
        mut fields: T::Fields,
        file: Option<MediaAsset>,
    ) -> Result<T, PipelineError> {
        run.enter(Stage::Validating);
        T::validate(&fields)?;
        let existing = self
            .records
            .find(id)
            .await?
            .ok_or(PipelineError::NotFound { kind: T::KIND, id })?;

        let uploaded = match file {
            Some(asset) => Some(self.ingest(run, &mut fields, &asset).await?),
            None => None,
        };

        run.enter(Stage::Persisting);
        let saved = match self.records.update(id, &fields).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(PipelineError::NotFound { kind: T::KIND, id }),
            Err(err) => Err(err.into()),
        };
        let record = match saved {
            Ok(record) => record,
            Err(err) => {
                if let Some(url) = uploaded {
                    self.discard_upload(&url).await;
                }
                return Err(err);
            }
        };

        let previous = existing.image_url();
        if uploaded.is_some() && !previous.is_empty() && previous != record.image_url() {
            self.discard_upload(previous).await;
        }
        Ok(record)
    }

    async fn run_delete(&self, run: &mut Run, id: i64) -> Result<(), PipelineError> {
        run.enter(Stage::Validating);
        let record = self
            .records
            .find(id)
            .await?
            .ok_or(PipelineError::NotFound { kind: T::KIND, id })?;

        run.enter(Stage::Reclaiming);
        self.reclaimer
            .reclaim(T::KIND.bucket(), record.image_url())
            .await?;

        run.enter(Stage::Persisting);
        if !self.records.delete(id).await? {
            debug!("{} {} was already gone", T::KIND, id);
        }
        Ok(())
    }

    /// Compress and upload `asset`, pointing the image field at the result.
    async fn ingest(
        &self,
        run: &mut Run,
        fields: &mut T::Fields,
        asset: &MediaAsset,
    ) -> Result<String, PipelineError> {
        run.enter(Stage::Compressing);
        let compressed = compressor::compress(asset, &self.policy).await?;

        run.enter(Stage::Uploading);
        let stored = self
            .uploader
            .upload(&compressed, T::KIND.bucket(), &asset.extension())
            .await?;

        T::set_image_field(fields, stored.public_url.clone());
        Ok(stored.public_url)
    }

    /// Best-effort removal of an object no record points at any more.
    async fn discard_upload(&self, url: &str) {
        if let Err(err) = self.reclaimer.reclaim(T::KIND.bucket(), url).await {
            warn!("leaving orphaned object behind: {}", err);
        }
    }

    async fn finish(
        &self,
        run: Run,
        result: Result<Option<T>, PipelineError>,
    ) -> Result<PipelineOutcome<T>, PipelineError> {
        let operation = run.operation;
        match result {
            Ok(record) => {
                run.succeed();
                info!("{} {} succeeded", T::KIND, operation);
                self.notifier.notify(
                    NotificationKind::Success,
                    format!("{} {}", capitalize(T::KIND.label()), operation.past_tense()),
                );

                let items = match self.records.list(None).await {
                    Ok(items) => items,
                    Err(err) => {
                        warn!("refreshing {} listing failed: {}", T::KIND, err);
                        Vec::new()
                    }
                };
                Ok(PipelineOutcome {
                    operation,
                    record,
                    items,
                })
            }
            Err(err) => {
                run.fail(&err);
                warn!("{} {} failed at {:?}: {}", T::KIND, operation, run.stage, err);
                self.notifier.notify(
                    NotificationKind::Error,
                    format!("Failed to {} {}: {}", operation.verb(), T::KIND, err),
                );
                Err(err)
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
