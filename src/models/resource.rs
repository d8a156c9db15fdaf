//! The shape shared by every content record the admin can manage.
//!
//! Projects, certificates and skills differ only in their columns, their
//! validation rules, and how listings are ordered. [`Resource`] captures
//! those differences so that the synchronizer and the pipeline are written
//! once and instantiated per entity.

use super::bucket::Bucket;
use serde::{Serialize, de::DeserializeOwned};
use sqlx::{FromRow, sqlite::SqliteRow};
use std::fmt::{self, Debug};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Project,
    Certificate,
    Skill,
}

impl ResourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Project => "project",
            ResourceKind::Certificate => "certificate",
            ResourceKind::Skill => "skill",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            ResourceKind::Project => "projects",
            ResourceKind::Certificate => "certificates",
            ResourceKind::Skill => "skills",
        }
    }

    pub fn bucket(&self) -> Bucket {
        match self {
            ResourceKind::Project => Bucket::ProjectImages,
            ResourceKind::Certificate => Bucket::CertificateImages,
            ResourceKind::Skill => Bucket::SkillIcons,
        }
    }

    /// Column holding the public URL of the record's image.
    pub fn image_column(&self) -> &'static str {
        match self {
            ResourceKind::Skill => "icon",
            _ => "image",
        }
    }

    /// ORDER BY clause for listings.
    ///
    /// Projects honour the manual `display_order` first and fall back to
    /// newest-first. Certificates are newest-first, skills oldest-first.
    /// `id` breaks ties between rows created within the same instant.
    pub fn order_by(&self) -> &'static str {
        match self {
            ResourceKind::Project => "display_order ASC, created_at DESC, id DESC",
            ResourceKind::Certificate => "created_at DESC, id DESC",
            ResourceKind::Skill => "created_at ASC, id ASC",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single bindable column value produced from a fields payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    /// Stored as a JSON array.
    List(Vec<String>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("`{0}` must not be empty")]
    Empty(&'static str),
    #[error("`{field}` is not a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },
}

/// A content record persisted in its own table and shown on the public page.
pub trait Resource:
    for<'r> FromRow<'r, SqliteRow> + Serialize + Clone + Debug + Send + Sync + Unpin + 'static
{
    /// Payload submitted by the admin form for create and update.
    type Fields: DeserializeOwned + Clone + Debug + Send + Sync + 'static;

    const KIND: ResourceKind;

    fn id(&self) -> i64;

    /// Stored image/icon URL, empty when the record has none.
    fn image_url(&self) -> &str;

    fn validate(fields: &Self::Fields) -> Result<(), ValidationError>;

    fn image_field(fields: &Self::Fields) -> &str;

    fn set_image_field(fields: &mut Self::Fields, url: String);

    /// Column/value pairs written on insert and update, image column included.
    fn columns(fields: &Self::Fields) -> Vec<(&'static str, FieldValue)>;
}

/// Split a comma-separated free-text list and trim each element.
///
/// Empty elements are kept, so `""` becomes `[""]`.
pub fn normalize_list(input: &str) -> Vec<String> {
    input.split(',').map(|item| item.trim().to_string()).collect()
}

/// Reject blank required text fields.
pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Empty(field))
    } else {
        Ok(())
    }
}

/// An image field may be empty; otherwise it must be an absolute http(s) URL.
pub fn require_url_or_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || is_http_url(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        })
    }
}

fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or("");
            !host.is_empty() && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
