//! Certificates earned from courses and providers.

use super::resource::{
    FieldValue, Resource, ResourceKind, ValidationError, normalize_list, require,
    require_url_or_empty,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of the `certificates` table.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Certificate {
    pub id: i64,
    pub title: String,
    pub provider: String,

    /// Issue date as entered (e.g. `2023-09-14`).
    pub date: String,
    pub image: String,
    pub description: String,

    #[sqlx(json)]
    pub skills: Vec<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct CertificateFields {
    pub title: String,
    #[serde(default)]
    pub provider: String,
    pub date: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,

    /// Comma-separated list as typed by the admin.
    #[serde(default)]
    pub skills: String,
}

impl Resource for Certificate {
    type Fields = CertificateFields;

    const KIND: ResourceKind = ResourceKind::Certificate;

    fn id(&self) -> i64 {
        self.id
    }

    fn image_url(&self) -> &str {
        &self.image
    }

    fn validate(fields: &CertificateFields) -> Result<(), ValidationError> {
        require("title", &fields.title)?;
        require("date", &fields.date)?;
        require_url_or_empty("image", &fields.image)
    }

    fn image_field(fields: &CertificateFields) -> &str {
        &fields.image
    }

    fn set_image_field(fields: &mut CertificateFields, url: String) {
        fields.image = url;
    }

    fn columns(fields: &CertificateFields) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("title", FieldValue::Text(fields.title.clone())),
            ("provider", FieldValue::Text(fields.provider.clone())),
            ("date", FieldValue::Text(fields.date.clone())),
            ("image", FieldValue::Text(fields.image.clone())),
            ("description", FieldValue::Text(fields.description.clone())),
            ("skills", FieldValue::List(normalize_list(&fields.skills))),
        ]
    }
}
