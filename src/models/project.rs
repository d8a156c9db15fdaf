//! Portfolio projects shown in the public project grid.

use super::resource::{
    FieldValue, Resource, ResourceKind, ValidationError, normalize_list, require,
    require_url_or_empty,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of the `projects` table.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: String,

    /// Technologies used, stored as a JSON array.
    #[sqlx(json)]
    pub technologies: Vec<String>,

    /// Public URL of the cover image, or empty.
    pub image: String,
    pub github_link: String,
    pub live_link: String,

    /// Manual position in the listing; lower comes first.
    #[sqlx(rename = "display_order")]
    #[serde(rename = "order")]
    pub order: i64,

    pub created_at: DateTime<Utc>,
}

/// Form payload for creating or editing a project.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct ProjectFields {
    pub title: String,
    #[serde(default)]
    pub description: String,

    /// Comma-separated list as typed by the admin.
    #[serde(default)]
    pub technologies: String,

    #[serde(default)]
    pub image: String,
    #[serde(default, alias = "githubLink")]
    pub github_link: String,
    #[serde(default, alias = "liveLink")]
    pub live_link: String,
    #[serde(default)]
    pub order: i64,
}

impl Resource for Project {
    type Fields = ProjectFields;

    const KIND: ResourceKind = ResourceKind::Project;

    fn id(&self) -> i64 {
        self.id
    }

    fn image_url(&self) -> &str {
        &self.image
    }

    fn validate(fields: &ProjectFields) -> Result<(), ValidationError> {
        require("title", &fields.title)?;
        require_url_or_empty("image", &fields.image)
    }

    fn image_field(fields: &ProjectFields) -> &str {
        &fields.image
    }

    fn set_image_field(fields: &mut ProjectFields, url: String) {
        fields.image = url;
    }

    fn columns(fields: &ProjectFields) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("title", FieldValue::Text(fields.title.clone())),
            ("description", FieldValue::Text(fields.description.clone())),
            (
                "technologies",
                FieldValue::List(normalize_list(&fields.technologies)),
            ),
            ("image", FieldValue::Text(fields.image.clone())),
            ("github_link", FieldValue::Text(fields.github_link.clone())),
            ("live_link", FieldValue::Text(fields.live_link.clone())),
            ("display_order", FieldValue::Integer(fields.order)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_camel_case_link_fields() {
        let fields: ProjectFields = serde_json::from_str(
            r#"{"title":"Quran Digital","technologies":"React, Tailwind","githubLink":"https://github.com/x/y"}"#,
        )
        .unwrap();
        assert_eq!(fields.github_link, "https://github.com/x/y");
        assert_eq!(fields.order, 0);
    }

    #[test]
    fn columns_split_technologies() {
        let fields = ProjectFields {
            title: "Juju News".into(),
            technologies: "React , DaisyUI".into(),
            ..Default::default()
        };
        let columns = Project::columns(&fields);
        let (_, technologies) = columns
            .iter()
            .find(|(name, _)| *name == "technologies")
            .unwrap();
        assert_eq!(
            technologies,
            &FieldValue::List(vec!["React".into(), "DaisyUI".into()])
        );
    }

    #[test]
    fn title_is_required() {
        let fields = ProjectFields {
            title: "  ".into(),
            ..Default::default()
        };
        assert_eq!(
            Project::validate(&fields),
            Err(ValidationError::Empty("title"))
        );
    }
}
