//! Skills, shown grouped by category with their icon.

use super::resource::{
    FieldValue, Resource, ResourceKind, ValidationError, require, require_url_or_empty,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of the `skills` table.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Skill {
    pub id: i64,
    pub name: String,
    /// Public URL of the icon, or empty.
    pub icon: String,
    /// Free-form grouping such as `frontend`, `backend` or `mobile`.
    pub category: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct SkillFields {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "frontend".to_string()
}

impl Resource for Skill {
    type Fields = SkillFields;

    const KIND: ResourceKind = ResourceKind::Skill;

    fn id(&self) -> i64 {
        self.id
    }

    fn image_url(&self) -> &str {
        &self.icon
    }

    fn validate(fields: &SkillFields) -> Result<(), ValidationError> {
        require("name", &fields.name)?;
        require("category", &fields.category)?;
        require_url_or_empty("icon", &fields.icon)
    }

    fn image_field(fields: &SkillFields) -> &str {
        &fields.icon
    }

    fn set_image_field(fields: &mut SkillFields, url: String) {
        fields.icon = url;
    }

    fn columns(fields: &SkillFields) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("name", FieldValue::Text(fields.name.clone())),
            ("icon", FieldValue::Text(fields.icon.clone())),
            ("category", FieldValue::Text(fields.category.clone())),
        ]
    }
}

/// Skills of one category, in listing order.
#[derive(Serialize, Clone, Debug)]
pub struct SkillGroup {
    pub category: String,
    pub skills: Vec<Skill>,
}

/// Group skills by category, keeping first-seen category order and the
/// listing order inside each group.
pub fn group_by_category(skills: Vec<Skill>) -> Vec<SkillGroup> {
    let mut groups: Vec<SkillGroup> = Vec::new();
    for skill in skills {
        match groups.iter_mut().find(|g| g.category == skill.category) {
            Some(group) => group.skills.push(skill),
            None => groups.push(SkillGroup {
                category: skill.category.clone(),
                skills: vec![skill],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(id: i64, name: &str, category: &str) -> Skill {
        Skill {
            id,
            name: name.into(),
            icon: String::new(),
            category: category.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn category_defaults_to_frontend() {
        let fields: SkillFields = serde_json::from_str(r#"{"name":"HTML"}"#).unwrap();
        assert_eq!(fields.category, "frontend");
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let groups = group_by_category(vec![
            skill(1, "HTML", "frontend"),
            skill(2, "PHP", "backend"),
            skill(3, "CSS", "frontend"),
            skill(4, "Expo", "mobile"),
        ]);
        let categories: Vec<_> = groups.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(categories, vec!["frontend", "backend", "mobile"]);
        let frontend: Vec<_> = groups[0].skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(frontend, vec!["HTML", "CSS"]);
    }
}
