use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{Material, NewMaterial};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialType {
    #[default]
    Lecture,
    File,
    Link,
}

impl MaterialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialType::Lecture => "lecture",
            MaterialType::File => "file",
            MaterialType::Link => "link",
        }
    }

    pub fn needs_link(&self) -> bool {
        matches!(self, MaterialType::File | MaterialType::Link)
    }
}

/// `?group_id=&limit=&cursor=`; the group is mandatory.
#[derive(Debug, Default, Deserialize)]
pub struct MaterialsQuery {
    pub group_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

impl MaterialsQuery {
    pub fn required_group(&self) -> AppResult<Uuid> {
        self.group_id
            .ok_or_else(|| AppError::bad_request("GROUP_ID_REQUIRED", "group_id is required"))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMaterialRequest {
    pub group_id: Uuid,
    pub title: String,
    pub body_text: Option<String>,
    #[serde(default, rename = "type")]
    pub material_type: MaterialType,
    pub link_url: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

impl CreateMaterialRequest {
    pub fn into_new_material(self) -> AppResult<NewMaterial> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::validation("title must not be empty"));
        }
        let link_url = self
            .link_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        if self.material_type.needs_link() && link_url.is_none() {
            return Err(AppError::validation(format!(
                "link_url is required for {} materials",
                self.material_type.as_str()
            )));
        }
        Ok(NewMaterial {
            group_id: self.group_id,
            title,
            body_text: self.body_text,
            material_type: self.material_type.as_str(),
            link_url,
            is_published: self.is_published,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct MaterialShort {
    pub id: Uuid,
    pub group_id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub material_type: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Material> for MaterialShort {
    fn from(m: Material) -> Self {
        Self {
            id: m.id,
            group_id: m.group_id,
            title: m.title,
            material_type: m.material_type,
            created_at: m.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: serde_json::Value) -> CreateMaterialRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn lecture_is_default_and_needs_no_link() {
        let new = parse(json!({"group_id": Uuid::new_v4(), "title": "Fractions"}))
            .into_new_material()
            .unwrap();
        assert_eq!(new.material_type, "lecture");
        assert!(!new.is_published);
        assert_eq!(new.link_url, None);
    }

    #[test]
    fn link_and_file_require_link_url() {
        for kind in ["link", "file"] {
            let err = parse(json!({"group_id": Uuid::new_v4(), "title": "Slides", "type": kind}))
                .into_new_material()
                .unwrap_err();
            assert_eq!(err.code(), "VALIDATION_ERROR");
        }

        let new = parse(json!({
            "group_id": Uuid::new_v4(),
            "title": "Slides",
            "type": "link",
            "link_url": "https://example.com/slides"
        }))
        .into_new_material()
        .unwrap();
        assert_eq!(new.material_type, "link");
    }

    #[test]
    fn missing_group_id_has_its_own_code() {
        let err = MaterialsQuery::default().required_group().unwrap_err();
        assert_eq!(err.code(), "GROUP_ID_REQUIRED");
    }
}
