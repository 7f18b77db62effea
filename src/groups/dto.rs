use serde::Deserialize;
use serde_json::Value;

use super::repo::{Group, NewGroup};
use crate::{
    error::{AppError, AppResult},
    serde_fmt::double_option,
};

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub course_title: Option<String>,
    pub course_description: Option<String>,
    pub default_teacher_name: Option<String>,
    pub capacity: Option<i32>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub schedule_json: Option<Value>,
}

fn default_active() -> bool {
    true
}

fn required_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }
    Ok(name.to_string())
}

fn check_capacity(capacity: Option<i32>) -> AppResult<()> {
    match capacity {
        Some(c) if c < 0 => Err(AppError::validation("capacity must not be negative")),
        _ => Ok(()),
    }
}

impl CreateGroupRequest {
    pub fn into_new_group(self) -> AppResult<NewGroup> {
        check_capacity(self.capacity)?;
        Ok(NewGroup {
            name: required_name(&self.name)?,
            course_title: self.course_title,
            course_description: self.course_description,
            default_teacher_name: self.default_teacher_name,
            capacity: self.capacity,
            is_active: self.is_active,
            schedule_json: self.schedule_json.unwrap_or_else(|| Value::Array(Vec::new())),
        })
    }
}

/// Partial update. Absent fields are kept; `null` clears a nullable field.
/// Schedule entries are stored as given; the generator skips malformed rules.
#[derive(Debug, Default, Deserialize)]
pub struct GroupPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub course_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub course_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub default_teacher_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub capacity: Option<Option<i32>>,
    pub is_active: Option<bool>,
    pub schedule_json: Option<Value>,
}

impl GroupPatch {
    pub fn apply(&self, current: &Group) -> AppResult<Group> {
        fn pick<T: Clone>(patch: &Option<Option<T>>, current: &Option<T>) -> Option<T> {
            match patch {
                Some(value) => value.clone(),
                None => current.clone(),
            }
        }
        let name = match &self.name {
            Some(raw) => required_name(raw)?,
            None => current.name.clone(),
        };
        let capacity = pick(&self.capacity, &current.capacity);
        check_capacity(capacity)?;
        Ok(Group {
            name,
            course_title: pick(&self.course_title, &current.course_title),
            course_description: pick(&self.course_description, &current.course_description),
            default_teacher_name: pick(&self.default_teacher_name, &current.default_teacher_name),
            capacity,
            is_active: self.is_active.unwrap_or(current.is_active),
            schedule_json: self
                .schedule_json
                .clone()
                .unwrap_or_else(|| current.schedule_json.clone()),
            ..current.clone()
        })
    }
}
