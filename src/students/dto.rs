use serde::Deserialize;
use time::Date;
use uuid::Uuid;

use super::repo::NewStudent;
use crate::{
    error::{AppError, AppResult},
    serde_fmt,
};

#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    pub group_id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub father_name: Option<String>,
    #[serde(default, with = "serde_fmt::option_date")]
    pub birthdate: Option<Date>,
    pub school_class: Option<String>,
    pub group_number: Option<String>,
}

impl CreateStudentRequest {
    /// The caller registering the child becomes its parent.
    pub fn into_new_student(self, parent_user_id: Uuid) -> AppResult<NewStudent> {
        let first_name = self.first_name.trim().to_string();
        if first_name.is_empty() {
            return Err(AppError::validation("first_name must not be empty"));
        }
        Ok(NewStudent {
            parent_user_id,
            group_id: self.group_id,
            first_name,
            last_name: self.last_name,
            father_name: self.father_name,
            birthdate: self.birthdate,
            school_class: self.school_class,
            group_number: self.group_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::date;

    #[test]
    fn create_binds_caller_as_parent() {
        let group_id = Uuid::new_v4();
        let parent = Uuid::new_v4();
        let req: CreateStudentRequest = serde_json::from_value(json!({
            "group_id": group_id,
            "first_name": " Lena ",
            "birthdate": "2015-03-09",
            "school_class": "5B"
        }))
        .unwrap();
        let new = req.into_new_student(parent).unwrap();
        assert_eq!(new.parent_user_id, parent);
        assert_eq!(new.group_id, group_id);
        assert_eq!(new.first_name, "Lena");
        assert_eq!(new.birthdate, Some(date!(2015 - 03 - 09)));
        assert_eq!(new.school_class.as_deref(), Some("5B"));
        assert_eq!(new.group_number, None);
    }

    #[test]
    fn blank_first_name_is_rejected() {
        let req: CreateStudentRequest = serde_json::from_value(json!({
            "group_id": Uuid::new_v4(),
            "first_name": "  "
        }))
        .unwrap();
        assert_eq!(
            req.into_new_student(Uuid::new_v4()).unwrap_err().code(),
            "VALIDATION_ERROR"
        );
    }
}
