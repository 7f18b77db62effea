use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    jwt::JwtKeys,
    password::MIN_PASSWORD_LEN,
    repo::{NewParent, User},
};
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct RegisterParentRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub father_name: Option<String>,
    pub timezone: Option<String>,
    pub avatar_url: Option<String>,
}

/// Email or phone identifying an account.
#[derive(Debug, Default, Deserialize)]
pub struct Identity {
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(flatten)]
    pub identity: Identity,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub refresh_expires_in: u64,
}

impl TokenResponse {
    pub fn issue(keys: &JwtKeys, user_id: Uuid) -> anyhow::Result<Self> {
        Ok(Self {
            access_token: keys.sign_access(user_id)?,
            refresh_token: keys.sign_refresh(user_id)?,
            token_type: "bearer",
            expires_in: keys.access_ttl.as_secs(),
            refresh_expires_in: keys.refresh_ttl.as_secs(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CheckUserResponse {
    pub id: Uuid,
    pub user_type: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub father_name: Option<String>,
}

impl From<User> for CheckUserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            user_type: u.user_type,
            first_name: u.first_name,
            last_name: u.last_name,
            father_name: u.father_name,
        }
    }
}

/// Lowercased trimmed email, `None` when blank.
pub fn normalize_email(raw: Option<&str>) -> Option<String> {
    raw.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty())
}

pub fn normalize_phone(raw: Option<&str>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn blank_to_none(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Identity {
    pub fn normalized(&self) -> AppResult<(Option<String>, Option<String>)> {
        let email = normalize_email(self.email.as_deref());
        let phone = normalize_phone(self.phone.as_deref());
        if email.is_none() && phone.is_none() {
            return Err(AppError::validation("email or phone is required"));
        }
        Ok((email, phone))
    }
}

impl RegisterParentRequest {
    pub fn into_new_parent(self) -> AppResult<NewParent> {
        let (email, phone) = Identity {
            email: self.email,
            phone: self.phone,
        }
        .normalized()?;

        if let Some(email) = &email {
            if !super::services::is_valid_email(email) {
                return Err(AppError::validation("invalid email"));
            }
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        Ok(NewParent {
            email,
            phone,
            password: self.password,
            first_name: blank_to_none(self.first_name),
            last_name: blank_to_none(self.last_name),
            father_name: blank_to_none(self.father_name),
            timezone: blank_to_none(self.timezone),
            avatar_url: blank_to_none(self.avatar_url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;

    fn request(email: Option<&str>, phone: Option<&str>, password: &str) -> RegisterParentRequest {
        RegisterParentRequest {
            email: email.map(String::from),
            phone: phone.map(String::from),
            password: password.into(),
            first_name: Some("  Anna ".into()),
            last_name: Some("".into()),
            father_name: None,
            timezone: None,
            avatar_url: None,
        }
    }

    #[test]
    fn register_normalizes_contact_fields() {
        let parent = request(Some(" Parent@Example.COM "), Some("  "), "secret1")
            .into_new_parent()
            .unwrap();
        assert_eq!(parent.email.as_deref(), Some("parent@example.com"));
        assert_eq!(parent.phone, None);
        assert_eq!(parent.first_name.as_deref(), Some("Anna"));
        assert_eq!(parent.last_name, None);
    }

    #[test]
    fn register_accepts_phone_only() {
        let parent = request(None, Some("+43 660 1234567"), "secret1")
            .into_new_parent()
            .unwrap();
        assert_eq!(parent.phone.as_deref(), Some("+43 660 1234567"));
    }

    #[test]
    fn register_rejects_missing_contact_short_password_and_bad_email() {
        let err = request(None, None, "secret1").into_new_parent().unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let err = request(Some("a@b.at"), None, "12345").into_new_parent().unwrap_err();
        assert!(err.to_string().contains("at least 6"));

        let err = request(Some("not-an-email"), None, "secret1")
            .into_new_parent()
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid email");
    }

    #[test]
    fn login_body_flattens_identity() {
        let body: LoginRequest =
            serde_json::from_str(r#"{"phone":"+431","password":"pw"}"#).unwrap();
        assert_eq!(body.identity.phone.as_deref(), Some("+431"));
        assert!(body.identity.email.is_none());
    }

    #[test]
    fn token_response_shape() {
        let keys = JwtKeys::new(&JwtConfig {
            secret: "s".into(),
            issuer: "i".into(),
            audience: "a".into(),
            ttl_minutes: 30,
            refresh_ttl_minutes: 43_200,
        });
        let tokens = TokenResponse::issue(&keys, Uuid::new_v4()).unwrap();
        let json = serde_json::to_value(&tokens).unwrap();
        assert_eq!(json["token_type"], "bearer");
        assert_eq!(json["expires_in"], 1800);
        assert_eq!(json["refresh_expires_in"], 2_592_000);
        assert!(keys.verify_refresh(&tokens.refresh_token).is_ok());
    }
}
