use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, warn};

use super::{
    dto::{CheckUserResponse, Identity, LoginRequest, RegisterParentRequest, TokenResponse},
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo::{self, Course, User},
};
use crate::{
    error::{is_unique_violation, AppError, AppResult},
    scope::Caller,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

fn invalid_credentials() -> AppError {
    AppError::unauthorized("AUTH_INVALID_CREDENTIALS", "Invalid credentials")
}

pub fn invalid_token() -> AppError {
    AppError::unauthorized("AUTH_INVALID_TOKEN", "Invalid or expired token")
}

/// Looks an account up by email first, phone second.
async fn find_by_identity(
    db: &PgPool,
    email: Option<&str>,
    phone: Option<&str>,
) -> anyhow::Result<Option<User>> {
    if let Some(email) = email {
        return User::find_by_email(db, email).await;
    }
    match phone {
        Some(phone) => User::find_by_phone(db, phone).await,
        None => Ok(None),
    }
}

pub async fn register_parent(
    db: &PgPool,
    keys: &JwtKeys,
    payload: RegisterParentRequest,
) -> AppResult<TokenResponse> {
    let parent = payload.into_new_parent()?;

    if let Some(email) = &parent.email {
        if User::find_by_email(db, email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AppError::conflict("AUTH_EMAIL_IN_USE", "Email already in use"));
        }
    }
    if let Some(phone) = &parent.phone {
        if User::find_by_phone(db, phone).await?.is_some() {
            warn!(phone = %phone, "phone already registered");
            return Err(AppError::conflict("AUTH_PHONE_IN_USE", "Phone already in use"));
        }
    }

    let hash = hash_password(&parent.password)?;
    let user = match User::create_parent(db, &parent, &hash).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            warn!(error = %e, "registration lost a uniqueness race");
            return Err(if parent.email.is_some() {
                AppError::conflict("AUTH_EMAIL_IN_USE", "Email already in use")
            } else {
                AppError::conflict("AUTH_PHONE_IN_USE", "Phone already in use")
            });
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, "parent registered");
    Ok(TokenResponse::issue(keys, user.id)?)
}

pub async fn login(db: &PgPool, keys: &JwtKeys, payload: LoginRequest) -> AppResult<TokenResponse> {
    let (email, phone) = payload.identity.normalized()?;

    let Some(user) = find_by_identity(db, email.as_deref(), phone.as_deref()).await? else {
        warn!("login for unknown account");
        return Err(invalid_credentials());
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid_credentials());
    }

    info!(user_id = %user.id, "user logged in");
    Ok(TokenResponse::issue(keys, user.id)?)
}

pub async fn refresh(db: &PgPool, keys: &JwtKeys, refresh_token: &str) -> AppResult<TokenResponse> {
    let claims = keys.verify_refresh(refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        invalid_token()
    })?;

    if User::role_of(db, claims.sub).await?.is_none() {
        warn!(user_id = %claims.sub, "refresh for deleted user");
        return Err(invalid_token());
    }

    Ok(TokenResponse::issue(keys, claims.sub)?)
}

pub async fn check_user(db: &PgPool, identity: &Identity) -> AppResult<CheckUserResponse> {
    let (email, phone) = identity.normalized()?;
    find_by_identity(db, email.as_deref(), phone.as_deref())
        .await?
        .map(CheckUserResponse::from)
        .ok_or_else(|| AppError::forbidden("AUTH_USER_NOT_FOUND", "User not found"))
}

pub async fn me(db: &PgPool, caller: &Caller) -> AppResult<User> {
    User::find_by_id(db, caller.id)
        .await?
        .ok_or_else(invalid_token)
}

pub async fn courses(db: &PgPool, caller: &Caller) -> AppResult<Vec<Course>> {
    let scope = caller.scope()?;
    Ok(repo::list_courses(db, scope).await?)
}
