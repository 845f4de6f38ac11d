use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{is_email, ValidationError};
use crate::policy::{Principal, Role};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn principal(&self) -> Principal {
        Principal::new(self.id, self.role)
    }
}

/// Incoming user payload (registration or admin create). `password` is plain
/// text here and must be hashed before it reaches a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::default();
        check_name(&mut errors, &self.name);
        check_email(&mut errors, &self.email);
        check_password(&mut errors, "password", &self.password);
        errors.into_result()
    }

    pub fn into_user(self, id: Uuid, password_hash: String, created_at: DateTime<Utc>) -> User {
        User {
            id,
            name: self.name.trim().to_string(),
            email: normalize_email(&self.email),
            role: self.role.unwrap_or_default(),
            password_hash,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl UserPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::default();
        if let Some(name) = &self.name {
            check_name(&mut errors, name);
        }
        if let Some(email) = &self.email {
            check_email(&mut errors, email);
        }
        errors.into_result()
    }

    pub fn apply(self, user: &mut User) {
        if let Some(v) = self.name {
            user.name = v.trim().to_string();
        }
        if let Some(v) = self.email {
            user.email = normalize_email(&v);
        }
        if let Some(v) = self.role {
            user.role = v;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub email: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        self.role.map_or(true, |r| user.role == r)
            && self.email.as_ref().map_or(true, |e| user.email == normalize_email(e))
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn check_password(errors: &mut ValidationError, field: &str, password: &str) {
    if password.is_empty() {
        errors.add(field, "Please add a password");
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(field, format!("Password must be at least {} characters", MIN_PASSWORD_LEN));
    }
}

fn check_name(errors: &mut ValidationError, name: &str) {
    if name.trim().is_empty() {
        errors.add("name", "Please add a name");
    }
}

fn check_email(errors: &mut ValidationError, email: &str) {
    if email.trim().is_empty() {
        errors.add("email", "Please add an email");
    } else if !is_email(email.trim()) {
        errors.add("email", "Please add a valid email");
    }
}
