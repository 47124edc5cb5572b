use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Portal role of an account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Client = 0,
    Admin = 1,
}

/// Database user model
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub client_code: Option<String>,
    pub client_name: String,
    pub last_edit: DateTime<Utc>,
}

/// JSON representation of a user for API responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserDto {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub client_code: Option<String>,
    pub client_name: String,
    pub last_edit: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            client_code: user.client_code,
            client_name: user.client_name,
            last_edit: user.last_edit,
        }
    }
}

/// Login request from the portal
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response carrying the bearer token
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserDto,
}

/// Client account created by the administrator
#[derive(Debug, Clone, Deserialize)]
pub struct NewClientAccount {
    pub username: String,
    pub password: String,
    pub client_code: String,
    pub client_name: String,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub role: Role,
    pub client_code: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether orders of `client_code` are visible to this user
    pub fn can_view(&self, client_code: &str) -> bool {
        self.is_admin()
            || self
                .client_code
                .as_deref()
                .is_some_and(|own| own.eq_ignore_ascii_case(client_code))
    }
}
