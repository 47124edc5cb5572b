use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;

use crate::{
    db::user_store::UserStore,
    error::{AppError, Result},
    models::user::{Claims, LoginResponse, NewClientAccount, Role, User, UserDto},
};

const LOGIN_FAILED: &str = "Invalid username or password";

/// Hash a password into an argon2 PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; 16];
    rand::rng().fill(&mut salt);
    let salt = SaltString::encode_b64(&salt)?;

    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password_hash: &str, password: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// Issues and checks HS256 bearer tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_hours: i64,
}

impl TokenIssuer {
    pub fn new(secret: &str, expiration_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_hours,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            client_code: user.client_code.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.expiration_hours)).timestamp(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }
}

/// Login and account management
#[derive(Clone)]
pub struct AuthService {
    user_store: UserStore,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(user_store: UserStore, tokens: TokenIssuer) -> Self {
        Self { user_store, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Check credentials and hand out a token
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let username = username.trim();
        let user = match self.user_store.find_user_by_username(username).await? {
            Some(user) if verify_password(&user.password_hash, password) => user,
            _ => {
                tracing::warn!(username, "Login rejected");
                return Err(AppError::Auth(LOGIN_FAILED.to_string()));
            }
        };

        let token = self.tokens.issue(&user)?;
        tracing::info!(username = %user.username, role = ?user.role, "Login successful");

        Ok(LoginResponse {
            token,
            user: UserDto::from(user),
        })
    }

    /// Create the administrator account unless one exists already
    pub async fn ensure_admin(&self, username: &str, password: &str) -> Result<bool> {
        if self.user_store.admin_exists().await? {
            return Ok(false);
        }

        let password_hash = hash_password(password)?;
        self.user_store
            .create_user(username, &password_hash, Role::Admin, None, "System Administrator")
            .await?;
        tracing::info!(username, "Created administrator account");

        Ok(true)
    }

    pub async fn create_client(&self, account: NewClientAccount) -> Result<UserDto> {
        let username = account.username.trim();
        let client_code = account.client_code.trim().to_uppercase();
        if username.is_empty() || client_code.is_empty() {
            return Err(AppError::BadRequest(
                "username and client_code are required".to_string(),
            ));
        }
        if account.password.len() < 8 {
            return Err(AppError::BadRequest(
                "password must be at least 8 characters".to_string(),
            ));
        }

        let client_name = match account.client_name.trim() {
            "" => format!("{} Client", client_code),
            name => name.to_string(),
        };

        let password_hash = hash_password(&account.password)?;
        let user = self
            .user_store
            .create_user(
                username,
                &password_hash,
                Role::Client,
                Some(&client_code),
                &client_name,
            )
            .await?;
        tracing::info!(username, client_code = %client_code, "Created client account");

        Ok(UserDto::from(user))
    }

    pub async fn list_users(&self) -> Result<Vec<UserDto>> {
        let users = self.user_store.get_all_users().await?;
        Ok(users.into_iter().map(UserDto::from).collect())
    }

    pub async fn current_user(&self, claims: &Claims) -> Result<UserDto> {
        let user = self.user_store.get_user_by_id(claims.sub).await?;
        Ok(UserDto::from(user))
    }

    /// Delete a client account; administrators cannot be removed here
    pub async fn delete_client(&self, id: i64) -> Result<()> {
        let user = self.user_store.get_user_by_id(id).await?;
        if user.role == Role::Admin {
            return Err(AppError::Forbidden(
                "administrator accounts cannot be deleted".to_string(),
            ));
        }
        self.user_store.delete_user(id).await?;
        tracing::info!(username = %user.username, "Deleted client account");
        Ok(())
    }
}
