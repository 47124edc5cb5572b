use chrono::Utc;

use crate::{
    db::DbPool,
    error::{AppError, Result},
    models::user::{Role, User},
};

/// User store for database operations
#[derive(Clone)]
pub struct UserStore {
    pool: DbPool,
}

impl UserStore {
    /// Create a new UserStore with the provided database pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a list of all users
    pub async fn get_all_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(users)
    }

    /// Get a user by ID
    pub async fn get_user_by_id(&self, id: i64) -> Result<User> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or(AppError::UserNotFound)?;

        Ok(user)
    }

    /// Get a user by username, ignoring case
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ? COLLATE NOCASE")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(user)
    }

    pub async fn admin_exists(&self) -> Result<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(Role::Admin as i32)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(count.0 > 0)
    }

    /// Create a user with an already hashed password
    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
        client_code: Option<&str>,
        client_name: &str,
    ) -> Result<User> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, role, client_code, client_name, last_edit)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(role as i32)
        .bind(client_code)
        .bind(client_name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_insert(e, || format!("User {} already exists", username)))?;

        self.get_user_by_id(result.last_insert_rowid()).await
    }

    /// Delete a user by ID
    pub async fn delete_user(&self, id: i64) -> Result<()> {
        let existing_user = self.get_user_by_id(id).await?;

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(existing_user.id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(())
    }
}
