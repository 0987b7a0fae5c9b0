use sqlx::SqlitePool;

use crate::error::{AppError, Result};

use super::models::{NewUser, User, UserUpdate};

const USER_COLUMNS: &str = "id, first_name, last_name, username, password_hash, email";

/// Credential store over the `users` table.
pub struct UserStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserStore<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn exists(&self, username: &str) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Insert a user. Duplicate usernames or emails are rejected by the
    /// table's UNIQUE constraints and come back as `AppError::Conflict`.
    pub async fn create(&self, user: &NewUser) -> Result<User> {
        let id = sqlx::query(
            "INSERT INTO users (first_name, last_name, username, password_hash, email) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .execute(self.pool)
        .await?
        .last_insert_rowid();

        Ok(User {
            id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            email: user.email.clone(),
        })
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(&self, user_id: i64) -> Result<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn update(&self, user_id: i64, update: &UserUpdate) -> Result<User> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                first_name = COALESCE(?, first_name),
                last_name = COALESCE(?, last_name),
                password_hash = COALESCE(?, password_hash),
                email = COALESCE(?, email)
            WHERE id = ?
            "#,
        )
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.password_hash)
        .bind(&update.email)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        self.find_by_id(user_id).await
    }
}
