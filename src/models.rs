use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the `users` table. Owned by the credential store.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    /// bcrypt over the pre-hashed password, see [`crate::password`].
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    /// Both fields are required and must be non-empty.
    pub fn validate(&self) -> Result<(), String> {
        if self.username.is_empty() {
            return Err("username is required".into());
        }
        if self.password.is_empty() {
            return Err("password is required".into());
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Serialize, Deserialize)]
pub struct MeResponse {
    pub username: String,
}

/// Payload of a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    /// Expiry as seconds since the Unix epoch.
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /categories`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryRequest {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

impl CreateCategoryRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is required".into());
        }
        if self.kind.trim().is_empty() {
            return Err("type is required".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub user_id: i32,
    pub title: String,
    pub kind: String,
    pub description: String,
}

/// Body of `PUT /categories/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCategory {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl UpdateCategory {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is required".into());
        }
        Ok(())
    }
}

/// Query string of `GET /categories`. Absent fields do not filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryFilter {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl CategoryFilter {
    /// In-memory equivalent of the SQL filter: exact `type`, case-insensitive
    /// substring on `title` and `description`.
    pub fn matches(&self, category: &Category) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            needle
                .as_deref()
                .map_or(true, |n| haystack.to_lowercase().contains(&n.to_lowercase()))
        }

        self.kind.as_deref().map_or(true, |k| category.kind == k)
            && contains(&category.title, &self.title)
            && contains(&category.description, &self.description)
    }
}
