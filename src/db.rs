//! Persistence for users and categories.
//!
//! Handlers only see the [`CredentialStore`] and [`CategoryStore`] traits.
//! [`PgStore`] backs them with Postgres; [`MemoryStore`] keeps everything in
//! process and is used by tests and local development.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::{Category, CategoryFilter, NewCategory, UpdateCategory, User};
use crate::password::{self, PasswordError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("database error: {0}")]
    Backend(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            other => Self::Backend(other),
        }
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `StoreError::NotFound` when no user has this username.
    async fn get_user(&self, username: &str) -> Result<User, StoreError>;
}

/// Category persistence. Every call is scoped to the owning user.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn create_category(&self, new: NewCategory) -> Result<Category, StoreError>;

    async fn get_category(&self, user_id: i32, id: i32) -> Result<Category, StoreError>;

    async fn list_categories(
        &self,
        user_id: i32,
        filter: &CategoryFilter,
    ) -> Result<Vec<Category>, StoreError>;

    async fn update_category(
        &self,
        user_id: i32,
        id: i32,
        update: UpdateCategory,
    ) -> Result<Category, StoreError>;

    /// Deleting a category that does not exist is not an error.
    async fn delete_category(&self, user_id: i32, id: i32) -> Result<(), StoreError>;
}

const CREATE_USERS: &str = "CREATE TABLE IF NOT EXISTS users (
    id SERIAL PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

const CREATE_CATEGORIES: &str = "CREATE TABLE IF NOT EXISTS categories (
    id SERIAL PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    type TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        tracing::info!(max_connections, "connected to postgres");
        Ok(Self::new(pool))
    }

    /// Creates the tables if they are missing.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in [CREATE_USERS, CREATE_CATEGORIES] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn get_user(&self, username: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, email, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl CategoryStore for PgStore {
    async fn create_category(&self, new: NewCategory) -> Result<Category, StoreError> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (user_id, title, type, description)
             VALUES ($1, $2, $3, $4)
             RETURNING id, user_id, title, type, description, created_at",
        )
        .bind(new.user_id)
        .bind(&new.title)
        .bind(&new.kind)
        .bind(&new.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn get_category(&self, user_id: i32, id: i32) -> Result<Category, StoreError> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, user_id, title, type, description, created_at
             FROM categories WHERE id = $1 AND user_id = $2 LIMIT 1",
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn list_categories(
        &self,
        user_id: i32,
        filter: &CategoryFilter,
    ) -> Result<Vec<Category>, StoreError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, user_id, title, type, description, created_at
             FROM categories
             WHERE user_id = $1
               AND ($2::text IS NULL OR type = $2)
               AND ($3::text IS NULL OR title ILIKE '%' || $3 || '%')
               AND ($4::text IS NULL OR description ILIKE '%' || $4 || '%')
             ORDER BY id",
        )
        .bind(user_id)
        .bind(&filter.kind)
        .bind(&filter.title)
        .bind(&filter.description)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn update_category(
        &self,
        user_id: i32,
        id: i32,
        update: UpdateCategory,
    ) -> Result<Category, StoreError> {
        let category = sqlx::query_as::<_, Category>(
            "UPDATE categories SET title = $3, description = $4
             WHERE id = $1 AND user_id = $2
             RETURNING id, user_id, title, type, description, created_at",
        )
        .bind(id)
        .bind(user_id)
        .bind(&update.title)
        .bind(&update.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn delete_category(&self, user_id: i32, id: i32) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM categories WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    categories: BTreeMap<i32, Category>,
    last_user_id: i32,
    last_category_id: i32,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Stores a user whose password is hashed with the two-stage scheme.
    /// Adding an existing username replaces its credentials but keeps its id,
    /// so categories stay attached.
    pub async fn add_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        cost: u32,
    ) -> Result<User, PasswordError> {
        let password_hash = password::hash_password(password, cost)?;
        let mut tables = self.tables.lock().await;
        let (id, created_at) = match tables.users.get(username) {
            Some(existing) => (existing.id, existing.created_at),
            None => {
                tables.last_user_id += 1;
                (tables.last_user_id, Utc::now())
            }
        };
        let user = User {
            id,
            username: username.to_string(),
            password_hash,
            email: email.to_string(),
            created_at,
        };
        tables.users.insert(username.to_string(), user.clone());
        Ok(user)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get_user(&self, username: &str) -> Result<User, StoreError> {
        self.tables
            .lock()
            .await
            .users
            .get(username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn create_category(&self, new: NewCategory) -> Result<Category, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.last_category_id += 1;
        let category = Category {
            id: tables.last_category_id,
            user_id: new.user_id,
            title: new.title,
            kind: new.kind,
            description: new.description,
            created_at: Utc::now(),
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn get_category(&self, user_id: i32, id: i32) -> Result<Category, StoreError> {
        self.tables
            .lock()
            .await
            .categories
            .get(&id)
            .filter(|c| c.user_id == user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_categories(
        &self,
        user_id: i32,
        filter: &CategoryFilter,
    ) -> Result<Vec<Category>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .categories
            .values()
            .filter(|c| c.user_id == user_id && filter.matches(c))
            .cloned()
            .collect())
    }

    async fn update_category(
        &self,
        user_id: i32,
        id: i32,
        update: UpdateCategory,
    ) -> Result<Category, StoreError> {
        let mut tables = self.tables.lock().await;
        let category = tables
            .categories
            .get_mut(&id)
            .filter(|c| c.user_id == user_id)
            .ok_or(StoreError::NotFound)?;
        category.title = update.title;
        category.description = update.description;
        Ok(category.clone())
    }

    async fn delete_category(&self, user_id: i32, id: i32) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.categories.get(&id).is_some_and(|c| c.user_id == user_id) {
            tables.categories.remove(&id);
        }
        Ok(())
    }
}
