//! Spendwise: a small personal-finance REST backend.
//!
//! Users log in with a username and password and receive a signed session
//! token. Category routes require that token as `Authorization: Bearer`.

pub mod auth;
pub mod category_handlers;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod password;
pub mod user_handlers;

use std::sync::Arc;

use actix_web::{get, web, HttpResponse, Responder};

use crate::auth::TokenKeys;
use crate::db::{CategoryStore, CredentialStore};
use crate::error::ApiError;

/// Shared, read-only application data handed to every worker.
#[derive(Clone)]
pub struct AppState {
    pub keys: web::Data<TokenKeys>,
    pub users: web::Data<dyn CredentialStore>,
    pub categories: web::Data<dyn CategoryStore>,
}

impl AppState {
    /// One store serving both users and categories.
    pub fn new<S>(store: Arc<S>, keys: TokenKeys) -> Self
    where
        S: CredentialStore + CategoryStore + 'static,
    {
        let users: Arc<dyn CredentialStore> = store.clone();
        let categories: Arc<dyn CategoryStore> = store;
        Self::from_parts(keys, users, categories)
    }

    pub fn from_parts(
        keys: TokenKeys,
        users: Arc<dyn CredentialStore>,
        categories: Arc<dyn CategoryStore>,
    ) -> Self {
        Self {
            keys: web::Data::new(keys),
            users: web::Data::from(users),
            categories: web::Data::from(categories),
        }
    }

    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.keys.clone())
            .app_data(self.users.clone())
            .app_data(self.categories.clone());
        routes(cfg);
    }
}

/// Route table plus extractor error handlers, so that unreadable bodies,
/// queries and paths come back as validation errors.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::Validation(format!("invalid request body: {err}")).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        ApiError::Validation(format!("invalid query string: {err}")).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        ApiError::Validation(format!("invalid path: {err}")).into()
    }))
    .service(health)
    .service(user_handlers::login)
    .service(user_handlers::me)
    .service(category_handlers::create_category)
    .service(category_handlers::list_categories)
    .service(category_handlers::get_category)
    .service(category_handlers::update_category)
    .service(category_handlers::delete_category);
}

/// Simple health check
#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().body("OK")
}
