//! Spending categories. Every route requires a bearer token and only ever
//! touches the caller's own rows.

use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::auth::Principal;
use crate::db::{CategoryStore, CredentialStore, StoreError};
use crate::error::ApiError;
use crate::models::{CategoryFilter, CreateCategoryRequest, NewCategory, UpdateCategory};

/// Resolves the token's username to the owning user id.
async fn owner_id(store: &dyn CredentialStore, principal: &Principal) -> Result<i32, ApiError> {
    match store.get_user(&principal.username).await {
        Ok(user) => Ok(user.id),
        Err(StoreError::NotFound) => {
            tracing::warn!(username = %principal.username, "token for unknown user");
            Err(ApiError::Authentication("unknown principal".into()))
        }
        Err(e) => Err(ApiError::Internal(format!("user lookup failed: {e}"))),
    }
}

fn category_not_found(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::NotFound("category not found".into()),
        other => other.into(),
    }
}

#[post("/categories")]
pub async fn create_category(
    principal: Principal,
    body: web::Json<CreateCategoryRequest>,
    users: web::Data<dyn CredentialStore>,
    categories: web::Data<dyn CategoryStore>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    request.validate().map_err(ApiError::Validation)?;
    let user_id = owner_id(users.get_ref(), &principal).await?;

    let category = categories
        .create_category(NewCategory {
            user_id,
            title: request.title,
            kind: request.kind,
            description: request.description,
        })
        .await?;
    tracing::info!(user_id, category_id = category.id, "category created");
    Ok(HttpResponse::Created().json(category))
}

#[get("/categories")]
pub async fn list_categories(
    principal: Principal,
    filter: web::Query<CategoryFilter>,
    users: web::Data<dyn CredentialStore>,
    categories: web::Data<dyn CategoryStore>,
) -> Result<HttpResponse, ApiError> {
    let user_id = owner_id(users.get_ref(), &principal).await?;
    let found = categories.list_categories(user_id, &filter).await?;
    Ok(HttpResponse::Ok().json(found))
}

#[get("/categories/{id}")]
pub async fn get_category(
    principal: Principal,
    path: web::Path<i32>,
    users: web::Data<dyn CredentialStore>,
    categories: web::Data<dyn CategoryStore>,
) -> Result<HttpResponse, ApiError> {
    let user_id = owner_id(users.get_ref(), &principal).await?;
    let category = categories
        .get_category(user_id, path.into_inner())
        .await
        .map_err(category_not_found)?;
    Ok(HttpResponse::Ok().json(category))
}

#[put("/categories/{id}")]
pub async fn update_category(
    principal: Principal,
    path: web::Path<i32>,
    body: web::Json<UpdateCategory>,
    users: web::Data<dyn CredentialStore>,
    categories: web::Data<dyn CategoryStore>,
) -> Result<HttpResponse, ApiError> {
    let update = body.into_inner();
    update.validate().map_err(ApiError::Validation)?;
    let user_id = owner_id(users.get_ref(), &principal).await?;

    let category = categories
        .update_category(user_id, path.into_inner(), update)
        .await
        .map_err(category_not_found)?;
    Ok(HttpResponse::Ok().json(category))
}

#[delete("/categories/{id}")]
pub async fn delete_category(
    principal: Principal,
    path: web::Path<i32>,
    users: web::Data<dyn CredentialStore>,
    categories: web::Data<dyn CategoryStore>,
) -> Result<HttpResponse, ApiError> {
    let user_id = owner_id(users.get_ref(), &principal).await?;
    categories
        .delete_category(user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
