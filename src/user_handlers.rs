use actix_web::{get, post, web, HttpResponse};

use crate::auth::{Principal, TokenKeys};
use crate::db::{CredentialStore, StoreError};
use crate::error::ApiError;
use crate::models::{LoginRequest, LoginResponse, MeResponse};
use crate::password::{self, Verification};

/// Looks up the user, checks the password, then issues a token.
///
/// Stops at the first stage that fails; nothing is retried.
pub async fn authenticate(
    store: &dyn CredentialStore,
    keys: &TokenKeys,
    request: LoginRequest,
) -> Result<String, ApiError> {
    let user = store
        .get_user(&request.username)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::NotFound("user not found".into()),
            other => ApiError::Internal(format!("user lookup failed: {other}")),
        })?;

    let submitted = request.password;
    let stored = user.password_hash;
    let outcome = web::block(move || password::verify(&submitted, &stored))
        .await
        .map_err(|e| ApiError::Internal(format!("password check did not complete: {e}")))??;

    if outcome == Verification::Mismatch {
        tracing::info!(username = %request.username, "login rejected: wrong password");
        return Err(ApiError::Authentication(
            "invalid username or password".into(),
        ));
    }

    let token = keys.issue(&request.username)?;
    tracing::info!(username = %request.username, "login succeeded");
    Ok(token)
}

#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    store: web::Data<dyn CredentialStore>,
    keys: web::Data<TokenKeys>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    request.validate().map_err(ApiError::Validation)?;

    let token = authenticate(store.get_ref(), &keys, request).await?;
    Ok(HttpResponse::Ok().json(LoginResponse { token }))
}

#[get("/me")]
pub async fn me(principal: Principal) -> HttpResponse {
    HttpResponse::Ok().json(MeResponse {
        username: principal.username,
    })
}
