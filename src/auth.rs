//! Session tokens: issuing, validating, and pulling them out of requests.
//!
//! Tokens are HS256 JWTs carrying [`Claims`]. They are stateless, so a token
//! is valid until its `exp` and there is nothing to revoke.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::Header as _;
use actix_web::{web, FromRequest, HttpRequest};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;

use crate::config::{AppConfig, JwtSecret};
use crate::error::ApiError;
use crate::models::Claims;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing header, wrong scheme, or a token that is not three segments.
    #[error("malformed bearer token")]
    Malformed,

    #[error("token signature is invalid")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token claims are missing or invalid")]
    InvalidClaims,

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// `now + ttl` does not fit in a timestamp.
    #[error("token expiry is out of range")]
    ExpiryOutOfRange,
}

/// The authenticated caller of a protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
}

/// Signing material and token lifetime. Built once at startup and shared
/// read-only by every worker.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &JwtSecret, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked in `validate_at` against the caller's clock.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, config.token_ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, username: &str) -> Result<String, AuthError> {
        self.issue_at(username, Utc::now())
    }

    /// Signs a token for `username` expiring `ttl` after `now`.
    pub fn issue_at(&self, username: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let exp = now
            .checked_add_signed(self.ttl)
            .ok_or(AuthError::ExpiryOutOfRange)?;
        let claims = Claims {
            username: username.to_owned(),
            exp: exp.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(AuthError::Signing)
    }

    pub fn validate(&self, token: &str) -> Result<Principal, AuthError> {
        self.validate_at(token, Utc::now())
    }

    /// Runs a token through shape, signature and claim checks, in that order,
    /// and fails with the error of the first check that rejects it.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, AuthError> {
        check_shape(token)?;
        decode_header(token).map_err(|_| classify_header(token))?;

        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(classify)?
            .claims;

        if claims.username.is_empty() {
            return Err(AuthError::InvalidClaims);
        }
        if now.timestamp() > claims.exp {
            return Err(AuthError::Expired);
        }

        Ok(Principal {
            username: claims.username,
        })
    }
}

fn check_shape(token: &str) -> Result<(), AuthError> {
    let mut segments = 0;
    for segment in token.split('.') {
        if segment.is_empty() {
            return Err(AuthError::Malformed);
        }
        segments += 1;
    }
    if segments == 3 {
        Ok(())
    } else {
        Err(AuthError::Malformed)
    }
}

/// A header that is a JSON object naming an `alg` we cannot parse is a
/// signature problem, not a shape problem.
fn classify_header(token: &str) -> AuthError {
    let names_alg = token
        .split('.')
        .next()
        .and_then(|segment| URL_SAFE_NO_PAD.decode(segment).ok())
        .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok())
        .is_some_and(|header| header.get("alg").is_some_and(|alg| alg.is_string()));

    if names_alg {
        AuthError::BadSignature
    } else {
        AuthError::Malformed
    }
}

/// Maps decode failures once the header is known to be well formed.
fn classify(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::BadSignature,
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidToken => AuthError::Malformed,
        _ => AuthError::InvalidClaims,
    }
}

/// Reads `Authorization: Bearer <token>` from the request. Exactly one space
/// separates the scheme from the token; the token itself holds no whitespace.
pub fn bearer_token(req: &HttpRequest) -> Result<String, AuthError> {
    let auth = Authorization::<Bearer>::parse(req).map_err(|_| AuthError::Malformed)?;
    let token = auth.into_scheme().token().to_string();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::Malformed);
    }
    Ok(token)
}

impl FromRequest for Principal {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(keys) = req.app_data::<web::Data<TokenKeys>>() else {
            let err = ApiError::Internal("token keys are not registered".into());
            return ready(Err(err));
        };

        let result = bearer_token(req).and_then(|token| keys.validate(&token));
        if let Err(e) = &result {
            tracing::debug!(error = %e, path = req.path(), "rejected bearer token");
        }
        ready(result.map_err(ApiError::from))
    }
}
