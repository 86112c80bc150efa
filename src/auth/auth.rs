use actix_web::{
    FromRequest, HttpMessage, HttpRequest, HttpResponse, dev::Payload, http::StatusCode, web::Data,
};
use futures::future::{Ready, ready};
use serde_json::json;
use thiserror::Error;

use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;

/// Caller identity extracted from the bearer token. Handlers declare this
/// as a parameter; everything below the HTTP layer only sees the uid.
#[derive(Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub role: Role,
}

/// Why a request failed authentication. Rendered as a 401 with the same
/// `{"error": ...}` body shape the service errors use.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid or expired token")]
    BadToken,

    #[error("Invalid role")]
    BadRole,

    #[error("App config missing")]
    NoConfig,
}

impl actix_web::ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::NoConfig => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

impl AuthUser {
    /// Decodes the request's `Authorization: Bearer` token into a caller
    /// identity. Single source of truth for token parsing; both the
    /// extractor below and the scope middleware go through here.
    pub fn from_bearer(req: &HttpRequest) -> Result<Self, AuthError> {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or(AuthError::MissingToken)?;

        let config = req.app_data::<Data<Config>>().ok_or(AuthError::NoConfig)?;
        let claims = verify_token(token, &config.jwt_secret).map_err(|_| AuthError::BadToken)?;
        let role = Role::from_id(claims.role).ok_or(AuthError::BadRole)?;

        Ok(AuthUser {
            uid: claims.sub,
            email: claims.email,
            role,
        })
    }

    pub fn require_admin(&self) -> Result<(), crate::error::ServiceError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(crate::error::ServiceError::Forbidden("Admin only".into()))
        }
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Inside a guarded scope the middleware already decoded the token;
        // reuse its result. Public-scope routes decode on the spot.
        if let Some(user) = req.extensions().get::<AuthUser>().cloned() {
            return ready(Ok(user));
        }
        ready(AuthUser::from_bearer(req).map_err(Into::into))
    }
}
