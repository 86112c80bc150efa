use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
};

use crate::auth::auth::AuthUser;

/// Rejects unauthenticated requests at the scope boundary and caches the
/// decoded identity for the handlers' `AuthUser` extractor.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let user = AuthUser::from_bearer(req.request())?;
    req.extensions_mut().insert(user);

    next.call(req).await
}
