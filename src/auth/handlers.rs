use crate::{
    AppState,
    auth::{
        auth::AuthUser,
        jwt::generate_access_token,
        password::{hash_password, verify_password},
    },
    config::Config,
    error::ServiceError,
    model::role::Role,
    model::user::{User, UserResponse},
    models::{LoginReqDto, RegisterReq},
};
use actix_web::{HttpResponse, web};
use serde_json::json;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Register a new employee account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Account created", body = Object, example = json!({
            "uid": "7f9c0b1e-..." })),
        (status = 400, description = "Missing required fields"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
pub async fn register(
    payload: web::Json<RegisterReq>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ServiceError> {
    let email = payload.email.trim().to_lowercase();

    if email.is_empty() || payload.password.is_empty() {
        return Err(ServiceError::BadRequest(
            "Email and password must not be empty".into(),
        ));
    }
    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return Err(ServiceError::BadRequest(
            "First and last name must not be empty".into(),
        ));
    }

    let password_hash = hash_password(&payload.password)
        .map_err(|e| ServiceError::Internal(format!("password hashing failed: {e}")))?;

    // The configured bootstrap address becomes the first administrator.
    let role = if config
        .admin_email
        .as_deref()
        .is_some_and(|admin| admin.eq_ignore_ascii_case(&email))
    {
        Role::Admin
    } else {
        Role::Employee
    };

    let user = User {
        uid: Uuid::new_v4().to_string(),
        email,
        password_hash,
        role_id: role.id(),
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
        department: payload.department.clone(),
        position: payload.position.clone(),
        schedule: None,
        timezone: None,
        created_at: state.clock.now(),
        updated_at: None,
    };

    state.store.users().create(&user).await?;

    info!(uid = %user.uid, "user registered");
    Ok(HttpResponse::Created().json(json!({ "uid": user.uid })))
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Authenticated", body = Object, example = json!({
            "accessToken": "eyJ..." })),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(payload, state, config), fields(email = %payload.email))]
pub async fn login(
    payload: web::Json<LoginReqDto>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ServiceError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ServiceError::BadRequest("Email or password required".into()));
    }

    debug!("fetching user");
    let user = match state
        .store
        .users()
        .find_by_email(&payload.email.trim().to_lowercase())
        .await?
    {
        Some(u) => u,
        None => {
            info!("invalid credentials: user not found");
            return Ok(HttpResponse::Unauthorized().json(json!({
                "error": "Invalid credentials"
            })));
        }
    };

    if verify_password(&payload.password, &user.password_hash).is_err() {
        info!("invalid credentials: password mismatch");
        return Ok(HttpResponse::Unauthorized().json(json!({
            "error": "Invalid credentials"
        })));
    }

    let access_token = generate_access_token(
        &user.uid,
        &user.email,
        user.role_id,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    info!(uid = %user.uid, "login successful");
    Ok(HttpResponse::Ok().json(json!({ "accessToken": access_token })))
}

/// Current user's profile
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Profile", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Profile missing")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    let user = state
        .store
        .users()
        .get(&auth.uid)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User profile not found".into()))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}
