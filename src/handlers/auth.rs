use actix_web::{http::StatusCode, web, HttpResponse};
use log::{info, warn};
use mongodb::bson::doc;

use super::current_user;
use crate::{
    auth::{self as tokens, AuthUser},
    config::Config,
    db::Store,
    error::ApiError,
    models::{
        record_id, user::normalize_email, ApiResponse, AuthResponse, LoginRequest,
        RegisterRequest, User, UserResponse, UserRole, ValidateRequest,
    },
};

async fn create_account<S: Store>(
    store: &S,
    config: &Config,
    request: &RegisterRequest,
    role: UserRole,
) -> Result<HttpResponse, ApiError> {
    request.check()?;

    let email = normalize_email(&request.email);
    if store
        .find_one::<User>(doc! { "email": &email })
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("User already exists".into()));
    }

    // bcrypt is CPU bound; keep it off the worker thread.
    let (password, auth) = (request.password.clone(), config.auth.clone());
    let hashed_password = web::block(move || tokens::hash_password(&password, &auth)).await??;
    let user = store
        .insert(User::new(&request.name, &email, hashed_password, role))
        .await?;

    info!("Registered {} account {}", role.as_str(), user.email);
    signed_in(config, &user, StatusCode::CREATED)
}

/// Builds the `{ token, user }` response and sets the session cookie.
fn signed_in(
    config: &Config,
    user: &User,
    status: StatusCode,
) -> Result<HttpResponse, ApiError> {
    let user_id = record_id(user)?;
    let token = tokens::issue_token(user_id, user.role, &config.auth)?;
    let cookie = tokens::session_cookie(token.clone(), &config.auth);

    let body = ApiResponse::new(AuthResponse {
        token,
        user: UserResponse::from_user(user, user_id),
    });
    Ok(HttpResponse::build(status).cookie(cookie).json(body))
}

/// Operator sign-up from the admin console.
pub async fn register<S: Store>(
    store: web::Data<S>,
    config: web::Data<Config>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    create_account(store.get_ref(), &config, &request, UserRole::Operator).await
}

/// Passenger sign-up from the storefront.
pub async fn register_customer<S: Store>(
    store: web::Data<S>,
    config: web::Data<Config>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    create_account(store.get_ref(), &config, &request, UserRole::Customer).await
}

pub async fn login<S: Store>(
    store: web::Data<S>,
    config: web::Data<Config>,
    credentials: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    credentials.check()?;

    let email = normalize_email(&credentials.email);
    let user = store
        .find_one::<User>(doc! { "email": &email })
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".into()))?;

    let (password, hash) = (credentials.password.clone(), user.password.clone());
    if !web::block(move || tokens::verify_password(&password, &hash)).await? {
        warn!("Invalid password attempt for email: {}", email);
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    info!("User {} authenticated successfully", user.email);
    signed_in(&config, &user, StatusCode::OK)
}

pub async fn logout(config: web::Data<Config>) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(tokens::expired_session_cookie(&config.auth))
        .json(ApiResponse::new(()).with_message("Signed out"))
}

pub async fn me<S: Store>(user: AuthUser, store: web::Data<S>) -> Result<HttpResponse, ApiError> {
    let record = current_user(store.get_ref(), &user).await?;
    Ok(ApiResponse::new(UserResponse::from_user(&record, user.id)).ok())
}
