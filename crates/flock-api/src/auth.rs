use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::SaltString,
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use tracing::info;
use uuid::Uuid;

use flock_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use flock_types::models::{Role, User};

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::state::{AppState, blocking};

const TOKEN_TTL_DAYS: i64 = 30;
const MIN_PASSWORD_LEN: usize = 8;

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = req.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::bad_request("email must contain '@'"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request("password must be at least 8 characters"));
    }
    let full_name = req.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(ApiError::bad_request("full_name is required"));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();
    let phone = req.phone;

    let email_db = email.clone();
    let created = blocking(&state, move |db| {
        if db.email_exists(&email_db)? {
            return Ok(false);
        }
        db.create_user(user_id, &email_db, &password_hash, &full_name, phone.as_deref(), Role::Member)?;
        Ok(true)
    })
    .await?;
    if !created {
        return Err(ApiError::Conflict("email already registered".into()));
    }

    info!("Registered {} ({})", email, user_id);
    let token = create_token(&state.jwt_secret, user_id, &email, Role::Member)?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let email = req.email.trim().to_lowercase();
    let creds = blocking(&state, move |db| db.get_credentials_by_email(&email))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let parsed_hash = PasswordHash::new(&creds.password_hash)
        .map_err(|e| anyhow::anyhow!("stored hash for {} is unreadable: {}", creds.user.id, e))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let user = creds.user;
    let token = create_token(&state.jwt_secret, user.id, &user.email, user.role)?;
    Ok(Json(LoginResponse {
        user_id: user.id,
        full_name: user.full_name,
        role: user.role,
        token,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<User>> {
    let user_id = claims.sub;
    blocking(&state, move |db| db.get_user(user_id))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("user"))
}

/// Argon2id with a random salt, in PHC string form.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

pub fn create_token(secret: &str, user_id: Uuid, email: &str, role: Role) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}
