use std::sync::LazyLock;

use axum::{
    Router,
    extract::{Json, State},
    http::{HeaderMap, header::AUTHORIZATION},
    response::IntoResponse,
    routing::{get, post},
};
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;

use crate::AppState;
use crate::error::ApiError;
use crate::models::{AuthResponse, SignInRequest, SignUpRequest, User, UserResponse};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Numeric user id, stringified.
    pub sub: String,
    pub exp: usize,
}

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+$").expect("valid email regex"));

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/me", get(me))
}

async fn signup(
    State(state): State<AppState>,
    Json(input): Json<SignUpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_signup(&input)?;

    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(&input.email)
        .fetch_optional(&state.pool)
        .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hashed = hash(&input.password, DEFAULT_COST)?;
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO users (email, password, nickname, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&input.email)
    .bind(&hashed)
    .bind(&input.nickname)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(result.last_insert_id() as i64)
        .fetch_one(&state.pool)
        .await?;

    let token = generate_token(user.id)?;
    Ok(Json(AuthResponse {
        user: UserResponse::from(user),
        token,
    }))
}

async fn signin(
    State(state): State<AppState>,
    Json(input): Json<SignInRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if input.email.trim().is_empty() || input.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required".into(),
        ));
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(&input.email)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Incorrect email or password".into()))?;

    if !verify(&input.password, &user.password)? {
        return Err(ApiError::Unauthorized("Incorrect email or password".into()));
    }

    let token = generate_token(user.id)?;
    Ok(Json(AuthResponse {
        user: UserResponse::from(user),
        token,
    }))
}

async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = extract_current_user(&state.pool, &headers).await?;
    Ok(Json(UserResponse::from(user)))
}

fn validate_signup(input: &SignUpRequest) -> Result<(), ApiError> {
    if !EMAIL_RE.is_match(&input.email) {
        return Err(ApiError::BadRequest("Invalid email format".into()));
    }
    if input.password.chars().count() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".into(),
        ));
    }
    let nickname_len = input.nickname.chars().count();
    if !(2..=20).contains(&nickname_len) {
        return Err(ApiError::BadRequest(
            "Nickname must be between 2 and 20 characters".into(),
        ));
    }
    Ok(())
}

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "my-secret-key-change-in-production".into())
}

fn generate_token(user_id: i64) -> Result<String, ApiError> {
    let expiration = Utc::now()
        .checked_add_signed(chrono::Duration::hours(24))
        .expect("valid timestamp")
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret().as_bytes()),
    )?;
    Ok(token)
}

/// Resolves the bearer token to a user row. This is the only place request
/// identity is established; handlers never look at tokens themselves.
pub async fn extract_current_user(pool: &MySqlPool, headers: &HeaderMap) -> Result<User, ApiError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".into()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header".into()))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret().as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized("Invalid token".into()))?;

    let user_id: i64 = token_data
        .claims
        .sub
        .parse()
        .map_err(|_| ApiError::Unauthorized("Token carries no user identity".into()))?;

    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))
}

/// Like `extract_current_user`, but anonymous requests are allowed through.
pub async fn extract_optional_user(
    pool: &MySqlPool,
    headers: &HeaderMap,
) -> Result<Option<User>, ApiError> {
    let Some(auth_header) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return Ok(None);
    };
    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return Ok(None);
    };

    let token_data = match decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret().as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => data,
        Err(_) => return Ok(None),
    };

    let Ok(user_id) = token_data.claims.sub.parse::<i64>() else {
        return Ok(None);
    };

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str, nickname: &str) -> SignUpRequest {
        SignUpRequest {
            email: email.to_string(),
            password: password.to_string(),
            nickname: nickname.to_string(),
        }
    }

    #[test]
    fn accepts_a_well_formed_signup() {
        assert!(validate_signup(&request("user@example.com", "longenough", "neighbor")).is_ok());
    }

    #[test]
    fn rejects_malformed_email() {
        let err = validate_signup(&request("not-an-email", "longenough", "neighbor")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn rejects_short_password() {
        let err = validate_signup(&request("user@example.com", "short", "neighbor")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn rejects_out_of_range_nickname() {
        assert!(validate_signup(&request("user@example.com", "longenough", "x")).is_err());
        assert!(
            validate_signup(&request(
                "user@example.com",
                "longenough",
                "a-nickname-way-beyond-twenty-chars"
            ))
            .is_err()
        );
    }
}
