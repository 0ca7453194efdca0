use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use pulse_db::Database;
use pulse_db::users::clean_username;
use pulse_gateway::{Hub, SessionConfig};
use pulse_notify::NotificationService;
use pulse_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};

use crate::error::ApiError;

const TOKEN_TTL_DAYS: i64 = 7;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub hub: Hub,
    pub notifications: NotificationService,
    pub session: SessionConfig,
    /// Cancelled on server shutdown; stream sessions hold child tokens.
    pub shutdown: CancellationToken,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = clean_username(&req.username).to_string();
    validate_username(&username)?;
    if req.password.len() < 8 {
        return Err(ApiError::bad_request("password must be at least 8 characters"));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            ApiError::Internal
        })?
        .to_string();

    // Uniqueness is enforced by the (case-insensitive) column constraint.
    let user = state
        .db
        .blocking(move |db| db.create_user(&username, &password_hash))
        .await?;

    let token = issue_token(&state.jwt_secret, user.id, &user.username)?;
    info!(user_id = user.id, username = %user.username, "Registered user");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id: user.id,
            username: user.username,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let username = req.username;
    let user = state
        .db
        .blocking(move |db| db.get_user_by_username(&username))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password).map_err(|e| {
        error!(user_id = user.id, "Stored password hash is unreadable: {}", e);
        ApiError::Internal
    })?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let token = issue_token(&state.jwt_secret, user.id, &user.username)?;

    Ok(Json(AuthResponse {
        user_id: user.id,
        username: user.username,
        token,
    }))
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(ApiError::bad_request("username must be 3-32 characters"));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(ApiError::bad_request(
            "username may only contain letters, digits, '_', '-' and '.'",
        ));
    }
    Ok(())
}

fn issue_token(secret: &str, user_id: i64, username: &str) -> Result<String, ApiError> {
    create_token(secret, user_id, username).map_err(|e| {
        error!("Token signing failed: {}", e);
        ApiError::Internal
    })
}

pub fn create_token(secret: &str, user_id: i64, username: &str) -> jsonwebtoken::errors::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validates signature and expiry.
pub fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let token = create_token("secret", 42, "alice").unwrap();
        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.username, "alice");
        assert!(decode_token("other-secret", &token).is_none());
        assert!(decode_token("secret", "garbage").is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            sub: 1,
            username: "alice".into(),
            exp: (chrono::Utc::now() - chrono::Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(decode_token("secret", &token).is_none());
    }

    #[test]
    fn generated_salt_hashes_and_verifies() {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(b"correct-horse", &salt)
            .unwrap()
            .to_string();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default().verify_password(b"correct-horse", &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"wrong-horse", &parsed).is_err());
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("a.b-c_d").is_ok());
        assert!(validate_username("al").is_err());
        assert!(validate_username(&"x".repeat(33)).is_err());
        assert!(validate_username("al ice").is_err());
        assert!(validate_username("al@ice").is_err());
    }
}
