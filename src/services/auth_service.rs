use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::auth::{
        Claims, ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest,
        ResetPasswordRequest,
    },
    error::{AppError, AppResult},
    mail,
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub reset_token: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub(crate) fn user_from_row(row: UserRow) -> User {
    User {
        id: row.id,
        email: row.email,
        name: row.name,
        role: row.role,
        created_at: row.created_at,
    }
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let RegisterRequest {
        email,
        password,
        name,
    } = payload;
    if password.len() < 8 {
        return Err(AppError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }

    let exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(&state.pool)
        .await?;
    if exist.is_some() {
        return Err(AppError::BadRequest("Email is already taken".to_string()));
    }

    let password_hash = hash_password(&password)?;
    let id = Uuid::new_v4();

    let user: UserRow = sqlx::query_as(
        "INSERT INTO users (id, email, password_hash, name) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(id)
    .bind(email.as_str())
    .bind(password_hash)
    .bind(name.as_str())
    .fetch_one(&state.pool)
    .await?;

    log_audit(
        state,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "User created",
        user_from_row(user),
        None,
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(&state.pool)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::BadRequest("Invalid email or password".into())),
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    let argon2 = Argon2::default();
    if argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        exp: expiration.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    log_audit(
        state,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token: format!("Bearer {}", token),
        },
        Some(Meta::empty()),
    ))
}

/// Issue a reset token and email the link. The response is identical whether
/// or not the address exists, so the endpoint can't be used to probe accounts.
pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(payload.email.as_str())
        .fetch_optional(&state.pool)
        .await?;

    if let Some(user) = user {
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::hours(1);
        sqlx::query(
            "UPDATE users SET reset_token = $2, reset_token_expires_at = $3 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&token)
        .bind(expires_at)
        .execute(&state.pool)
        .await?;

        let link = format!(
            "{}/reset-password?token={}",
            state.config.public_base_url, token
        );
        state
            .mailer
            .send_detached(mail::password_reset(&user.email, &link));
    }

    Ok(ApiResponse::success(
        "If the address exists, a reset link has been sent",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if payload.new_password.len() < 8 {
        return Err(AppError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }

    let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE reset_token = $1")
        .bind(payload.token.as_str())
        .fetch_optional(&state.pool)
        .await?;
    let user = match user {
        Some(u) => u,
        None => return Err(AppError::BadRequest("Invalid or expired reset token".into())),
    };

    let still_valid = user
        .reset_token_expires_at
        .map(|expiry| expiry > Utc::now())
        .unwrap_or(false);
    if !still_valid {
        return Err(AppError::BadRequest("Invalid or expired reset token".into()));
    }

    let password_hash = hash_password(&payload.new_password)?;
    sqlx::query(
        r#"
        UPDATE users
        SET password_hash = $2, reset_token = NULL, reset_token_expires_at = NULL
        WHERE id = $1
        "#,
    )
    .bind(user.id)
    .bind(password_hash)
    .execute(&state.pool)
    .await?;

    log_audit(
        state,
        Some(user.id),
        "password_reset",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Password updated",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub(crate) fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}
