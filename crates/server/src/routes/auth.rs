use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::header, http::HeaderMap, Json};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::{format_ts, UserRow},
    error::AppError,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInvitationRequest {
    pub code: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: String,
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub role: String,
    pub exp: usize,
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = email.contains('@') && email.split('@').nth(1).is_some_and(|d| d.contains('.'));
    if !valid {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 6 {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    Ok(argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .to_string())
}

/// Admin signup. Members never register directly; they join by accepting an
/// invitation.
/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    validate_email(&req.email)?;
    validate_password(&req.password)?;

    // Check if user already exists
    if state.db.get_user_by_email(&req.email).await?.is_some() {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }

    let user = UserRow {
        id: Uuid::new_v4().to_string(),
        email: req.email,
        name: Some(req.name),
        password_hash: hash_password(&req.password)?,
        avatar_url: None,
        role: "admin".to_string(),
        invited_by: None,
        created_at: format_ts(Utc::now()),
    };
    state.db.create_user(&user).await?;
    tracing::info!("Admin registered: {}", user.id);

    let token = generate_token(&user.id, &user.role, &state.config.auth)?;
    Ok(Json(AuthResponse {
        token,
        user_id: user.id,
        role: user.role,
    }))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    // Find user
    let user = state
        .db
        .get_user_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid email or password".to_string()))?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::AuthError("Invalid email or password".to_string()))?;

    let token = generate_token(&user.id, &user.role, &state.config.auth)?;
    Ok(Json(AuthResponse {
        token,
        user_id: user.id,
        role: user.role,
    }))
}

/// Redeem an invitation code: the invitee picks a name and password and
/// becomes a member of the inviting admin's workspace.
/// POST /auth/accept-invitation
pub async fn accept_invitation(
    State(state): State<AppState>,
    Json(req): Json<AcceptInvitationRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    validate_password(&req.password)?;

    let invitation = state
        .db
        .get_invitation_by_code(&req.code)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid invitation code".to_string()))?;

    if !invitation.is_pending() {
        return Err(AppError::BadRequest(
            "This invitation has already been used".to_string(),
        ));
    }

    let expires_at = crate::db::parse_ts(&invitation.expires_at)?;
    if Utc::now() >= expires_at {
        return Err(AppError::BadRequest("This invitation has expired".to_string()));
    }

    if state.db.get_user_by_email(&invitation.email).await?.is_some() {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }

    let user = UserRow {
        id: Uuid::new_v4().to_string(),
        email: invitation.email.clone(),
        name: Some(req.name),
        password_hash: hash_password(&req.password)?,
        avatar_url: None,
        role: invitation.role.clone(),
        invited_by: Some(invitation.invited_by.clone()),
        created_at: format_ts(Utc::now()),
    };
    state.db.create_user(&user).await?;
    state.db.accept_invitation(&invitation.id).await?;

    tracing::info!(
        "Invitation {} accepted, member {} joined workspace of {}",
        invitation.id,
        user.id,
        invitation.invited_by
    );

    let token = generate_token(&user.id, &user.role, &state.config.auth)?;
    Ok(Json(AuthResponse {
        token,
        user_id: user.id,
        role: user.role,
    }))
}

fn generate_token(
    user_id: &str,
    role: &str,
    auth_config: &crate::config::AuthConfig,
) -> Result<String, AppError> {
    let expiration = Utc::now()
        .checked_add_signed(chrono::Duration::hours(auth_config.token_expiry_hours as i64))
        .ok_or_else(|| AppError::Internal("Failed to calculate expiration".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth_config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    jsonwebtoken::decode::<Claims>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
        &jsonwebtoken::Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::AuthError(e.to_string()))
}

/// Resolves the authenticated user from a Bearer token. The role is read from
/// the user row, not the token, so a stale token cannot carry a stale role.
pub(crate) async fn current_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<UserRow, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::AuthError("Missing or invalid Authorization header".to_string())
        })?;

    let claims = verify_token(token, &state.config.auth.jwt_secret)?;
    state
        .db
        .get_user_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::AuthError("Unknown user".to_string()))
}

pub(crate) async fn require_admin(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<UserRow, AppError> {
    let user = current_user(state, headers).await?;
    if !user.is_admin() {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    Ok(user)
}
