use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{
        AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, UpdateProfileRequest, UserDto,
    },
    extractors::AuthUser,
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo::User,
};
use crate::{
    error::ApiError,
    response::{created, ok, ApiResult},
    state::AppState,
    validate::ValidJson,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/profile", get(get_profile).put(update_profile))
}

fn issue_pair(keys: &JwtKeys, user: &User, recipe_count: i64) -> Result<AuthResponse, ApiError> {
    Ok(AuthResponse {
        access_token: keys.sign_access(user.id)?,
        refresh_token: keys.sign_refresh(user.id)?,
        user: UserDto::from_user(user, recipe_count),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(mut payload): ValidJson<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    payload.email = payload.email.trim().to_lowercase();
    payload.validate()?;

    if let Some(existing) =
        User::find_by_username_or_email(&state.db, &payload.username, &payload.email).await?
    {
        warn!(username = %payload.username, "registration conflict");
        let message = if existing.email == payload.email {
            "User with this email already exists"
        } else {
            "User with this username already exists"
        };
        return Err(ApiError::conflict(message));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        &payload.username,
        &payload.email,
        &hash,
        payload.full_name.as_deref(),
    )
    .await?;

    let keys = JwtKeys::from_ref(&state);
    let response = issue_pair(&keys, &user, 0)?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(created(response))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> ApiResult<AuthResponse> {
    payload.validate()?;

    let user = match User::find_by_identity(&state.db, payload.username.trim()).await? {
        Some(user) => user,
        None => {
            warn!(username = %payload.username, "login unknown identity");
            return Err(ApiError::InvalidCredentials);
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let recipe_count = User::recipe_count(&state.db, user.id).await?;
    let keys = JwtKeys::from_ref(&state);
    let response = issue_pair(&keys, &user, recipe_count)?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(ok(response))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RefreshRequest>,
) -> ApiResult<AuthResponse> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|_| ApiError::unauthenticated("Invalid or expired refresh token"))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthenticated("User no longer exists"))?;

    let recipe_count = User::recipe_count(&state.db, user.id).await?;
    let response = issue_pair(&keys, &user, recipe_count)?;
    Ok(ok(response))
}

/// Stateless tokens cannot be revoked server-side; the client discards them.
#[instrument]
pub async fn logout(AuthUser(user_id): AuthUser) -> ApiResult<()> {
    info!(user_id = %user_id, "user logged out");
    Ok(ok(()))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<UserDto> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let recipe_count = User::recipe_count(&state.db, user.id).await?;
    Ok(ok(UserDto::from_user(&user, recipe_count)))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(payload): ValidJson<UpdateProfileRequest>,
) -> ApiResult<UserDto> {
    payload.validate()?;

    let user = User::update_profile(
        &state.db,
        user_id,
        payload.full_name.as_deref(),
        payload.bio.as_deref(),
        payload.profile_image.as_deref(),
    )
    .await?;

    let recipe_count = User::recipe_count(&state.db, user.id).await?;
    info!(user_id = %user.id, "profile updated");
    Ok(ok(UserDto::from_user(&user, recipe_count)))
}
