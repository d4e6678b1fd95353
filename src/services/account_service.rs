use uuid::Uuid;

use crate::{
    dto::account::{Profile, UpdateProfileRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    services::cart_service,
    state::AppState,
    validation::not_blank,
};

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Profile>> {
    let profile = load_profile(state, user.user_id).await?;
    Ok(ApiResponse::success("Profile", profile, None))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<Profile>> {
    let email = payload
        .email
        .map(|email| not_blank("email", email))
        .transpose()?;

    if let Some(email) = email.as_deref() {
        let taken: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE email = $1 AND id <> $2")
                .bind(email)
                .bind(user.user_id)
                .fetch_optional(&state.pool)
                .await?;
        if taken.is_some() {
            return Err(AppError::BadRequest("Email is already taken".to_string()));
        }
    }

    let result = sqlx::query(
        r#"
        UPDATE users
        SET first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            email = COALESCE($4, email)
        WHERE id = $1
        "#,
    )
    .bind(user.user_id)
    .bind(payload.first_name)
    .bind(payload.last_name)
    .bind(email)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    let profile = load_profile(state, user.user_id).await?;
    Ok(ApiResponse::success("Updated", profile, Some(Meta::empty())))
}

async fn load_profile(state: &AppState, user_id: Uuid) -> AppResult<Profile> {
    let user: User = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound)?;
    let cart_count = cart_service::cart_count(&state.pool, user_id).await?;
    Ok(Profile { user, cart_count })
}
