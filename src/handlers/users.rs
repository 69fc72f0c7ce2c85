use axum::extract::{Path, Query, State};
use axum::response::Response;

use crate::models::PageRequest;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::identity::CallerId;
use crate::utils::response::{empty_success, success};

pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PageRequest>,
) -> Result<Response, AppError> {
    let users = state.users.list_users(page).await?;
    Ok(success(users, "Users retrieved"))
}

pub async fn my_profile(
    State(state): State<AppState>,
    caller: CallerId,
) -> Result<Response, AppError> {
    let profile = state.users.get_profile(caller.as_str()).await?;
    Ok(success(profile, "Profile retrieved"))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    let profile = state.users.get_profile(&user_id).await?;
    Ok(success(profile, "User retrieved"))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    _caller: CallerId,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    state.users.deactivate_user(&user_id).await?;
    Ok(empty_success("User deactivated"))
}
