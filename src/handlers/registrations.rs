use axum::extract::{Path, State};
use axum::response::Response;

use crate::models::registration::{
    AttendanceRequest, RegistrationCreateRequest, RegistrationUpdateRequest,
};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::identity::CallerId;
use crate::utils::json::ApiJson;
use crate::utils::response::{created, empty_success, success};

pub async fn register(
    State(state): State<AppState>,
    caller: CallerId,
    ApiJson(request): ApiJson<RegistrationCreateRequest>,
) -> Result<Response, AppError> {
    let registration = state
        .registrations
        .register(caller.as_str(), request)
        .await?;
    Ok(created(registration, "Registration created"))
}

pub async fn my_registrations(
    State(state): State<AppState>,
    caller: CallerId,
) -> Result<Response, AppError> {
    let registrations = state
        .registrations
        .registrations_by_user(caller.as_str())
        .await?;
    Ok(success(registrations, "Registrations retrieved"))
}

pub async fn my_confirmed_registrations(
    State(state): State<AppState>,
    caller: CallerId,
) -> Result<Response, AppError> {
    let registrations = state
        .registrations
        .confirmed_registrations_by_user(caller.as_str())
        .await?;
    Ok(success(registrations, "Registrations retrieved"))
}

pub async fn my_confirmed_with_events(
    State(state): State<AppState>,
    caller: CallerId,
) -> Result<Response, AppError> {
    let pairs = state
        .registrations
        .confirmed_registrations_with_event_by_user(caller.as_str())
        .await?;
    Ok(success(pairs, "Registrations retrieved"))
}

pub async fn my_active_with_events(
    State(state): State<AppState>,
    caller: CallerId,
) -> Result<Response, AppError> {
    let pairs = state
        .registrations
        .active_registrations_with_event_by_user(caller.as_str())
        .await?;
    Ok(success(pairs, "Registrations retrieved"))
}

pub async fn my_events(
    State(state): State<AppState>,
    caller: CallerId,
) -> Result<Response, AppError> {
    let events = state
        .registrations
        .registered_events_for_user(caller.as_str())
        .await?;
    Ok(success(events, "Events retrieved"))
}

pub async fn event_registrations(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Response, AppError> {
    let registrations = state.registrations.registrations_by_event(&event_id).await?;
    Ok(success(registrations, "Registrations retrieved"))
}

pub async fn update_registration(
    State(state): State<AppState>,
    _caller: CallerId,
    Path(registration_id): Path<String>,
    ApiJson(request): ApiJson<RegistrationUpdateRequest>,
) -> Result<Response, AppError> {
    let registration = state
        .registrations
        .update_registration(&registration_id, request)
        .await?;
    Ok(success(registration, "Registration updated"))
}

pub async fn cancel_registration(
    State(state): State<AppState>,
    caller: CallerId,
    Path(registration_id): Path<String>,
) -> Result<Response, AppError> {
    state
        .registrations
        .cancel_registration(&registration_id, caller.as_str())
        .await?;
    Ok(empty_success("Registration cancelled"))
}

pub async fn mark_attendance(
    State(state): State<AppState>,
    _caller: CallerId,
    Path(registration_id): Path<String>,
    ApiJson(request): ApiJson<AttendanceRequest>,
) -> Result<Response, AppError> {
    let registration = state
        .registrations
        .mark_attendance(&registration_id, request.attended)
        .await?;
    Ok(success(registration, "Attendance updated"))
}
