use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::Deserialize;

use crate::models::event::{EventRequest, EventStatusRequest};
use crate::models::page::{PageRequest, DEFAULT_PAGE_SIZE};
use crate::models::EventCategory;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::identity::CallerId;
use crate::utils::json::ApiJson;
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_size")]
    pub size: usize,
}

const fn default_size() -> usize {
    DEFAULT_PAGE_SIZE
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(page): Query<PageRequest>,
) -> Result<Response, AppError> {
    let events = state.events.list_events(page).await?;
    Ok(success(events, "Events retrieved"))
}

pub async fn search_events(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, AppError> {
    let page = PageRequest::new(query.page, query.size);
    let events = state.events.search_events(&query.q, page).await?;
    Ok(success(events, "Search results"))
}

pub async fn list_categories(State(state): State<AppState>) -> Response {
    success(state.events.list_categories(), "Categories retrieved")
}

pub async fn list_events_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(page): Query<PageRequest>,
) -> Result<Response, AppError> {
    let category: EventCategory = category.parse()?;
    let events = state.events.list_events_by_category(category, page).await?;
    Ok(success(events, "Events retrieved"))
}

pub async fn list_events_by_organizer(
    State(state): State<AppState>,
    Path(organizer_id): Path<String>,
    Query(page): Query<PageRequest>,
) -> Result<Response, AppError> {
    let events = state
        .events
        .list_events_by_organizer(&organizer_id, page)
        .await?;
    Ok(success(events, "Events retrieved"))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Response, AppError> {
    let event = state.events.get_event(&event_id).await?;
    Ok(success(event, "Event retrieved"))
}

pub async fn create_event(
    State(state): State<AppState>,
    caller: CallerId,
    ApiJson(request): ApiJson<EventRequest>,
) -> Result<Response, AppError> {
    let event = state.events.create_event(caller.as_str(), request).await?;
    Ok(created(event, "Event created"))
}

pub async fn update_event(
    State(state): State<AppState>,
    caller: CallerId,
    Path(event_id): Path<String>,
    ApiJson(request): ApiJson<EventRequest>,
) -> Result<Response, AppError> {
    let event = state
        .events
        .update_event(&event_id, caller.as_str(), request)
        .await?;
    Ok(success(event, "Event updated"))
}

pub async fn delete_event(
    State(state): State<AppState>,
    caller: CallerId,
    Path(event_id): Path<String>,
) -> Result<Response, AppError> {
    state.events.delete_event(&event_id, caller.as_str()).await?;
    Ok(empty_success("Event cancelled"))
}

pub async fn update_event_status(
    State(state): State<AppState>,
    caller: CallerId,
    Path(event_id): Path<String>,
    ApiJson(request): ApiJson<EventStatusRequest>,
) -> Result<Response, AppError> {
    let event = state
        .events
        .update_event_status(&event_id, caller.as_str(), &request.status)
        .await?;
    Ok(success(event, "Event status updated"))
}
