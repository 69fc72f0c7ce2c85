use axum::extract::State;
use axum::response::Response;

use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::identity::CallerId;
use crate::utils::response::success;

/// Active registrations of the caller, each joined with its event.
pub async fn attendee_dashboard(
    State(state): State<AppState>,
    caller: CallerId,
) -> Result<Response, AppError> {
    let dashboard = state
        .registrations
        .attendee_dashboard(caller.as_str())
        .await?;
    Ok(success(dashboard, "Dashboard retrieved"))
}
