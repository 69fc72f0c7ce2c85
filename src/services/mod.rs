//! Business rules on top of the stores.

use crate::models::{Event, EventResponse, RegistrationStatus};
use crate::store::RegistrationStore;
use crate::utils::error::AppError;

pub mod event_service;
pub mod registration_service;
pub mod user_service;

pub use event_service::EventService;
pub use registration_service::RegistrationService;
pub use user_service::UserService;

/// Builds the client view of an event with a freshly counted
/// `registered_count`.
pub(crate) async fn event_view(
    registrations: &dyn RegistrationStore,
    event: Event,
) -> Result<EventResponse, AppError> {
    let confirmed = registrations
        .count_by_event_and_status(&event.id, RegistrationStatus::Confirmed)
        .await?;
    Ok(EventResponse::from_event(event, confirmed))
}

#[cfg(test)]
pub(crate) mod test_support;
