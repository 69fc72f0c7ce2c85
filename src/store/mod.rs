//! Persistence contracts for events, registrations and users.
//!
//! Services only see these traits. [`memory`] backs tests and database-less
//! runs; [`postgres`] is the production backend.

use async_trait::async_trait;

use crate::models::{
    Event, EventCategory, Page, PageRequest, Registration, RegistrationStatus, User,
};
use crate::utils::error::AppError;

pub mod memory;
pub mod postgres;

pub use memory::{MemoryEventStore, MemoryRegistrationStore, MemoryUserStore};
pub use postgres::{PgEventStore, PgRegistrationStore, PgUserStore};

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Event>, AppError>;

    async fn find_by_organizer(&self, organizer_id: &str) -> Result<Vec<Event>, AppError>;

    async fn find_by_category(&self, category: EventCategory) -> Result<Vec<Event>, AppError>;

    /// Newest first.
    async fn find_all(&self, page: PageRequest) -> Result<Page<Event>, AppError>;

    /// Case-insensitive match on title, description or any tag. Newest first.
    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<Event>, AppError>;

    /// Inserts or fully overwrites the event with the same id.
    async fn save(&self, event: &Event) -> Result<(), AppError>;
}

#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Registration>, AppError>;

    async fn find_by_event(&self, event_id: &str) -> Result<Vec<Registration>, AppError>;

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Registration>, AppError>;

    /// True when any registration exists for the pair, cancelled ones included.
    async fn exists_by_event_and_user(&self, event_id: &str, user_id: &str)
        -> Result<bool, AppError>;

    async fn count_by_event_and_status(
        &self,
        event_id: &str,
        status: RegistrationStatus,
    ) -> Result<u64, AppError>;

    /// Inserts or fully overwrites the registration with the same id.
    async fn save(&self, registration: &Registration) -> Result<(), AppError>;

    /// Admits a new registration as one atomic step per event.
    ///
    /// Under a single critical section the store rejects a duplicate
    /// `(event_id, user_id)` pair with [`AppError::Conflict`], counts the
    /// event's confirmed registrations, assigns [`admission_status`] and
    /// inserts. `capacity` is the caller's reading of the event; a store that
    /// locks the event row uses the locked value instead.
    async fn admit(&self, registration: Registration, capacity: u32)
        -> Result<Registration, AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Oldest first.
    async fn find_all(&self, page: PageRequest) -> Result<Page<User>, AppError>;

    async fn save(&self, user: &User) -> Result<(), AppError>;
}

/// Confirmed while there is room, waitlisted once capacity is used up.
pub fn admission_status(confirmed: u64, capacity: u32) -> RegistrationStatus {
    if confirmed < u64::from(capacity) {
        RegistrationStatus::Confirmed
    } else {
        RegistrationStatus::Waitlisted
    }
}

pub(crate) fn already_registered() -> AppError {
    AppError::Conflict("Already registered for this event".into())
}
