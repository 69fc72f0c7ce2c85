use std::sync::Arc;

use sqlx::PgPool;

use crate::services::{EventService, RegistrationService, UserService};
use crate::store::{
    EventStore, MemoryEventStore, MemoryRegistrationStore, MemoryUserStore, PgEventStore,
    PgRegistrationStore, PgUserStore, RegistrationStore, UserStore,
};

/// Services shared by every handler. Cloning is cheap: each service only
/// holds `Arc`s to its stores.
#[derive(Clone)]
pub struct AppState {
    pub events: EventService,
    pub registrations: RegistrationService,
    pub users: UserService,
}

impl AppState {
    pub fn new(
        events: Arc<dyn EventStore>,
        registrations: Arc<dyn RegistrationStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            events: EventService::new(events.clone(), registrations.clone()),
            registrations: RegistrationService::new(registrations, events),
            users: UserService::new(users),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryEventStore::new()),
            Arc::new(MemoryRegistrationStore::new()),
            Arc::new(MemoryUserStore::new()),
        )
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self::new(
            Arc::new(PgEventStore::new(pool.clone())),
            Arc::new(PgRegistrationStore::new(pool.clone())),
            Arc::new(PgUserStore::new(pool)),
        )
    }
}
