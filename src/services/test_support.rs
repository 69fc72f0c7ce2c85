use std::sync::Arc;

use chrono::{Duration, Utc};

use super::{EventService, RegistrationService, UserService};
use crate::models::event::EventRequest;
use crate::models::{EventCategory, LocationType, User, UserPreferences};
use crate::store::{MemoryEventStore, MemoryRegistrationStore, MemoryUserStore};

/// Services wired to fresh in-memory stores, with the stores kept reachable.
pub struct Fixture {
    pub event_store: Arc<MemoryEventStore>,
    pub registration_store: Arc<MemoryRegistrationStore>,
    pub user_store: Arc<MemoryUserStore>,
    pub events: EventService,
    pub registrations: RegistrationService,
    pub users: UserService,
}

impl Fixture {
    pub fn new() -> Self {
        let event_store = Arc::new(MemoryEventStore::new());
        let registration_store = Arc::new(MemoryRegistrationStore::new());
        let user_store = Arc::new(MemoryUserStore::new());

        Self {
            events: EventService::new(event_store.clone(), registration_store.clone()),
            registrations: RegistrationService::new(
                registration_store.clone(),
                event_store.clone(),
            ),
            users: UserService::new(user_store.clone()),
            event_store,
            registration_store,
            user_store,
        }
    }
}

pub fn event_request(title: &str, capacity: u32) -> EventRequest {
    let start = Utc::now() + Duration::days(7);
    EventRequest {
        title: title.to_string(),
        description: Some(format!("{} description", title)),
        category: EventCategory::Conference,
        start_date_time: start,
        end_date_time: start + Duration::hours(3),
        location_type: LocationType::Physical,
        address: Some("1 Main St".into()),
        city: Some("Lisbon".into()),
        country: Some("PT".into()),
        virtual_link: None,
        capacity,
        registration_deadline: Some(start - Duration::days(1)),
        tags: Vec::new(),
        image_url: None,
        requirements: None,
        agenda: Vec::new(),
    }
}

pub fn user(id: &str) -> User {
    let now = Utc::now();
    User {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        phone: None,
        profile_image: None,
        preferences: UserPreferences {
            categories: vec![EventCategory::Workshop],
            notifications: true,
        },
        active: true,
        created_at: now,
        updated_at: now,
    }
}
