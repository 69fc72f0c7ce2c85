use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{admission_status, already_registered, EventStore, RegistrationStore, UserStore};
use crate::models::{
    Event, EventCategory, Page, PageRequest, Registration, RegistrationStatus, User,
};
use crate::utils::error::AppError;

fn newest_first(events: &mut [Event]) {
    events.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn by_registration_date(registrations: &mut [Registration]) {
    registrations.sort_by(|a, b| {
        a.registration_date
            .cmp(&b.registration_date)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<HashMap<String, Event>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hard removal, which the service never does. Lets tests model an
    /// event that vanished underneath its registrations.
    pub async fn remove(&self, id: &str) -> Option<Event> {
        self.events.write().await.remove(id)
    }

    async fn collect(&self, keep: impl Fn(&Event) -> bool) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .events
            .read()
            .await
            .values()
            .filter(|&e| keep(e))
            .cloned()
            .collect();
        newest_first(&mut events);
        events
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn get(&self, id: &str) -> Result<Option<Event>, AppError> {
        Ok(self.events.read().await.get(id).cloned())
    }

    async fn find_by_organizer(&self, organizer_id: &str) -> Result<Vec<Event>, AppError> {
        Ok(self.collect(|e| e.organizer_id == organizer_id).await)
    }

    async fn find_by_category(&self, category: EventCategory) -> Result<Vec<Event>, AppError> {
        Ok(self.collect(|e| e.category == category).await)
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<Event>, AppError> {
        Ok(Page::from_vec(self.collect(|_| true).await, page))
    }

    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<Event>, AppError> {
        Ok(Page::from_vec(self.collect(|e| e.matches(query)).await, page))
    }

    async fn save(&self, event: &Event) -> Result<(), AppError> {
        self.events
            .write()
            .await
            .insert(event.id.clone(), event.clone());
        Ok(())
    }
}

/// All registrations behind one lock, which makes [`RegistrationStore::admit`]
/// trivially atomic.
#[derive(Default)]
pub struct MemoryRegistrationStore {
    registrations: RwLock<HashMap<String, Registration>>,
}

impl MemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn collect(&self, keep: impl Fn(&Registration) -> bool) -> Vec<Registration> {
        let mut registrations: Vec<Registration> = self
            .registrations
            .read()
            .await
            .values()
            .filter(|&r| keep(r))
            .cloned()
            .collect();
        by_registration_date(&mut registrations);
        registrations
    }
}

#[async_trait]
impl RegistrationStore for MemoryRegistrationStore {
    async fn get(&self, id: &str) -> Result<Option<Registration>, AppError> {
        Ok(self.registrations.read().await.get(id).cloned())
    }

    async fn find_by_event(&self, event_id: &str) -> Result<Vec<Registration>, AppError> {
        Ok(self.collect(|r| r.event_id == event_id).await)
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Registration>, AppError> {
        Ok(self.collect(|r| r.user_id == user_id).await)
    }

    async fn exists_by_event_and_user(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<bool, AppError> {
        Ok(self
            .registrations
            .read()
            .await
            .values()
            .any(|r| r.event_id == event_id && r.user_id == user_id))
    }

    async fn count_by_event_and_status(
        &self,
        event_id: &str,
        status: RegistrationStatus,
    ) -> Result<u64, AppError> {
        let count = self
            .registrations
            .read()
            .await
            .values()
            .filter(|r| r.event_id == event_id && r.status == status)
            .count();
        Ok(count as u64)
    }

    async fn save(&self, registration: &Registration) -> Result<(), AppError> {
        self.registrations
            .write()
            .await
            .insert(registration.id.clone(), registration.clone());
        Ok(())
    }

    async fn admit(
        &self,
        mut registration: Registration,
        capacity: u32,
    ) -> Result<Registration, AppError> {
        let mut registrations = self.registrations.write().await;

        let mut confirmed = 0u64;
        for existing in registrations.values() {
            if existing.event_id != registration.event_id {
                continue;
            }
            if existing.user_id == registration.user_id {
                return Err(already_registered());
            }
            if existing.status == RegistrationStatus::Confirmed {
                confirmed += 1;
            }
        }

        registration.status = admission_status(confirmed, capacity);
        registrations.insert(registration.id.clone(), registration.clone());
        Ok(registration)
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<User>, AppError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(Page::from_vec(users, page))
    }

    async fn save(&self, user: &User) -> Result<(), AppError> {
        self.users.write().await.insert(user.id.clone(), user.clone());
        Ok(())
    }
}
