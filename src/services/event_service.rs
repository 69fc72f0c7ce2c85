use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use tracing::{info, instrument, warn};

use super::event_view;
use crate::models::event::{EventRequest, EventResponse};
use crate::models::{Event, EventCategory, EventStatus, Page, PageRequest};
use crate::store::{EventStore, RegistrationStore};
use crate::utils::error::AppError;

#[derive(Clone)]
pub struct EventService {
    events: Arc<dyn EventStore>,
    registrations: Arc<dyn RegistrationStore>,
}

impl EventService {
    pub fn new(events: Arc<dyn EventStore>, registrations: Arc<dyn RegistrationStore>) -> Self {
        Self {
            events,
            registrations,
        }
    }

    async fn view(&self, event: Event) -> Result<EventResponse, AppError> {
        event_view(self.registrations.as_ref(), event).await
    }

    async fn view_page(&self, page: Page<Event>) -> Result<Page<EventResponse>, AppError> {
        let Page {
            content,
            page,
            size,
            total_elements,
            total_pages,
        } = page;

        let content = try_join_all(content.into_iter().map(|event| self.view(event))).await?;

        Ok(Page {
            content,
            page,
            size,
            total_elements,
            total_pages,
        })
    }

    async fn load(&self, event_id: &str) -> Result<Event, AppError> {
        self.events
            .get(event_id)
            .await?
            .ok_or_else(|| AppError::not_found("Event", event_id))
    }

    /// Loads an event and checks that `user_id` organizes it.
    async fn load_owned(&self, event_id: &str, user_id: &str) -> Result<Event, AppError> {
        let event = self.load(event_id).await?;
        if !event.is_owned_by(user_id) {
            warn!(event_id, user_id, "Caller does not organize this event");
            return Err(AppError::Forbidden(
                "Not authorized to modify this event".into(),
            ));
        }
        Ok(event)
    }

    #[instrument(skip(self, request))]
    pub async fn create_event(
        &self,
        organizer_id: &str,
        request: EventRequest,
    ) -> Result<EventResponse, AppError> {
        request.validate()?;

        let now = Utc::now();
        let event = Event {
            id: uuid::Uuid::new_v4().to_string(),
            location: request.location(),
            title: request.title,
            description: request.description,
            category: request.category,
            organizer_id: organizer_id.to_string(),
            start_date_time: request.start_date_time,
            end_date_time: request.end_date_time,
            capacity: request.capacity,
            registration_deadline: request.registration_deadline,
            status: EventStatus::Published,
            tags: request.tags,
            image_url: request.image_url,
            requirements: request.requirements,
            agenda: request.agenda,
            created_at: now,
            updated_at: now,
        };

        self.events.save(&event).await?;
        info!(event_id = %event.id, capacity = event.capacity, "Event created");

        self.view(event).await
    }

    #[instrument(skip(self, request))]
    pub async fn update_event(
        &self,
        event_id: &str,
        user_id: &str,
        request: EventRequest,
    ) -> Result<EventResponse, AppError> {
        request.validate()?;
        let mut event = self.load_owned(event_id, user_id).await?;

        event.location = request.location();
        event.title = request.title;
        event.description = request.description;
        event.category = request.category;
        event.start_date_time = request.start_date_time;
        event.end_date_time = request.end_date_time;
        event.capacity = request.capacity;
        event.registration_deadline = request.registration_deadline;
        event.tags = request.tags;
        event.image_url = request.image_url;
        event.requirements = request.requirements;
        event.agenda = request.agenda;
        event.updated_at = Utc::now();

        self.events.save(&event).await?;
        self.view(event).await
    }

    /// Soft delete: the event is kept and marked cancelled.
    #[instrument(skip(self))]
    pub async fn delete_event(&self, event_id: &str, user_id: &str) -> Result<(), AppError> {
        let mut event = self.load_owned(event_id, user_id).await?;

        event.status = EventStatus::Cancelled;
        event.updated_at = Utc::now();
        self.events.save(&event).await?;

        info!(event_id, "Event cancelled");
        Ok(())
    }

    pub async fn get_event(&self, event_id: &str) -> Result<EventResponse, AppError> {
        let event = self.load(event_id).await?;
        self.view(event).await
    }

    pub async fn list_events(&self, page: PageRequest) -> Result<Page<EventResponse>, AppError> {
        let events = self.events.find_all(page.normalized()).await?;
        self.view_page(events).await
    }

    pub async fn search_events(
        &self,
        query: &str,
        page: PageRequest,
    ) -> Result<Page<EventResponse>, AppError> {
        let events = self.events.search(query, page.normalized()).await?;
        self.view_page(events).await
    }

    // Paginates in memory over the organizer's full list.
    pub async fn list_events_by_organizer(
        &self,
        organizer_id: &str,
        page: PageRequest,
    ) -> Result<Page<EventResponse>, AppError> {
        let events = self.events.find_by_organizer(organizer_id).await?;
        self.view_page(Page::from_vec(events, page.normalized()))
            .await
    }

    pub async fn list_events_by_category(
        &self,
        category: EventCategory,
        page: PageRequest,
    ) -> Result<Page<EventResponse>, AppError> {
        let events = self.events.find_by_category(category).await?;
        self.view_page(Page::from_vec(events, page.normalized()))
            .await
    }

    /// Writes any recognised status without checking the transition.
    #[instrument(skip(self))]
    pub async fn update_event_status(
        &self,
        event_id: &str,
        user_id: &str,
        status: &str,
    ) -> Result<EventResponse, AppError> {
        let mut event = self.load_owned(event_id, user_id).await?;
        let status: EventStatus = status.parse()?;

        event.status = status;
        event.updated_at = Utc::now();
        self.events.save(&event).await?;

        info!(event_id, status = %status, "Event status updated");
        self.view(event).await
    }

    pub fn list_categories(&self) -> Vec<&'static str> {
        EventCategory::ALL.iter().map(|c| c.as_str()).collect()
    }
}
