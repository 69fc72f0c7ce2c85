use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    Conference,
    Workshop,
    Seminar,
    Networking,
    Social,
    Sports,
    Music,
    Other,
}

impl EventCategory {
    pub const ALL: [EventCategory; 8] = [
        EventCategory::Conference,
        EventCategory::Workshop,
        EventCategory::Seminar,
        EventCategory::Networking,
        EventCategory::Social,
        EventCategory::Sports,
        EventCategory::Music,
        EventCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Conference => "CONFERENCE",
            EventCategory::Workshop => "WORKSHOP",
            EventCategory::Seminar => "SEMINAR",
            EventCategory::Networking => "NETWORKING",
            EventCategory::Social => "SOCIAL",
            EventCategory::Sports => "SPORTS",
            EventCategory::Music => "MUSIC",
            EventCategory::Other => "OTHER",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventCategory::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::InvalidArgument(format!("Unknown event category '{}'", s)))
    }
}

/// Lifecycle state of an event. `Cancelled` doubles as the soft-delete marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Draft,
    Published,
    Cancelled,
    Completed,
}

impl EventStatus {
    pub const ALL: [EventStatus; 4] = [
        EventStatus::Draft,
        EventStatus::Published,
        EventStatus::Cancelled,
        EventStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "DRAFT",
            EventStatus::Published => "PUBLISHED",
            EventStatus::Cancelled => "CANCELLED",
            EventStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::InvalidArgument(format!("Unknown event status '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationType {
    Physical,
    Virtual,
    Hybrid,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::Physical => "PHYSICAL",
            LocationType::Virtual => "VIRTUAL",
            LocationType::Hybrid => "HYBRID",
        }
    }
}

impl FromStr for LocationType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PHYSICAL" => Ok(LocationType::Physical),
            "VIRTUAL" => Ok(LocationType::Virtual),
            "HYBRID" => Ok(LocationType::Hybrid),
            _ => Err(AppError::InvalidArgument(format!(
                "Unknown location type '{}'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "type")]
    pub location_type: LocationType,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub virtual_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: EventCategory,
    pub organizer_id: String,
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    pub location: Location,
    pub capacity: u32,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub status: EventStatus,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub requirements: Option<String>,
    pub agenda: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.organizer_id == user_id
    }

    /// Case-insensitive match against title, description and tags.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }
}

/// Largest capacity the Postgres `INTEGER` column can hold.
pub const MAX_CAPACITY: u32 = i32::MAX as u32;

/// Payload shared by event creation and full-overwrite updates.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: EventCategory,
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    pub location_type: LocationType,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub virtual_link: Option<String>,
    pub capacity: u32,
    pub registration_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub requirements: Option<String>,
    #[serde(default)]
    pub agenda: Vec<String>,
}

impl EventRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::ValidationError("Title must not be empty".into()));
        }
        if self.end_date_time < self.start_date_time {
            return Err(AppError::ValidationError(
                "End time must not precede start time".into(),
            ));
        }
        if self.capacity > MAX_CAPACITY {
            return Err(AppError::ValidationError(format!(
                "Capacity must not exceed {}",
                MAX_CAPACITY
            )));
        }
        Ok(())
    }

    pub fn location(&self) -> Location {
        Location {
            location_type: self.location_type,
            address: self.address.clone(),
            city: self.city.clone(),
            country: self.country.clone(),
            virtual_link: self.virtual_link.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventStatusRequest {
    pub status: String,
}

/// Flattened event view returned to clients.
///
/// `registered_count` is never stored; it is the live number of confirmed
/// registrations at the time the view was built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: EventCategory,
    pub organizer_id: String,
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    pub location_type: LocationType,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub virtual_link: Option<String>,
    pub capacity: u32,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub status: EventStatus,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub requirements: Option<String>,
    pub agenda: Vec<String>,
    pub registered_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventResponse {
    pub fn from_event(event: Event, registered_count: u64) -> Self {
        Self {
            id: event.id,
            title: event.title,
            description: event.description,
            category: event.category,
            organizer_id: event.organizer_id,
            start_date_time: event.start_date_time,
            end_date_time: event.end_date_time,
            location_type: event.location.location_type,
            address: event.location.address,
            city: event.location.city,
            country: event.location.country,
            virtual_link: event.location.virtual_link,
            capacity: event.capacity,
            registration_deadline: event.registration_deadline,
            status: event.status,
            tags: event.tags,
            image_url: event.image_url,
            requirements: event.requirements,
            agenda: event.agenda,
            registered_count,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}
